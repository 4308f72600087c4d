//! Pattern index types
//!
//! Schema for the generated pattern index file: the cross-device
//! auth-pattern aggregate plus one detection descriptor per decoder.
//! The file is produced offline by the profile generator and treated
//! as read-only input here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported index schema version. A mismatch is fatal at load time.
pub const SCHEMA_VERSION: u32 = 1;

/// Known username/password form field name pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormFieldPair {
    pub username: String,
    pub password: String,
}

/// Cross-device authentication pattern aggregate.
///
/// Built offline from the union of all known device profiles so the
/// core carries no single device's hard-coded knowledge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthPatterns {
    /// Known login-form field name pairs
    #[serde(default)]
    pub form_fields: Vec<FormFieldPair>,
    /// Known login-form action paths
    #[serde(default)]
    pub form_actions: Vec<String>,
    /// Markers indicating the page script encodes the password (base64 etc.)
    #[serde(default)]
    pub encoding_markers: Vec<String>,
    /// Known HNAP endpoint paths
    #[serde(default)]
    pub hnap_endpoints: Vec<String>,
    /// Known HNAP XML namespaces
    #[serde(default)]
    pub hnap_namespaces: Vec<String>,
    /// Known URL-token login path prefixes
    #[serde(default)]
    pub url_token_prefixes: Vec<String>,
    /// Known session-token cookie names
    #[serde(default)]
    pub token_cookies: Vec<String>,
}

/// Decoder verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    InProgress,
    AwaitingVerification,
    Broken,
    Deprecated,
}

impl VerificationStatus {
    /// Broken and deprecated decoders are never selected
    pub fn selectable(&self) -> bool {
        !matches!(self, Self::Broken | Self::Deprecated)
    }
}

/// One textual detection pattern with its fixed confidence weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionPattern {
    pub pattern: String,
    pub confidence: f64,
    /// Interpret `pattern` as a regex instead of a case-insensitive substring
    #[serde(default)]
    pub regex: bool,
}

/// Pre-auth / post-auth pattern sets for one decoder.
///
/// The split is deliberate: pre_auth patterns only rule devices out and
/// steer paradigm/auth detection; identity is decided on post_auth
/// evidence alone, because login pages share generic boilerplate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetectionDescriptor {
    #[serde(default)]
    pub pre_auth: Vec<DetectionPattern>,
    #[serde(default)]
    pub post_auth: Vec<DetectionPattern>,
    /// Path to fetch to evaluate post_auth patterns, when the landing
    /// page does not expose them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_hint: Option<String>,
}

/// Decoder metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoderMetadata {
    pub manufacturer: String,
    #[serde(default)]
    pub models: Vec<String>,
    pub verification_status: VerificationStatus,
    /// Tie-break rank; lower wins
    #[serde(default)]
    pub priority: i32,
}

/// One decoder entry in the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoderDescriptor {
    pub decoder_id: String,
    #[serde(flatten)]
    pub metadata: DecoderMetadata,
    pub detection: DetectionDescriptor,
}

/// The full generated index document.
///
/// `decoders` is an ordered array rather than a JSON map: the
/// selector's final tie-break is index insertion order, which a map
/// would not guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternIndex {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub auth_patterns: AuthPatterns,
    #[serde(default)]
    pub decoders: Vec<DecoderDescriptor>,
}
