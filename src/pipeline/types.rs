//! Pipeline stage result types
//!
//! Each stage's result is retained, not merged away, so a failure is
//! attributable to a specific stage. The top-level result is the only
//! object exposed to the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth_client::{ConnectivityFailure, SessionToken};
use crate::decoder::TelemetryRecord;
use crate::detector::{AuthStrategy, Paradigm};
use crate::signal::DiscoveryResult;

pub use crate::selector::ParserResult;

/// Stage 1: one unauthenticated request to the device root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityResult {
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ConnectivityFailure>,
}

/// Stage 2: one authentication attempt with the resolved strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    /// Resolved strategy; None when no auth signal existed
    pub strategy: Option<AuthStrategy>,
    pub authenticated: bool,
    /// Session material for subsequent fetches; not serialized
    #[serde(skip)]
    pub session: Option<SessionToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stage 4: one decode of a real data page plus a required-field check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub missing_fields: Vec<String>,
    /// Set when the selected decoder failed and the generic fallback
    /// produced the checked record instead
    #[serde(default)]
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryRecord>,
}

/// The four stage results. Stages after a connectivity failure stay
/// `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStages {
    pub connectivity: ConnectivityResult,
    pub auth: Option<AuthResult>,
    pub parser: Option<ParserResult>,
    pub validation: Option<ValidationResult>,
}

/// Final pipeline verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPipelineResult {
    pub attempt_id: Uuid,
    pub host: String,
    pub paradigm: Option<Paradigm>,
    pub stages: PipelineStages,
    pub success: bool,
    pub diagnostic_signals: DiscoveryResult,
}
