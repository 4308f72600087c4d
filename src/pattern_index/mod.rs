//! Pattern Knowledge Base
//!
//! A generic, cross-device aggregate of authentication-related
//! patterns (form field names, HNAP endpoints/namespaces, URL-token
//! markers) plus per-decoder detection descriptors, compiled offline
//! from every known device profile. Loaded once at startup, read-only
//! during discovery.

mod loader;
mod types;

pub use loader::{CompiledDetection, CompiledPattern, Matcher};
pub use types::{
    AuthPatterns, DecoderDescriptor, DecoderMetadata, DetectionDescriptor, DetectionPattern,
    FormFieldPair, PatternIndex, VerificationStatus, SCHEMA_VERSION,
};

#[cfg(test)]
mod tests;
