//! Decoder contract and registry
//!
//! Device-specific decoders live outside this crate; the pipeline and
//! selector depend only on the `ModemDecoder` trait. The registry is
//! populated explicitly at startup from the generated pattern index
//! (no dynamic loading), plus any compile-time registered
//! implementations. The generic HTML fallback always exists.

mod fallback;
mod registry;
mod telemetry;

pub use fallback::{GenericHtmlDecoder, FALLBACK_DECODER_ID};
pub use registry::{DecoderRegistry, RegistryEntry};
pub use telemetry::{DownstreamChannel, TelemetryRecord, UpstreamChannel};

use crate::error::Result;
use crate::pattern_index::{DecoderMetadata, DetectionDescriptor, VerificationStatus};

/// Capability contract every decoder implements
pub trait ModemDecoder: Send + Sync {
    fn decoder_id(&self) -> &str;

    /// Turn one raw device response into structured telemetry
    fn decode(&self, raw: &str) -> Result<TelemetryRecord>;

    fn detection_descriptor(&self) -> &DetectionDescriptor;

    fn metadata(&self) -> &DecoderMetadata;
}

#[cfg(test)]
mod tests;
