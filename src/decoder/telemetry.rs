//! Canonical telemetry record
//!
//! The shape every decoder produces, independent of the device's wire
//! format: identity fields, connection state, and channel tables.

use serde::{Deserialize, Serialize};

/// One downstream channel row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownstreamChannel {
    pub channel_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_dbmv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncorrectable: Option<u64>,
}

/// One upstream channel row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamChannel {
    pub channel_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_dbmv: Option<f64>,
}

/// Structured telemetry decoded from one device page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    /// Free-form device connection state ("Operational", "Online", ...)
    pub connection_status: String,
    #[serde(default)]
    pub downstream: Vec<DownstreamChannel>,
    #[serde(default)]
    pub upstream: Vec<UpstreamChannel>,
    /// Set by decoders for devices that legitimately expose no channel
    /// tables (bridge mode, pure REST gateways)
    #[serde(default)]
    pub channels_not_applicable: bool,
}

impl TelemetryRecord {
    /// Required-field check used by the pipeline validation stage.
    /// Returns the list of missing fields, empty when valid.
    pub fn missing_required_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.connection_status.trim().is_empty() {
            missing.push("connection_status".to_string());
        }
        let has_channels = !self.downstream.is_empty() || !self.upstream.is_empty();
        if !has_channels && !self.channels_not_applicable {
            missing.push("channel_tables".to_string());
        }
        missing
    }
}
