//! Generic HTML fallback decoder
//!
//! Best-effort heuristics over arbitrary modem status pages: keyword
//! scan for connection state, uptime and firmware extraction, and
//! channel-table parsing keyed on Hz/dBmV/dB cell units. Always
//! produces a record; a page with nothing recognizable yields empty
//! tables with `channels_not_applicable` set.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use super::telemetry::{DownstreamChannel, TelemetryRecord, UpstreamChannel};
use super::{DecoderMetadata, DetectionDescriptor, ModemDecoder, VerificationStatus};
use crate::error::Result;

/// Id of the always-present fallback decoder
pub const FALLBACK_DECODER_ID: &str = "generic-html";

pub struct GenericHtmlDecoder {
    detection: DetectionDescriptor,
    metadata: DecoderMetadata,
}

impl Default for GenericHtmlDecoder {
    fn default() -> Self {
        Self {
            // Empty pattern sets: the fallback never competes on
            // detection, the selector designates it below the floor.
            detection: DetectionDescriptor::default(),
            metadata: DecoderMetadata {
                manufacturer: "generic".to_string(),
                models: vec![],
                verification_status: VerificationStatus::Verified,
                priority: i32::MAX,
            },
        }
    }
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("builtin regex")
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ci(r"<tr[^>]*>(.*?)</tr>"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ci(r"<t[dh][^>]*>(.*?)</t[dh]>"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ci(r"<[^>]+>"))
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ci(r"\b(operational|online|connected|allowed|locked)\b"))
}

fn firmware_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ci(r"(?:software|firmware)\s*version\b[^A-Za-z0-9]*([A-Za-z0-9][A-Za-z0-9._/-]+)"))
}

fn uptime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        ci(r"up\s*time\b[^0-9]*(?:(\d+)\s*d(?:ays?)?[^0-9]*)?(\d{1,2})[h:](?:\s*)(\d{1,2})[m:](?:\s*)(\d{1,2})")
    })
}

fn strip_tags(html: &str) -> String {
    tag_re().replace_all(html, " ").to_string()
}

fn first_int(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn leading_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    trimmed[..end].parse().ok()
}

/// Parse a channel row from stripped cell text. A row qualifies when
/// it carries a frequency-looking cell (Hz unit or 7+ digit number).
fn parse_channel_row(cells: &[String]) -> Option<(DownstreamChannel, bool)> {
    let mut frequency_hz = None;
    let mut power_dbmv = None;
    let mut snr_db = None;
    let mut lock_status = None;
    let mut modulation = None;
    let mut channel_id = None;

    for cell in cells {
        let lower = cell.to_lowercase();
        let trimmed = cell.trim();
        if lower.contains("hz") {
            if let Some(v) = leading_float(trimmed) {
                frequency_hz = Some(if lower.contains("mhz") {
                    (v * 1_000_000.0) as u64
                } else {
                    v as u64
                });
            }
        } else if lower.contains("dbmv") {
            power_dbmv = leading_float(trimmed);
        } else if lower.contains("db") {
            snr_db = leading_float(trimmed);
        } else if lower.contains("locked") {
            lock_status = Some(trimmed.to_string());
        } else if lower.contains("qam") || lower.contains("ofdm") || lower.contains("atdma") || lower.contains("sc-qam") {
            modulation = Some(trimmed.to_string());
        } else if channel_id.is_none() && !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            channel_id = first_int(trimmed).map(|v| v as u32);
        }
    }

    // A bare number is not a channel without a frequency to anchor it
    let frequency_hz = match frequency_hz {
        Some(f) if f >= 1_000_000 => Some(f),
        _ => return None,
    };

    let is_downstream = snr_db.is_some();
    Some((
        DownstreamChannel {
            channel_id: channel_id.unwrap_or(0),
            lock_status,
            modulation,
            frequency_hz,
            power_dbmv,
            snr_db,
            corrected: None,
            uncorrectable: None,
        },
        is_downstream,
    ))
}

impl GenericHtmlDecoder {
    fn parse_channels(&self, raw: &str, record: &mut TelemetryRecord) {
        for row in row_re().captures_iter(raw) {
            let cells: Vec<String> = cell_re()
                .captures_iter(&row[1])
                .map(|c| strip_tags(&c[1]).trim().to_string())
                .collect();
            if cells.len() < 3 {
                continue;
            }
            if let Some((channel, is_downstream)) = parse_channel_row(&cells) {
                if is_downstream {
                    record.downstream.push(channel);
                } else {
                    record.upstream.push(UpstreamChannel {
                        channel_id: channel.channel_id,
                        lock_status: channel.lock_status,
                        modulation: channel.modulation,
                        frequency_hz: channel.frequency_hz,
                        power_dbmv: channel.power_dbmv,
                    });
                }
            }
        }
    }
}

impl ModemDecoder for GenericHtmlDecoder {
    fn decoder_id(&self) -> &str {
        FALLBACK_DECODER_ID
    }

    fn decode(&self, raw: &str) -> Result<TelemetryRecord> {
        let mut record = TelemetryRecord::default();
        let text = strip_tags(raw);

        if let Some(caps) = status_re().captures(&text) {
            record.connection_status = caps[1].to_string();
        }
        if let Some(caps) = firmware_re().captures(&text) {
            record.firmware_version = Some(caps[1].to_string());
        }
        if let Some(caps) = uptime_re().captures(&text) {
            let days: u64 = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            let h: u64 = caps[2].parse().unwrap_or(0);
            let m: u64 = caps[3].parse().unwrap_or(0);
            let s: u64 = caps[4].parse().unwrap_or(0);
            record.uptime_seconds = Some(days * 86_400 + h * 3_600 + m * 60 + s);
        }

        self.parse_channels(raw, &mut record);

        if record.downstream.is_empty() && record.upstream.is_empty() {
            record.channels_not_applicable = true;
        }
        Ok(record)
    }

    fn detection_descriptor(&self) -> &DetectionDescriptor {
        &self.detection
    }

    fn metadata(&self) -> &DecoderMetadata {
        &self.metadata
    }
}
