use std::sync::Arc;

use chrono::Utc;

use super::{DecoderRegistry, GenericHtmlDecoder, ModemDecoder, FALLBACK_DECODER_ID};
use crate::pattern_index::{AuthPatterns, PatternIndex, SCHEMA_VERSION};

const STATUS_PAGE: &str = r#"<html><body>
<p>Cable Modem Status: Operational</p>
<p>Software Version: V1.0.9-SB</p>
<p>System Up Time: 3 days 04:12:55</p>
<table>
<tr><th>Channel</th><th>Lock</th><th>Modulation</th><th>Frequency</th><th>Power</th><th>SNR</th></tr>
<tr><td>1</td><td>Locked</td><td>QAM256</td><td>549000000 Hz</td><td>2.1 dBmV</td><td>38.9 dB</td></tr>
<tr><td>2</td><td>Locked</td><td>QAM256</td><td>555000000 Hz</td><td>1.8 dBmV</td><td>38.4 dB</td></tr>
</table>
<table>
<tr><th>Channel</th><th>Lock</th><th>Modulation</th><th>Frequency</th><th>Power</th></tr>
<tr><td>1</td><td>Locked</td><td>SC-QAM</td><td>35.6 MHz</td><td>44.5 dBmV</td></tr>
</table>
</body></html>"#;

#[test]
fn test_fallback_decodes_status_page() {
    let decoder = GenericHtmlDecoder::default();
    let record = decoder.decode(STATUS_PAGE).unwrap();

    assert_eq!(record.connection_status, "Operational");
    assert_eq!(record.firmware_version.as_deref(), Some("V1.0.9-SB"));
    assert_eq!(record.uptime_seconds, Some(3 * 86_400 + 4 * 3_600 + 12 * 60 + 55));

    assert_eq!(record.downstream.len(), 2);
    assert_eq!(record.downstream[0].channel_id, 1);
    assert_eq!(record.downstream[0].frequency_hz, Some(549_000_000));
    assert_eq!(record.downstream[0].snr_db, Some(38.9));

    assert_eq!(record.upstream.len(), 1);
    assert_eq!(record.upstream[0].frequency_hz, Some(35_600_000));
    assert!(!record.channels_not_applicable);
    assert!(record.missing_required_fields().is_empty());
}

#[test]
fn test_fallback_never_fails_on_garbage() {
    let decoder = GenericHtmlDecoder::default();
    let record = decoder.decode("not even html {{{").unwrap();
    assert!(record.channels_not_applicable);
    assert!(record.downstream.is_empty());
    // Empty connection_status still fails validation, it just decodes
    assert!(record
        .missing_required_fields()
        .contains(&"connection_status".to_string()));
}

#[test]
fn test_registry_falls_back_for_unknown_id() {
    let index = PatternIndex {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        auth_patterns: AuthPatterns::default(),
        decoders: vec![],
    };
    let registry = DecoderRegistry::from_index(&index).unwrap();
    let decoder = registry.get("no-such-decoder");
    assert_eq!(decoder.decoder_id(), FALLBACK_DECODER_ID);
}

#[test]
fn test_registry_register_appends_descriptor() {
    let index = PatternIndex {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        auth_patterns: AuthPatterns::default(),
        decoders: vec![],
    };
    let mut registry = DecoderRegistry::from_index(&index).unwrap();
    registry
        .register(Arc::new(GenericHtmlDecoder::default()))
        .unwrap();
    assert_eq!(registry.entries().len(), 1);
    assert!(registry.entry(FALLBACK_DECODER_ID).is_some());
}
