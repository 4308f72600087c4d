use chrono::{TimeZone, Utc};

use super::*;
use crate::error::Error;

fn sample_index_json(schema_version: u32) -> String {
    format!(
        r#"{{
            "schema_version": {},
            "generated_at": "2025-11-02T09:00:00Z",
            "auth_patterns": {{
                "form_fields": [{{"username": "loginUsername", "password": "loginPassword"}}],
                "form_actions": ["/goform/login"],
                "encoding_markers": ["base64Encode("],
                "hnap_endpoints": ["/HNAP1/"],
                "hnap_namespaces": ["http://purenetworks.com/HNAP1/"],
                "url_token_prefixes": ["/login_"],
                "token_cookies": ["credential"]
            }},
            "decoders": [
                {{
                    "decoder_id": "acme-sb1234",
                    "manufacturer": "Acme",
                    "models": ["SB1234"],
                    "verification_status": "verified",
                    "priority": 10,
                    "detection": {{
                        "pre_auth": [{{"pattern": "SB1234 Login", "confidence": 0.6}}],
                        "post_auth": [{{"pattern": "Downstream Bonded Channels", "confidence": 0.8}}],
                        "page_hint": "/cmconnectionstatus.html"
                    }}
                }}
            ]
        }}"#,
        schema_version
    )
}

#[test]
fn test_load_valid_index() {
    let index = PatternIndex::from_json(&sample_index_json(SCHEMA_VERSION)).unwrap();
    assert_eq!(index.decoders.len(), 1);
    assert_eq!(index.decoders[0].decoder_id, "acme-sb1234");
    assert_eq!(
        index.decoders[0].metadata.verification_status,
        VerificationStatus::Verified
    );
    assert_eq!(index.auth_patterns.hnap_endpoints, vec!["/HNAP1/"]);
}

#[test]
fn test_schema_version_mismatch_is_fatal() {
    let err = PatternIndex::from_json(&sample_index_json(99)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_out_of_range_confidence_is_fatal() {
    let json = sample_index_json(SCHEMA_VERSION).replace("0.8", "1.8");
    let err = PatternIndex::from_json(&json).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_substring_matcher_is_case_insensitive() {
    let pattern = DetectionPattern {
        pattern: "Downstream Bonded".to_string(),
        confidence: 0.8,
        regex: false,
    };
    let descriptor = DetectionDescriptor {
        pre_auth: vec![],
        post_auth: vec![pattern],
        page_hint: None,
    };
    let compiled = descriptor.compile().unwrap();
    assert!(compiled.post_auth[0].matcher.is_match("<th>DOWNSTREAM bonded Channels</th>"));
    assert!(!compiled.post_auth[0].matcher.is_match("Upstream Channels"));
}

#[test]
fn test_bad_regex_is_fatal() {
    let descriptor = DetectionDescriptor {
        pre_auth: vec![DetectionPattern {
            pattern: "(unclosed".to_string(),
            confidence: 0.5,
            regex: true,
        }],
        post_auth: vec![],
        page_hint: None,
    };
    assert!(matches!(descriptor.compile(), Err(Error::Config(_))));
}

#[test]
fn test_write_if_changed_ignores_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patterns.json");

    let mut index = PatternIndex::from_json(&sample_index_json(SCHEMA_VERSION)).unwrap();
    assert!(index.write_if_changed(&path).unwrap());

    // Only the generation timestamp differs: no rewrite
    index.generated_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    assert!(!index.write_if_changed(&path).unwrap());

    // Semantic change: rewritten
    index.auth_patterns.form_actions.push("/login.cgi".to_string());
    assert!(index.write_if_changed(&path).unwrap());

    let reloaded = PatternIndex::load(&path).unwrap();
    assert_eq!(reloaded.auth_patterns.form_actions.len(), 2);
}

#[test]
fn test_duplicate_decoder_id_is_fatal() {
    let json = sample_index_json(SCHEMA_VERSION);
    // Duplicate the single decoder entry
    let dup = json.replacen(
        "\"decoders\": [",
        "\"decoders\": [
                {
                    \"decoder_id\": \"acme-sb1234\",
                    \"manufacturer\": \"Acme\",
                    \"models\": [],
                    \"verification_status\": \"verified\",
                    \"priority\": 1,
                    \"detection\": {}
                },",
        1,
    );
    assert!(matches!(PatternIndex::from_json(&dup), Err(Error::Config(_))));
}
