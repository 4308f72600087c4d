use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::*;
use crate::auth_client::{
    ConnectivityFailure, ConnectivityFailureKind, Credentials, ProbeClient, ProbeResponse,
};
use crate::decoder::{DecoderRegistry, ModemDecoder, TelemetryRecord, FALLBACK_DECODER_ID};
use crate::error::Error;
use crate::pattern_index::{
    AuthPatterns, DecoderDescriptor, DecoderMetadata, DetectionDescriptor, DetectionPattern,
    FormFieldPair, PatternIndex, VerificationStatus, SCHEMA_VERSION,
};

const ROOT_PAGE: &str = "<html><body>Residential Gateway</body></html>";

const STATUS_PAGE: &str = r#"<html><body>
<h1>Downstream Bonded Channels</h1>
<p>Connection: Operational</p>
<table>
<tr><td>1</td><td>Locked</td><td>QAM256</td><td>549000000 Hz</td><td>2.1 dBmV</td><td>38.9 dB</td></tr>
</table>
</body></html>"#;

const LOGIN_PAGE: &str = r#"<html><body>
<form action="/goform/login" method="post">
<input name="loginUsername" type="text">
<input name="loginPassword" type="password">
</form></body></html>"#;

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> ProbeResponse {
    ProbeResponse {
        requested_url: String::new(),
        final_url: String::new(),
        status,
        headers: headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect(),
        body: body.to_string(),
    }
}

/// Scripted transport with a call log and optional per-request delay
#[derive(Default)]
struct ScriptedClient {
    gets: HashMap<String, ProbeResponse>,
    forms: HashMap<String, ProbeResponse>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn log(&self, what: &str) {
        self.calls.lock().unwrap().push(what.to_string());
    }

    fn refused() -> ConnectivityFailure {
        ConnectivityFailure::new(ConnectivityFailureKind::ConnectionRefused, "refused")
    }
}

#[async_trait]
impl ProbeClient for ScriptedClient {
    async fn get(
        &self,
        url: &str,
        _basic: Option<&Credentials>,
        _extra: &[(String, String)],
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        self.log(&format!("GET {}", url));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.gets
            .get(url)
            .map(|r| {
                let mut r = r.clone();
                r.requested_url = url.to_string();
                r.final_url = url.to_string();
                r
            })
            .ok_or_else(Self::refused)
    }

    async fn post_form(
        &self,
        url: &str,
        _fields: &[(String, String)],
        _extra: &[(String, String)],
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        self.log(&format!("POST-FORM {}", url));
        self.forms.get(url).cloned().ok_or_else(Self::refused)
    }

    async fn post(
        &self,
        url: &str,
        _headers: &[(String, String)],
        _body: String,
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        self.log(&format!("POST {}", url));
        Err(Self::refused())
    }
}

fn test_index(decoders: Vec<DecoderDescriptor>) -> Arc<PatternIndex> {
    Arc::new(PatternIndex {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        auth_patterns: AuthPatterns {
            form_fields: vec![FormFieldPair {
                username: "loginUsername".to_string(),
                password: "loginPassword".to_string(),
            }],
            form_actions: vec!["/goform/login".to_string()],
            ..Default::default()
        },
        decoders,
    })
}

fn acme_decoder() -> DecoderDescriptor {
    DecoderDescriptor {
        decoder_id: "acme-sb1234".to_string(),
        metadata: DecoderMetadata {
            manufacturer: "Acme".to_string(),
            models: vec!["SB1234".to_string()],
            verification_status: VerificationStatus::Verified,
            priority: 10,
        },
        detection: DetectionDescriptor {
            pre_auth: vec![],
            post_auth: vec![DetectionPattern {
                pattern: "Downstream Bonded Channels".to_string(),
                confidence: 0.8,
                regex: false,
            }],
            page_hint: Some("/status.html".to_string()),
        },
    }
}

fn pipeline(index: Arc<PatternIndex>, client: ScriptedClient) -> DiscoveryPipeline {
    let registry = Arc::new(DecoderRegistry::from_index(&index).unwrap());
    DiscoveryPipeline::new(index, registry, Arc::new(client)).unwrap()
}

#[tokio::test]
async fn test_full_pass_open_device() {
    let mut client = ScriptedClient::default();
    client
        .gets
        .insert("http://192.168.100.1".to_string(), response(200, &[("Content-Type", "text/html")], ROOT_PAGE));
    client.gets.insert(
        "http://192.168.100.1/status.html".to_string(),
        response(200, &[("Content-Type", "text/html")], STATUS_PAGE),
    );

    let p = pipeline(test_index(vec![acme_decoder()]), client);
    let result = p
        .run("192.168.100.1", None, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.stages.connectivity.reachable);
    assert!(result.stages.connectivity.latency_ms.is_some());

    let auth = result.stages.auth.as_ref().unwrap();
    assert_eq!(auth.strategy, Some(crate::detector::AuthStrategy::None));
    assert!(auth.authenticated);

    let parser = result.stages.parser.as_ref().unwrap();
    assert_eq!(parser.decoder_id, "acme-sb1234");
    assert!(parser.confidence >= 0.8);

    let validation = result.stages.validation.as_ref().unwrap();
    assert!(validation.valid);
    let telemetry = validation.telemetry.as_ref().unwrap();
    assert_eq!(telemetry.connection_status, "Operational");
    assert_eq!(telemetry.downstream.len(), 1);

    // Identity evidence was gathered post-auth
    assert!(result
        .diagnostic_signals
        .get_by_kind(crate::signal::SignalKind::ModelString)
        .next()
        .is_none()); // model string "SB1234" not on any page
}

#[tokio::test]
async fn test_connectivity_failure_short_circuits() {
    // Empty script: every request is refused
    let client = ScriptedClient::default();
    let p = pipeline(test_index(vec![acme_decoder()]), client);

    let result = p
        .run("192.168.100.1", None, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(!result.stages.connectivity.reachable);
    assert_eq!(
        result.stages.connectivity.error.as_ref().unwrap().kind,
        ConnectivityFailureKind::ConnectionRefused
    );
    assert!(result.stages.auth.is_none());
    assert!(result.stages.parser.is_none());
    assert!(result.stages.validation.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_host_times_out_without_auth_attempt() {
    let mut client = ScriptedClient::default();
    client.delay = Some(Duration::from_secs(60));
    client.gets.insert(
        "http://192.168.100.1".to_string(),
        response(200, &[], ROOT_PAGE),
    );

    let index = test_index(vec![]);
    let registry = Arc::new(DecoderRegistry::from_index(&index).unwrap());
    let client = Arc::new(client);
    let p = DiscoveryPipeline::new(index, registry, client.clone()).unwrap();

    let result = p
        .run("192.168.100.1", None, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(
        result.stages.connectivity.error.as_ref().unwrap().kind,
        ConnectivityFailureKind::Timeout
    );
    // Only the single connectivity GET was issued
    let calls = client.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("GET "));
}

#[tokio::test]
async fn test_auth_failure_continues_degraded() {
    let mut client = ScriptedClient::default();
    client.gets.insert(
        "http://192.168.100.1".to_string(),
        response(200, &[("Content-Type", "text/html")], LOGIN_PAGE),
    );
    // Login POST answers with the login form again: rejected
    client.forms.insert(
        "http://192.168.100.1/goform/login".to_string(),
        response(200, &[], LOGIN_PAGE),
    );

    let p = pipeline(test_index(vec![acme_decoder()]), client);
    let credentials = Credentials {
        username: "admin".to_string(),
        password: "wrong".to_string(),
    };
    let result = p
        .run("192.168.100.1", Some(credentials), Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!result.success);
    let auth = result.stages.auth.as_ref().unwrap();
    assert_eq!(auth.strategy, Some(crate::detector::AuthStrategy::Form));
    assert!(!auth.authenticated);
    assert!(auth.error.is_some());

    // Pipeline still attempted selection and validation
    assert!(result.stages.parser.is_some());
    assert!(result.stages.validation.is_some());
}

#[tokio::test]
async fn test_no_matching_decoder_selects_fallback() {
    let mut client = ScriptedClient::default();
    client.gets.insert(
        "http://192.168.100.1".to_string(),
        response(200, &[("Content-Type", "text/html")], STATUS_PAGE),
    );
    client.gets.insert(
        "http://192.168.100.1/status.html".to_string(),
        response(200, &[("Content-Type", "text/html")], ROOT_PAGE),
    );

    // The decoder's post_auth marker is on neither page it looks at:
    // its page_hint now serves the bare root page
    let mut decoder = acme_decoder();
    decoder.detection.post_auth[0].pattern = "Never Present Marker".to_string();

    let p = pipeline(test_index(vec![decoder]), client);
    let result = p
        .run("192.168.100.1", None, Duration::from_secs(5))
        .await
        .unwrap();

    let parser = result.stages.parser.as_ref().unwrap();
    assert_eq!(parser.decoder_id, FALLBACK_DECODER_ID);
    // Fallback still validated the status page successfully
    assert!(result.stages.validation.as_ref().unwrap().valid);
    assert!(result.success);
}

/// Selectable decoder whose decode always errors
struct MiswiredDecoder {
    descriptor: DecoderDescriptor,
}

impl ModemDecoder for MiswiredDecoder {
    fn decoder_id(&self) -> &str {
        &self.descriptor.decoder_id
    }

    fn decode(&self, _raw: &str) -> crate::error::Result<TelemetryRecord> {
        Err(Error::Decode("channel table layout changed".to_string()))
    }

    fn detection_descriptor(&self) -> &crate::pattern_index::DetectionDescriptor {
        &self.descriptor.detection
    }

    fn metadata(&self) -> &DecoderMetadata {
        &self.descriptor.metadata
    }
}

#[tokio::test]
async fn test_decode_error_retries_with_fallback_and_records_it() {
    let mut client = ScriptedClient::default();
    client.gets.insert(
        "http://192.168.100.1".to_string(),
        response(200, &[("Content-Type", "text/html")], ROOT_PAGE),
    );
    client.gets.insert(
        "http://192.168.100.1/status.html".to_string(),
        response(200, &[("Content-Type", "text/html")], STATUS_PAGE),
    );

    let index = test_index(vec![acme_decoder()]);
    let mut registry = DecoderRegistry::from_index(&index).unwrap();
    registry
        .register(Arc::new(MiswiredDecoder {
            descriptor: acme_decoder(),
        }))
        .unwrap();

    let p = DiscoveryPipeline::new(index, Arc::new(registry), Arc::new(client)).unwrap();
    let result = p
        .run("192.168.100.1", None, Duration::from_secs(5))
        .await
        .unwrap();

    // The indexed decoder still wins selection; only its decode failed
    let parser = result.stages.parser.as_ref().unwrap();
    assert_eq!(parser.decoder_id, "acme-sb1234");

    let validation = result.stages.validation.as_ref().unwrap();
    assert!(validation.used_fallback);
    assert!(validation.valid);
    let telemetry = validation.telemetry.as_ref().unwrap();
    assert_eq!(telemetry.connection_status, "Operational");
    assert!(result.success);
}

#[tokio::test]
async fn test_invalid_host_is_a_hard_error() {
    let client = ScriptedClient::default();
    let p = pipeline(test_index(vec![]), client);
    let err = p
        .run("not a host\u{0000}", None, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::Validation(_)));

    let client = ScriptedClient::default();
    let p = pipeline(test_index(vec![]), client);
    let err = p.run("   ", None, Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, crate::error::Error::Validation(_)));
}

#[tokio::test]
async fn test_model_string_recorded_from_post_auth_page() {
    let status_with_model = format!("{}<p>Model: SB1234</p>", STATUS_PAGE);

    let mut client = ScriptedClient::default();
    client.gets.insert(
        "http://192.168.100.1".to_string(),
        response(200, &[("Content-Type", "text/html")], ROOT_PAGE),
    );
    client.gets.insert(
        "http://192.168.100.1/status.html".to_string(),
        response(200, &[("Content-Type", "text/html")], &status_with_model),
    );

    let p = pipeline(test_index(vec![acme_decoder()]), client);
    let result = p
        .run("192.168.100.1", None, Duration::from_secs(5))
        .await
        .unwrap();

    let model = result
        .diagnostic_signals
        .get_by_kind(crate::signal::SignalKind::ModelString)
        .next()
        .unwrap();
    assert_eq!(model.value, "SB1234");
    assert!(result.success);
}
