//! Discovery Pipeline Orchestrator
//!
//! One pass through Connectivity → Auth → Decoder-selection →
//! Validation. Strictly sequential, no retries within a stage (retries
//! belong to the caller). Only a connectivity failure is terminal:
//! every later stage failure is recorded in its result and the
//! pipeline continues in degraded mode, so the caller can still offer
//! the best-guess decoder for manual confirmation.

mod types;

pub use types::{
    AuthResult, ConnectivityResult, DiscoveryPipelineResult, ParserResult, PipelineStages,
    ValidationResult,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::auth_client::{
    self, ConnectivityFailure, ConnectivityFailureKind, Credentials, HttpProbeClient, ProbeClient,
    ProbeResponse, SessionCache,
};
use crate::decoder::DecoderRegistry;
use crate::detector::{AuthStrategy, Detector};
use crate::error::{Error, Result};
use crate::pattern_index::PatternIndex;
use crate::selector::{select_decoder, EvidencePages, SelectorConfig};
use crate::signal::{DiscoveryResult, SignalKind};

/// Single-pass discovery pipeline. Shared state (pattern index,
/// decoder registry) is read-only, so concurrent attempts against
/// different hosts are independent.
pub struct DiscoveryPipeline {
    client: Arc<dyn ProbeClient>,
    detector: Detector,
    registry: Arc<DecoderRegistry>,
    selector_config: SelectorConfig,
    sessions: Arc<SessionCache>,
}

impl DiscoveryPipeline {
    pub fn new(
        index: Arc<PatternIndex>,
        registry: Arc<DecoderRegistry>,
        client: Arc<dyn ProbeClient>,
    ) -> Result<Self> {
        Ok(Self {
            detector: Detector::new(index)?,
            client,
            registry,
            selector_config: SelectorConfig::default(),
            sessions: Arc::new(SessionCache::new()),
        })
    }

    pub fn with_selector_config(mut self, config: SelectorConfig) -> Self {
        self.selector_config = config;
        self
    }

    /// Session cache handle, for the external restart monitor's
    /// `invalidate_session` calls
    pub fn sessions(&self) -> Arc<SessionCache> {
        self.sessions.clone()
    }

    /// Run one discovery pass. Idempotent; safe to call again with
    /// different credentials. Errors only on malformed input host;
    /// every device-probing failure is captured in the result.
    pub async fn run(
        &self,
        host: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<DiscoveryPipelineResult> {
        let base_url = normalize_host(host)?;
        let attempt_id = Uuid::new_v4();
        let mut discovery = DiscoveryResult::new(host);

        info!(attempt_id = %attempt_id, host = %host, "Discovery pipeline started");

        // Stage 1: Connectivity
        let started = Instant::now();
        let probe = match self.fetch(&base_url, None, &[], timeout).await {
            Ok(probe) => probe,
            Err(failure) => {
                warn!(host = %host, error = %failure, "Connectivity failed, pipeline terminated");
                return Ok(DiscoveryPipelineResult {
                    attempt_id,
                    host: host.to_string(),
                    paradigm: None,
                    stages: PipelineStages {
                        connectivity: ConnectivityResult {
                            reachable: false,
                            latency_ms: None,
                            error: Some(failure),
                        },
                        auth: None,
                        parser: None,
                        validation: None,
                    },
                    success: false,
                    diagnostic_signals: discovery,
                });
            }
        };
        let connectivity = ConnectivityResult {
            reachable: true,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        };

        // Stage 2: Auth
        self.detector
            .analyze_probe(&probe, &mut discovery, "connectivity-probe")?;
        let paradigm = self.detector.resolve_paradigm(&discovery);
        let strategy = self.detector.resolve_auth(&discovery);

        let auth = match strategy {
            None => {
                warn!(host = %host, "No auth signal resolved, continuing degraded");
                AuthResult {
                    strategy: None,
                    authenticated: false,
                    session: None,
                    error: Some("no authentication signal resolved".to_string()),
                }
            }
            Some(strategy) => {
                let encode_password = self.saw_encoding_marker(&discovery);
                let outcome = auth_client::attempt(
                    self.client.as_ref(),
                    &base_url,
                    strategy,
                    credentials.as_ref(),
                    &self.detector.index().auth_patterns,
                    encode_password,
                )
                .await;
                if let Some(session) = &outcome.session {
                    self.sessions.store(host, session.clone()).await;
                }
                AuthResult {
                    strategy: Some(strategy),
                    authenticated: outcome.authenticated,
                    session: outcome.session,
                    error: outcome.error,
                }
            }
        };

        // Stage 3: Decoder selection (never errors, fallback always exists)
        let basic = match (auth.strategy, auth.authenticated, credentials.as_ref()) {
            (Some(AuthStrategy::Basic), true, Some(c)) => Some(c.clone()),
            _ => None,
        };
        let session_headers: Vec<(String, String)> = auth
            .session
            .as_ref()
            .map(|s| s.headers.clone())
            .unwrap_or_default();

        // Best-available default page: a fresh authenticated fetch, or
        // the connectivity probe body when auth failed or fetch fails.
        let default_body = if auth.authenticated {
            match self
                .fetch(&base_url, basic.as_ref(), &session_headers, timeout)
                .await
            {
                Ok(authed) => {
                    self.detector
                        .analyze_probe(&authed, &mut discovery, "authenticated-probe")?;
                    authed.body
                }
                Err(failure) => {
                    warn!(host = %host, error = %failure, "Authenticated re-probe failed");
                    probe.body.clone()
                }
            }
        } else {
            probe.body.clone()
        };

        // Candidates whose pre_auth gate passes decide which page
        // hints are worth fetching.
        let candidates: Vec<_> = self
            .registry
            .entries()
            .iter()
            .filter(|e| {
                e.compiled.pre_auth.is_empty()
                    || e.compiled.pre_auth.iter().any(|p| p.matcher.is_match(&probe.body))
            })
            .collect();

        let mut hint_pages: HashMap<String, String> = HashMap::new();
        for entry in &candidates {
            let Some(hint) = &entry.compiled.page_hint else {
                continue;
            };
            if hint_pages.contains_key(hint) {
                continue;
            }
            let url = join_path(&base_url, hint);
            match self
                .fetch(&url, basic.as_ref(), &session_headers, timeout)
                .await
            {
                Ok(page) => {
                    hint_pages.insert(hint.clone(), page.body);
                }
                Err(failure) => {
                    warn!(host = %host, page = %hint, error = %failure, "Page hint fetch failed");
                }
            }
        }

        // Identity evidence comes from post-auth pages only
        let descriptor_refs: Vec<_> = candidates.iter().map(|e| &e.descriptor).collect();
        self.detector
            .scan_identity(&default_body, &descriptor_refs, &mut discovery, "post-auth")?;
        for (hint, body) in &hint_pages {
            self.detector
                .scan_identity(body, &descriptor_refs, &mut discovery, hint)?;
        }

        let parser = select_decoder(
            &self.registry,
            &self.selector_config,
            &probe.body,
            &EvidencePages {
                default_page: &default_body,
                hint_pages: &hint_pages,
            },
        );
        info!(
            host = %host,
            decoder_id = %parser.decoder_id,
            confidence = parser.confidence,
            "Decoder selected"
        );

        // Stage 4: Validation
        let validation = self
            .validate(
                &base_url,
                &parser,
                &default_body,
                &hint_pages,
                basic.as_ref(),
                &session_headers,
                timeout,
            )
            .await;

        let success = connectivity.reachable
            && (auth.authenticated || auth.strategy == Some(AuthStrategy::None))
            && validation.valid;

        info!(
            attempt_id = %attempt_id,
            host = %host,
            success = success,
            signals = discovery.len(),
            "Discovery pipeline finished"
        );

        Ok(DiscoveryPipelineResult {
            attempt_id,
            host: host.to_string(),
            paradigm,
            stages: PipelineStages {
                connectivity,
                auth: Some(auth),
                parser: Some(parser),
                validation: Some(validation),
            },
            success,
            diagnostic_signals: discovery,
        })
    }

    /// Did the detector see a known password-encoding marker?
    fn saw_encoding_marker(&self, discovery: &DiscoveryResult) -> bool {
        let markers = &self.detector.index().auth_patterns.encoding_markers;
        discovery
            .get_by_kind(SignalKind::AuthForm)
            .any(|s| markers.iter().any(|m| m == &s.value))
    }

    async fn fetch(
        &self,
        url: &str,
        basic: Option<&Credentials>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        // Bound the whole request even when the transport has no
        // timeout of its own (test transports).
        match tokio::time::timeout(timeout, self.client.get(url, basic, headers)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectivityFailure::new(
                ConnectivityFailureKind::Timeout,
                format!("no response within {:?}", timeout),
            )),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn validate(
        &self,
        base_url: &str,
        parser: &ParserResult,
        default_body: &str,
        hint_pages: &HashMap<String, String>,
        basic: Option<&Credentials>,
        session_headers: &[(String, String)],
        timeout: Duration,
    ) -> ValidationResult {
        let entry = self.registry.entry(&parser.decoder_id);
        let page_hint = entry.and_then(|e| e.compiled.page_hint.clone());

        // Prefer an already-fetched hint page, then a fresh fetch of
        // the hint, then the default page.
        let data_page: String = match &page_hint {
            Some(hint) => match hint_pages.get(hint) {
                Some(body) => body.clone(),
                None => {
                    let url = join_path(base_url, hint);
                    match self.fetch(&url, basic, session_headers, timeout).await {
                        Ok(page) => page.body,
                        Err(_) => default_body.to_string(),
                    }
                }
            },
            None => default_body.to_string(),
        };

        let decoder = self.registry.get(&parser.decoder_id);
        let (record, used_fallback) = match decoder.decode(&data_page) {
            Ok(record) => (record, false),
            Err(e) => {
                warn!(
                    decoder_id = %parser.decoder_id,
                    error = %e,
                    "Decode failed, retrying with generic fallback"
                );
                match self.registry.fallback().decode(&data_page) {
                    Ok(record) => (record, true),
                    Err(fallback_err) => {
                        warn!(error = %fallback_err, "Fallback decode failed");
                        return ValidationResult {
                            valid: false,
                            missing_fields: vec!["decode_failed".to_string()],
                            used_fallback: true,
                            telemetry: None,
                        };
                    }
                }
            }
        };

        let missing_fields = record.missing_required_fields();
        ValidationResult {
            valid: missing_fields.is_empty(),
            missing_fields,
            used_fallback,
            telemetry: Some(record),
        }
    }
}

/// Discovery pipeline entry point for the config/setup collaborator:
/// single call, single pass, idempotent.
pub async fn run_discovery_pipeline(
    index: Arc<PatternIndex>,
    registry: Arc<DecoderRegistry>,
    host: &str,
    credentials: Option<Credentials>,
    timeout: Duration,
) -> Result<DiscoveryPipelineResult> {
    let client = Arc::new(HttpProbeClient::new(timeout)?);
    let pipeline = DiscoveryPipeline::new(index, registry, client)?;
    pipeline.run(host, credentials, timeout).await
}

/// Normalize the caller-supplied host into a base URL. A host string
/// url can't parse is a programming error, not a probing failure.
fn normalize_host(host: &str) -> Result<String> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("empty host".to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let parsed = Url::parse(&candidate)
        .map_err(|e| Error::Validation(format!("invalid host '{}': {}", host, e)))?;
    if parsed.host_str().is_none() {
        return Err(Error::Validation(format!("invalid host '{}'", host)));
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

fn join_path(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests;
