//! Paradigm & Auth Detector
//!
//! Turns raw probe text and HTTP metadata into Signals, then reduces a
//! DiscoveryResult to a best paradigm and best auth strategy.
//!
//! Elimination model: evidence from unauthenticated pages (login
//! boilerplate, protocol headers) determines paradigm and auth
//! strategy and narrows candidates, but never proves device identity.
//! Identity signals (`ModelString`) are emitted only from
//! post-authentication pages, because many devices share generic
//! login-page markup and differ once authenticated.

pub mod weights;

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth_client::ProbeResponse;
use crate::error::Result;
use crate::pattern_index::{DecoderDescriptor, PatternIndex};
use crate::signal::{DiscoveryResult, Signal, SignalKind, AUTH_KINDS, PARADIGM_KINDS};

/// Protocol dialect a device speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Paradigm {
    Html,
    Hnap,
    Rest,
}

/// Authentication strategy a device requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    None,
    Basic,
    Form,
    Hnap,
    UrlToken,
}

/// Paradigm & auth detector over the shared pattern index
pub struct Detector {
    index: Arc<PatternIndex>,
    form_re: Regex,
    password_input_re: Regex,
    form_action_re: Regex,
}

impl Detector {
    pub fn new(index: Arc<PatternIndex>) -> Result<Self> {
        // Static patterns; compile once per detector
        let build = |p: &str| {
            regex::RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| crate::error::Error::Config(format!("bad builtin regex: {}", e)))
        };
        Ok(Self {
            index,
            form_re: build(r"<form\b")?,
            password_input_re: build(r#"<input[^>]*type\s*=\s*["']?password"#)?,
            form_action_re: build(r#"<form[^>]*action\s*=\s*["']?([^"'\s>]+)"#)?,
        })
    }

    pub fn index(&self) -> &PatternIndex {
        &self.index
    }

    /// Analyze one unauthenticated probe response, appending signals.
    ///
    /// Deterministic: the same response always yields the same signal
    /// sequence, so paradigm/auth resolution is reproducible.
    pub fn analyze_probe(
        &self,
        probe: &ProbeResponse,
        discovery: &mut DiscoveryResult,
        source: &str,
    ) -> Result<()> {
        let auth_signals_before = count_family(discovery, AUTH_KINDS);

        // Factual content signals first
        discovery.add(Signal::new(
            SignalKind::HttpStatus,
            probe.status.to_string(),
            weights::FACT,
            source,
        )?);
        if let Some(content_type) = probe.header("content-type") {
            discovery.add(Signal::new(
                SignalKind::ContentType,
                content_type,
                weights::FACT,
                source,
            )?);
        }
        if probe.was_redirected() {
            discovery.add(Signal::new(
                SignalKind::RedirectUrl,
                probe.final_url.clone(),
                weights::FACT,
                source,
            )?);
        }

        self.scan_headers(probe, discovery, source)?;
        self.scan_body(probe, discovery, source)?;

        // Explicit absence of any login artifact plus a 200 resolves
        // to auth=none at low confidence.
        let auth_signals_after = count_family(discovery, AUTH_KINDS);
        if probe.is_success() && auth_signals_after == auth_signals_before {
            discovery.add(Signal::new(
                SignalKind::AuthNone,
                "no login artifact on 200 response",
                weights::AUTH_NONE,
                source,
            )?);
        }

        debug!(
            source = source,
            status = probe.status,
            signals = discovery.len(),
            "Probe analyzed"
        );
        Ok(())
    }

    fn scan_headers(
        &self,
        probe: &ProbeResponse,
        discovery: &mut DiscoveryResult,
        source: &str,
    ) -> Result<()> {
        // HNAP SOAPACTION header is near-conclusive for the paradigm
        if let Some(soap_action) = probe.header("soapaction") {
            let is_hnap = self
                .index
                .auth_patterns
                .hnap_namespaces
                .iter()
                .any(|ns| soap_action.contains(ns.as_str()));
            if is_hnap {
                discovery.add(Signal::new(
                    SignalKind::ParadigmHnap,
                    soap_action,
                    weights::HNAP_HEADER,
                    source,
                )?);
                discovery.add(Signal::new(
                    SignalKind::AuthHnap,
                    soap_action,
                    weights::HNAP_AUTH,
                    source,
                )?);
                discovery.add(Signal::new(
                    SignalKind::HnapActionPrefix,
                    soap_action,
                    weights::FACT,
                    source,
                )?);
            }
        }

        // 401 + Basic challenge
        if probe.status == 401 {
            if let Some(challenge) = probe.header("www-authenticate") {
                if challenge.to_lowercase().starts_with("basic") {
                    discovery.add(Signal::new(
                        SignalKind::AuthBasic,
                        challenge,
                        weights::BASIC_CHALLENGE,
                        source,
                    )?);
                }
            }
        }

        // Session-token cookie names
        for set_cookie in probe.headers_named("set-cookie") {
            let cookie_name = set_cookie.split('=').next().unwrap_or("").trim();
            if self
                .index
                .auth_patterns
                .token_cookies
                .iter()
                .any(|c| c.eq_ignore_ascii_case(cookie_name))
            {
                discovery.add(Signal::new(
                    SignalKind::AuthUrlToken,
                    cookie_name,
                    weights::TOKEN_COOKIE,
                    source,
                )?);
            }
        }

        Ok(())
    }

    fn scan_body(
        &self,
        probe: &ProbeResponse,
        discovery: &mut DiscoveryResult,
        source: &str,
    ) -> Result<()> {
        let body = &probe.body;
        let body_lower = body.to_lowercase();
        let patterns = &self.index.auth_patterns;

        // HNAP endpoints / namespaces referenced in page text
        for endpoint in &patterns.hnap_endpoints {
            if body_lower.contains(&endpoint.to_lowercase()) {
                discovery.add(Signal::new(
                    SignalKind::ParadigmHnap,
                    endpoint,
                    weights::HNAP_ENDPOINT,
                    source,
                )?);
                discovery.add(Signal::new(
                    SignalKind::AuthHnap,
                    endpoint,
                    weights::HNAP_AUTH,
                    source,
                )?);
            }
        }
        for namespace in &patterns.hnap_namespaces {
            if body_lower.contains(&namespace.to_lowercase()) {
                discovery.add(Signal::new(
                    SignalKind::ParadigmHnap,
                    namespace,
                    weights::HNAP_ENDPOINT,
                    source,
                )?);
                discovery.add(Signal::new(
                    SignalKind::HnapActionPrefix,
                    namespace,
                    weights::FACT,
                    source,
                )?);
            }
        }

        // JSON body implies the REST paradigm
        let content_type = probe.header("content-type").unwrap_or("");
        let looks_json = content_type.to_lowercase().contains("application/json")
            || body_is_json(body);
        if looks_json {
            discovery.add(Signal::new(
                SignalKind::ParadigmRest,
                if content_type.is_empty() { "json body" } else { content_type },
                weights::REST_JSON,
                source,
            )?);
            discovery.add(Signal::new(
                SignalKind::JsonMarker,
                "json body",
                weights::FACT,
                source,
            )?);
        }

        // HTML markup implies the scraping paradigm
        let looks_html = content_type.to_lowercase().contains("text/html")
            || body_lower.contains("<html");
        if looks_html {
            discovery.add(Signal::new(
                SignalKind::ParadigmHtml,
                "html markup",
                weights::HTML_MARKUP,
                source,
            )?);
            discovery.add(Signal::new(
                SignalKind::HtmlMarker,
                "html markup",
                weights::FACT,
                source,
            )?);
        }

        // Login form with a password input
        if self.form_re.is_match(body) && self.password_input_re.is_match(body) {
            discovery.add(Signal::new(
                SignalKind::AuthForm,
                "password form",
                weights::FORM_PASSWORD,
                source,
            )?);

            // Known action path upgrades confidence
            if let Some(caps) = self.form_action_re.captures(body) {
                let action = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                if patterns.form_actions.iter().any(|a| action.contains(a.as_str())) {
                    discovery.add(Signal::new(
                        SignalKind::AuthForm,
                        action,
                        weights::KNOWN_FORM_ACTION,
                        source,
                    )?);
                }
            }

            // Known field name pair present
            for pair in &patterns.form_fields {
                if body.contains(pair.username.as_str()) && body.contains(pair.password.as_str()) {
                    discovery.add(Signal::new(
                        SignalKind::AuthForm,
                        format!("{}/{}", pair.username, pair.password),
                        weights::KNOWN_FORM_ACTION,
                        source,
                    )?);
                    break;
                }
            }
        }

        // Password-encoding markers in page script
        for marker in &patterns.encoding_markers {
            if body.contains(marker.as_str()) {
                discovery.add(Signal::new(
                    SignalKind::AuthForm,
                    marker,
                    weights::ENCODING_MARKER,
                    source,
                )?);
            }
        }

        // URL-token login prefixes in links or the landing URL itself
        for prefix in &patterns.url_token_prefixes {
            if body.contains(prefix.as_str()) || probe.final_url.contains(prefix.as_str()) {
                discovery.add(Signal::new(
                    SignalKind::AuthUrlToken,
                    prefix,
                    weights::URL_TOKEN,
                    source,
                )?);
            }
        }

        Ok(())
    }

    /// Scan a post-authentication page for identity evidence.
    ///
    /// Only here are `ModelString` / `ManufacturerHint` signals
    /// emitted; pre-auth matches never prove identity.
    pub fn scan_identity(
        &self,
        body: &str,
        candidates: &[&DecoderDescriptor],
        discovery: &mut DiscoveryResult,
        source: &str,
    ) -> Result<()> {
        let body_lower = body.to_lowercase();
        for descriptor in candidates {
            for model in &descriptor.metadata.models {
                if body_lower.contains(&model.to_lowercase()) {
                    discovery.add(Signal::new(
                        SignalKind::ModelString,
                        model,
                        weights::MODEL_STRING,
                        source,
                    )?);
                }
            }
            let manufacturer = &descriptor.metadata.manufacturer;
            if !manufacturer.is_empty() && body_lower.contains(&manufacturer.to_lowercase()) {
                discovery.add(Signal::new(
                    SignalKind::ManufacturerHint,
                    manufacturer,
                    weights::MANUFACTURER_HINT,
                    source,
                )?);
            }
        }
        Ok(())
    }

    /// Best paradigm, or None when no paradigm signal exists
    pub fn resolve_paradigm(&self, discovery: &DiscoveryResult) -> Option<Paradigm> {
        discovery
            .highest_confidence(PARADIGM_KINDS)
            .map(|s| match s.kind {
                SignalKind::ParadigmHnap => Paradigm::Hnap,
                SignalKind::ParadigmRest => Paradigm::Rest,
                _ => Paradigm::Html,
            })
    }

    /// Best auth strategy, or None when no auth signal exists
    pub fn resolve_auth(&self, discovery: &DiscoveryResult) -> Option<AuthStrategy> {
        discovery.highest_confidence(AUTH_KINDS).map(|s| match s.kind {
            SignalKind::AuthBasic => AuthStrategy::Basic,
            SignalKind::AuthForm => AuthStrategy::Form,
            SignalKind::AuthHnap => AuthStrategy::Hnap,
            SignalKind::AuthUrlToken => AuthStrategy::UrlToken,
            _ => AuthStrategy::None,
        })
    }
}

fn count_family(discovery: &DiscoveryResult, kinds: &[SignalKind]) -> usize {
    kinds.iter().map(|&k| discovery.get_by_kind(k).count()).sum()
}

fn body_is_json(body: &str) -> bool {
    let trimmed = body.trim_start();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(body).is_ok()
}
