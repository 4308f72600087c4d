//! Per-strategy authentication attempts
//!
//! One attempt per discovery pass, with the single credential set the
//! caller supplied. A failed attempt is an expected outcome (wrong
//! paradigm guess, bad credentials), reported in the outcome and never
//! raised.

use std::sync::OnceLock;

use base64::Engine;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use super::hnap;
use super::transport::ProbeClient;
use super::types::{Credentials, ProbeResponse, SessionToken};
use crate::detector::AuthStrategy;
use crate::pattern_index::AuthPatterns;

/// Result of one authentication attempt
#[derive(Debug, Clone, Default)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub session: Option<SessionToken>,
    pub error: Option<String>,
}

impl AuthOutcome {
    fn success(session: Option<SessionToken>) -> Self {
        Self {
            authenticated: true,
            session,
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            session: None,
            error: Some(error.into()),
        }
    }
}

fn password_input_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r#"<input[^>]*type\s*=\s*["']?password"#)
            .case_insensitive(true)
            .build()
            .expect("builtin regex")
    })
}

/// A login response that still presents a password form did not log in
fn still_on_login_page(response: &ProbeResponse) -> bool {
    password_input_re().is_match(&response.body)
}

fn session_from_cookies(response: &ProbeResponse) -> Option<SessionToken> {
    let cookies: Vec<String> = response
        .headers_named("set-cookie")
        .filter_map(|c| c.split(';').next())
        .map(str::to_string)
        .collect();
    if cookies.is_empty() {
        None
    } else {
        Some(SessionToken {
            headers: vec![("Cookie".to_string(), cookies.join("; "))],
        })
    }
}

/// Attempt authentication with the resolved strategy.
///
/// `encode_password` is set when the detector saw a password-encoding
/// marker on the login page (the device expects base64).
pub async fn attempt(
    client: &dyn ProbeClient,
    base_url: &str,
    strategy: AuthStrategy,
    credentials: Option<&Credentials>,
    patterns: &AuthPatterns,
    encode_password: bool,
) -> AuthOutcome {
    let credentials = match (strategy, credentials) {
        (AuthStrategy::None, _) => return AuthOutcome::success(None),
        (_, Some(c)) => c,
        (_, None) => return AuthOutcome::failure("credentials required but none supplied"),
    };

    let outcome = match strategy {
        AuthStrategy::None => unreachable!("handled above"),
        AuthStrategy::Basic => attempt_basic(client, base_url, credentials).await,
        AuthStrategy::Form => {
            attempt_form(client, base_url, credentials, patterns, encode_password).await
        }
        AuthStrategy::Hnap => match hnap::hnap_login(client, base_url, credentials, patterns).await
        {
            Ok(session) => AuthOutcome::success(Some(session)),
            Err(e) => AuthOutcome::failure(e),
        },
        AuthStrategy::UrlToken => attempt_url_token(client, base_url, credentials, patterns).await,
    };

    if outcome.authenticated {
        info!(strategy = ?strategy, "Authentication succeeded");
    } else {
        info!(
            strategy = ?strategy,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "Authentication failed"
        );
    }
    outcome
}

async fn attempt_basic(
    client: &dyn ProbeClient,
    base_url: &str,
    credentials: &Credentials,
) -> AuthOutcome {
    match client.get(base_url, Some(credentials), &[]).await {
        Ok(response) if response.is_success() => {
            AuthOutcome::success(session_from_cookies(&response))
        }
        Ok(response) => AuthOutcome::failure(format!("basic auth rejected: HTTP {}", response.status)),
        Err(e) => AuthOutcome::failure(format!("basic auth request failed: {}", e)),
    }
}

async fn attempt_form(
    client: &dyn ProbeClient,
    base_url: &str,
    credentials: &Credentials,
    patterns: &AuthPatterns,
    encode_password: bool,
) -> AuthOutcome {
    if patterns.form_actions.is_empty() || patterns.form_fields.is_empty() {
        return AuthOutcome::failure("no known form actions or field names");
    }

    let password = if encode_password {
        base64::engine::general_purpose::STANDARD.encode(&credentials.password)
    } else {
        credentials.password.clone()
    };

    let base = base_url.trim_end_matches('/');
    let mut last_error = String::from("no form attempt made");

    for action in &patterns.form_actions {
        let url = format!("{}{}", base, action);
        for pair in &patterns.form_fields {
            let fields = vec![
                (pair.username.clone(), credentials.username.clone()),
                (pair.password.clone(), password.clone()),
            ];
            match client.post_form(&url, &fields, &[]).await {
                Ok(response) => {
                    let accepted = (response.is_success() || response.was_redirected())
                        && !still_on_login_page(&response);
                    if accepted {
                        debug!(action = %action, fields = %pair.username, "Form login accepted");
                        return AuthOutcome::success(session_from_cookies(&response));
                    }
                    last_error = format!(
                        "form login to {} rejected (HTTP {})",
                        action, response.status
                    );
                }
                Err(e) => {
                    last_error = format!("form login to {} failed: {}", action, e);
                }
            }
        }
    }

    AuthOutcome::failure(last_error)
}

async fn attempt_url_token(
    client: &dyn ProbeClient,
    base_url: &str,
    credentials: &Credentials,
    patterns: &AuthPatterns,
) -> AuthOutcome {
    if patterns.url_token_prefixes.is_empty() {
        return AuthOutcome::failure("no known url-token login prefixes");
    }

    let token = hnap::url_token(credentials);
    let cookie_name = patterns
        .token_cookies
        .first()
        .map(String::as_str)
        .unwrap_or("credential");
    let base = base_url.trim_end_matches('/');
    let mut last_error = String::from("no url-token attempt made");

    for prefix in &patterns.url_token_prefixes {
        let url = format!("{}{}{}", base, prefix, token);
        match client.get(&url, None, &[]).await {
            Ok(response) if response.is_success() => {
                // The response body (when present) is the session
                // token; fall back to the login token itself.
                let value = {
                    let trimmed = response.body.trim();
                    if trimmed.is_empty() || trimmed.len() > 512 || trimmed.contains('<') {
                        token.clone()
                    } else {
                        trimmed.to_string()
                    }
                };
                return AuthOutcome::success(Some(SessionToken::from_cookie(cookie_name, &value)));
            }
            Ok(response) => {
                last_error = format!("url-token login rejected: HTTP {}", response.status);
            }
            Err(e) => {
                last_error = format!("url-token login failed: {}", e);
            }
        }
    }

    AuthOutcome::failure(last_error)
}
