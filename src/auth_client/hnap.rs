//! HNAP challenge/response login
//!
//! Two-step Login action against the HNAP endpoint: the first request
//! obtains Challenge/Cookie/PublicKey, the private key and login
//! password are derived with HMAC-MD5, and the second request presents
//! them. Digests are uppercase hex, matching the wire dialect the HNAP
//! modems emit.

use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;
use serde_json::json;
use tracing::debug;

use super::transport::ProbeClient;
use super::types::{Credentials, SessionToken};
use crate::pattern_index::AuthPatterns;

type HmacMd5 = Hmac<Md5>;

/// Uppercase hex HMAC-MD5
pub fn hmac_md5_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacMd5::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

/// Derive (private_key, login_password) from the first-stage response
pub fn derive_login_keys(
    public_key: &str,
    challenge: &str,
    password: &str,
) -> (String, String) {
    let key_material = format!("{}{}", public_key, password);
    let private_key = hmac_md5_hex(key_material.as_bytes(), challenge.as_bytes());
    let login_password = hmac_md5_hex(private_key.as_bytes(), challenge.as_bytes());
    (private_key, login_password)
}

fn login_body(action: &str, username: &str, login_password: &str) -> String {
    json!({
        "Login": {
            "Action": action,
            "Username": username,
            "LoginPassword": login_password,
            "Captcha": "",
            "PrivateLogin": "LoginPassword",
        }
    })
    .to_string()
}

fn login_response_field<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value.get("LoginResponse")?.get(field)?.as_str()
}

/// Attempt an HNAP login. Returns the session headers on success, or
/// a human-readable failure reason.
pub async fn hnap_login(
    client: &dyn ProbeClient,
    base_url: &str,
    credentials: &Credentials,
    patterns: &AuthPatterns,
) -> Result<SessionToken, String> {
    let endpoint = patterns
        .hnap_endpoints
        .first()
        .map(String::as_str)
        .unwrap_or("/HNAP1/");
    let namespace = patterns
        .hnap_namespaces
        .first()
        .map(String::as_str)
        .unwrap_or("http://purenetworks.com/HNAP1/");
    let url = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
    let soap_action = format!("\"{}Login\"", namespace);

    let headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("SOAPAction".to_string(), soap_action.clone()),
    ];

    // Stage 1: request the challenge
    let request_body = login_body("request", &credentials.username, "");
    let response = client
        .post(&url, &headers, request_body)
        .await
        .map_err(|e| format!("challenge request failed: {}", e))?;
    if !response.is_success() {
        return Err(format!("challenge request returned HTTP {}", response.status));
    }
    let parsed: serde_json::Value = serde_json::from_str(&response.body)
        .map_err(|e| format!("challenge response is not JSON: {}", e))?;

    let challenge = login_response_field(&parsed, "Challenge")
        .ok_or("challenge response missing Challenge")?;
    let cookie = login_response_field(&parsed, "Cookie")
        .ok_or("challenge response missing Cookie")?;
    let public_key = login_response_field(&parsed, "PublicKey")
        .ok_or("challenge response missing PublicKey")?;

    let (private_key, login_password) =
        derive_login_keys(public_key, challenge, &credentials.password);

    debug!(url = %url, "HNAP challenge received, sending login");

    // Stage 2: present the derived login password
    let mut login_headers = headers;
    login_headers.push((
        "Cookie".to_string(),
        format!("uid={}; PrivateKey={}", cookie, private_key),
    ));
    let login_request = login_body("login", &credentials.username, &login_password);
    let response = client
        .post(&url, &login_headers, login_request)
        .await
        .map_err(|e| format!("login request failed: {}", e))?;
    if !response.is_success() {
        return Err(format!("login returned HTTP {}", response.status));
    }
    let parsed: serde_json::Value = serde_json::from_str(&response.body)
        .map_err(|e| format!("login response is not JSON: {}", e))?;
    let result = login_response_field(&parsed, "LoginResult").unwrap_or("");
    if !result.eq_ignore_ascii_case("ok") && !result.eq_ignore_ascii_case("success") {
        return Err(format!("login rejected: LoginResult={}", result));
    }

    Ok(SessionToken {
        headers: vec![(
            "Cookie".to_string(),
            format!("uid={}; PrivateKey={}", cookie, private_key),
        )],
    })
}

/// Base64 of `username:password` for URL-token logins
pub fn url_token(credentials: &Credentials) -> String {
    base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", credentials.username, credentials.password))
}
