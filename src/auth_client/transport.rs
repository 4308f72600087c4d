//! HTTP probe transport
//!
//! The pipeline talks to devices only through `ProbeClient`, so tests
//! can substitute an in-memory transport. The real implementation is a
//! reqwest client with bounded connect/read timeouts; dropping an
//! in-flight future cancels the request without leaking sockets.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{ConnectivityFailure, ConnectivityFailureKind, Credentials, ProbeResponse};
use crate::error::Result;

/// Probe transport contract
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        basic: Option<&Credentials>,
        extra_headers: &[(String, String)],
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure>;

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        extra_headers: &[(String, String)],
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure>;

    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure>;
}

/// reqwest-backed probe client
pub struct HttpProbeClient {
    client: reqwest::Client,
}

impl HttpProbeClient {
    /// Build a client with the given total timeout. Modems routinely
    /// present self-signed certificates, so TLS verification is off.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }

    fn classify(e: &reqwest::Error) -> ConnectivityFailureKind {
        if e.is_timeout() {
            ConnectivityFailureKind::Timeout
        } else if e.is_connect() {
            let msg = format!("{:?}", e).to_lowercase();
            if msg.contains("tls") || msg.contains("certificate") || msg.contains("handshake") {
                ConnectivityFailureKind::TlsError
            } else {
                ConnectivityFailureKind::ConnectionRefused
            }
        } else {
            ConnectivityFailureKind::Other
        }
    }

    async fn execute(
        &self,
        requested_url: &str,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| ConnectivityFailure::new(Self::classify(&e), e.to_string()))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectivityFailure::new(Self::classify(&e), e.to_string()))?;

        Ok(ProbeResponse {
            requested_url: requested_url.to_string(),
            final_url,
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn get(
        &self,
        url: &str,
        basic: Option<&Credentials>,
        extra_headers: &[(String, String)],
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        let mut request = self.client.get(url);
        if let Some(creds) = basic {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        for (name, value) in extra_headers {
            request = request.header(name, value);
        }
        self.execute(url, request).await
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        extra_headers: &[(String, String)],
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        let mut request = self.client.post(url).form(fields);
        for (name, value) in extra_headers {
            request = request.header(name, value);
        }
        self.execute(url, request).await
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> std::result::Result<ProbeResponse, ConnectivityFailure> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        self.execute(url, request).await
    }
}
