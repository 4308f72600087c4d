//! Probe transport types

use serde::{Deserialize, Serialize};

/// One credential set supplied by the caller
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connectivity failure classes. A timeout is a normal, recoverable
/// outcome of probing an embedded device, not an exceptional condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityFailureKind {
    Timeout,
    ConnectionRefused,
    TlsError,
    Other,
}

/// Typed connectivity failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityFailure {
    pub kind: ConnectivityFailureKind,
    pub message: String,
}

impl ConnectivityFailure {
    pub fn new(kind: ConnectivityFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConnectivityFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// One HTTP probe response with the metadata the detector consumes
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub requested_url: String,
    /// URL after redirects; differs from requested_url on login bounces
    pub final_url: String,
    pub status: u16,
    /// Header name/value pairs in wire order (names may repeat)
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ProbeResponse {
    /// First header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All header values by case-insensitive name (Set-Cookie repeats)
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn was_redirected(&self) -> bool {
        self.requested_url != self.final_url
    }
}

/// Opaque per-host session material: the headers to replay on
/// authenticated requests (token cookies, HNAP auth headers).
#[derive(Debug, Clone, Default)]
pub struct SessionToken {
    pub headers: Vec<(String, String)>,
}

impl SessionToken {
    pub fn from_cookie(name: &str, value: &str) -> Self {
        Self {
            headers: vec![("Cookie".to_string(), format!("{}={}", name, value))],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
