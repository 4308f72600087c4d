//! Confidence weights per pattern category
//!
//! Fixed design constants, not statistically derived. Relative
//! ordering matters: exact model strings beat protocol headers beat
//! generic markup. Tests pin the exact values.

/// Exact model-string match on a post-auth page
pub const MODEL_STRING: f64 = 0.95;

/// SOAPACTION header carrying an HNAP namespace
pub const HNAP_HEADER: f64 = 0.9;

/// Known HNAP endpoint path or namespace seen in page text
pub const HNAP_ENDPOINT: f64 = 0.85;

/// 401 response with a `WWW-Authenticate: Basic` challenge
pub const BASIC_CHALLENGE: f64 = 0.85;

/// HNAP evidence implying HNAP challenge/response auth
pub const HNAP_AUTH: f64 = 0.8;

/// Manufacturer name seen in markup
pub const MANUFACTURER_HINT: f64 = 0.7;

/// Form action or field names matching a known login form
pub const KNOWN_FORM_ACTION: f64 = 0.7;

/// Login path matching a known URL-token prefix
pub const URL_TOKEN: f64 = 0.7;

/// JSON body or application/json content type
pub const REST_JSON: f64 = 0.7;

/// Password-encoding marker in page script
pub const ENCODING_MARKER: f64 = 0.65;

/// Set-Cookie name matching a known session-token cookie
pub const TOKEN_COOKIE: f64 = 0.65;

/// A `<form>` containing a password input
pub const FORM_PASSWORD: f64 = 0.6;

/// HTML content type or markup
pub const HTML_MARKUP: f64 = 0.5;

/// 200 response with no login artifact at all
pub const AUTH_NONE: f64 = 0.5;

/// Factual content signals (status, content type, redirect)
pub const FACT: f64 = 1.0;
