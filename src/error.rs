//! Error handling for modemscan

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Signal confidence outside [0, 1]
    #[error("Invalid confidence {0}: must be within [0, 1]")]
    InvalidConfidence(f64),

    /// Pattern index / startup configuration error (fatal at load time)
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid caller input (bad host string etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication failure
    #[error("Auth error: {0}")]
    Auth(String),

    /// Malformed or unexpected page structure during decoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
