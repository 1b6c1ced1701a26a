// Centralized error handling using thiserror for type-safe error management
//
// Design Decision: One crate error with one variant per failure family
//
// The management connection never hands these to its callers for transport,
// protocol or decode failures: those are folded into a failed OpResult at the
// connection boundary. The variants still exist so the layers underneath
// (transports, discovery, XML parsing) can propagate with `?` and the
// boundary can render one description from them.

use thiserror::Error;

/// Main error type for the management probe
///
/// Error Handling Strategy:
/// - IO, JSON, HTTP and XML errors: converted automatically via #[from]
/// - Usage errors: returned at construction time (empty names, bad options)
/// - Discovery errors: fatal for one candidate process only
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller or programming defect detected at construction time
    ///
    /// Examples: operation without a name, option descriptor without
    /// short or long name, address segment with an empty name.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Transport-level failure (connect refused, timeout, authentication)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote peer reported a failure or answered out of protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reply could not be decoded (malformed JSON, missing field)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Candidate process could not be turned into an endpoint
    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Boot configuration file is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Type alias for Result with ProbeError
pub type Result<T> = std::result::Result<T, ProbeError>;

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        ProbeError::Config(err.to_string())
    }
}
