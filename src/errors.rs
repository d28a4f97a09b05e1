//! Error types for the CAS bridge.

use thiserror::Error;

/// Result type alias for the CAS bridge.
pub type Result<T, E = CasError> = std::result::Result<T, E>;

/// Main error type for the CAS bridge.
#[derive(Error, Debug)]
pub enum CasError {
    /// Configuration errors. Fatal at construction time: the broker must not
    /// start with a whitelist it could not load.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network/HTTP errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SAML validation request errors
    #[error("SAML request error: {0}")]
    Saml(#[from] SamlError),
}

impl CasError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Errors raised while parsing or checking an inbound SAML 1.1 validation
/// request. Each failure is a single descriptive condition; callers surface
/// the message verbatim in the failure response.
#[derive(Error, Debug)]
pub enum SamlError {
    #[error("Malformed SAML request: {0}")]
    Malformed(String),

    #[error("Could not find {0} in SAML request")]
    Missing(&'static str),

    #[error("Bad IssueInstant timestamp: {0}")]
    BadTimestamp(String),

    #[error("Request version error: SAML 1.1 required, got {0}")]
    UnsupportedVersion(String),

    #[error("Request IssueInstant in future")]
    IssueInstantInFuture,

    #[error("Request IssueInstant too old")]
    IssueInstantTooOld,

    #[error("Request AssertionArtifact (ticket) invalid")]
    EmptyTicket,
}
