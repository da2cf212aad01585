//! Error type shared by the notifier's collaborators.
//!
//! Every variant is non-fatal inside the polling loop: the loop logs it and
//! moves on to the next cycle. Only configuration problems found at startup
//! abort the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    /// Invalid or missing startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials expired, revoked or lacking the required scope
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network failure, timeout, rate limiting or a 5xx from the provider
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Provider answered but the payload did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Speech failed: {0}")]
    Speech(String),

    #[error("Motion failed: {0}")]
    Motion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl NotifierError {
    pub fn config(message: impl Into<String>) -> Self {
        NotifierError::Config(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        NotifierError::Transient(message.into())
    }

    /// Whether recovery needs an external re-authentication step
    pub fn is_auth(&self) -> bool {
        matches!(self, NotifierError::Auth(_))
    }
}

pub type NotifierResult<T> = Result<T, NotifierError>;
