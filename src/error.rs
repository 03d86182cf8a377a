//! Error types for the banking assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Turn Lifecycle Errors
    // =============================

    /// Workspace setup failed for good; every turn is refused.
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Workspace has not been resolved yet.
    #[error("Assistant workspace is not ready")]
    NotReady,

    /// The dialog engine, a data lookup or the image classifier failed.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AssistantError {
    /// Upstream failure, defaulting the status to 500 when the service gave none.
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status: status.unwrap_or(500),
            message: message.into(),
        }
    }

    /// HTTP status to report to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::HttpError(e) => e.status().map(|s| s.as_u16()).unwrap_or(500),
            Self::BadRequest(_) => 400,
            Self::Setup(_) | Self::NotReady => 200,
            _ => 500,
        }
    }
}
