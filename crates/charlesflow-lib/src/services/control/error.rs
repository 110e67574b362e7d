// Control API Error Types

use thiserror::Error;

use crate::models::{ConfigError, InvalidPresetError};

/// Errors talking to the Charles control API
#[derive(Error, Debug)]
pub enum ControlError {
    /// Charles (or its proxy port) could not be reached
    #[error("Cannot reach Charles control API ({endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    #[error("Charles control API timed out on {endpoint} after {seconds}s")]
    Timeout { endpoint: String, seconds: u64 },

    /// Non-success HTTP status
    #[error("Charles control API returned HTTP {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Failed to read response body from {endpoint}: {message}")]
    Body { endpoint: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rejected before any request is made
    #[error(transparent)]
    InvalidPreset(#[from] InvalidPresetError),
}

/// Result type for control API calls
pub type ControlResult<T> = Result<T, ControlError>;

impl ControlError {
    pub fn code(&self) -> &'static str {
        match self {
            ControlError::Connection { .. } => "CONTROL_CONNECTION_FAILED",
            ControlError::Timeout { .. } => "CONTROL_TIMEOUT",
            ControlError::Status { .. } => "CONTROL_HTTP_STATUS",
            ControlError::Body { .. } => "CONTROL_BODY_ERROR",
            ControlError::Client(_) => "CONTROL_CLIENT_ERROR",
            ControlError::Config(_) => "CONTROL_INVALID_CONFIG",
            ControlError::InvalidPreset(_) => "CONTROL_INVALID_PRESET",
        }
    }

    /// Transport-level failure (unreachable or timed out)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ControlError::Connection { .. } | ControlError::Timeout { .. }
        )
    }
}

impl From<ControlError> for String {
    fn from(err: ControlError) -> Self {
        err.to_string()
    }
}
