use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid ranking: {0}")]
    InvalidRanking(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Failures reported by an AI judge gateway for a single candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgeError {
    #[error("judge call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("judge API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed judge output: {0}")]
    Malformed(String),
}

impl JudgeError {
    /// Errors worth a second attempt. A 4xx other than 408/429 will fail the
    /// same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            JudgeError::Timeout(_) | JudgeError::Transport(_) | JudgeError::Malformed(_) => true,
            JudgeError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
        }
    }
}
