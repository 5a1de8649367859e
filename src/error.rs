use std::io;
use thiserror::Error;

/// Custom error type for the alertness core
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the alertness core
pub type Result<T> = std::result::Result<T, VigilError>;

impl VigilError {
    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        VigilError::InvalidConfig(msg.into())
    }

    /// Create a runtime error
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        VigilError::Runtime(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        VigilError::Other(msg.into())
    }

    pub fn is_invalid_config(&self) -> bool {
        matches!(self, VigilError::InvalidConfig(_))
    }
}
