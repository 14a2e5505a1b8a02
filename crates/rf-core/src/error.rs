//! Error types for ReelForge

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum RfError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid win line: {0}")]
    InvalidWinLine(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Presentation locked")]
    PresentationLocked,

    #[error("Completion abandoned before it resolved")]
    Abandoned,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type RfResult<T> = Result<T, RfError>;
