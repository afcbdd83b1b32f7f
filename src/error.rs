//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code used as a structured log field
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Workflow(_) => "WORKFLOW_ERROR",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a workflow error
pub fn workflow_error(msg: impl Into<String>) -> AppError {
    AppError::Workflow(msg.into())
}

/// Helper function to create a transport error
pub fn transport_error(msg: impl Into<String>) -> AppError {
    AppError::Transport(msg.into())
}
