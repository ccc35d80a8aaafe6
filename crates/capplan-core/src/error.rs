//! Centralized error types for Capplan.

use thiserror::Error;

use crate::view::Rejection;

/// Main error type for Capplan operations.
#[derive(Error, Debug)]
pub enum CapError {
    #[error("Quarter not found: {0}")]
    QuarterNotFound(String),

    #[error("No active quarter")]
    NoActiveQuarter,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Store error: {0}")]
    Store(#[from] capplan_redis::RedisError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Capplan operations.
pub type CapResult<T> = Result<T, CapError>;

impl CapError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether this error means the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QuarterNotFound(_)
                | Self::NoActiveQuarter
                | Self::Store(capplan_redis::RedisError::NotFound(_))
        )
    }
}
