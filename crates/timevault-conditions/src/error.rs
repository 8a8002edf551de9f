//! Error types for condition construction.

use thiserror::Error;

/// Errors that can occur while building conditions.
///
/// Evaluation itself never errors: it returns a typed
/// [`Evaluation`](crate::Evaluation) outcome instead.
#[derive(Debug, Error)]
pub enum ConditionError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// A condition parameter is out of range.
    #[error("invalid condition parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for condition operations.
pub type Result<T> = std::result::Result<T, ConditionError>;
