//! Error types for the blob store boundary.

use thiserror::Error;

/// Errors a blob store implementation may surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is unavailable or exhausted.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store returned bytes it should not have.
    #[error("store returned corrupt data: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
