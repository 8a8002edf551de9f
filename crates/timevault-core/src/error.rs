//! Error types for the Timevault core.

use thiserror::Error;

/// Errors that can occur in core cryptographic operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key generation failed (entropy source unavailable).
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Authentication tag did not verify. The ciphertext is tampered or
    /// corrupted; no partial plaintext is ever released.
    #[error("integrity check failed: ciphertext rejected")]
    Integrity,

    /// The supplied key does not correspond to this ciphertext.
    #[error("unauthorized: key does not correspond")]
    Unauthorized,

    /// Key material is structurally malformed.
    #[error("corrupt key material: {0}")]
    CorruptKey(String),

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Encoding error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Decoding error.
    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
