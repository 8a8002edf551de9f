//! Error types for the capsule aggregate.

use thiserror::Error;
use timevault_core::CapsuleId;

use crate::status::CapsuleStatus;

/// Errors that can occur during capsule lifecycle and codec operations.
#[derive(Debug, Error)]
pub enum CapsuleError {
    /// The audit log reached its capacity; the append was refused.
    #[error("audit log full: capacity {0} exhausted")]
    AuditExhausted(usize),

    /// The audit hash chain does not verify.
    #[error("audit chain broken at seq {0}")]
    AuditChainBroken(u64),

    /// A status transition would move backward.
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status.
        from: CapsuleStatus,
        /// Requested status.
        to: CapsuleStatus,
    },

    /// The self-destruct window has passed; the capsule can never be
    /// opened again.
    #[error("self-destruct window expired")]
    Expired,

    /// Stored bytes do not match the capsule's content-address.
    #[error("capsule id mismatch: expected {expected}, got {actual}")]
    IdMismatch {
        /// Content-address recorded in the record.
        expected: CapsuleId,
        /// Content-address recomputed from the sealed parts.
        actual: CapsuleId,
    },

    /// Encoding error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Decoding error.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The record is structurally malformed.
    #[error("malformed capsule record: {0}")]
    MalformedRecord(String),
}

/// Result type for capsule operations.
pub type Result<T> = std::result::Result<T, CapsuleError>;
