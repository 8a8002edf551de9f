//! Error types for sealing, opening, and the unified API.

use thiserror::Error;

use timevault_capsule::CapsuleError;
use timevault_core::{CapsuleId, CoreError, IdentityId};
use timevault_store::StoreError;
use timevault_vault::VaultError;

/// Errors rejected by the sealer.
///
/// Validation errors are raised synchronously before any crypto work.
#[derive(Debug, Error)]
pub enum SealError {
    /// The request contained no content items.
    #[error("no content items to seal")]
    EmptyContent,

    /// The request named no recipients.
    #[error("no recipients")]
    NoRecipients,

    /// A recipient appears more than once.
    #[error("duplicate recipient: {0}")]
    DuplicateRecipient(IdentityId),

    /// Core error (key generation, encryption).
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Capsule error (audit append).
    #[error("capsule error: {0}")]
    Capsule(#[from] CapsuleError),
}

/// Errors raised by the opener.
///
/// A condition set that does not (yet) hold is not an error: it is the
/// typed [`Denied`](crate::OpenOutcome::Denied) outcome.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The self-destruct window has passed; no attempt can ever succeed.
    #[error("self-destruct window expired")]
    Expired,

    /// The opener holds no wrapped key in this capsule.
    #[error("identity {0} is not a recipient of this capsule")]
    Unauthorized(IdentityId),

    /// An authentication tag failed. Tamper evidence; never retried.
    #[error("integrity failure on content item {index}: tamper suspected")]
    Integrity {
        /// Which content item failed.
        index: u32,
    },

    /// A wrapped key is structurally malformed.
    #[error("corrupt wrapped key for content item {index}: {reason}")]
    CorruptKey {
        /// Which content item's key failed.
        index: u32,
        /// What was malformed.
        reason: String,
    },

    /// Vault error.
    #[error("vault error: {0}")]
    Vault(VaultError),

    /// Capsule error.
    #[error("capsule error: {0}")]
    Capsule(#[from] CapsuleError),

    /// Core error.
    #[error("core error: {0}")]
    Core(CoreError),
}

/// Errors surfaced by the unified API.
#[derive(Debug, Error)]
pub enum TimevaultError {
    /// Seal error.
    #[error("seal error: {0}")]
    Seal(#[from] SealError),

    /// Open error.
    #[error("open error: {0}")]
    Open(#[from] OpenError),

    /// Blob store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Capsule codec error.
    #[error("capsule error: {0}")]
    Capsule(#[from] CapsuleError),

    /// Vault error.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// No record in the blob store under this ID.
    #[error("capsule not found: {0}")]
    CapsuleNotFound(CapsuleId),
}

/// Result type for unified API operations.
pub type Result<T> = std::result::Result<T, TimevaultError>;
