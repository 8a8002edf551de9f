//! Error types for the key vault.

use thiserror::Error;
use timevault_core::{CoreError, IdentityId};

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The vault holds no key material for this identity.
    #[error("no key material for identity: {0}")]
    UnknownIdentity(IdentityId),

    /// The identity is already provisioned; re-generating would orphan
    /// every capsule sealed to the old keys.
    #[error("identity already provisioned: {0}")]
    IdentityExists(IdentityId),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
