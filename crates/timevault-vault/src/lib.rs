//! # Timevault Vault
//!
//! The key vault owns asymmetric key material per identity.
//!
//! Private keys never leave this crate's types: the vault exposes signing
//! and key-unwrapping as operations, not the secrets themselves. Lifecycle
//! is `init (generate/import) -> use -> teardown`, with all secret material
//! zeroized when the vault is dropped.
//!
//! The vault is injected into the sealer/opener rather than accessed as
//! ambient state, so each deployment scopes exactly the identities it holds.

pub mod error;
pub mod vault;

pub use error::{Result, VaultError};
pub use vault::{IdentityPublicKeys, KeyVault};
