//! # Timevault Core
//!
//! Pure cryptographic primitives for the sealed-capsule core.
//!
//! This crate contains no I/O, no storage, no clocks. It is pure computation
//! over key material and ciphertext.
//!
//! ## Key Types
//!
//! - [`EncryptedContent`] - An authenticated-encrypted content item
//! - [`WrappedKey`] - A content key encrypted for one specific recipient
//! - [`ContentKey`] - One-time symmetric key for a single content item
//! - [`CapsuleId`] / [`IdentityId`] - Strong identifiers
//!
//! ## Encryption Model
//!
//! Content is sealed with a fresh symmetric key per item (ChaCha20-Poly1305),
//! and that key is wrapped once per recipient via ephemeral X25519 ECDH. Only
//! the holder of a recipient's agreement secret can recover the content key.

pub mod agreement;
pub mod cipher;
pub mod crypto;
pub mod error;
pub mod types;
pub mod wrap;

pub use agreement::{EphemeralKeyPair, SharedKey, X25519PublicKey, X25519StaticSecret};
pub use cipher::{CipherFormat, ContentKey, ContentNonce, EncryptedContent};
pub use crypto::{Blake3Hash, Ed25519Keypair, Ed25519PublicKey, Ed25519Signature};
pub use error::{CoreError, Result};
pub use types::{CapsuleId, ContentKind, ContentMetadata, IdentityId};
pub use wrap::{WrapFormat, WrappedKey};
