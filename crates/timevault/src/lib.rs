//! # Timevault
//!
//! The unified API for the sealed-capsule core.
//!
//! Brings the vault, sealer, opener, and blob store boundary together into
//! one interface for building applications.
//!
//! ## Overview
//!
//! Content is sealed so only designated recipients can ever open it: each
//! item gets a one-time symmetric key, wrapped per recipient via ephemeral
//! X25519. Opening is gated by a conjunctive condition set (date, location,
//! event, password, biometric), an optional self-destruct window after the
//! first open, and per-(capsule, opener) password rate limiting. Every
//! lifecycle transition lands in an append-only, hash-chained audit trail.
//!
//! ```no_run
//! use timevault::{ContentItem, Recipient, SealRequest, Timevault};
//! use timevault_conditions::{DeliveryCondition, Evidence};
//! use timevault_core::IdentityId;
//! use timevault_store::MemoryBlobStore;
//! use timevault_vault::KeyVault;
//!
//! let mut vault = KeyVault::new();
//! let bob = IdentityId::new("bob");
//! let bob_keys = vault.generate_identity(bob.clone()).unwrap();
//!
//! let tv = Timevault::new(vault, MemoryBlobStore::new());
//! let capsule = tv
//!     .seal(SealRequest {
//!         sealed_by: IdentityId::new("alice"),
//!         items: vec![ContentItem::text("hello future")],
//!         recipients: vec![Recipient::new(bob.clone(), bob_keys.agreement)],
//!         conditions: vec![DeliveryCondition::date(1_893_456_000_000)],
//!         self_destruct: None,
//!         now: 1_700_000_000_000,
//!     })
//!     .unwrap();
//!
//! let outcome = tv
//!     .attempt_open(&capsule, &bob, &Evidence::at(1_900_000_000_000))
//!     .unwrap();
//! assert!(outcome.is_opened());
//! ```

pub mod error;
pub mod open;
pub mod ratelimit;
pub mod seal;
mod timevault;

pub use error::{OpenError, Result, SealError, TimevaultError};
pub use open::{CapsuleOpener, Denial, OpenOutcome, OpenedItem};
pub use ratelimit::RateLimiter;
pub use seal::{CapsuleSealer, ContentItem, Recipient, SealRequest};
pub use timevault::{CapsuleAttestation, Timevault};

pub use timevault_capsule::{
    AuditEntry, AuditEventKind, AuditLog, Capsule, CapsuleStatus, KeySlot, OpenCommit,
    SelfDestruct,
};
pub use timevault_conditions::{
    BiometricKind, DeliveryCondition, Evaluation, Evidence,
};
pub use timevault_core::{CapsuleId, ContentKind, ContentMetadata, IdentityId};
pub use timevault_vault::{IdentityPublicKeys, KeyVault};
