//! # Timevault Capsule
//!
//! The sealed capsule aggregate and its lifecycle.
//!
//! A [`Capsule`] owns its encrypted content items and per-recipient wrapped
//! keys (created together at seal time, destroyed together), the condition
//! set that gates opening, an optional self-destruct window, and an
//! append-only, hash-chained [`AuditLog`].
//!
//! ## Lifecycle
//!
//! Status is monotonic: `Draft < Scheduled < Delivered < Opened`. A capsule
//! is born `Scheduled` (sealing is the draft-to-scheduled transition) and the
//! transition to `Opened` happens exactly once, under the capsule's lifecycle
//! lock, no matter how many authorized recipients open it afterwards.
//!
//! Sealed parts are immutable; the capsule's identity is their Blake3
//! content-address over a canonical CBOR encoding, so any mutation of stored
//! bytes is detected on load.

pub mod audit;
pub mod canonical;
pub mod capsule;
pub mod error;
pub mod serial;
pub mod status;

pub use audit::{AuditEntry, AuditEventKind, AuditLog, MAX_AUDIT_ENTRIES};
pub use canonical::{canonical_sealed_bytes, derive_capsule_id};
pub use capsule::{slot_context, Capsule, KeySlot, OpenCommit, SealedParts};
pub use error::{CapsuleError, Result};
pub use status::{CapsuleStatus, SelfDestruct};
