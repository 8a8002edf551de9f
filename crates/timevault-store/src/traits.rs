//! The BlobStore trait: abstract persistence for serialized capsules.

use async_trait::async_trait;
use bytes::Bytes;
use timevault_core::CapsuleId;

use crate::error::Result;

/// Async interface to an opaque capsule blob store.
///
/// All methods are async so slow backends never block the caller's thread;
/// the orchestration layer awaits these calls outside any capsule lock.
///
/// # Design Notes
///
/// - **Opaque records**: the store never inspects capsule bytes; tamper
///   detection happens in the capsule codec, not here.
/// - **Idempotent puts**: storing the same capsule ID twice overwrites; the
///   capsule's content-address makes the overwrite byte-identical unless
///   lifecycle state advanced, which is the intended update path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a serialized capsule record under its ID.
    async fn put(&self, id: &CapsuleId, record: Bytes) -> Result<()>;

    /// Fetch a serialized capsule record.
    async fn get(&self, id: &CapsuleId) -> Result<Option<Bytes>>;

    /// Remove a record (e.g. after expired-content cleanup).
    ///
    /// Removing an absent record is not an error.
    async fn remove(&self, id: &CapsuleId) -> Result<()>;

    /// Whether a record exists.
    async fn contains(&self, id: &CapsuleId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}
