//! In-memory implementation of the BlobStore trait.
//!
//! Primarily for testing. Same semantics as a real backend but keeps
//! everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use timevault_core::CapsuleId;

use crate::error::Result;
use crate::traits::BlobStore;

/// In-memory blob store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryBlobStore {
    records: RwLock<HashMap<CapsuleId, Bytes>>,
}

impl MemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().expect("store lock poisoned").len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, id: &CapsuleId, record: Bytes) -> Result<()> {
        self.records
            .write()
            .expect("store lock poisoned")
            .insert(*id, record);
        Ok(())
    }

    async fn get(&self, id: &CapsuleId) -> Result<Option<Bytes>> {
        Ok(self
            .records
            .read()
            .expect("store lock poisoned")
            .get(id)
            .cloned())
    }

    async fn remove(&self, id: &CapsuleId) -> Result<()> {
        self.records
            .write()
            .expect("store lock poisoned")
            .remove(id);
        Ok(())
    }
}
