//! The audit trail: an append-only, hash-chained event ledger.
//!
//! Entries are never edited or removed; the sequence is the sole source of
//! truth for lifecycle history. Each entry hashes its predecessor, so edits
//! anywhere in the ledger break the chain.

use serde::{Deserialize, Serialize};
use timevault_core::{Blake3Hash, IdentityId};

use crate::error::{CapsuleError, Result};

/// Capacity cap for a single capsule's ledger.
///
/// An append past the cap is refused as storage exhaustion.
pub const MAX_AUDIT_ENTRIES: usize = 65_536;

/// Metadata prefix marking a denied open attempt.
const DENIED_PREFIX: &str = "denied";

/// Format denial metadata for a denied open attempt.
pub(crate) fn denial_metadata(outcome: &str, reason: &str) -> String {
    format!("{DENIED_PREFIX} ({outcome}): {reason}")
}

/// The kind of lifecycle event an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AuditEventKind {
    /// Capsule sealed.
    Created = 1,
    /// Sealed state altered by an authorized maintenance action
    /// (e.g. expired ciphertext purged).
    Modified = 2,
    /// Surfaced to recipients by the delivery collaborator.
    Delivered = 3,
    /// Open attempt (granted or denied; see metadata).
    Opened = 4,
}

impl AuditEventKind {
    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Created),
            2 => Some(Self::Modified),
            3 => Some(Self::Delivered),
            4 => Some(Self::Opened),
            _ => None,
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the ledger (1-indexed, monotonic).
    pub seq: u64,

    /// The event recorded.
    pub event: AuditEventKind,

    /// When it happened (Unix ms, caller-supplied clock).
    pub timestamp: i64,

    /// Who acted, when known.
    pub actor: Option<IdentityId>,

    /// Freeform detail; denial entries carry the denial reason.
    pub metadata: Option<String>,

    /// Hash of the previous entry (zero for the first).
    pub prev_hash: Blake3Hash,

    /// Hash of this entry, chaining prev_hash.
    pub entry_hash: Blake3Hash,
}

impl AuditEntry {
    /// Whether this entry records a denied open attempt.
    pub fn is_denied_attempt(&self) -> bool {
        self.event == AuditEventKind::Opened
            && self
                .metadata
                .as_deref()
                .is_some_and(|m| m.starts_with(DENIED_PREFIX))
    }

    fn compute_hash(
        seq: u64,
        event: AuditEventKind,
        timestamp: i64,
        actor: Option<&IdentityId>,
        metadata: Option<&str>,
        prev_hash: &Blake3Hash,
    ) -> Blake3Hash {
        let mut hasher = blake3::Hasher::new_derive_key("timevault-v0-audit-entry");
        hasher.update(&seq.to_be_bytes());
        hasher.update(&[event.to_u8()]);
        hasher.update(&timestamp.to_be_bytes());
        hash_opt_str(&mut hasher, actor.map(IdentityId::as_str));
        hash_opt_str(&mut hasher, metadata);
        hasher.update(prev_hash.as_bytes());
        Blake3Hash(*hasher.finalize().as_bytes())
    }
}

/// Length-prefixed optional string, so adjacent fields cannot collide.
fn hash_opt_str(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        Some(s) => {
            hasher.update(&[1]);
            hasher.update(&(s.len() as u64).to_be_bytes());
            hasher.update(s.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

/// The append-only ledger.
///
/// Readers get snapshot iterators, never a mutable view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    ///
    /// Fails only when the ledger capacity is exhausted; the refused entry
    /// is not partially recorded.
    pub fn append(
        &mut self,
        event: AuditEventKind,
        timestamp: i64,
        actor: Option<IdentityId>,
        metadata: Option<String>,
    ) -> Result<&AuditEntry> {
        if self.entries.len() >= MAX_AUDIT_ENTRIES {
            return Err(CapsuleError::AuditExhausted(MAX_AUDIT_ENTRIES));
        }

        let seq = self.entries.len() as u64 + 1;
        let prev_hash = self
            .entries
            .last()
            .map(|e| e.entry_hash)
            .unwrap_or(Blake3Hash::ZERO);

        let entry_hash = AuditEntry::compute_hash(
            seq,
            event,
            timestamp,
            actor.as_ref(),
            metadata.as_deref(),
            &prev_hash,
        );

        self.entries.push(AuditEntry {
            seq,
            event,
            timestamp,
            actor,
            metadata,
            prev_hash,
            entry_hash,
        });

        // Just pushed; the vec is non-empty.
        Ok(self.entries.last().expect("entry just appended"))
    }

    /// Ordered snapshot iterator over all entries.
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    /// Entries recording successful opens.
    pub fn successful_opens(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.event == AuditEventKind::Opened && !e.is_denied_attempt())
    }

    /// Entries recording denied open attempts.
    pub fn denied_attempts(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| e.is_denied_attempt())
    }

    /// Verify the hash chain end to end.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = Blake3Hash::ZERO;
        for entry in &self.entries {
            if entry.prev_hash != prev {
                return Err(CapsuleError::AuditChainBroken(entry.seq));
            }
            let expected = AuditEntry::compute_hash(
                entry.seq,
                entry.event,
                entry.timestamp,
                entry.actor.as_ref(),
                entry.metadata.as_deref(),
                &entry.prev_hash,
            );
            if entry.entry_hash != expected {
                return Err(CapsuleError::AuditChainBroken(entry.seq));
            }
            prev = entry.entry_hash;
        }
        Ok(())
    }

    /// Rebuild a ledger from stored entries, verifying the chain.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Result<Self> {
        let log = Self { entries };
        log.verify_chain()?;
        Ok(log)
    }
}
