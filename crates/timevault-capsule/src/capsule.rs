//! The capsule aggregate.
//!
//! Sealed parts are immutable after construction. Lifecycle state (status,
//! first-open time, audit ledger) lives behind a per-capsule mutex: open
//! attempts evaluate and decrypt unsynchronized, and serialize only at the
//! commit point, so concurrent first-openers cannot double-trigger the
//! self-destruct timer or duplicate the transition.

use std::collections::BTreeSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use timevault_conditions::DeliveryCondition;
use timevault_core::{Blake3Hash, CapsuleId, EncryptedContent, IdentityId, WrappedKey};

use crate::audit::{denial_metadata, AuditEntry, AuditEventKind, AuditLog};
use crate::canonical::derive_capsule_id;
use crate::error::{CapsuleError, Result};
use crate::status::{CapsuleStatus, SelfDestruct};

/// Context bytes binding a wrapped key to its content slot.
pub fn slot_context(content_index: u32) -> [u8; 4] {
    content_index.to_be_bytes()
}

/// One wrapped key occupying a (content item, recipient) slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySlot {
    /// Index of the content item this key opens.
    pub content_index: u32,

    /// The wrapped key.
    pub wrapped: WrappedKey,
}

/// Borrowed view of the immutable sealed parts, for canonical encoding.
#[derive(Clone, Copy)]
pub struct SealedParts<'a> {
    /// Seal time (Unix ms).
    pub created_at: i64,
    /// Who sealed the capsule.
    pub sealed_by: &'a IdentityId,
    /// Encrypted content items.
    pub contents: &'a [EncryptedContent],
    /// Wrapped keys, one per (item, recipient).
    pub key_slots: &'a [KeySlot],
    /// The condition set gating opening.
    pub conditions: &'a [DeliveryCondition],
    /// Optional self-destruct window.
    pub self_destruct: Option<&'a SelfDestruct>,
}

/// Result of committing an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenCommit {
    /// Whether this commit performed the one-time transition to Opened.
    pub first_open: bool,

    /// When the capsule was first opened (Unix ms).
    pub first_opened_at: i64,
}

/// Mutable lifecycle state, guarded by the capsule's mutex.
pub(crate) struct Lifecycle {
    pub(crate) status: CapsuleStatus,
    pub(crate) first_opened_at: Option<i64>,
    pub(crate) purged: bool,
    pub(crate) audit: AuditLog,
}

/// A sealed capsule.
///
/// Owns its encrypted contents and wrapped keys exclusively; they were
/// created together at seal time and are destroyed together.
pub struct Capsule {
    id: CapsuleId,
    created_at: i64,
    sealed_by: IdentityId,
    contents: Vec<EncryptedContent>,
    key_slots: Vec<KeySlot>,
    conditions: Vec<DeliveryCondition>,
    self_destruct: Option<SelfDestruct>,
    lifecycle: Mutex<Lifecycle>,
}

impl Capsule {
    /// Construct a freshly sealed capsule.
    ///
    /// This is the draft-to-scheduled transition: the capsule is born
    /// `Scheduled` with a `Created` audit entry. Content bytes are
    /// immutable from here on.
    pub fn new_sealed(
        sealed_by: IdentityId,
        contents: Vec<EncryptedContent>,
        key_slots: Vec<KeySlot>,
        conditions: Vec<DeliveryCondition>,
        self_destruct: Option<SelfDestruct>,
        now: i64,
    ) -> Result<Self> {
        let id = derive_capsule_id(&SealedParts {
            created_at: now,
            sealed_by: &sealed_by,
            contents: &contents,
            key_slots: &key_slots,
            conditions: &conditions,
            self_destruct: self_destruct.as_ref(),
        });

        let mut audit = AuditLog::new();
        audit.append(
            AuditEventKind::Created,
            now,
            Some(sealed_by.clone()),
            None,
        )?;

        Ok(Self {
            id,
            created_at: now,
            sealed_by,
            contents,
            key_slots,
            conditions,
            self_destruct,
            lifecycle: Mutex::new(Lifecycle {
                status: CapsuleStatus::Scheduled,
                first_opened_at: None,
                purged: false,
                audit,
            }),
        })
    }

    /// Rebuild a capsule from a decoded record. Used by the codec.
    pub(crate) fn from_record_parts(
        id: CapsuleId,
        created_at: i64,
        sealed_by: IdentityId,
        contents: Vec<EncryptedContent>,
        key_slots: Vec<KeySlot>,
        conditions: Vec<DeliveryCondition>,
        self_destruct: Option<SelfDestruct>,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            id,
            created_at,
            sealed_by,
            contents,
            key_slots,
            conditions,
            self_destruct,
            lifecycle: Mutex::new(lifecycle),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sealed parts (immutable)
    // ─────────────────────────────────────────────────────────────────────

    /// The capsule's content-address.
    pub fn id(&self) -> CapsuleId {
        self.id
    }

    /// Seal time (Unix ms).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Who sealed the capsule.
    pub fn sealed_by(&self) -> &IdentityId {
        &self.sealed_by
    }

    /// The encrypted content items.
    pub fn contents(&self) -> &[EncryptedContent] {
        &self.contents
    }

    /// All wrapped-key slots.
    pub fn key_slots(&self) -> &[KeySlot] {
        &self.key_slots
    }

    /// The condition set gating opening.
    pub fn conditions(&self) -> &[DeliveryCondition] {
        &self.conditions
    }

    /// The self-destruct window, if configured.
    pub fn self_destruct(&self) -> Option<&SelfDestruct> {
        self.self_destruct.as_ref()
    }

    /// The distinct recipients holding wrapped keys.
    pub fn recipients(&self) -> Vec<IdentityId> {
        let set: BTreeSet<&IdentityId> =
            self.key_slots.iter().map(|s| &s.wrapped.recipient).collect();
        set.into_iter().cloned().collect()
    }

    /// Whether an identity holds a wrapped key in this capsule.
    pub fn is_recipient(&self, id: &IdentityId) -> bool {
        self.key_slots.iter().any(|s| &s.wrapped.recipient == id)
    }

    /// The wrapped key for (recipient, content item), if present.
    pub fn wrapped_key_for(&self, id: &IdentityId, content_index: u32) -> Option<&WrappedKey> {
        self.key_slots
            .iter()
            .find(|s| s.content_index == content_index && &s.wrapped.recipient == id)
            .map(|s| &s.wrapped)
    }

    /// Borrowed view of the sealed parts.
    pub fn sealed_parts(&self) -> SealedParts<'_> {
        SealedParts {
            created_at: self.created_at,
            sealed_by: &self.sealed_by,
            contents: &self.contents,
            key_slots: &self.key_slots,
            conditions: &self.conditions,
            self_destruct: self.self_destruct.as_ref(),
        }
    }

    /// Hash of the canonical sealed bytes, for external attestation
    /// (e.g. anchoring in an outside ledger; anchoring itself is not this
    /// core's concern).
    pub fn attestation_hash(&self) -> Blake3Hash {
        crate::canonical::sealed_parts_hash(&self.sealed_parts())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle (guarded)
    // ─────────────────────────────────────────────────────────────────────

    /// Current status.
    pub fn status(&self) -> CapsuleStatus {
        self.lock().status
    }

    /// When the capsule was first successfully opened, if ever.
    pub fn first_opened_at(&self) -> Option<i64> {
        self.lock().first_opened_at
    }

    /// Whether expired ciphertext has been purged.
    pub fn is_purged(&self) -> bool {
        self.lock().purged
    }

    /// Snapshot of the audit ledger.
    pub fn audit_snapshot(&self) -> Vec<AuditEntry> {
        self.lock().audit.entries().cloned().collect()
    }

    /// Verify the audit hash chain.
    pub fn verify_audit(&self) -> Result<()> {
        self.lock().audit.verify_chain()
    }

    /// Record that the delivery collaborator surfaced the capsule.
    ///
    /// Idempotent past Delivered; status never moves backward.
    pub fn mark_delivered(&self, now: i64) -> Result<CapsuleStatus> {
        let mut lc = self.lock();
        match lc.status {
            CapsuleStatus::Scheduled => {
                lc.status = CapsuleStatus::Delivered;
                lc.audit
                    .append(AuditEventKind::Delivered, now, None, None)?;
                Ok(CapsuleStatus::Delivered)
            }
            status @ (CapsuleStatus::Delivered | CapsuleStatus::Opened) => Ok(status),
            from @ CapsuleStatus::Draft => Err(CapsuleError::InvalidTransition {
                from,
                to: CapsuleStatus::Delivered,
            }),
        }
    }

    /// Self-destruct gate: fails once the window after first open has
    /// passed. Checked synchronously at the start of every attempt.
    pub fn check_expired(&self, now: i64) -> Result<()> {
        let lc = self.lock();
        if lc.purged {
            return Err(CapsuleError::Expired);
        }
        if let (Some(sd), Some(first)) = (self.self_destruct.as_ref(), lc.first_opened_at) {
            if sd.is_expired(first, now) {
                return Err(CapsuleError::Expired);
            }
        }
        Ok(())
    }

    /// Record a denied open attempt. Audit-only; no lifecycle state
    /// changes, so attempt history leaks nothing through status.
    pub fn record_denied_attempt(
        &self,
        actor: IdentityId,
        outcome: &str,
        reason: &str,
        now: i64,
    ) -> Result<()> {
        let mut lc = self.lock();
        lc.audit.append(
            AuditEventKind::Opened,
            now,
            Some(actor),
            Some(denial_metadata(outcome, reason)),
        )?;
        Ok(())
    }

    /// Commit a successful open.
    ///
    /// The one-time Scheduled/Delivered -> Opened transition happens here,
    /// atomically under the lifecycle lock; later authorized openers append
    /// further `Opened` entries without re-transitioning. Expiry is
    /// re-checked at the commit point so a racing opener cannot slip past a
    /// window that closed while it was decrypting.
    pub fn commit_opened(&self, actor: IdentityId, now: i64) -> Result<OpenCommit> {
        let mut lc = self.lock();

        if lc.purged {
            return Err(CapsuleError::Expired);
        }
        if let (Some(sd), Some(first)) = (self.self_destruct.as_ref(), lc.first_opened_at) {
            if sd.is_expired(first, now) {
                return Err(CapsuleError::Expired);
            }
        }

        match lc.status {
            CapsuleStatus::Scheduled | CapsuleStatus::Delivered => {
                lc.status = CapsuleStatus::Opened;
                lc.first_opened_at = Some(now);
                lc.audit.append(
                    AuditEventKind::Opened,
                    now,
                    Some(actor),
                    Some("first open".into()),
                )?;
                Ok(OpenCommit {
                    first_open: true,
                    first_opened_at: now,
                })
            }
            CapsuleStatus::Opened => {
                let first = lc.first_opened_at.unwrap_or(now);
                lc.audit
                    .append(AuditEventKind::Opened, now, Some(actor), None)?;
                Ok(OpenCommit {
                    first_open: false,
                    first_opened_at: first,
                })
            }
            from @ CapsuleStatus::Draft => Err(CapsuleError::InvalidTransition {
                from,
                to: CapsuleStatus::Opened,
            }),
        }
    }

    /// Irreversibly destroy ciphertext once the self-destruct window has
    /// passed. Optional cleanup; denial of access does not depend on it.
    ///
    /// Returns whether anything was purged.
    pub fn purge_expired(&mut self, now: i64) -> Result<bool> {
        {
            let lc = self.lock();
            if lc.purged {
                return Ok(false);
            }
            let expired = match (self.self_destruct.as_ref(), lc.first_opened_at) {
                (Some(sd), Some(first)) => sd.is_expired(first, now),
                _ => false,
            };
            if !expired {
                return Ok(false);
            }
        }

        for content in &mut self.contents {
            content.ciphertext.zeroize();
        }
        for slot in &mut self.key_slots {
            slot.wrapped.wrapped_key.zeroize();
        }

        let mut lc = self.lock();
        lc.purged = true;
        lc.audit.append(
            AuditEventKind::Modified,
            now,
            None,
            Some("ciphertext purged after self-destruct".into()),
        )?;
        Ok(true)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().expect("capsule lifecycle lock poisoned")
    }
}

impl std::fmt::Debug for Capsule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capsule")
            .field("id", &self.id)
            .field("contents", &self.contents.len())
            .field("key_slots", &self.key_slots.len())
            .field("conditions", &self.conditions.len())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timevault_core::{ContentKey, ContentKind, X25519StaticSecret};

    fn sealed_capsule(self_destruct: Option<SelfDestruct>) -> Capsule {
        let key = ContentKey::generate().unwrap();
        let content = EncryptedContent::seal(ContentKind::Text, b"hello", &key, None).unwrap();

        let secret = X25519StaticSecret::from_bytes([0x22; 32]);
        let wrapped = WrappedKey::wrap(
            &key,
            IdentityId::new("bob"),
            &secret.public_key(),
            &slot_context(0),
        )
        .unwrap();

        Capsule::new_sealed(
            IdentityId::new("alice"),
            vec![content],
            vec![KeySlot {
                content_index: 0,
                wrapped,
            }],
            vec![DeliveryCondition::date(1_000)],
            self_destruct,
            500,
        )
        .unwrap()
    }

    #[test]
    fn test_born_scheduled_with_created_entry() {
        let capsule = sealed_capsule(None);

        assert_eq!(capsule.status(), CapsuleStatus::Scheduled);
        let audit = capsule.audit_snapshot();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].event, AuditEventKind::Created);
        assert_eq!(audit[0].actor, Some(IdentityId::new("alice")));
    }

    #[test]
    fn test_recipients_and_slots() {
        let capsule = sealed_capsule(None);
        let bob = IdentityId::new("bob");

        assert_eq!(capsule.recipients(), vec![bob.clone()]);
        assert!(capsule.is_recipient(&bob));
        assert!(!capsule.is_recipient(&IdentityId::new("carol")));
        assert!(capsule.wrapped_key_for(&bob, 0).is_some());
        assert!(capsule.wrapped_key_for(&bob, 1).is_none());
    }

    #[test]
    fn test_commit_opened_once() {
        let capsule = sealed_capsule(None);
        let bob = IdentityId::new("bob");

        let first = capsule.commit_opened(bob.clone(), 2_000).unwrap();
        assert!(first.first_open);
        assert_eq!(capsule.status(), CapsuleStatus::Opened);

        let second = capsule.commit_opened(bob, 3_000).unwrap();
        assert!(!second.first_open);
        assert_eq!(second.first_opened_at, 2_000);
        assert_eq!(capsule.status(), CapsuleStatus::Opened);

        // One transition, two opened entries.
        let opens: Vec<AuditEntry> = capsule
            .audit_snapshot()
            .into_iter()
            .filter(|e| e.event == AuditEventKind::Opened)
            .collect();
        assert_eq!(opens.len(), 2);
    }

    #[test]
    fn test_mark_delivered_monotonic() {
        let capsule = sealed_capsule(None);

        assert_eq!(
            capsule.mark_delivered(800).unwrap(),
            CapsuleStatus::Delivered
        );
        // Idempotent
        assert_eq!(
            capsule.mark_delivered(900).unwrap(),
            CapsuleStatus::Delivered
        );

        capsule.commit_opened(IdentityId::new("bob"), 2_000).unwrap();
        // Never moves backward
        assert_eq!(capsule.mark_delivered(2_100).unwrap(), CapsuleStatus::Opened);
        assert_eq!(capsule.status(), CapsuleStatus::Opened);
    }

    #[test]
    fn test_expiry_gate() {
        let capsule = sealed_capsule(Some(SelfDestruct::after_seconds(5)));
        let bob = IdentityId::new("bob");

        capsule.check_expired(1_000).unwrap();
        capsule.commit_opened(bob.clone(), 10_000).unwrap();

        // Window still open
        capsule.check_expired(15_000).unwrap();
        capsule.commit_opened(bob.clone(), 15_000).unwrap();

        // Window passed
        assert!(matches!(
            capsule.check_expired(16_001),
            Err(CapsuleError::Expired)
        ));
        assert!(matches!(
            capsule.commit_opened(bob, 16_001),
            Err(CapsuleError::Expired)
        ));
    }

    #[test]
    fn test_denied_attempt_mutates_no_state() {
        let capsule = sealed_capsule(None);

        capsule
            .record_denied_attempt(IdentityId::new("bob"), "pending", "locked until 1000", 700)
            .unwrap();

        assert_eq!(capsule.status(), CapsuleStatus::Scheduled);
        assert_eq!(capsule.first_opened_at(), None);
        let audit = capsule.audit_snapshot();
        assert_eq!(audit.len(), 2);
        assert!(audit[1].is_denied_attempt());
    }

    #[test]
    fn test_purge_after_expiry() {
        let mut capsule = sealed_capsule(Some(SelfDestruct::after_seconds(1)));
        let bob = IdentityId::new("bob");

        capsule.commit_opened(bob, 10_000).unwrap();

        // Not yet expired: nothing purged.
        assert!(!capsule.purge_expired(10_500).unwrap());

        assert!(capsule.purge_expired(12_000).unwrap());
        assert!(capsule.is_purged());
        assert!(capsule.contents()[0].ciphertext.is_empty());
        assert!(capsule.key_slots()[0].wrapped.wrapped_key.is_empty());

        // Purge is recorded and final.
        assert!(!capsule.purge_expired(13_000).unwrap());
        assert!(matches!(
            capsule.check_expired(13_000),
            Err(CapsuleError::Expired)
        ));
    }

    #[test]
    fn test_concurrent_commit_single_transition() {
        use std::sync::Arc;

        let capsule = Arc::new(sealed_capsule(None));
        let mut handles = Vec::new();

        for i in 0..8 {
            let capsule = Arc::clone(&capsule);
            handles.push(std::thread::spawn(move || {
                let opener = IdentityId::new(format!("opener-{i}"));
                capsule.commit_opened(opener, 5_000 + i).unwrap()
            }));
        }

        let commits: Vec<OpenCommit> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        let first_opens = commits.iter().filter(|c| c.first_open).count();
        assert_eq!(first_opens, 1);
        assert_eq!(capsule.status(), CapsuleStatus::Opened);
    }
}
