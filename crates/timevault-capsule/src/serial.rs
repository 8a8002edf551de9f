//! Capsule codec for the opaque blob store.
//!
//! The record is plain CBOR (ciborium/serde); decoding re-verifies both the
//! audit hash chain and the capsule's content-address, so a tampered blob is
//! rejected before any crypto work.

use serde::{Deserialize, Serialize};

use timevault_conditions::DeliveryCondition;
use timevault_core::{CapsuleId, EncryptedContent, IdentityId};

use crate::audit::{AuditEntry, AuditLog};
use crate::canonical::derive_capsule_id;
use crate::capsule::{Capsule, KeySlot, Lifecycle, SealedParts};
use crate::error::{CapsuleError, Result};
use crate::status::{CapsuleStatus, SelfDestruct};

/// The stored form of a capsule.
#[derive(Serialize, Deserialize)]
struct CapsuleRecord {
    id: CapsuleId,
    created_at: i64,
    sealed_by: IdentityId,
    contents: Vec<EncryptedContent>,
    key_slots: Vec<KeySlot>,
    conditions: Vec<DeliveryCondition>,
    self_destruct: Option<SelfDestruct>,
    status: CapsuleStatus,
    first_opened_at: Option<i64>,
    purged: bool,
    audit: Vec<AuditEntry>,
}

impl Capsule {
    /// Serialize to CBOR bytes for the blob store.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let record = CapsuleRecord {
            id: self.id(),
            created_at: self.created_at(),
            sealed_by: self.sealed_by().clone(),
            contents: self.contents().to_vec(),
            key_slots: self.key_slots().to_vec(),
            conditions: self.conditions().to_vec(),
            self_destruct: self.self_destruct().copied(),
            status: self.status(),
            first_opened_at: self.first_opened_at(),
            purged: self.is_purged(),
            audit: self.audit_snapshot(),
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&record, &mut buf)
            .map_err(|e| CapsuleError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from blob-store bytes.
    ///
    /// Verifies the audit chain and, unless the content was purged,
    /// recomputes the content-address; a mismatch is tamper evidence.
    pub fn from_bytes(bytes: &[u8]) -> Result<Capsule> {
        let record: CapsuleRecord = ciborium::from_reader(bytes)
            .map_err(|e| CapsuleError::Decoding(e.to_string()))?;

        let audit = AuditLog::from_entries(record.audit)?;

        if record.status == CapsuleStatus::Opened && record.first_opened_at.is_none() {
            return Err(CapsuleError::MalformedRecord(
                "opened capsule without first_opened_at".into(),
            ));
        }
        if record.status == CapsuleStatus::Draft {
            return Err(CapsuleError::MalformedRecord(
                "stored capsule cannot be a draft".into(),
            ));
        }

        if !record.purged {
            let actual = derive_capsule_id(&SealedParts {
                created_at: record.created_at,
                sealed_by: &record.sealed_by,
                contents: &record.contents,
                key_slots: &record.key_slots,
                conditions: &record.conditions,
                self_destruct: record.self_destruct.as_ref(),
            });
            if actual != record.id {
                return Err(CapsuleError::IdMismatch {
                    expected: record.id,
                    actual,
                });
            }
        }

        Ok(Capsule::from_record_parts(
            record.id,
            record.created_at,
            record.sealed_by,
            record.contents,
            record.key_slots,
            record.conditions,
            record.self_destruct,
            Lifecycle {
                status: record.status,
                first_opened_at: record.first_opened_at,
                purged: record.purged,
                audit,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::slot_context;
    use timevault_core::{ContentKey, ContentKind, WrappedKey, X25519StaticSecret};

    fn sealed_capsule() -> Capsule {
        let key = ContentKey::generate().unwrap();
        let content =
            EncryptedContent::seal(ContentKind::Text, b"hello future", &key, None).unwrap();

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
            Some(SelfDestruct::after_seconds(60)),
            500,
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_preserves_capsule() {
        let capsule = sealed_capsule();
        let bytes = capsule.to_bytes().unwrap();
        let restored = Capsule::from_bytes(&bytes).unwrap();

        assert_eq!(restored.id(), capsule.id());
        assert_eq!(restored.status(), capsule.status());
        assert_eq!(restored.contents(), capsule.contents());
        assert_eq!(restored.key_slots(), capsule.key_slots());
        assert_eq!(restored.conditions(), capsule.conditions());
        assert_eq!(restored.audit_snapshot(), capsule.audit_snapshot());
    }

    #[test]
    fn test_roundtrip_preserves_lifecycle() {
        let capsule = sealed_capsule();
        capsule
            .commit_opened(IdentityId::new("bob"), 2_000)
            .unwrap();

        let restored = Capsule::from_bytes(&capsule.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.status(), CapsuleStatus::Opened);
        assert_eq!(restored.first_opened_at(), Some(2_000));
    }

    #[test]
    fn test_tampered_record_rejected() {
        let capsule = sealed_capsule();
        let bytes = capsule.to_bytes().unwrap();

        // Flip a bit inside the stored content-address.
        let mut tampered = bytes.clone();
        tampered[16] ^= 0x01;
        assert!(Capsule::from_bytes(&tampered).is_err());

        // Flip a bit inside the trailing audit entry hash.
        let mut tampered = bytes.clone();
        let last = tampered.len() - 10;
        tampered[last] ^= 0x01;
        assert!(Capsule::from_bytes(&tampered).is_err());
    }

    #[test]
    fn test_truncated_record_rejected() {
        let capsule = sealed_capsule();
        let bytes = capsule.to_bytes().unwrap();
        assert!(Capsule::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_roundtrip_any_payload(payload in prop::collection::vec(any::<u8>(), 0..256)) {
            let key = ContentKey::generate().unwrap();
            let content =
                EncryptedContent::seal(ContentKind::File, &payload, &key, None).unwrap();

            let secret = X25519StaticSecret::from_bytes([0x33; 32]);
            let wrapped = WrappedKey::wrap(
                &key,
                IdentityId::new("bob"),
                &secret.public_key(),
                &slot_context(0),
            )
            .unwrap();

            let capsule = Capsule::new_sealed(
                IdentityId::new("alice"),
                vec![content],
                vec![KeySlot { content_index: 0, wrapped }],
                vec![],
                None,
                100,
            )
            .unwrap();

            let restored = Capsule::from_bytes(&capsule.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(restored.id(), capsule.id());
            prop_assert_eq!(restored.contents(), capsule.contents());
        }
    }
}
