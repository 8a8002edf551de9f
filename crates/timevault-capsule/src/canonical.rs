//! Canonical CBOR encoding for a capsule's sealed parts.
//!
//! Implements RFC 8949 Core Deterministic Encoding over the subset the
//! capsule needs: integer map keys, smallest-integer encoding, definite
//! lengths, no floats (coordinates are micro-degree integers). The same
//! sealed parts produce identical bytes on every platform, so the Blake3
//! hash of this encoding is the capsule's content-address.

use timevault_conditions::DeliveryCondition;
use timevault_core::{Blake3Hash, CapsuleId, ContentMetadata, EncryptedContent};

use crate::capsule::{KeySlot, SealedParts};
use crate::status::SelfDestruct;

/// Top-level field keys (0-23 encode as single bytes in CBOR).
mod keys {
    pub const CREATED_AT: u64 = 0;
    pub const SEALED_BY: u64 = 1;
    pub const CONTENTS: u64 = 2;
    pub const KEY_SLOTS: u64 = 3;
    pub const CONDITIONS: u64 = 4;
    pub const SELF_DESTRUCT: u64 = 5;
}

/// Condition kind tags in the canonical form.
mod condition_tags {
    pub const DATE: u64 = 1;
    pub const LOCATION: u64 = 2;
    pub const EVENT: u64 = 3;
    pub const PASSWORD: u64 = 4;
    pub const BIOMETRIC: u64 = 5;
}

/// The CBOR subset the canonical form uses.
enum Value {
    Int(i64),
    Uint(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    /// Integer-keyed map; keys are sorted before encoding.
    Map(Vec<(u64, Value)>),
    Null,
}

/// Encode sealed parts to canonical bytes.
pub fn canonical_sealed_bytes(parts: &SealedParts<'_>) -> Vec<u8> {
    let value = sealed_parts_to_value(parts);
    let mut buf = Vec::new();
    encode_value(&mut buf, &value);
    buf
}

/// Derive the capsule's content-address from its sealed parts.
pub fn derive_capsule_id(parts: &SealedParts<'_>) -> CapsuleId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"timevault-capsule-v0:");
    hasher.update(&canonical_sealed_bytes(parts));
    CapsuleId(*hasher.finalize().as_bytes())
}

/// Hash of the canonical sealed bytes, for external attestation.
pub(crate) fn sealed_parts_hash(parts: &SealedParts<'_>) -> Blake3Hash {
    Blake3Hash::hash(&canonical_sealed_bytes(parts))
}

fn sealed_parts_to_value(parts: &SealedParts<'_>) -> Value {
    let contents = parts.contents.iter().map(content_to_value).collect();
    let slots = parts.key_slots.iter().map(slot_to_value).collect();
    let conditions = parts.conditions.iter().map(condition_to_value).collect();

    Value::Map(vec![
        (keys::CREATED_AT, Value::Int(parts.created_at)),
        (keys::SEALED_BY, Value::Text(parts.sealed_by.as_str().into())),
        (keys::CONTENTS, Value::Array(contents)),
        (keys::KEY_SLOTS, Value::Array(slots)),
        (keys::CONDITIONS, Value::Array(conditions)),
        (keys::SELF_DESTRUCT, self_destruct_to_value(parts.self_destruct)),
    ])
}

fn content_to_value(content: &EncryptedContent) -> Value {
    Value::Map(vec![
        (0, Value::Uint(u64::from(content.kind.to_u8()))),
        (1, Value::Uint(u64::from(content.format.to_u8()))),
        (2, Value::Bytes(content.nonce.as_bytes().to_vec())),
        (3, Value::Bytes(content.ciphertext.clone())),
        (4, metadata_to_value(content.metadata.as_ref())),
    ])
}

fn metadata_to_value(metadata: Option<&ContentMetadata>) -> Value {
    match metadata {
        Some(m) => Value::Map(vec![
            (0, opt_text(m.filename.as_deref())),
            (1, opt_text(m.mime_type.as_deref())),
        ]),
        None => Value::Null,
    }
}

fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(s) => Value::Text(s.into()),
        None => Value::Null,
    }
}

fn slot_to_value(slot: &KeySlot) -> Value {
    Value::Map(vec![
        (0, Value::Uint(u64::from(slot.content_index))),
        (1, Value::Text(slot.wrapped.recipient.as_str().into())),
        (2, Value::Uint(u64::from(slot.wrapped.format.to_u8()))),
        (3, Value::Bytes(slot.wrapped.ephemeral_public.as_bytes().to_vec())),
        (4, Value::Bytes(slot.wrapped.nonce.as_bytes().to_vec())),
        (5, Value::Bytes(slot.wrapped.wrapped_key.clone())),
    ])
}

fn condition_to_value(condition: &DeliveryCondition) -> Value {
    match condition {
        DeliveryCondition::Date { unlock_at } => Value::Map(vec![
            (0, Value::Uint(condition_tags::DATE)),
            (1, Value::Int(*unlock_at)),
        ]),
        DeliveryCondition::Location {
            latitude_udeg,
            longitude_udeg,
            radius_m,
        } => Value::Map(vec![
            (0, Value::Uint(condition_tags::LOCATION)),
            (1, Value::Int(*latitude_udeg)),
            (2, Value::Int(*longitude_udeg)),
            (3, Value::Uint(u64::from(*radius_m))),
        ]),
        DeliveryCondition::Event { name } => Value::Map(vec![
            (0, Value::Uint(condition_tags::EVENT)),
            (1, Value::Text(name.clone())),
        ]),
        DeliveryCondition::Password { phc_hash } => Value::Map(vec![
            (0, Value::Uint(condition_tags::PASSWORD)),
            (1, Value::Text(phc_hash.clone())),
        ]),
        DeliveryCondition::Biometric { kind } => Value::Map(vec![
            (0, Value::Uint(condition_tags::BIOMETRIC)),
            (1, Value::Uint(u64::from(kind.to_u8()))),
        ]),
    }
}

fn self_destruct_to_value(sd: Option<&SelfDestruct>) -> Value {
    match sd {
        Some(sd) => Value::Map(vec![(0, Value::Uint(sd.delay_seconds))]),
        None => Value::Null,
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Encoder
// ─────────────────────────────────────────────────────────────────────────

fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Uint(n) => encode_head(buf, 0, *n),
        Value::Int(n) => encode_int(buf, *n),
        Value::Bytes(b) => {
            encode_head(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_head(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            encode_head(buf, 4, items.len() as u64);
            for item in items {
                encode_value(buf, item);
            }
        }
        Value::Map(entries) => encode_map(buf, entries),
        Value::Null => buf.push(0xf6),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_head(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_head(buf, 1, (-1 - n) as u64);
    }
}

/// Encode a CBOR head with the smallest valid argument encoding.
fn encode_head(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode an integer-keyed map with keys in ascending order.
///
/// For unsigned integer keys, numeric order equals encoded-byte order, so
/// this satisfies the deterministic-encoding key sort.
fn encode_map(buf: &mut Vec<u8>, entries: &[(u64, Value)]) {
    let mut sorted: Vec<&(u64, Value)> = entries.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    encode_head(buf, 5, sorted.len() as u64);
    for (key, value) in sorted {
        encode_head(buf, 0, *key);
        encode_value(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timevault_core::{
        ContentKey, ContentKind, IdentityId, WrappedKey, X25519StaticSecret,
    };

    fn sample_parts() -> (Vec<EncryptedContent>, Vec<KeySlot>, Vec<DeliveryCondition>) {
        let key = ContentKey::from_bytes([0x11; 32]);
        let content =
            EncryptedContent::seal(ContentKind::Text, b"hello", &key, None).unwrap();

        let secret = X25519StaticSecret::from_bytes([0x22; 32]);
        let wrapped = WrappedKey::wrap(
            &key,
            IdentityId::new("alice"),
            &secret.public_key(),
            b"\x00\x00\x00\x00",
        )
        .unwrap();

        (
            vec![content],
            vec![KeySlot {
                content_index: 0,
                wrapped,
            }],
            vec![DeliveryCondition::date(1_900_000_000_000)],
        )
    }

    #[test]
    fn test_canonical_bytes_deterministic() {
        let (contents, slots, conditions) = sample_parts();
        let sealed_by = IdentityId::new("alice");
        let parts = SealedParts {
            created_at: 1_700_000_000_000,
            sealed_by: &sealed_by,
            contents: &contents,
            key_slots: &slots,
            conditions: &conditions,
            self_destruct: None,
        };

        assert_eq!(canonical_sealed_bytes(&parts), canonical_sealed_bytes(&parts));
        assert_eq!(derive_capsule_id(&parts), derive_capsule_id(&parts));
    }

    #[test]
    fn test_id_changes_with_any_sealed_part() {
        let (contents, slots, conditions) = sample_parts();
        let sealed_by = IdentityId::new("alice");
        let base = SealedParts {
            created_at: 1_700_000_000_000,
            sealed_by: &sealed_by,
            contents: &contents,
            key_slots: &slots,
            conditions: &conditions,
            self_destruct: None,
        };
        let base_id = derive_capsule_id(&base);

        // Different creation time
        let shifted = SealedParts {
            created_at: 1_700_000_000_001,
            ..base
        };
        assert_ne!(derive_capsule_id(&shifted), base_id);

        // Different self-destruct
        let sd = SelfDestruct::after_seconds(60);
        let with_sd = SealedParts {
            self_destruct: Some(&sd),
            ..base
        };
        assert_ne!(derive_capsule_id(&with_sd), base_id);

        // Tampered ciphertext
        let mut tampered = contents.clone();
        tampered[0].ciphertext[0] ^= 1;
        let with_tamper = SealedParts {
            contents: &tampered,
            ..base
        };
        assert_ne!(derive_capsule_id(&with_tamper), base_id);
    }

    #[test]
    fn test_smallest_int_encoding() {
        let mut buf = Vec::new();
        encode_head(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_head(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_head(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_head(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_negative_int_encoding() {
        let mut buf = Vec::new();
        encode_int(&mut buf, -1);
        assert_eq!(buf, vec![0x20]);

        buf.clear();
        encode_int(&mut buf, -25);
        assert_eq!(buf, vec![0x38, 24]);
    }

    #[test]
    fn test_map_keys_sorted() {
        let mut buf = Vec::new();
        let entries = vec![
            (5u64, Value::Uint(50)),
            (0u64, Value::Uint(0)),
            (8u64, Value::Uint(80)),
        ];
        encode_map(&mut buf, &entries);

        // Map header (3 entries), then keys in order 0, 5, 8.
        assert_eq!(buf[0], 0xa3);
        assert_eq!(buf[1], 0x00);
        assert_eq!(buf[3], 0x05);
        assert_eq!(buf[6], 0x08);
    }
}
