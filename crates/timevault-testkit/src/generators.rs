//! Proptest generators for property-based testing.

use proptest::prelude::*;

use timevault::ContentItem;
use timevault_conditions::{BiometricKind, DeliveryCondition};
use timevault_core::{CapsuleId, ContentKind, ContentMetadata, IdentityId};

/// Generate an identity ID.
pub fn identity_id() -> impl Strategy<Value = IdentityId> {
    "[a-z][a-z0-9-]{2,15}".prop_map(IdentityId::new)
}

/// Generate a random CapsuleId.
pub fn capsule_id() -> impl Strategy<Value = CapsuleId> {
    any::<[u8; 32]>().prop_map(CapsuleId::from_bytes)
}

/// Generate a content kind.
pub fn content_kind() -> impl Strategy<Value = ContentKind> {
    prop_oneof![
        Just(ContentKind::Text),
        Just(ContentKind::Image),
        Just(ContentKind::Video),
        Just(ContentKind::Audio),
        Just(ContentKind::File),
    ]
}

/// Generate optional content metadata.
pub fn content_metadata() -> impl Strategy<Value = Option<ContentMetadata>> {
    proptest::option::of(("[a-z]{1,12}\\.bin", proptest::option::of("[a-z]+/[a-z]+")).prop_map(
        |(filename, mime_type)| ContentMetadata {
            filename: Some(filename),
            mime_type,
        },
    ))
}

/// Generate a content item with payload up to `max_len` bytes.
pub fn content_item(max_len: usize) -> impl Strategy<Value = ContentItem> {
    (
        content_kind(),
        prop::collection::vec(any::<u8>(), 0..=max_len),
        content_metadata(),
    )
        .prop_map(|(kind, data, metadata)| ContentItem {
            kind,
            data,
            metadata,
        })
}

/// Generate a reasonable timestamp (Unix ms).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000 // through 2100
}

/// Generate a biometric kind.
pub fn biometric_kind() -> impl Strategy<Value = BiometricKind> {
    prop_oneof![
        Just(BiometricKind::Fingerprint),
        Just(BiometricKind::Face),
        Just(BiometricKind::Voice),
    ]
}

/// Generate a delivery condition.
///
/// Passwords are excluded: hashing one per proptest case would dominate
/// the run time. Use [`DeliveryCondition::password`] directly in targeted
/// tests.
pub fn condition() -> impl Strategy<Value = DeliveryCondition> {
    prop_oneof![
        timestamp().prop_map(DeliveryCondition::date),
        (
            -90_000_000i64..=90_000_000,
            -180_000_000i64..=180_000_000,
            1u32..=100_000,
        )
            .prop_map(|(latitude_udeg, longitude_udeg, radius_m)| {
                DeliveryCondition::Location {
                    latitude_udeg,
                    longitude_udeg,
                    radius_m,
                }
            }),
        "[a-z]{1,16}".prop_map(DeliveryCondition::event),
        biometric_kind().prop_map(DeliveryCondition::biometric),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestFixture;
    use timevault::OpenOutcome;
    use timevault_capsule::Capsule;
    use timevault_conditions::Evidence;

    proptest! {
        // Sealing keeps its promises for any content: the recipient gets
        // the exact plaintext back once conditions trivially hold.
        #[test]
        fn prop_seal_open_roundtrip(
            items in prop::collection::vec(content_item(128), 1..4),
            now in timestamp(),
        ) {
            let fixture = TestFixture::with_seed(0x07);
            let plaintexts: Vec<Vec<u8>> = items.iter().map(|i| i.data.clone()).collect();

            let capsule = fixture.seal_items(items, vec![], None, now);

            let outcome = fixture
                .timevault
                .attempt_open(&capsule, &fixture.recipient, &Evidence::at(now))
                .unwrap();

            match outcome {
                OpenOutcome::Opened { items, .. } => {
                    let recovered: Vec<Vec<u8>> =
                        items.into_iter().map(|i| i.plaintext).collect();
                    prop_assert_eq!(recovered, plaintexts);
                }
                OpenOutcome::Denied(d) => prop_assert!(false, "unexpected denial: {:?}", d),
            }
        }

        // Serialized capsules survive the blob codec for any condition mix.
        #[test]
        fn prop_codec_roundtrip_any_conditions(
            conditions in prop::collection::vec(condition(), 0..5),
            now in timestamp(),
        ) {
            let fixture = TestFixture::with_seed(0x09);
            let capsule = fixture.seal_text("payload", conditions, now);

            let restored = Capsule::from_bytes(&capsule.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(restored.id(), capsule.id());
            prop_assert_eq!(restored.conditions(), capsule.conditions());
        }
    }
}
