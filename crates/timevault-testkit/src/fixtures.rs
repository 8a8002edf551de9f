//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use timevault::{ContentItem, Recipient, SealRequest, SelfDestruct, Timevault};
use timevault_capsule::Capsule;
use timevault_conditions::DeliveryCondition;
use timevault_core::IdentityId;
use timevault_store::MemoryBlobStore;
use timevault_vault::{IdentityPublicKeys, KeyVault};

/// A test fixture with a two-identity vault and an in-memory blob store.
pub struct TestFixture {
    /// The unified API instance under test.
    pub timevault: Timevault<MemoryBlobStore>,
    /// The sealing identity ("alice").
    pub sealer: IdentityId,
    /// The recipient identity ("bob").
    pub recipient: IdentityId,
    /// Alice's public keys.
    pub sealer_keys: IdentityPublicKeys,
    /// Bob's public keys.
    pub recipient_keys: IdentityPublicKeys,
}

impl TestFixture {
    /// Create a fixture with fresh random keys.
    pub fn new() -> Self {
        let mut vault = KeyVault::new();
        let sealer = IdentityId::new("alice");
        let recipient = IdentityId::new("bob");
        let sealer_keys = vault
            .generate_identity(sealer.clone())
            .expect("fixture keygen");
        let recipient_keys = vault
            .generate_identity(recipient.clone())
            .expect("fixture keygen");

        Self {
            timevault: Timevault::new(vault, MemoryBlobStore::new()),
            sealer,
            recipient,
            sealer_keys,
            recipient_keys,
        }
    }

    /// Create with deterministic keys derived from a seed byte.
    pub fn with_seed(seed: u8) -> Self {
        let mut vault = KeyVault::new();
        let sealer = IdentityId::new("alice");
        let recipient = IdentityId::new("bob");
        let sealer_keys = vault
            .import_identity(sealer.clone(), [seed; 32], [seed.wrapping_add(1); 32])
            .expect("fixture import");
        let recipient_keys = vault
            .import_identity(
                recipient.clone(),
                [seed.wrapping_add(2); 32],
                [seed.wrapping_add(3); 32],
            )
            .expect("fixture import");

        Self {
            timevault: Timevault::new(vault, MemoryBlobStore::new()),
            sealer,
            recipient,
            sealer_keys,
            recipient_keys,
        }
    }

    /// The recipient as a seal-request record.
    pub fn recipient_record(&self) -> Recipient {
        Recipient::new(self.recipient.clone(), self.recipient_keys.agreement)
    }

    /// Seal a single text item for the fixture recipient.
    pub fn seal_text(
        &self,
        text: &str,
        conditions: Vec<DeliveryCondition>,
        now: i64,
    ) -> Capsule {
        self.seal_items(vec![ContentItem::text(text)], conditions, None, now)
    }

    /// Seal arbitrary items for the fixture recipient.
    pub fn seal_items(
        &self,
        items: Vec<ContentItem>,
        conditions: Vec<DeliveryCondition>,
        self_destruct: Option<SelfDestruct>,
        now: i64,
    ) -> Capsule {
        self.timevault
            .seal(SealRequest {
                sealed_by: self.sealer.clone(),
                items,
                recipients: vec![self.recipient_record()],
                conditions,
                self_destruct,
                now,
            })
            .expect("fixture seal")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timevault::OpenOutcome;
    use timevault_conditions::Evidence;

    #[test]
    fn test_fixture_seal_and_open() {
        let fixture = TestFixture::new();
        let capsule = fixture.seal_text("fixture works", vec![], 1_000);

        let outcome = fixture
            .timevault
            .attempt_open(&capsule, &fixture.recipient, &Evidence::at(2_000))
            .unwrap();

        match outcome {
            OpenOutcome::Opened { items, .. } => {
                assert_eq!(items[0].plaintext, b"fixture works");
            }
            OpenOutcome::Denied(d) => panic!("unexpected denial: {d:?}"),
        }
    }

    #[test]
    fn test_seeded_fixture_deterministic_keys() {
        let f1 = TestFixture::with_seed(0x42);
        let f2 = TestFixture::with_seed(0x42);
        assert_eq!(f1.recipient_keys, f2.recipient_keys);
        assert_eq!(f1.sealer_keys, f2.sealer_keys);
    }
}
