//! The key vault: a scoped secret store for identity key material.

use std::collections::HashMap;

use zeroize::Zeroize;

use timevault_core::{
    ContentKey, Ed25519Keypair, Ed25519PublicKey, Ed25519Signature, IdentityId, WrappedKey,
    X25519PublicKey, X25519StaticSecret,
};

use crate::error::{Result, VaultError};

/// The externally visible credentials of a vault identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityPublicKeys {
    /// Ed25519 key for signature verification.
    pub signing: Ed25519PublicKey,

    /// X25519 key for key wrapping.
    pub agreement: X25519PublicKey,
}

/// Secret key material for one identity.
///
/// Both dalek secret types zeroize themselves on drop.
struct IdentityKeys {
    signing: Ed25519Keypair,
    agreement: X25519StaticSecret,
}

/// The key vault.
///
/// Owns one signing keypair and one agreement secret per identity. Secrets
/// never leave the vault; callers get signatures and unwrapped content keys,
/// not key bytes.
#[derive(Default)]
pub struct KeyVault {
    keys: HashMap<IdentityId, IdentityKeys>,
}

impl KeyVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate fresh key material for an identity.
    ///
    /// Fails with [`VaultError::IdentityExists`] if the identity is already
    /// provisioned, and surfaces entropy failures as key-generation errors.
    pub fn generate_identity(&mut self, id: IdentityId) -> Result<IdentityPublicKeys> {
        if self.keys.contains_key(&id) {
            return Err(VaultError::IdentityExists(id));
        }

        let signing = Ed25519Keypair::generate()?;
        let agreement = X25519StaticSecret::generate()?;
        let public = IdentityPublicKeys {
            signing: signing.public_key(),
            agreement: agreement.public_key(),
        };

        self.keys.insert(id, IdentityKeys { signing, agreement });
        Ok(public)
    }

    /// Import key material from seeds (restore / deterministic tests).
    ///
    /// The seed copies are cleared before returning.
    pub fn import_identity(
        &mut self,
        id: IdentityId,
        mut signing_seed: [u8; 32],
        mut agreement_seed: [u8; 32],
    ) -> Result<IdentityPublicKeys> {
        if self.keys.contains_key(&id) {
            signing_seed.zeroize();
            agreement_seed.zeroize();
            return Err(VaultError::IdentityExists(id));
        }

        let signing = Ed25519Keypair::from_seed(&signing_seed);
        let agreement = X25519StaticSecret::from_bytes(agreement_seed);
        signing_seed.zeroize();
        agreement_seed.zeroize();

        let public = IdentityPublicKeys {
            signing: signing.public_key(),
            agreement: agreement.public_key(),
        };

        self.keys.insert(id, IdentityKeys { signing, agreement });
        Ok(public)
    }

    /// Get the public keys for an identity.
    pub fn public_keys(&self, id: &IdentityId) -> Result<IdentityPublicKeys> {
        let keys = self.get(id)?;
        Ok(IdentityPublicKeys {
            signing: keys.signing.public_key(),
            agreement: keys.agreement.public_key(),
        })
    }

    /// Sign a message with an identity's signing key.
    pub fn sign(&self, id: &IdentityId, message: &[u8]) -> Result<Ed25519Signature> {
        Ok(self.get(id)?.signing.sign(message))
    }

    /// Recover a content key from a wrapped key addressed to `id`.
    ///
    /// Refuses keys addressed to someone else, even if they would unwrap.
    pub fn unwrap_content_key(
        &self,
        id: &IdentityId,
        wrapped: &WrappedKey,
        context: &[u8],
    ) -> Result<ContentKey> {
        if &wrapped.recipient != id {
            return Err(VaultError::UnknownIdentity(wrapped.recipient.clone()));
        }

        let keys = self.get(id)?;
        Ok(wrapped.unwrap_key(&keys.agreement, context)?)
    }

    /// Check whether the vault holds keys for an identity.
    pub fn contains(&self, id: &IdentityId) -> bool {
        self.keys.contains_key(id)
    }

    /// Number of provisioned identities.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the vault is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Tear the vault down, dropping (and thereby zeroizing) all secrets.
    pub fn teardown(mut self) {
        self.keys.clear();
    }

    fn get(&self, id: &IdentityId) -> Result<&IdentityKeys> {
        self.keys
            .get(id)
            .ok_or_else(|| VaultError::UnknownIdentity(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timevault_core::CoreError;

    #[test]
    fn test_generate_and_lookup() {
        let mut vault = KeyVault::new();
        let alice = IdentityId::new("alice");

        let public = vault.generate_identity(alice.clone()).unwrap();
        assert_eq!(vault.public_keys(&alice).unwrap(), public);
        assert!(vault.contains(&alice));
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut vault = KeyVault::new();
        let alice = IdentityId::new("alice");

        vault.generate_identity(alice.clone()).unwrap();
        assert!(matches!(
            vault.generate_identity(alice),
            Err(VaultError::IdentityExists(_))
        ));
    }

    #[test]
    fn test_unknown_identity() {
        let vault = KeyVault::new();
        assert!(matches!(
            vault.public_keys(&IdentityId::new("ghost")),
            Err(VaultError::UnknownIdentity(_))
        ));
    }

    #[test]
    fn test_sign_verifies_under_published_key() {
        let mut vault = KeyVault::new();
        let alice = IdentityId::new("alice");
        let public = vault.generate_identity(alice.clone()).unwrap();

        let sig = vault.sign(&alice, b"attest").unwrap();
        public.signing.verify(b"attest", &sig).unwrap();
    }

    #[test]
    fn test_import_deterministic() {
        let mut v1 = KeyVault::new();
        let mut v2 = KeyVault::new();

        let p1 = v1
            .import_identity(IdentityId::new("a"), [0x11; 32], [0x22; 32])
            .unwrap();
        let p2 = v2
            .import_identity(IdentityId::new("a"), [0x11; 32], [0x22; 32])
            .unwrap();

        assert_eq!(p1, p2);
    }

    #[test]
    fn test_unwrap_roundtrip_through_vault() {
        let mut vault = KeyVault::new();
        let bob = IdentityId::new("bob");
        let public = vault.generate_identity(bob.clone()).unwrap();

        let content_key = ContentKey::generate().unwrap();
        let wrapped =
            WrappedKey::wrap(&content_key, bob.clone(), &public.agreement, b"slot-0").unwrap();

        let recovered = vault.unwrap_content_key(&bob, &wrapped, b"slot-0").unwrap();
        assert_eq!(recovered.as_bytes(), content_key.as_bytes());
    }

    #[test]
    fn test_unwrap_refuses_misaddressed_key() {
        let mut vault = KeyVault::new();
        let bob = IdentityId::new("bob");
        let carol = IdentityId::new("carol");
        let bob_public = vault.generate_identity(bob.clone()).unwrap();
        vault.generate_identity(carol.clone()).unwrap();

        let content_key = ContentKey::generate().unwrap();
        // Wrapped for bob's key but labeled for bob; carol must not unwrap it.
        let wrapped =
            WrappedKey::wrap(&content_key, bob, &bob_public.agreement, b"slot-0").unwrap();

        assert!(vault
            .unwrap_content_key(&carol, &wrapped, b"slot-0")
            .is_err());
    }

    #[test]
    fn test_unwrap_wrong_vault_is_unauthorized() {
        let mut sender_view = KeyVault::new();
        let bob = IdentityId::new("bob");
        let bob_public = sender_view.generate_identity(bob.clone()).unwrap();

        // A different vault claims the same identity label with other keys.
        let mut impostor = KeyVault::new();
        impostor.generate_identity(bob.clone()).unwrap();

        let content_key = ContentKey::generate().unwrap();
        let wrapped =
            WrappedKey::wrap(&content_key, bob.clone(), &bob_public.agreement, b"slot-0").unwrap();

        assert!(matches!(
            impostor.unwrap_content_key(&bob, &wrapped, b"slot-0"),
            Err(VaultError::Core(CoreError::Unauthorized))
        ));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_import_deterministic(
            signing_seed in any::<[u8; 32]>(),
            agreement_seed in any::<[u8; 32]>(),
        ) {
            let mut v1 = KeyVault::new();
            let mut v2 = KeyVault::new();

            let p1 = v1
                .import_identity(IdentityId::new("a"), signing_seed, agreement_seed)
                .unwrap();
            let p2 = v2
                .import_identity(IdentityId::new("a"), signing_seed, agreement_seed)
                .unwrap();

            prop_assert_eq!(p1, p2);
        }
    }
}
