//! X25519 key agreement for recipient key wrapping.
//!
//! Every wrap operation uses a fresh ephemeral keypair, so two wraps of the
//! same content key never share ciphertext.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::cipher::ContentKey;
use crate::error::{CoreError, Result};

/// An X25519 public key (32 bytes).
///
/// This is a recipient's externally visible agreement credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to x25519-dalek PublicKey.
    pub fn to_dalek(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static agreement secret.
///
/// Only for key agreement, never signing. Held by the key vault; zeroized
/// on drop by the underlying dalek type.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    ///
    /// Entropy failures surface as [`CoreError::KeyGeneration`].
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CoreError::KeyGeneration(e.to_string()))?;
        Ok(Self(StaticSecret::from(bytes)))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Clone)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a key-wrapping key from this shared secret.
    ///
    /// Blake3 derive_key gives domain separation; `context` binds the
    /// wrapping key to a specific capsule slot.
    pub fn derive_wrap_key(&self, context: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key("timevault-v0-key-wrap");
        hasher.update(&self.0);
        hasher.update(context);
        ContentKey::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_key_agreement() {
        let alice_secret = X25519StaticSecret::generate().unwrap();
        let alice_public = alice_secret.public_key();

        let bob_secret = X25519StaticSecret::generate().unwrap();
        let bob_public = bob_secret.public_key();

        let alice_shared = alice_secret.diffie_hellman(&bob_public);
        let bob_shared = bob_secret.diffie_hellman(&alice_public);

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_ephemeral_key_agreement() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();

        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let sender_shared = ephemeral.diffie_hellman(&recipient_public);
        let recipient_shared = recipient_secret.diffie_hellman(&ephemeral_public);

        assert_eq!(sender_shared.as_bytes(), recipient_shared.as_bytes());
    }

    #[test]
    fn test_wrap_key_derivation_deterministic() {
        let shared = SharedKey([0x42; 32]);

        let k1 = shared.derive_wrap_key(b"slot-0");
        let k2 = shared.derive_wrap_key(b"slot-0");
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_wrap_key_derivation_context_separated() {
        let shared = SharedKey([0x42; 32]);

        let k1 = shared.derive_wrap_key(b"slot-0");
        let k2 = shared.derive_wrap_key(b"slot-1");
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }
}
