//! Key wrapping: a content key encrypted for one specific recipient.
//!
//! The wrapper runs once per (recipient, content item) pair; callers budget
//! for the O(recipients x items) cross-product.

use serde::{Deserialize, Serialize};

use crate::agreement::{EphemeralKeyPair, X25519PublicKey, X25519StaticSecret};
use crate::cipher::{ContentKey, ContentNonce};
use crate::error::{CoreError, Result};
use crate::types::IdentityId;

/// Wrapping scheme identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum WrapFormat {
    /// Ephemeral X25519 ECDH, Blake3 KDF, ChaCha20-Poly1305.
    X25519ChaCha20Poly1305 = 1,
}

impl WrapFormat {
    /// Convert to u8 for canonical encoding.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::X25519ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// A content key encrypted for one specific recipient.
///
/// Structurally deterministic, non-deterministic in ciphertext: every wrap
/// uses a fresh ephemeral keypair and nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// The recipient this key is wrapped for.
    pub recipient: IdentityId,

    /// Wrapping scheme used.
    pub format: WrapFormat,

    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used to encrypt the content key.
    pub nonce: ContentNonce,

    /// The content key, encrypted with the derived shared secret.
    pub wrapped_key: Vec<u8>,
}

impl WrappedKey {
    /// Wrap a content key for a recipient.
    ///
    /// `context` binds the wrap to a capsule slot (content index), so a
    /// wrapped key cannot be replayed into a different slot.
    pub fn wrap(
        content_key: &ContentKey,
        recipient: IdentityId,
        recipient_public: &X25519PublicKey,
        context: &[u8],
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient_public);
        let wrap_key = shared.derive_wrap_key(context);

        let nonce = ContentNonce::generate();
        let wrapped_key = wrap_key.encrypt(content_key.as_bytes(), &nonce)?;

        Ok(Self {
            recipient,
            format: WrapFormat::X25519ChaCha20Poly1305,
            ephemeral_public,
            nonce,
            wrapped_key,
        })
    }

    /// Recover the content key using the recipient's agreement secret.
    ///
    /// Fails with [`CoreError::Unauthorized`] when the secret does not
    /// correspond, [`CoreError::CorruptKey`] on malformed input.
    pub fn unwrap_key(
        &self,
        recipient_secret: &X25519StaticSecret,
        context: &[u8],
    ) -> Result<ContentKey> {
        match self.format {
            WrapFormat::X25519ChaCha20Poly1305 => {}
        }

        // Wrapped ciphertext is a 32-byte key plus the 16-byte Poly1305 tag.
        if self.wrapped_key.len() != 48 {
            return Err(CoreError::CorruptKey(format!(
                "wrapped key length {} != 48",
                self.wrapped_key.len()
            )));
        }

        let shared = recipient_secret.diffie_hellman(&self.ephemeral_public);
        let wrap_key = shared.derive_wrap_key(context);

        let key_bytes = wrap_key
            .decrypt(&self.wrapped_key, &self.nonce)
            .map_err(|_| CoreError::Unauthorized)?;

        if key_bytes.len() != 32 {
            return Err(CoreError::CorruptKey(format!(
                "unwrapped key length {} != 32",
                key_bytes.len()
            )));
        }

        let mut arr = [0u8; 32];
        arr.copy_from_slice(&key_bytes);
        Ok(ContentKey::from_bytes(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();

        let content_key = ContentKey::generate().unwrap();

        let wrapped = WrappedKey::wrap(
            &content_key,
            IdentityId::new("alice"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();

        let recovered = wrapped.unwrap_key(&recipient_secret, b"slot-0").unwrap();
        assert_eq!(content_key.as_bytes(), recovered.as_bytes());
    }

    #[test]
    fn test_unwrap_wrong_secret_fails() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();
        let wrong_secret = X25519StaticSecret::generate().unwrap();

        let content_key = ContentKey::generate().unwrap();
        let wrapped = WrappedKey::wrap(
            &content_key,
            IdentityId::new("alice"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();

        assert!(matches!(
            wrapped.unwrap_key(&wrong_secret, b"slot-0"),
            Err(CoreError::Unauthorized)
        ));
    }

    #[test]
    fn test_unwrap_wrong_context_fails() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();

        let content_key = ContentKey::generate().unwrap();
        let wrapped = WrappedKey::wrap(
            &content_key,
            IdentityId::new("alice"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();

        assert!(wrapped.unwrap_key(&recipient_secret, b"slot-1").is_err());
    }

    #[test]
    fn test_tampered_wrapped_key_rejected() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();

        let content_key = ContentKey::generate().unwrap();
        let mut wrapped = WrappedKey::wrap(
            &content_key,
            IdentityId::new("alice"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();

        wrapped.wrapped_key[7] ^= 0x80;

        assert!(wrapped.unwrap_key(&recipient_secret, b"slot-0").is_err());
    }

    #[test]
    fn test_truncated_wrapped_key_is_corrupt() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();

        let content_key = ContentKey::generate().unwrap();
        let mut wrapped = WrappedKey::wrap(
            &content_key,
            IdentityId::new("alice"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();

        wrapped.wrapped_key.truncate(16);

        assert!(matches!(
            wrapped.unwrap_key(&recipient_secret, b"slot-0"),
            Err(CoreError::CorruptKey(_))
        ));
    }

    #[test]
    fn test_wrap_fresh_randomness_per_call() {
        let recipient_secret = X25519StaticSecret::generate().unwrap();
        let recipient_public = recipient_secret.public_key();
        let content_key = ContentKey::generate().unwrap();

        let w1 = WrappedKey::wrap(
            &content_key,
            IdentityId::new("a"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();
        let w2 = WrappedKey::wrap(
            &content_key,
            IdentityId::new("a"),
            &recipient_public,
            b"slot-0",
        )
        .unwrap();

        assert_ne!(w1.ephemeral_public, w2.ephemeral_public);
        assert_ne!(w1.wrapped_key, w2.wrapped_key);
    }
}
