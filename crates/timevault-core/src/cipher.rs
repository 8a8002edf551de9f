//! The content cipher: authenticated symmetric encryption of payload bytes.
//!
//! Each content item is sealed under its own one-time [`ContentKey`] with a
//! fresh random nonce. Tampering is detected, not just reversed: a failed
//! authentication tag rejects the whole ciphertext.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CoreError, Result};
use crate::types::{ContentKind, ContentMetadata};

/// A 256-bit one-time symmetric key for a single content item.
///
/// Exists only transiently during seal/open; zeroized on drop and never
/// serialized.
#[derive(Clone)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Generate a new random key.
    ///
    /// Entropy failures surface as [`CoreError::KeyGeneration`].
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CoreError::KeyGeneration(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &ContentNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CoreError::Encryption(e.to_string()))
    }

    /// Decrypt data with this key.
    ///
    /// Fails closed with [`CoreError::Integrity`] if the authentication tag
    /// does not verify; no partial plaintext is released.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &ContentNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CoreError::Integrity)
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
///
/// Fresh-random per encryption; a content key never encrypts twice, so a
/// nonce is never reused under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNonce(pub [u8; 12]);

impl ContentNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Cipher identifier for sealed content.
///
/// Recorded on every ciphertext so the primitive choice is data, not an
/// assumption baked into readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CipherFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

impl CipherFormat {
    /// Convert to u8 for canonical encoding.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// An authenticated-encrypted content item.
///
/// Produced once at seal time, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContent {
    /// How the plaintext is interpreted once decrypted.
    pub kind: ContentKind,

    /// Cipher used to seal this item.
    pub format: CipherFormat,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: ContentNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,

    /// Optional descriptive metadata (not encrypted).
    pub metadata: Option<ContentMetadata>,
}

impl EncryptedContent {
    /// Seal plaintext under the given one-time key.
    ///
    /// Generates a fresh random nonce for this operation.
    pub fn seal(
        kind: ContentKind,
        plaintext: &[u8],
        key: &ContentKey,
        metadata: Option<ContentMetadata>,
    ) -> Result<Self> {
        let nonce = ContentNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            kind,
            format: CipherFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
            metadata,
        })
    }

    /// Open the ciphertext with the given key.
    pub fn open(&self, key: &ContentKey) -> Result<Vec<u8>> {
        match self.format {
            CipherFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }

    /// Get the size of the ciphertext.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = ContentKey::generate().unwrap();
        let plaintext = b"dear future self";

        let sealed = EncryptedContent::seal(ContentKind::Text, plaintext, &key, None).unwrap();
        assert_ne!(sealed.ciphertext, plaintext);

        let opened = sealed.open(&key).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let key1 = ContentKey::generate().unwrap();
        let key2 = ContentKey::generate().unwrap();

        let sealed = EncryptedContent::seal(ContentKind::Text, b"secret", &key1, None).unwrap();

        assert!(matches!(sealed.open(&key2), Err(CoreError::Integrity)));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = ContentKey::generate().unwrap();
        let mut sealed =
            EncryptedContent::seal(ContentKind::File, b"payload bytes", &key, None).unwrap();

        // Flip one bit
        sealed.ciphertext[0] ^= 0x01;

        assert!(matches!(sealed.open(&key), Err(CoreError::Integrity)));
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = ContentKey::generate().unwrap();
        let a = EncryptedContent::seal(ContentKind::Text, b"x", &key, None).unwrap();
        let b = EncryptedContent::seal(ContentKind::Text, b"x", &key, None).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_metadata_preserved() {
        let key = ContentKey::generate().unwrap();
        let meta = ContentMetadata {
            filename: Some("letter.txt".into()),
            mime_type: Some("text/plain".into()),
        };
        let sealed =
            EncryptedContent::seal(ContentKind::Text, b"hi", &key, Some(meta.clone())).unwrap();
        assert_eq!(sealed.metadata, Some(meta));
    }
}
