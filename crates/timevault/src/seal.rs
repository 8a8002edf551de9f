//! The capsule sealer.
//!
//! Sealing is atomic all-or-nothing: a wrapping failure for any single
//! recipient aborts the whole seal, and every generated content key is
//! zeroized on the way out.

use timevault_capsule::{slot_context, Capsule, KeySlot, SelfDestruct};
use timevault_conditions::DeliveryCondition;
use timevault_core::{
    ContentKey, ContentKind, ContentMetadata, EncryptedContent, IdentityId, X25519PublicKey,
};

use crate::error::SealError;

/// One plaintext item to seal.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// How the plaintext is interpreted.
    pub kind: ContentKind,

    /// The plaintext bytes.
    pub data: Vec<u8>,

    /// Optional descriptive metadata (stored unencrypted).
    pub metadata: Option<ContentMetadata>,
}

impl ContentItem {
    /// A text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            data: text.into().into_bytes(),
            metadata: None,
        }
    }

    /// An item of the given kind.
    pub fn new(kind: ContentKind, data: Vec<u8>) -> Self {
        Self {
            kind,
            data,
            metadata: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: ContentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A designated recipient: identity plus agreement credential.
///
/// The identity source supplies these; the sealer never sees private keys.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// The recipient's identity.
    pub id: IdentityId,

    /// The recipient's X25519 agreement key.
    pub agreement_key: X25519PublicKey,
}

impl Recipient {
    /// Build a recipient record.
    pub fn new(id: IdentityId, agreement_key: X25519PublicKey) -> Self {
        Self { id, agreement_key }
    }
}

/// Everything needed to seal one capsule.
#[derive(Debug, Clone)]
pub struct SealRequest {
    /// Who is sealing.
    pub sealed_by: IdentityId,

    /// The plaintext items.
    pub items: Vec<ContentItem>,

    /// The designated recipients.
    pub recipients: Vec<Recipient>,

    /// Conditions gating the open (conjunction).
    pub conditions: Vec<DeliveryCondition>,

    /// Optional self-destruct window.
    pub self_destruct: Option<SelfDestruct>,

    /// Seal time (Unix ms, caller-supplied clock).
    pub now: i64,
}

/// The sealer: plaintext + recipients + conditions in, sealed capsule out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapsuleSealer;

impl CapsuleSealer {
    /// Create a sealer.
    pub fn new() -> Self {
        Self
    }

    /// Seal a capsule.
    ///
    /// One fresh content key per item, wrapped once per recipient (the
    /// O(recipients x items) cross-product the caller budgets for).
    /// Validation happens before any crypto work; nothing is produced
    /// unless everything succeeds.
    pub fn seal(&self, request: SealRequest) -> Result<Capsule, SealError> {
        if request.items.is_empty() {
            return Err(SealError::EmptyContent);
        }
        if request.recipients.is_empty() {
            return Err(SealError::NoRecipients);
        }
        for (i, recipient) in request.recipients.iter().enumerate() {
            if request.recipients[..i].iter().any(|r| r.id == recipient.id) {
                return Err(SealError::DuplicateRecipient(recipient.id.clone()));
            }
        }

        let mut contents = Vec::with_capacity(request.items.len());
        let mut key_slots =
            Vec::with_capacity(request.items.len() * request.recipients.len());

        for (index, item) in request.items.iter().enumerate() {
            let content_index = index as u32;
            let content_key = ContentKey::generate()?;

            contents.push(EncryptedContent::seal(
                item.kind,
                &item.data,
                &content_key,
                item.metadata.clone(),
            )?);

            for recipient in &request.recipients {
                let wrapped = timevault_core::WrappedKey::wrap(
                    &content_key,
                    recipient.id.clone(),
                    &recipient.agreement_key,
                    &slot_context(content_index),
                )?;
                key_slots.push(KeySlot {
                    content_index,
                    wrapped,
                });
            }
            // content_key drops (and zeroizes) here; it is never used again.
        }

        Ok(Capsule::new_sealed(
            request.sealed_by,
            contents,
            key_slots,
            request.conditions,
            request.self_destruct,
            request.now,
        )?)
    }
}
