//! The unified Timevault API.
//!
//! Owns the key vault, a shared rate limiter, and a handle to the opaque
//! blob store. Sealing, opening, and attestation are synchronous; only the
//! store round-trips are async, and they never hold a capsule lock across
//! an await.

use std::sync::Arc;

use bytes::Bytes;

use timevault_capsule::Capsule;
use timevault_conditions::Evidence;
use timevault_core::{
    Blake3Hash, CapsuleId, Ed25519PublicKey, Ed25519Signature, IdentityId,
};
use timevault_store::BlobStore;
use timevault_vault::{IdentityPublicKeys, KeyVault};

use crate::error::{OpenError, Result, SealError, TimevaultError};
use crate::open::{CapsuleOpener, OpenOutcome};
use crate::ratelimit::RateLimiter;
use crate::seal::{CapsuleSealer, SealRequest};

/// Domain prefix for attestation signatures.
const ATTEST_DOMAIN: &[u8] = b"timevault-attest-v0:";

/// A signed statement that a capsule with this content-address was sealed.
///
/// Emitted for external anchoring (a ledger, a registry); the anchoring
/// itself is a collaborator concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsuleAttestation {
    /// The attested capsule.
    pub capsule_id: CapsuleId,

    /// Hash of the capsule's canonical sealed bytes.
    pub content_hash: Blake3Hash,

    /// Who signed.
    pub signer: IdentityId,

    /// Signature over the domain-separated (id, hash) message.
    pub signature: Ed25519Signature,
}

impl CapsuleAttestation {
    /// Verify against the signer's published signing key.
    pub fn verify(&self, signer_key: &Ed25519PublicKey) -> bool {
        let message = attestation_message(&self.capsule_id, &self.content_hash);
        signer_key.verify(&message, &self.signature).is_ok()
    }
}

fn attestation_message(id: &CapsuleId, hash: &Blake3Hash) -> Vec<u8> {
    let mut message = Vec::with_capacity(ATTEST_DOMAIN.len() + 64);
    message.extend_from_slice(ATTEST_DOMAIN);
    message.extend_from_slice(id.as_bytes());
    message.extend_from_slice(hash.as_bytes());
    message
}

/// The unified API: vault + sealer + opener + blob store.
pub struct Timevault<S: BlobStore> {
    vault: KeyVault,
    store: Arc<S>,
    sealer: CapsuleSealer,
    limiter: RateLimiter,
}

impl<S: BlobStore> Timevault<S> {
    /// Create an instance over a vault and a blob store.
    pub fn new(vault: KeyVault, store: S) -> Self {
        Self {
            vault,
            store: Arc::new(store),
            sealer: CapsuleSealer::new(),
            limiter: RateLimiter::new(),
        }
    }

    /// Replace the default rate limiter (e.g. tighter backoff in tests).
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// The vault, read-only.
    pub fn vault(&self) -> &KeyVault {
        &self.vault
    }

    /// The blob store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Provision a fresh local identity.
    pub fn generate_identity(&mut self, id: IdentityId) -> Result<IdentityPublicKeys> {
        Ok(self.vault.generate_identity(id)?)
    }

    /// Seal a capsule.
    pub fn seal(&self, request: SealRequest) -> std::result::Result<Capsule, SealError> {
        self.sealer.seal(request)
    }

    /// Attempt to open a capsule.
    pub fn attempt_open(
        &self,
        capsule: &Capsule,
        opener: &IdentityId,
        evidence: &Evidence,
    ) -> std::result::Result<OpenOutcome, OpenError> {
        CapsuleOpener::new(&self.vault, &self.limiter).attempt_open(capsule, opener, evidence)
    }

    /// Sign an attestation of a capsule's content-address.
    pub fn attest(
        &self,
        capsule: &Capsule,
        signer: &IdentityId,
    ) -> Result<CapsuleAttestation> {
        let capsule_id = capsule.id();
        let content_hash = capsule.attestation_hash();
        let message = attestation_message(&capsule_id, &content_hash);
        let signature = self.vault.sign(signer, &message)?;

        Ok(CapsuleAttestation {
            capsule_id,
            content_hash,
            signer: signer.clone(),
            signature,
        })
    }

    /// Serialize a capsule and hand it to the blob store.
    ///
    /// The record is built before the await, so no capsule lock is held
    /// while the store responds (or fails to).
    pub async fn store_capsule(&self, capsule: &Capsule) -> Result<CapsuleId> {
        let id = capsule.id();
        let record = Bytes::from(capsule.to_bytes()?);
        self.store.put(&id, record).await?;
        Ok(id)
    }

    /// Load a capsule back from the blob store.
    ///
    /// Decoding re-verifies the audit chain and content-address.
    pub async fn load_capsule(&self, id: &CapsuleId) -> Result<Capsule> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or(TimevaultError::CapsuleNotFound(*id))?;
        Ok(Capsule::from_bytes(&record)?)
    }

    /// Remove a capsule's record from the blob store.
    pub async fn remove_capsule(&self, id: &CapsuleId) -> Result<()> {
        Ok(self.store.remove(id).await?)
    }
}
