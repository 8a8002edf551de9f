//! The capsule opener.
//!
//! Five hard gates, in order: self-destruct expiry, the condition set (with
//! password rate limiting), wrapped-key lookup, unwrap-and-decrypt, and the
//! atomic commit. Denied and pending attempts leave lifecycle state
//! untouched, so nothing about progress leaks through status alone.

use timevault_capsule::{slot_context, Capsule, OpenCommit};
use timevault_conditions::{evaluate, DeliveryCondition, Evaluation, Evidence};
use timevault_core::{ContentKind, ContentMetadata, CoreError, IdentityId};
use timevault_vault::{KeyVault, VaultError};

use crate::error::OpenError;
use crate::ratelimit::RateLimiter;

/// A decrypted content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedItem {
    /// How the plaintext is interpreted.
    pub kind: ContentKind,

    /// The recovered plaintext.
    pub plaintext: Vec<u8>,

    /// Descriptive metadata carried by the capsule.
    pub metadata: Option<ContentMetadata>,
}

/// Why an attempt was denied.
///
/// Pending attempts may succeed later with the same evidence shape; Failed
/// attempts never will without new evidence (e.g. the right password).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Not yet satisfiable; retry later.
    Pending {
        /// What is still missing.
        reason: String,
    },

    /// Rejected for this attempt.
    Failed {
        /// What was rejected.
        reason: String,
    },
}

impl Denial {
    /// The denial reason.
    pub fn reason(&self) -> &str {
        match self {
            Self::Pending { reason } | Self::Failed { reason } => reason,
        }
    }

    fn outcome_tag(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome of an open attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// All gates passed; plaintext recovered.
    Opened {
        /// The decrypted items, in capsule order.
        items: Vec<OpenedItem>,
        /// What the commit did.
        commit: OpenCommit,
    },

    /// The condition gate held the capsule shut.
    Denied(Denial),
}

impl OpenOutcome {
    /// Whether the capsule opened.
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened { .. })
    }
}

/// The opener: orchestrates condition evaluation, key unwrapping, and
/// decryption against a borrowed vault.
pub struct CapsuleOpener<'a> {
    vault: &'a KeyVault,
    limiter: &'a RateLimiter,
}

impl<'a> CapsuleOpener<'a> {
    /// Build an opener over a vault and a shared rate limiter.
    pub fn new(vault: &'a KeyVault, limiter: &'a RateLimiter) -> Self {
        Self { vault, limiter }
    }

    /// Attempt to open a capsule as `opener` with the given evidence.
    ///
    /// Returns `Ok(Denied(..))` for condition outcomes (normal, retryable
    /// or not); errors are reserved for expiry, authorization, tamper, and
    /// infrastructure faults.
    pub fn attempt_open(
        &self,
        capsule: &Capsule,
        opener: &IdentityId,
        evidence: &Evidence,
    ) -> Result<OpenOutcome, OpenError> {
        let now = evidence.now;

        // Gate 1: self-destruct expiry, before anything else.
        capsule.check_expired(now).map_err(expiry_err)?;

        let password_gated = capsule
            .conditions()
            .iter()
            .any(|c| matches!(c, DeliveryCondition::Password { .. }));

        // Gate 2: the condition set. Throttled password attempts deny as
        // Pending without touching the evaluator.
        if password_gated {
            if let Some(retry_at) = self.limiter.check(capsule.id(), opener, now) {
                let denial = Denial::Pending {
                    reason: format!("rate limited; retry at {retry_at}"),
                };
                capsule.record_denied_attempt(
                    opener.clone(),
                    denial.outcome_tag(),
                    denial.reason(),
                    now,
                )?;
                return Ok(OpenOutcome::Denied(denial));
            }
        }

        match evaluate(capsule.conditions(), evidence) {
            Evaluation::Satisfied => {
                if password_gated && evidence.password.is_some() {
                    self.limiter.record_success(capsule.id(), opener);
                }
            }
            Evaluation::Pending { reason } => {
                let denial = Denial::Pending { reason };
                capsule.record_denied_attempt(
                    opener.clone(),
                    denial.outcome_tag(),
                    denial.reason(),
                    now,
                )?;
                return Ok(OpenOutcome::Denied(denial));
            }
            Evaluation::Failed { reason } => {
                if password_gated && evidence.password.is_some() {
                    self.limiter.record_failure(capsule.id(), opener, now);
                }
                let denial = Denial::Failed { reason };
                capsule.record_denied_attempt(
                    opener.clone(),
                    denial.outcome_tag(),
                    denial.reason(),
                    now,
                )?;
                return Ok(OpenOutcome::Denied(denial));
            }
        }

        // Gates 3 and 4: locate the opener's wrapped key and decrypt each
        // item. Read-only; the commit point comes after.
        let mut items = Vec::with_capacity(capsule.contents().len());
        for (index, content) in capsule.contents().iter().enumerate() {
            let content_index = index as u32;

            let wrapped = capsule
                .wrapped_key_for(opener, content_index)
                .ok_or_else(|| OpenError::Unauthorized(opener.clone()))?;

            let content_key = match self.vault.unwrap_content_key(
                opener,
                wrapped,
                &slot_context(content_index),
            ) {
                Ok(key) => key,
                // The slot is addressed to this opener, so an unwrap
                // authentication failure is tamper-suspect, not a missing
                // credential.
                Err(VaultError::Core(CoreError::Unauthorized)) => {
                    tracing::warn!(
                        capsule = %capsule.id(),
                        item = content_index,
                        "wrapped key failed authentication; tamper suspected"
                    );
                    capsule.record_denied_attempt(
                        opener.clone(),
                        "failed",
                        "wrapped key failed authentication (tamper suspected)",
                        now,
                    )?;
                    return Err(OpenError::CorruptKey {
                        index: content_index,
                        reason: "wrapped key failed authentication".into(),
                    });
                }
                Err(e) => return Err(unwrap_err(e, content_index, opener)),
            };

            let plaintext = match content.open(&content_key) {
                Ok(plaintext) => plaintext,
                Err(CoreError::Integrity) => {
                    // Tamper evidence: escalate, never silently retry.
                    tracing::warn!(
                        capsule = %capsule.id(),
                        item = content_index,
                        "integrity failure on open; tamper suspected"
                    );
                    capsule.record_denied_attempt(
                        opener.clone(),
                        "failed",
                        "integrity failure (tamper suspected)",
                        now,
                    )?;
                    return Err(OpenError::Integrity {
                        index: content_index,
                    });
                }
                Err(e) => return Err(OpenError::Core(e)),
            };

            items.push(OpenedItem {
                kind: content.kind,
                plaintext,
                metadata: content.metadata.clone(),
            });
        }

        // Gate 5: the one-time transition, atomic under the capsule lock.
        let commit = capsule
            .commit_opened(opener.clone(), now)
            .map_err(expiry_err)?;

        Ok(OpenOutcome::Opened { items, commit })
    }
}

fn expiry_err(e: timevault_capsule::CapsuleError) -> OpenError {
    match e {
        timevault_capsule::CapsuleError::Expired => OpenError::Expired,
        other => OpenError::Capsule(other),
    }
}

fn unwrap_err(e: VaultError, index: u32, opener: &IdentityId) -> OpenError {
    match e {
        VaultError::UnknownIdentity(_) => OpenError::Unauthorized(opener.clone()),
        VaultError::Core(CoreError::CorruptKey(reason)) => OpenError::CorruptKey { index, reason },
        other => OpenError::Vault(other),
    }
}
