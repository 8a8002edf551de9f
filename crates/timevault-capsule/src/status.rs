//! Capsule lifecycle status and the self-destruct window.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a capsule.
///
/// Strictly monotonic: no transition may move status backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CapsuleStatus {
    /// Under construction; not yet sealed.
    Draft = 0,
    /// Sealed and awaiting its delivery conditions.
    Scheduled = 1,
    /// A delivery collaborator has surfaced the capsule to recipients.
    Delivered = 2,
    /// At least one authorized recipient has opened it.
    Opened = 3,
}

impl CapsuleStatus {
    /// Monotonic ordering rank.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Draft),
            1 => Some(Self::Scheduled),
            2 => Some(Self::Delivered),
            3 => Some(Self::Opened),
            _ => None,
        }
    }

    /// Whether an open attempt may proceed from this status.
    pub fn is_open_eligible(self) -> bool {
        matches!(self, Self::Scheduled | Self::Delivered)
    }
}

/// The self-destruct window configuration.
///
/// When present on a capsule, the effective right to re-open expires
/// `delay_seconds` after the first successful open. Once expired, no open
/// attempt may ever succeed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfDestruct {
    /// Seconds after the first successful open during which re-opening
    /// remains possible.
    pub delay_seconds: u64,
}

impl SelfDestruct {
    /// A window of the given number of seconds.
    pub fn after_seconds(delay_seconds: u64) -> Self {
        Self { delay_seconds }
    }

    /// The instant (Unix ms) at which the window closes.
    pub fn expires_at(&self, first_opened_at: i64) -> i64 {
        first_opened_at.saturating_add((self.delay_seconds as i64).saturating_mul(1000))
    }

    /// Whether the window has closed at `now`.
    pub fn is_expired(&self, first_opened_at: i64, now: i64) -> bool {
        now > self.expires_at(first_opened_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            CapsuleStatus::Draft,
            CapsuleStatus::Scheduled,
            CapsuleStatus::Delivered,
            CapsuleStatus::Opened,
        ] {
            assert_eq!(CapsuleStatus::from_u8(status.to_u8()), Some(status));
        }
        assert_eq!(CapsuleStatus::from_u8(4), None);
    }

    #[test]
    fn test_status_is_monotonic_rank() {
        assert!(CapsuleStatus::Draft.rank() < CapsuleStatus::Scheduled.rank());
        assert!(CapsuleStatus::Scheduled.rank() < CapsuleStatus::Delivered.rank());
        assert!(CapsuleStatus::Delivered.rank() < CapsuleStatus::Opened.rank());
    }

    #[test]
    fn test_open_eligibility() {
        assert!(!CapsuleStatus::Draft.is_open_eligible());
        assert!(CapsuleStatus::Scheduled.is_open_eligible());
        assert!(CapsuleStatus::Delivered.is_open_eligible());
        assert!(!CapsuleStatus::Opened.is_open_eligible());
    }

    #[test]
    fn test_self_destruct_window() {
        let sd = SelfDestruct::after_seconds(5);
        let first_open = 1_000_000;

        assert!(!sd.is_expired(first_open, first_open));
        assert!(!sd.is_expired(first_open, first_open + 5_000));
        assert!(sd.is_expired(first_open, first_open + 5_001));
        assert!(sd.is_expired(first_open, first_open + 6_000));
    }
}
