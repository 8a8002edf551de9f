//! The delivery condition sum type.
//!
//! Conditions are a closed tagged union so the evaluator's match is
//! exhaustive and a new kind is a compile-time-checked extension point.

use serde::{Deserialize, Serialize};

use crate::error::{ConditionError, Result};
use crate::password::hash_password;

/// Micro-degrees per degree. Coordinates are stored as integers so the
/// capsule's canonical encoding stays float-free.
pub(crate) const UDEG_PER_DEG: f64 = 1_000_000.0;

/// The kind of biometric assertion a condition demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BiometricKind {
    /// Fingerprint match.
    Fingerprint = 1,
    /// Face match.
    Face = 2,
    /// Voice match.
    Voice = 3,
}

impl BiometricKind {
    /// Convert to u8 for canonical encoding.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Fingerprint),
            2 => Some(Self::Face),
            3 => Some(Self::Voice),
            _ => None,
        }
    }
}

/// A predicate that must hold before a capsule may be opened.
///
/// A capsule holds an ordered set of these; the lock semantics are the
/// conjunction of all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryCondition {
    /// Satisfied once the current time reaches the stated instant.
    Date {
        /// Unlock time, Unix milliseconds.
        unlock_at: i64,
    },

    /// Satisfied when the opener is within `radius_m` meters of the point.
    Location {
        /// Latitude in micro-degrees.
        latitude_udeg: i64,
        /// Longitude in micro-degrees.
        longitude_udeg: i64,
        /// Radius in meters.
        radius_m: u32,
    },

    /// Satisfied once a collaborator declares the named event occurred.
    Event {
        /// The event name to wait for.
        name: String,
    },

    /// Satisfied by presenting the matching password.
    Password {
        /// Argon2id PHC string (carries salt and parameters).
        phc_hash: String,
    },

    /// Satisfied by a matching attested biometric assertion.
    Biometric {
        /// The required assertion type.
        kind: BiometricKind,
    },
}

impl DeliveryCondition {
    /// A date condition unlocking at the given Unix-millisecond instant.
    pub fn date(unlock_at: i64) -> Self {
        Self::Date { unlock_at }
    }

    /// A location condition around the given point (degrees).
    pub fn location(latitude_deg: f64, longitude_deg: f64, radius_m: u32) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(ConditionError::InvalidParameter(format!(
                "latitude {latitude_deg} out of range"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(ConditionError::InvalidParameter(format!(
                "longitude {longitude_deg} out of range"
            )));
        }
        Ok(Self::Location {
            latitude_udeg: (latitude_deg * UDEG_PER_DEG).round() as i64,
            longitude_udeg: (longitude_deg * UDEG_PER_DEG).round() as i64,
            radius_m,
        })
    }

    /// An event condition waiting on the named external event.
    pub fn event(name: impl Into<String>) -> Self {
        Self::Event { name: name.into() }
    }

    /// A password condition. Hashes the password with Argon2id and a fresh
    /// random salt; the plaintext is not retained.
    pub fn password(password: &str) -> Result<Self> {
        Ok(Self::Password {
            phc_hash: hash_password(password)?,
        })
    }

    /// A biometric condition of the given kind.
    pub fn biometric(kind: BiometricKind) -> Self {
        Self::Biometric { kind }
    }

    /// Short tag for audit metadata and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Date { .. } => "date",
            Self::Location { .. } => "location",
            Self::Event { .. } => "event",
            Self::Password { .. } => "password",
            Self::Biometric { .. } => "biometric",
        }
    }
}
