//! Runtime evidence supplied at the moment of an open attempt.
//!
//! The evidence provider (a collaborator) assembles this snapshot; the
//! evaluator never polls for any of it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::condition::BiometricKind;

/// Geographic coordinates from the opener's device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A biometric assertion made by the opener's platform authenticator.
///
/// The core trusts the attestation flag; verifying hardware is the
/// collaborator's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricAssertion {
    /// The assertion type performed.
    pub kind: BiometricKind,
    /// Whether the platform attests the match succeeded.
    pub attested: bool,
}

/// The evidence snapshot for one open attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Current time, Unix milliseconds.
    pub now: i64,

    /// Opener coordinates, if the device provided them.
    pub coordinates: Option<Coordinates>,

    /// True when the provider declares coordinates can never be supplied
    /// (no sensor, permission permanently denied).
    pub location_unavailable: bool,

    /// External events declared to have occurred.
    pub events: BTreeSet<String>,

    /// Password submitted for this attempt, if any.
    pub password: Option<String>,

    /// Biometric assertion for this attempt, if any.
    pub biometric: Option<BiometricAssertion>,
}

impl Evidence {
    /// Evidence carrying only the current time.
    pub fn at(now: i64) -> Self {
        Self {
            now,
            coordinates: None,
            location_unavailable: false,
            events: BTreeSet::new(),
            password: None,
            biometric: None,
        }
    }

    /// Attach opener coordinates.
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    /// Declare that coordinates can never be supplied.
    pub fn without_location(mut self) -> Self {
        self.location_unavailable = true;
        self
    }

    /// Declare an external event as having occurred.
    pub fn with_event(mut self, name: impl Into<String>) -> Self {
        self.events.insert(name.into());
        self
    }

    /// Attach a submitted password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Attach an attested biometric assertion.
    pub fn with_biometric(mut self, kind: BiometricKind) -> Self {
        self.biometric = Some(BiometricAssertion {
            kind,
            attested: true,
        });
        self
    }
}
