//! The pure condition evaluator.
//!
//! `evaluate` is a function of (conditions, evidence) with no side effects.
//! The overall result is the conjunction of per-condition results: Failed
//! dominates, then Pending, else Satisfied.

use crate::condition::{DeliveryCondition, UDEG_PER_DEG};
use crate::evidence::Evidence;
use crate::password::verify_password;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Outcome of evaluating a condition set against evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Every condition currently holds.
    Satisfied,

    /// Not yet satisfiable; the same attempt may succeed later.
    Pending {
        /// What is still missing.
        reason: String,
    },

    /// Rejected; this attempt can never succeed without new evidence.
    Failed {
        /// What was rejected.
        reason: String,
    },
}

impl Evaluation {
    /// Pending with a reason.
    pub fn pending(reason: impl Into<String>) -> Self {
        Self::Pending {
            reason: reason.into(),
        }
    }

    /// Failed with a reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Check for Satisfied.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }

    /// Conjunction: Failed dominates, then Pending.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (f @ Self::Failed { .. }, _) => f,
            (_, f @ Self::Failed { .. }) => f,
            (p @ Self::Pending { .. }, _) => p,
            (_, p @ Self::Pending { .. }) => p,
            (Self::Satisfied, Self::Satisfied) => Self::Satisfied,
        }
    }
}

/// Evaluate a condition set against runtime evidence.
///
/// Satisfied only if every condition is Satisfied; Failed if any condition
/// is Failed; otherwise Pending. An empty set is trivially Satisfied.
pub fn evaluate(conditions: &[DeliveryCondition], evidence: &Evidence) -> Evaluation {
    conditions
        .iter()
        .map(|c| evaluate_one(c, evidence))
        .fold(Evaluation::Satisfied, Evaluation::and)
}

fn evaluate_one(condition: &DeliveryCondition, evidence: &Evidence) -> Evaluation {
    match condition {
        DeliveryCondition::Date { unlock_at } => {
            if evidence.now >= *unlock_at {
                Evaluation::Satisfied
            } else {
                Evaluation::pending(format!("locked until {unlock_at}"))
            }
        }

        DeliveryCondition::Location {
            latitude_udeg,
            longitude_udeg,
            radius_m,
        } => match evidence.coordinates {
            Some(coords) => {
                let lat = *latitude_udeg as f64 / UDEG_PER_DEG;
                let lon = *longitude_udeg as f64 / UDEG_PER_DEG;
                let distance = haversine_m(coords.latitude, coords.longitude, lat, lon);
                if distance <= f64::from(*radius_m) {
                    Evaluation::Satisfied
                } else {
                    Evaluation::pending(format!(
                        "{:.0}m from delivery point (radius {}m)",
                        distance, radius_m
                    ))
                }
            }
            None if evidence.location_unavailable => {
                Evaluation::failed("location evidence unavailable")
            }
            None => Evaluation::pending("no coordinates in evidence"),
        },

        DeliveryCondition::Event { name } => {
            if evidence.events.contains(name) {
                Evaluation::Satisfied
            } else {
                Evaluation::pending(format!("event '{name}' has not occurred"))
            }
        }

        DeliveryCondition::Password { phc_hash } => match evidence.password.as_deref() {
            Some(submitted) => {
                if verify_password(submitted, phc_hash) {
                    Evaluation::Satisfied
                } else {
                    // Mismatch rejects per attempt; it does not wait.
                    Evaluation::failed("wrong password")
                }
            }
            None => Evaluation::pending("password required"),
        },

        DeliveryCondition::Biometric { kind } => match evidence.biometric {
            Some(assertion) => {
                if assertion.kind != *kind {
                    Evaluation::failed("biometric type mismatch")
                } else if !assertion.attested {
                    Evaluation::failed("biometric assertion not attested")
                } else {
                    Evaluation::Satisfied
                }
            }
            None => Evaluation::pending("biometric assertion required"),
        },
    }
}

/// Great-circle distance between two points, in meters.
fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
