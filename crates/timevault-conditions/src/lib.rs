//! # Timevault Conditions
//!
//! Delivery conditions and the pure evaluator that gates capsule opening.
//!
//! A capsule carries an ordered set of [`DeliveryCondition`]s; the capsule
//! unlocks only when **every** condition is currently satisfied. Conjunction
//! is deliberate: a time-or-password capsule would weaken the sender's
//! intended guarantee, so partial unlocking does not exist.
//!
//! The evaluator is a pure function over collaborator-supplied [`Evidence`]
//! (current time, geolocation, event flags, a submitted password, a biometric
//! assertion). It never polls for anything itself.

pub mod condition;
pub mod error;
pub mod evaluate;
pub mod evidence;
pub mod password;

pub use condition::{BiometricKind, DeliveryCondition};
pub use error::{ConditionError, Result};
pub use evaluate::{evaluate, Evaluation};
pub use evidence::{BiometricAssertion, Coordinates, Evidence};
pub use password::{hash_password, verify_password};
