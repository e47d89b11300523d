//! Concrete item kinds reconciled by converge.
//!
//! - [`GateCondition`]: conditions on a quality gate (metric, operator, threshold).
//! - [`ProfileRule`]: rule activations in a quality profile (severity, parameters).
//!
//! [`MemoryBackend`] is an in-memory remote system for either kind.

pub mod condition;
pub mod memory;
pub mod rule;

pub use condition::{ConditionKey, ConditionObservation, ConditionSpec, GateCondition};
pub use memory::{Materialize, MemoryBackend, PortCall};
pub use rule::{ProfileRule, RuleObservation, RuleSpec};
