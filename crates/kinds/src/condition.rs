//! Quality-gate conditions.
//!
//! A condition is identified remotely by an opaque id. Before the first
//! successful sync the only handle on it is the metric it watches plus,
//! optionally, its comparison operator.

use std::fmt;

use converge_core::compare::{fill_if_unset, optional_eq};
use converge_core::ItemKind;
use serde::{Deserialize, Serialize};

/// Marker type for quality-gate conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateCondition;

/// A condition as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub metric: String,
    /// Comparison operator (`LT`, `GT`). Unset means "whatever the server picks".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Error threshold.
    pub error: String,
}

impl ConditionSpec {
    pub fn new(metric: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: None,
            metric: metric.into(),
            op: None,
            error: error.into(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A condition as reported by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionObservation {
    pub id: String,
    pub metric: String,
    pub op: String,
    pub error: String,
}

impl ConditionObservation {
    pub fn new(
        id: impl Into<String>,
        metric: impl Into<String>,
        op: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            metric: metric.into(),
            op: op.into(),
            error: error.into(),
        }
    }
}

/// Business key of a condition: the metric, plus the operator when declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConditionKey {
    pub metric: String,
    pub op: Option<String>,
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Some(op) => write!(f, "{}/{}", self.metric, op),
            None => write!(f, "{}", self.metric),
        }
    }
}

impl ItemKind for GateCondition {
    const NAME: &'static str = "gate condition";

    type Desired = ConditionSpec;
    type Observed = ConditionObservation;
    type BusinessKey = ConditionKey;

    fn desired_id(desired: &ConditionSpec) -> Option<&str> {
        desired.id.as_deref()
    }

    fn assign_id(desired: &mut ConditionSpec, id: &str) {
        desired.id = Some(id.to_string());
    }

    fn observed_id(observed: &ConditionObservation) -> &str {
        &observed.id
    }

    fn business_key(desired: &ConditionSpec) -> ConditionKey {
        ConditionKey {
            metric: desired.metric.clone(),
            op: desired.op.clone(),
        }
    }

    fn same_identity(desired: &ConditionSpec, observed: &ConditionObservation) -> bool {
        desired.metric == observed.metric
            && optional_eq(desired.op.as_deref(), observed.op.as_str())
    }

    fn is_up_to_date(desired: &ConditionSpec, observed: &ConditionObservation) -> bool {
        desired.metric == observed.metric
            && desired.error == observed.error
            && optional_eq(desired.op.as_deref(), observed.op.as_str())
    }

    fn late_initialize(desired: &mut ConditionSpec, observed: &ConditionObservation) -> bool {
        fill_if_unset(&mut desired.op, &observed.op)
    }
}
