//! Quality-profile rule activations.
//!
//! A rule activation is addressed by its rule key (`java:S1144`) on both
//! sides, so the identifier is known from the first pass and never needs
//! to be discovered.

use std::collections::BTreeMap;

use converge_core::compare::{fill_if_unset, fill_map_if_unset, optional_eq, optional_map_eq};
use converge_core::ItemKind;
use serde::{Deserialize, Serialize};

/// Marker type for quality-profile rule activations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileRule;

/// A rule activation as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prioritized: Option<bool>,
}

impl RuleSpec {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity: None,
            params: None,
            prioritized: None,
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_prioritized(mut self, prioritized: bool) -> Self {
        self.prioritized = Some(prioritized);
        self
    }
}

/// A rule activation as reported by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleObservation {
    pub key: String,
    pub severity: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub prioritized: bool,
}

impl RuleObservation {
    pub fn new(key: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            severity: severity.into(),
            params: BTreeMap::new(),
            prioritized: false,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl ItemKind for ProfileRule {
    const NAME: &'static str = "profile rule";
    const CLIENT_ASSIGNED_ID: bool = true;

    type Desired = RuleSpec;
    type Observed = RuleObservation;
    type BusinessKey = String;

    fn desired_id(desired: &RuleSpec) -> Option<&str> {
        Some(&desired.rule)
    }

    fn assign_id(desired: &mut RuleSpec, id: &str) {
        desired.rule = id.to_string();
    }

    fn observed_id(observed: &RuleObservation) -> &str {
        &observed.key
    }

    fn business_key(desired: &RuleSpec) -> String {
        desired.rule.clone()
    }

    fn same_identity(desired: &RuleSpec, observed: &RuleObservation) -> bool {
        desired.rule == observed.key
    }

    fn is_up_to_date(desired: &RuleSpec, observed: &RuleObservation) -> bool {
        optional_eq(desired.severity.as_deref(), observed.severity.as_str())
            && optional_map_eq(desired.params.as_ref(), &observed.params)
            && optional_eq(desired.prioritized.as_ref(), &observed.prioritized)
    }

    fn late_initialize(desired: &mut RuleSpec, observed: &RuleObservation) -> bool {
        // Evaluate all three; `||` would short-circuit the later fills.
        let severity = fill_if_unset(&mut desired.severity, &observed.severity);
        let params = fill_map_if_unset(&mut desired.params, &observed.params);
        let prioritized = fill_if_unset(&mut desired.prioritized, &observed.prioritized);
        severity || params || prioritized
    }
}
