//! Input-contract checks on a desired collection.
//!
//! The correlator assumes one desired item per identifier and per business
//! key. This module rejects collections that break that assumption, and
//! reports every offending pair rather than stopping at the first.

use std::collections::BTreeMap;
use std::fmt;

use converge_core::ItemKind;

/// One input-contract violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate {kind} '{key}' at positions {first} and {second}")]
    DuplicateBusinessKey {
        kind: &'static str,
        key: String,
        first: usize,
        second: usize,
    },

    #[error("duplicate {kind} identifier '{id}' at positions {first} and {second}")]
    DuplicateIdentifier {
        kind: &'static str,
        id: String,
        first: usize,
        second: usize,
    },
}

/// All violations found in one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid desired collection: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check that identifiers and business keys are unique within `desired`.
///
/// When two items collide on both, only the business-key collision is
/// reported.
pub fn validate_desired<K: ItemKind>(desired: &[K::Desired]) -> Result<(), ValidationErrors> {
    let mut keys: BTreeMap<K::BusinessKey, usize> = BTreeMap::new();
    let mut ids: BTreeMap<&str, usize> = BTreeMap::new();
    let mut errors = Vec::new();

    for (index, item) in desired.iter().enumerate() {
        let key = K::business_key(item);
        let key_clash = keys.get(&key).copied();
        match key_clash {
            Some(first) => errors.push(ValidationError::DuplicateBusinessKey {
                kind: K::NAME,
                key: key.to_string(),
                first,
                second: index,
            }),
            None => {
                keys.insert(key, index);
            }
        }

        if let Some(id) = K::desired_id(item) {
            match ids.get(id).copied() {
                Some(first) if key_clash != Some(first) => {
                    errors.push(ValidationError::DuplicateIdentifier {
                        kind: K::NAME,
                        id: id.to_string(),
                        first,
                        second: index,
                    })
                }
                Some(_) => {}
                None => {
                    ids.insert(id, index);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge_kinds::{ConditionSpec, GateCondition, ProfileRule, RuleSpec};

    #[test]
    fn distinct_items_pass() {
        let desired = vec![
            ConditionSpec::new("coverage", "80").with_op("LT"),
            ConditionSpec::new("coverage", "10").with_op("GT"),
            ConditionSpec::new("bugs", "0").with_id("c2"),
        ];
        assert!(validate_desired::<GateCondition>(&desired).is_ok());
    }

    #[test]
    fn reports_every_duplicate() {
        let desired = vec![
            ConditionSpec::new("coverage", "80"),
            ConditionSpec::new("bugs", "0").with_id("c1"),
            ConditionSpec::new("coverage", "90"),
            ConditionSpec::new("new_bugs", "0").with_id("c1"),
        ];
        let err = validate_desired::<GateCondition>(&desired).unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                ValidationError::DuplicateBusinessKey {
                    kind: "gate condition",
                    key: "coverage".to_string(),
                    first: 0,
                    second: 2,
                },
                ValidationError::DuplicateIdentifier {
                    kind: "gate condition",
                    id: "c1".to_string(),
                    first: 1,
                    second: 3,
                },
            ]
        );
        assert!(err.to_string().contains("duplicate gate condition 'coverage'"));
    }

    #[test]
    fn rule_collision_is_reported_once() {
        let desired = vec![RuleSpec::new("java:S1144"), RuleSpec::new("java:S1144")];
        let err = validate_desired::<ProfileRule>(&desired).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(matches!(
            err.errors[0],
            ValidationError::DuplicateBusinessKey { .. }
        ));
    }
}
