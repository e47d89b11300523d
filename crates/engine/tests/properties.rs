//! Property tests over randomly generated gate conditions.

use std::collections::BTreeSet;

use converge_engine::{classify, correlate, observe, resolve, resolve_with, ReconcileConfig};
use converge_kinds::{ConditionObservation, ConditionSpec, GateCondition};
use proptest::prelude::*;

const METRICS: &[&str] = &[
    "coverage",
    "bugs",
    "vulnerabilities",
    "code_smells",
    "duplicated_lines",
    "security_hotspots",
];
const OPS: &[&str] = &["LT", "GT"];

// ============================================================================
// Generators
// ============================================================================

/// Observed conditions with distinct identifiers `c0`, `c1`, ...
fn arb_observed() -> impl Strategy<Value = Vec<ConditionObservation>> {
    prop::collection::vec((0..METRICS.len(), 0..OPS.len(), 0u8..3), 0..6).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (metric, op, error))| {
                ConditionObservation::new(
                    format!("c{}", i),
                    METRICS[metric],
                    OPS[op],
                    error.to_string(),
                )
            })
            .collect()
    })
}

/// Desired conditions with distinct business keys and distinct identifiers.
///
/// Identifiers are drawn from `c0..c7`, so some resolve against the
/// observed side and some are stale.
fn arb_desired() -> impl Strategy<Value = Vec<ConditionSpec>> {
    let entry = (
        0..METRICS.len(),
        prop::option::of(0..OPS.len()),
        0u8..3,
        prop::option::of(0usize..8),
    );
    prop::collection::vec(entry, 0..6).prop_map(|raw| {
        let mut keys = BTreeSet::new();
        let mut ids = BTreeSet::new();
        raw.into_iter()
            .filter(|(metric, op, _, _)| keys.insert((*metric, *op)))
            .map(|(metric, op, error, id)| {
                let mut spec = ConditionSpec::new(METRICS[metric], error.to_string());
                if let Some(op) = op {
                    spec = spec.with_op(OPS[op]);
                }
                if let Some(id) = id.filter(|id| ids.insert(*id)) {
                    spec = spec.with_id(format!("c{}", id));
                }
                spec
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every input item lands in exactly one association, and every
    /// association in exactly one bucket.
    #[test]
    fn prop_buckets_partition_inputs(desired in arb_desired(), observed in arb_observed()) {
        let map = correlate::<GateCondition>(&desired, &observed);
        let buckets = classify(&map);

        let with_desired = map.iter().filter(|(_, a)| a.desired().is_some()).count();
        let with_observed = map.iter().filter(|(_, a)| a.observed().is_some()).count();
        prop_assert_eq!(with_desired, desired.len());
        prop_assert_eq!(with_observed, observed.len());

        prop_assert_eq!(buckets.summary.total(), map.len());
        let union: BTreeSet<_> = buckets
            .current
            .iter()
            .chain(&buckets.to_create)
            .chain(&buckets.to_delete)
            .chain(&buckets.to_update)
            .collect();
        prop_assert_eq!(union.len(), map.len());
    }

    /// Input order does not change which items are matched or how they
    /// are classified.
    #[test]
    fn prop_correlation_ignores_input_order(desired in arb_desired(), observed in arb_observed()) {
        let forward = classify(&correlate::<GateCondition>(&desired, &observed));

        let mut desired_rev = desired.clone();
        desired_rev.reverse();
        let mut observed_rev = observed.clone();
        observed_rev.reverse();
        let backward = classify(&correlate::<GateCondition>(&desired_rev, &observed_rev));

        prop_assert_eq!(forward, backward);
    }

    /// A second observation over unchanged inputs changes nothing further
    /// and classifies the same way.
    #[test]
    fn prop_observation_is_idempotent(mut desired in arb_desired(), observed in arb_observed()) {
        let config = ReconcileConfig::default();
        let first = observe::<GateCondition>(&mut desired, &observed, &config);
        let after_first = desired.clone();

        let second = observe::<GateCondition>(&mut desired, &observed, &config);

        prop_assert_eq!(&desired, &after_first);
        prop_assert!(second.resolution.repairs.is_empty());
        prop_assert_eq!(second.resolution.backfilled, 0);
        prop_assert_eq!(first.report.summary, second.report.summary);
        prop_assert_eq!(
            classify(&first.associations),
            classify(&second.associations)
        );
    }

    /// Late init never rewrites a resolving identifier or a declared field.
    #[test]
    fn prop_late_init_is_monotone(mut desired in arb_desired(), observed in arb_observed()) {
        let before = desired.clone();
        let live: BTreeSet<&str> = observed.iter().map(|o| o.id.as_str()).collect();

        resolve::<GateCondition>(&mut desired, &observed);

        for (old, new) in before.iter().zip(&desired) {
            prop_assert_eq!(&old.metric, &new.metric);
            prop_assert_eq!(&old.error, &new.error);
            if old.op.is_some() {
                prop_assert_eq!(&old.op, &new.op);
            }
            match old.id.as_deref() {
                Some(id) if live.contains(id) => {
                    prop_assert_eq!(old.id.as_deref(), new.id.as_deref());
                }
                Some(_) => {
                    prop_assert!(new.id.is_some(), "stale identifier was cleared");
                }
                None => {}
            }
        }
    }

    /// No observed identifier is handed to two desired items.
    #[test]
    fn prop_resolved_identifiers_are_unique(mut desired in arb_desired(), observed in arb_observed()) {
        let live: BTreeSet<&str> = observed.iter().map(|o| o.id.as_str()).collect();

        resolve::<GateCondition>(&mut desired, &observed);

        let resolved: Vec<&str> = desired
            .iter()
            .filter_map(|d| d.id.as_deref())
            .filter(|id| live.contains(id))
            .collect();
        let distinct: BTreeSet<&str> = resolved.iter().copied().collect();
        prop_assert_eq!(resolved.len(), distinct.len());
    }

    /// With late init off only identifiers move.
    #[test]
    fn prop_resolve_without_late_init_leaves_attributes(
        mut desired in arb_desired(),
        observed in arb_observed(),
    ) {
        let before = desired.clone();
        let resolution = resolve_with::<GateCondition>(&mut desired, &observed, false);

        prop_assert_eq!(resolution.backfilled, 0);
        for (old, new) in before.iter().zip(&desired) {
            prop_assert_eq!(&old.op, &new.op);
        }
    }
}
