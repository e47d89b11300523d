//! Correlator: pair desired items with observed items.

use std::collections::btree_map::Entry;

use converge_core::{CorrelationKey, ItemKind};
use tracing::warn;

use crate::association::{Association, AssociationMap};

/// Build the association map for one pass.
///
/// 1. Every observed item is seeded under its identifier, observed side only.
/// 2. Every desired item is keyed by its identifier if it has one, otherwise
///    by its business key.
///    - An identifier that matches a seeded entry completes that association
///      and runs the comparator.
///    - An identifier with no observed counterpart is stale. It still gets
///      its own desired-only association under that identifier, so the
///      resolver or the create phase can deal with it.
///    - A business key always yields a desired-only association.
///
/// The result does not depend on the order of either input. Duplicate
/// identifiers or business keys break the one-item-per-key contract; the
/// first occurrence wins and the rest are logged and skipped. Use
/// [`validate_desired`](crate::validate_desired) to reject such input
/// before it gets here.
pub fn correlate<K: ItemKind>(
    desired: &[K::Desired],
    observed: &[K::Observed],
) -> AssociationMap<K> {
    let mut map = AssociationMap::new();

    for item in observed {
        let key = CorrelationKey::Stable(K::observed_id(item).to_string());
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Association::observed_only(item.clone()));
            }
            Entry::Occupied(slot) => {
                warn!(
                    kind = K::NAME,
                    key = %slot.key(),
                    "Observed collection holds the same identifier twice; keeping the first"
                );
            }
        }
    }

    for item in desired {
        let key = K::correlation_key(item);
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Association::desired_only(item.clone()));
            }
            Entry::Occupied(mut slot) => {
                if slot.get_mut().attach_desired(item.clone()).is_err() {
                    warn!(
                        kind = K::NAME,
                        key = %slot.key(),
                        "Desired collection holds the same key twice; keeping the first"
                    );
                }
            }
        }
    }

    map
}
