//! Identity resolver (late initialisation).
//!
//! Before correlating, desired items that lack an identifier, or carry one
//! that no longer resolves, are matched against the observed snapshot by
//! identity fields and given the observed identifier. Once an item is
//! matched, its other unset optional attributes can be back-filled from the
//! observed values.

use std::collections::{BTreeMap, BTreeSet};

use converge_core::ItemKind;
use serde::Serialize;
use tracing::{debug, warn};

/// One identifier change made by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityRepair {
    /// The item had no identifier and was given one.
    Assigned { index: usize, id: String },
    /// The item's identifier was stale and was replaced.
    Repaired {
        index: usize,
        from: String,
        to: String,
    },
}

impl IdentityRepair {
    /// Position of the repaired item in the desired collection.
    pub fn index(&self) -> usize {
        match self {
            IdentityRepair::Assigned { index, .. } | IdentityRepair::Repaired { index, .. } => {
                *index
            }
        }
    }

    /// The identifier the item carries now.
    pub fn id(&self) -> &str {
        match self {
            IdentityRepair::Assigned { id, .. } => id,
            IdentityRepair::Repaired { to, .. } => to,
        }
    }
}

/// What a resolver pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub repairs: Vec<IdentityRepair>,
    /// Number of items that had at least one optional attribute back-filled.
    pub backfilled: usize,
    /// Stale identifiers with no observed counterpart, left in place.
    pub unresolved: Vec<String>,
}

impl Resolution {
    /// Whether the desired collection was modified.
    pub fn changed(&self) -> bool {
        !self.repairs.is_empty() || self.backfilled > 0
    }
}

/// Resolve identifiers and back-fill optional attributes.
pub fn resolve<K: ItemKind>(desired: &mut [K::Desired], observed: &[K::Observed]) -> Resolution {
    resolve_with::<K>(desired, observed, true)
}

/// Resolve identifiers; back-fill optional attributes only if `late_initialize`.
///
/// Per desired item, in order:
///
/// - An identifier that resolves to an observed item is left alone.
/// - Otherwise the observed items not yet claimed by another desired item
///   are searched for the same identity, preferring one whose attributes
///   already match. A hit assigns its identifier.
/// - No hit leaves the item as it was. A stale identifier is kept, not
///   cleared, and reported in [`Resolution::unresolved`]; clearing it would
///   make it indistinguishable from an item that never had one. Kinds with
///   [`ItemKind::CLIENT_ASSIGNED_ID`] have no stale identifiers, only items
///   still to be created, so nothing is reported for them.
///
/// An observed identifier is given to at most one desired item per call;
/// the first desired item in iteration order wins.
pub fn resolve_with<K: ItemKind>(
    desired: &mut [K::Desired],
    observed: &[K::Observed],
    late_initialize: bool,
) -> Resolution {
    let mut by_id: BTreeMap<&str, &K::Observed> = BTreeMap::new();
    for item in observed {
        by_id.entry(K::observed_id(item)).or_insert(item);
    }

    // Identifiers already held by a desired item that resolves are off limits.
    let mut claimed: BTreeSet<String> = desired
        .iter()
        .filter_map(|d| K::desired_id(d))
        .filter(|id| by_id.contains_key(id))
        .map(str::to_string)
        .collect();

    let mut resolution = Resolution::default();

    for (index, item) in desired.iter_mut().enumerate() {
        let current = K::desired_id(item).map(str::to_string);

        let matched = match current.as_deref().and_then(|id| by_id.get(id)) {
            Some(found) => Some(*found),
            None => {
                let candidate = find_candidate::<K>(item, observed, &claimed);
                match (candidate, current) {
                    (Some(found), previous) => {
                        let id = K::observed_id(found).to_string();
                        K::assign_id(item, &id);
                        claimed.insert(id.clone());
                        let repair = match previous {
                            None => IdentityRepair::Assigned { index, id },
                            Some(from) => IdentityRepair::Repaired {
                                index,
                                from,
                                to: id,
                            },
                        };
                        debug!(kind = K::NAME, ?repair, "Resolved identifier");
                        resolution.repairs.push(repair);
                        Some(found)
                    }
                    (None, Some(pending)) if K::CLIENT_ASSIGNED_ID => {
                        debug!(kind = K::NAME, id = %pending, "Item not created yet");
                        None
                    }
                    (None, Some(stale)) => {
                        warn!(
                            kind = K::NAME,
                            id = %stale,
                            "Stale identifier has no observed counterpart; leaving it in place"
                        );
                        resolution.unresolved.push(stale);
                        None
                    }
                    (None, None) => None,
                }
            }
        };

        if late_initialize {
            if let Some(found) = matched {
                if K::late_initialize(item, found) {
                    resolution.backfilled += 1;
                }
            }
        }
    }

    resolution
}

fn find_candidate<'a, K: ItemKind>(
    desired: &K::Desired,
    observed: &'a [K::Observed],
    claimed: &BTreeSet<String>,
) -> Option<&'a K::Observed> {
    let mut open = observed
        .iter()
        .filter(|o| !claimed.contains(K::observed_id(o)) && K::same_identity(desired, o));
    let first = open.next()?;
    if K::is_up_to_date(desired, first) {
        return Some(first);
    }
    Some(open.find(|o| K::is_up_to_date(desired, o)).unwrap_or(first))
}
