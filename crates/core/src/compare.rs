//! Field-level comparison and back-fill helpers for item-kind comparators.
//!
//! The convention throughout is that an unset (`None`) desired field is
//! satisfied by any observed value.

use std::collections::BTreeMap;

/// `true` when `desired` is unset or equal to `observed`.
pub fn optional_eq<T: PartialEq + ?Sized>(desired: Option<&T>, observed: &T) -> bool {
    match desired {
        None => true,
        Some(d) => d == observed,
    }
}

/// Map comparison for optional desired maps.
///
/// Unset matches anything. A set map must equal the observed map entry for
/// entry; iteration order is irrelevant. Observed maps have no absent state,
/// so a set but empty map matches an observation with no entries.
pub fn optional_map_eq<K: Ord, V: PartialEq>(
    desired: Option<&BTreeMap<K, V>>,
    observed: &BTreeMap<K, V>,
) -> bool {
    match desired {
        None => true,
        Some(d) => d == observed,
    }
}

/// Set `slot` to `value` if it is unset. Returns whether the slot was filled.
pub fn fill_if_unset<T: Clone>(slot: &mut Option<T>, value: &T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value.clone());
    true
}

/// Like [`fill_if_unset`] for maps, but an empty observed map fills nothing,
/// since empty and absent are equivalent.
pub fn fill_map_if_unset<K: Ord + Clone, V: Clone>(
    slot: &mut Option<BTreeMap<K, V>>,
    value: &BTreeMap<K, V>,
) -> bool {
    if slot.is_some() || value.is_empty() {
        return false;
    }
    *slot = Some(value.clone());
    true
}
