//! Per-pass association state.
//!
//! An [`Association`] links at most one desired item and at most one observed
//! item under a [`CorrelationKey`]. The map is built fresh for every pass and
//! dropped at the end of it; nothing is cached across passes, because stale
//! identifier detection depends on a fresh snapshot.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use converge_core::{CorrelationKey, ItemKind};

/// The key type of an [`AssociationMap`] for kind `K`.
pub type AssociationKey<K> = CorrelationKey<<K as ItemKind>::BusinessKey>;

/// One desired/observed pairing.
///
/// Every association has at least one side; the constructors guarantee it.
/// `up_to_date` is only ever true when both sides are present.
pub struct Association<K: ItemKind> {
    desired: Option<K::Desired>,
    observed: Option<K::Observed>,
    up_to_date: bool,
}

impl<K: ItemKind> Association<K> {
    pub fn desired_only(desired: K::Desired) -> Self {
        Self {
            desired: Some(desired),
            observed: None,
            up_to_date: false,
        }
    }

    pub fn observed_only(observed: K::Observed) -> Self {
        Self {
            desired: None,
            observed: Some(observed),
            up_to_date: false,
        }
    }

    /// Pair both sides and run the comparator.
    pub fn matched(desired: K::Desired, observed: K::Observed) -> Self {
        let up_to_date = K::is_up_to_date(&desired, &observed);
        Self {
            desired: Some(desired),
            observed: Some(observed),
            up_to_date,
        }
    }

    pub fn desired(&self) -> Option<&K::Desired> {
        self.desired.as_ref()
    }

    pub fn observed(&self) -> Option<&K::Observed> {
        self.observed.as_ref()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.up_to_date
    }

    /// The remote identifier, when the observed side is present.
    pub fn observed_id(&self) -> Option<&str> {
        self.observed.as_ref().map(K::observed_id)
    }

    /// Attach a desired item to an observed-only association.
    ///
    /// Returns the desired item back if this association already has one.
    pub(crate) fn attach_desired(&mut self, desired: K::Desired) -> Result<(), K::Desired> {
        if self.desired.is_some() {
            return Err(desired);
        }
        self.up_to_date = match &self.observed {
            Some(observed) => K::is_up_to_date(&desired, observed),
            None => false,
        };
        self.desired = Some(desired);
        Ok(())
    }

    /// Record that the remote system now matches the desired side.
    pub(crate) fn mark_synced(&mut self) {
        self.up_to_date = self.desired.is_some() && self.observed.is_some();
    }

    /// A freshly created item: both sides present and in sync by construction.
    pub(crate) fn created(desired: K::Desired, observed: K::Observed) -> Self {
        Self {
            desired: Some(desired),
            observed: Some(observed),
            up_to_date: true,
        }
    }
}

impl<K: ItemKind> Clone for Association<K> {
    fn clone(&self) -> Self {
        Self {
            desired: self.desired.clone(),
            observed: self.observed.clone(),
            up_to_date: self.up_to_date,
        }
    }
}

impl<K: ItemKind> fmt::Debug for Association<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("desired", &self.desired)
            .field("observed", &self.observed)
            .field("up_to_date", &self.up_to_date)
            .finish()
    }
}

/// All associations of one pass, ordered by key.
///
/// Ordering is total and input-independent, so every query over the map is
/// deterministic.
pub struct AssociationMap<K: ItemKind> {
    entries: BTreeMap<AssociationKey<K>, Association<K>>,
}

impl<K: ItemKind> AssociationMap<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &AssociationKey<K>) -> Option<&Association<K>> {
        self.entries.get(key)
    }

    /// Look up by remote identifier.
    pub fn get_stable(&self, id: &str) -> Option<&Association<K>> {
        self.entries.get(&CorrelationKey::Stable(id.to_string()))
    }

    pub fn contains_key(&self, key: &AssociationKey<K>) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, AssociationKey<K>, Association<K>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, AssociationKey<K>, Association<K>> {
        self.entries.keys()
    }

    /// Desired items in key order, carrying any identifiers learned during sync.
    pub fn desired_items(&self) -> Vec<K::Desired> {
        self.entries
            .values()
            .filter_map(|a| a.desired.clone())
            .collect()
    }

    pub(crate) fn entry(
        &mut self,
        key: AssociationKey<K>,
    ) -> btree_map::Entry<'_, AssociationKey<K>, Association<K>> {
        self.entries.entry(key)
    }

    pub(crate) fn get_mut(&mut self, key: &AssociationKey<K>) -> Option<&mut Association<K>> {
        self.entries.get_mut(key)
    }

    pub(crate) fn insert(&mut self, key: AssociationKey<K>, association: Association<K>) {
        self.entries.insert(key, association);
    }

    pub(crate) fn remove(&mut self, key: &AssociationKey<K>) -> Option<Association<K>> {
        self.entries.remove(key)
    }
}

impl<K: ItemKind> Default for AssociationMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ItemKind> Clone for AssociationMap<K> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K: ItemKind> fmt::Debug for AssociationMap<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<'a, K: ItemKind> IntoIterator for &'a AssociationMap<K> {
    type Item = (&'a AssociationKey<K>, &'a Association<K>);
    type IntoIter = btree_map::Iter<'a, AssociationKey<K>, Association<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
