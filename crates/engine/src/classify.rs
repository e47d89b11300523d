//! Classifier: partition associations into reconciliation buckets.
//!
//! Everything here is a read-only query. The same map can be classified for
//! an observation pass and then handed to the sync driver unchanged.

use std::fmt;

use converge_core::{CorrelationKey, ItemKind};
use serde::Serialize;
use serde_json::Value;

use crate::association::{Association, AssociationKey, AssociationMap};

/// The reconciliation bucket of one association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Both sides present and equal.
    Current,
    /// Desired only.
    ToCreate,
    /// Observed only.
    ToDelete,
    /// Both sides present and divergent.
    ToUpdate,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Current => write!(f, "current"),
            Bucket::ToCreate => write!(f, "to_create"),
            Bucket::ToDelete => write!(f, "to_delete"),
            Bucket::ToUpdate => write!(f, "to_update"),
        }
    }
}

impl<K: ItemKind> Association<K> {
    /// Exactly one bucket per association.
    pub fn bucket(&self) -> Bucket {
        if self.is_up_to_date() {
            return Bucket::Current;
        }
        match (self.desired().is_some(), self.observed().is_some()) {
            (true, true) => Bucket::ToUpdate,
            (true, false) => Bucket::ToCreate,
            (false, _) => Bucket::ToDelete,
        }
    }
}

impl<K: ItemKind> AssociationMap<K> {
    /// Keys in `bucket`, in map order.
    pub fn in_bucket(&self, bucket: Bucket) -> Vec<&AssociationKey<K>> {
        self.iter()
            .filter(|(_, a)| a.bucket() == bucket)
            .map(|(k, _)| k)
            .collect()
    }

    pub fn to_create(&self) -> Vec<&AssociationKey<K>> {
        self.in_bucket(Bucket::ToCreate)
    }

    pub fn to_delete(&self) -> Vec<&AssociationKey<K>> {
        self.in_bucket(Bucket::ToDelete)
    }

    pub fn to_update(&self) -> Vec<&AssociationKey<K>> {
        self.in_bucket(Bucket::ToUpdate)
    }

    pub fn current(&self) -> Vec<&AssociationKey<K>> {
        self.in_bucket(Bucket::Current)
    }

    /// `true` iff every association is up to date. Vacuously true when empty.
    pub fn all_current(&self) -> bool {
        self.iter().all(|(_, a)| a.is_up_to_date())
    }
}

/// Counts per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    pub current: usize,
    pub to_create: usize,
    pub to_delete: usize,
    pub to_update: usize,
}

impl BucketSummary {
    pub fn total(&self) -> usize {
        self.current + self.to_create + self.to_delete + self.to_update
    }

    /// Number of mutations a sync pass would attempt.
    pub fn pending(&self) -> usize {
        self.to_create + self.to_delete + self.to_update
    }
}

/// A materialised bucket view of an association map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buckets<B> {
    pub current: Vec<CorrelationKey<B>>,
    pub to_create: Vec<CorrelationKey<B>>,
    pub to_delete: Vec<CorrelationKey<B>>,
    pub to_update: Vec<CorrelationKey<B>>,
    pub summary: BucketSummary,
}

impl<B: Serialize + fmt::Display> Buckets<B> {
    pub fn all_current(&self) -> bool {
        self.summary.pending() == 0
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// One line per non-current key: `+` create, `-` delete, `~` update.
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!(
            "{} item(s): {} current, {} to create, {} to delete, {} to update",
            self.summary.total(),
            self.summary.current,
            self.summary.to_create,
            self.summary.to_delete,
            self.summary.to_update
        )];
        lines.extend(self.to_create.iter().map(|k| format!("+ {}", k)));
        lines.extend(self.to_delete.iter().map(|k| format!("- {}", k)));
        lines.extend(self.to_update.iter().map(|k| format!("~ {}", k)));
        lines.join("\n")
    }
}

/// Classify every association of `map`.
pub fn classify<K: ItemKind>(map: &AssociationMap<K>) -> Buckets<K::BusinessKey> {
    let mut buckets = Buckets {
        current: Vec::new(),
        to_create: Vec::new(),
        to_delete: Vec::new(),
        to_update: Vec::new(),
        summary: BucketSummary::default(),
    };

    for (key, association) in map {
        let target = match association.bucket() {
            Bucket::Current => &mut buckets.current,
            Bucket::ToCreate => &mut buckets.to_create,
            Bucket::ToDelete => &mut buckets.to_delete,
            Bucket::ToUpdate => &mut buckets.to_update,
        };
        target.push(key.clone());
    }

    buckets.summary = BucketSummary {
        current: buckets.current.len(),
        to_create: buckets.to_create.len(),
        to_delete: buckets.to_delete.len(),
        to_update: buckets.to_update.len(),
    };
    buckets
}
