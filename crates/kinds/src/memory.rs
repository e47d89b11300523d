//! In-memory remote system.
//!
//! `MemoryBackend` implements [`MutationPort`] over a map of observed items.
//! It allocates identifiers, refuses to create a second item with the same
//! identity (like the real API does), can be told to fail specific calls,
//! and records every call it receives. `items()` doubles as the observed
//! collection provider for the next pass.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use converge_core::{ItemKind, MutationPort, PortError};

use crate::condition::{ConditionObservation, ConditionSpec, GateCondition};
use crate::rule::{ProfileRule, RuleObservation, RuleSpec};

/// How an item kind turns a desired item into a stored observation.
pub trait Materialize: ItemKind {
    /// Identifier for a newly created item; `seq` is unique per backend.
    fn new_id(desired: &Self::Desired, seq: u64) -> String;

    /// The observation the remote system would report right after creation.
    fn materialize(id: &str, desired: &Self::Desired) -> Self::Observed;

    /// Apply an update in place.
    fn apply(observed: &mut Self::Observed, desired: &Self::Desired);
}

impl Materialize for GateCondition {
    fn new_id(_desired: &ConditionSpec, seq: u64) -> String {
        format!("cond-{}", seq)
    }

    fn materialize(id: &str, desired: &ConditionSpec) -> ConditionObservation {
        ConditionObservation {
            id: id.to_string(),
            metric: desired.metric.clone(),
            op: desired.op.clone().unwrap_or_else(|| "LT".to_string()),
            error: desired.error.clone(),
        }
    }

    fn apply(observed: &mut ConditionObservation, desired: &ConditionSpec) {
        observed.metric = desired.metric.clone();
        observed.error = desired.error.clone();
        if let Some(op) = &desired.op {
            observed.op = op.clone();
        }
    }
}

impl Materialize for ProfileRule {
    fn new_id(desired: &RuleSpec, _seq: u64) -> String {
        desired.rule.clone()
    }

    fn materialize(id: &str, desired: &RuleSpec) -> RuleObservation {
        RuleObservation {
            key: id.to_string(),
            severity: desired
                .severity
                .clone()
                .unwrap_or_else(|| "MAJOR".to_string()),
            params: desired.params.clone().unwrap_or_default(),
            prioritized: desired.prioritized.unwrap_or(false),
        }
    }

    fn apply(observed: &mut RuleObservation, desired: &RuleSpec) {
        if let Some(severity) = &desired.severity {
            observed.severity = severity.clone();
        }
        if let Some(params) = &desired.params {
            observed.params = params.clone();
        }
        if let Some(prioritized) = desired.prioritized {
            observed.prioritized = prioritized;
        }
    }
}

/// A call received by the backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    Create { parent: String, key: String },
    Update { id: String },
    Delete { id: String },
}

struct MemoryState<K: ItemKind> {
    items: BTreeMap<String, K::Observed>,
    next_seq: u64,
    create_failures: BTreeMap<String, PortError>,
    id_failures: BTreeMap<String, PortError>,
    calls: Vec<PortCall>,
}

impl<K: Materialize> MemoryState<K> {
    /// Next identifier not already held by a stored item.
    ///
    /// Seeded items may already use sequence-derived identifiers, so
    /// taken ones are skipped. A kind whose identifier does not depend on
    /// the sequence fails as soon as the same identifier comes back.
    fn allocate_id(&mut self, desired: &K::Desired) -> Result<String, PortError> {
        let mut previous: Option<String> = None;
        loop {
            let seq = self.next_seq;
            self.next_seq += 1;
            let id = K::new_id(desired, seq);
            if !self.items.contains_key(&id) {
                return Ok(id);
            }
            if previous.as_deref() == Some(id.as_str()) {
                return Err(PortError::Conflict {
                    message: format!("{} {} already exists", K::NAME, id),
                });
            }
            previous = Some(id);
        }
    }
}

/// An in-memory remote system for one parent resource's children.
pub struct MemoryBackend<K: ItemKind> {
    state: Mutex<MemoryState<K>>,
}

impl<K: Materialize> MemoryBackend<K> {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Start from an existing set of observed items.
    pub fn with_items(items: Vec<K::Observed>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (K::observed_id(&item).to_string(), item))
            .collect();
        Self {
            state: Mutex::new(MemoryState {
                items,
                next_seq: 1,
                create_failures: BTreeMap::new(),
                id_failures: BTreeMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Fail every create whose business key renders as `key`.
    pub fn fail_create(&self, key: impl Into<String>, error: PortError) {
        self.lock().create_failures.insert(key.into(), error);
    }

    /// Fail every update or delete addressed to `id`.
    pub fn fail_id(&self, id: impl Into<String>, error: PortError) {
        self.lock().id_failures.insert(id.into(), error);
    }

    /// Current observed items, ordered by identifier.
    pub fn items(&self) -> Vec<K::Observed> {
        self.lock().items.values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Materialize> Default for MemoryBackend<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: Materialize> MutationPort<K> for MemoryBackend<K> {
    async fn create_item(
        &self,
        parent: &str,
        desired: &K::Desired,
    ) -> Result<K::Observed, PortError> {
        let mut state = self.lock();
        let key = K::business_key(desired).to_string();
        state.calls.push(PortCall::Create {
            parent: parent.to_string(),
            key: key.clone(),
        });
        if let Some(err) = state.create_failures.get(&key) {
            return Err(err.clone());
        }
        if state
            .items
            .values()
            .any(|existing| K::same_identity(desired, existing))
        {
            return Err(PortError::Conflict {
                message: format!("{} {} already exists", K::NAME, key),
            });
        }

        let id = state.allocate_id(desired)?;
        let observed = K::materialize(&id, desired);
        state.items.insert(id, observed.clone());
        Ok(observed)
    }

    async fn update_item(&self, id: &str, desired: &K::Desired) -> Result<(), PortError> {
        let mut state = self.lock();
        state.calls.push(PortCall::Update { id: id.to_string() });
        if let Some(err) = state.id_failures.get(id) {
            return Err(err.clone());
        }
        match state.items.get_mut(id) {
            Some(observed) => {
                K::apply(observed, desired);
                Ok(())
            }
            None => Err(PortError::NotFound { id: id.to_string() }),
        }
    }

    async fn delete_item(&self, id: &str) -> Result<(), PortError> {
        let mut state = self.lock();
        state.calls.push(PortCall::Delete { id: id.to_string() });
        if let Some(err) = state.id_failures.get(id) {
            return Err(err.clone());
        }
        match state.items.remove(id) {
            Some(_) => Ok(()),
            None => Err(PortError::NotFound { id: id.to_string() }),
        }
    }
}
