//! Sync driver: push the association map to the remote system.
//!
//! Three phases run in a fixed order. Deletes go first so uniqueness
//! constraints on the remote side are freed before anything is created, and
//! no update is spent on an item about to disappear. Creates follow, then
//! updates.
//!
//! A failed call never stops the pass. The failure is recorded and the next
//! item is attempted; once all phases are done, every failure is returned
//! together. Completed steps are not rolled back, so a partial failure means
//! "retry on the next pass".

use std::fmt;

use converge_core::{CorrelationKey, ItemKind, MutationPort, PortError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::association::{Association, AssociationKey, AssociationMap};

/// A sync phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Delete,
    Create,
    Update,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Delete => write!(f, "delete"),
            Phase::Create => write!(f, "create"),
            Phase::Update => write!(f, "update"),
        }
    }
}

/// A newly created item: the key it was correlated under before creation,
/// and the identifier the remote system assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedItem<B> {
    pub key: CorrelationKey<B>,
    pub id: String,
}

/// What a sync pass got done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary<B> {
    pub deleted: Vec<String>,
    pub created: Vec<CreatedItem<B>>,
    pub updated: Vec<String>,
    /// Observed items left in place because pruning is disabled.
    pub skipped: Vec<String>,
}

impl<B> SyncSummary<B> {
    pub fn new() -> Self {
        Self {
            deleted: Vec::new(),
            created: Vec::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// `(previous key, new identifier)` for each created item.
    pub fn created_ids(&self) -> impl Iterator<Item = (&CorrelationKey<B>, &str)> {
        self.created.iter().map(|c| (&c.key, c.id.as_str()))
    }

    /// Number of successful mutations.
    pub fn mutations(&self) -> usize {
        self.deleted.len() + self.created.len() + self.updated.len()
    }
}

impl<B> Default for SyncSummary<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// One failed remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure<B> {
    pub phase: Phase,
    pub key: CorrelationKey<B>,
    pub error: PortError,
}

impl<B: fmt::Display> fmt::Display for ItemFailure<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.phase, self.key, self.error)
    }
}

/// Every failure of a sync pass, alongside what did succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailures<B> {
    pub kind: &'static str,
    /// Number of remote calls issued.
    pub attempted: usize,
    pub failures: Vec<ItemFailure<B>>,
    pub completed: SyncSummary<B>,
}

impl<B: fmt::Display> fmt::Display for SyncFailures<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} {} operation(s) failed: ",
            self.failures.len(),
            self.attempted,
            self.kind
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl<B: fmt::Debug + fmt::Display> std::error::Error for SyncFailures<B> {}

/// Errors returned by [`sync`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError<B: fmt::Debug + fmt::Display> {
    /// No parent identifier to scope mutations to; nothing was attempted.
    #[error("cannot sync {kind} items: parent identifier is empty")]
    MissingParent { kind: &'static str },

    /// Some calls failed after every eligible item was attempted.
    #[error(transparent)]
    Partial(#[from] SyncFailures<B>),
}

/// Sync with pruning enabled.
pub async fn sync<K, P>(
    parent: &str,
    map: &mut AssociationMap<K>,
    port: &P,
) -> Result<SyncSummary<K::BusinessKey>, SyncError<K::BusinessKey>>
where
    K: ItemKind,
    P: MutationPort<K> + ?Sized,
{
    sync_with(parent, map, port, true).await
}

/// Run the delete, create, and update phases against `port`.
///
/// `map` is updated as calls succeed: deleted associations are removed,
/// created ones are re-keyed under their new identifier and marked up to
/// date, updated ones are marked up to date. With `prune` off, observed-only
/// associations are left in the map untouched and listed as skipped.
pub async fn sync_with<K, P>(
    parent: &str,
    map: &mut AssociationMap<K>,
    port: &P,
    prune: bool,
) -> Result<SyncSummary<K::BusinessKey>, SyncError<K::BusinessKey>>
where
    K: ItemKind,
    P: MutationPort<K> + ?Sized,
{
    if parent.trim().is_empty() {
        return Err(SyncError::MissingParent { kind: K::NAME });
    }

    let mut summary = SyncSummary::new();
    let mut failures = Vec::new();
    let mut attempted = 0;

    // ── Delete ──────────────────────────────────────────────────────────
    let to_delete: Vec<AssociationKey<K>> = map.to_delete().into_iter().cloned().collect();
    for key in to_delete {
        let Some(id) = map.get(&key).and_then(|a| a.observed_id()).map(str::to_string) else {
            continue;
        };
        if !prune {
            debug!(kind = K::NAME, parent_key = parent, id = %id, "Pruning disabled; leaving item");
            summary.skipped.push(id);
            continue;
        }
        attempted += 1;
        match port.delete_item(&id).await {
            Ok(()) => {
                map.remove(&key);
                info!(kind = K::NAME, parent_key = parent, id = %id, "Deleted item");
                summary.deleted.push(id);
            }
            Err(error) => {
                warn!(
                    kind = K::NAME,
                    parent_key = parent,
                    id = %id,
                    error = %error,
                    "Delete failed"
                );
                failures.push(ItemFailure {
                    phase: Phase::Delete,
                    key,
                    error,
                });
            }
        }
    }

    // ── Create ──────────────────────────────────────────────────────────
    let to_create: Vec<AssociationKey<K>> = map.to_create().into_iter().cloned().collect();
    for key in to_create {
        let Some(desired) = map.get(&key).and_then(|a| a.desired()).cloned() else {
            continue;
        };
        attempted += 1;
        match port.create_item(parent, &desired).await {
            Ok(observed) => {
                let id = K::observed_id(&observed).to_string();
                let new_key = CorrelationKey::Stable(id.clone());
                // The existing association keeps its observed item; the
                // desired one stays pending under its old key.
                if new_key != key && map.contains_key(&new_key) {
                    warn!(
                        kind = K::NAME,
                        parent_key = parent,
                        key = %key,
                        id = %id,
                        "Created item reuses an identifier already in use"
                    );
                    failures.push(ItemFailure {
                        phase: Phase::Create,
                        key,
                        error: PortError::Conflict {
                            message: format!("identifier {} is already held by another item", id),
                        },
                    });
                    continue;
                }
                let mut desired = desired;
                K::assign_id(&mut desired, &id);
                map.remove(&key);
                map.insert(new_key, Association::created(desired, observed));
                info!(kind = K::NAME, parent_key = parent, key = %key, id = %id, "Created item");
                summary.created.push(CreatedItem { key, id });
            }
            Err(error) => {
                warn!(
                    kind = K::NAME,
                    parent_key = parent,
                    key = %key,
                    error = %error,
                    "Create failed"
                );
                failures.push(ItemFailure {
                    phase: Phase::Create,
                    key,
                    error,
                });
            }
        }
    }

    // ── Update ──────────────────────────────────────────────────────────
    let to_update: Vec<AssociationKey<K>> = map.to_update().into_iter().cloned().collect();
    for key in to_update {
        let Some((id, desired)) = map.get(&key).and_then(|a| {
            Some((a.observed_id()?.to_string(), a.desired()?.clone()))
        }) else {
            continue;
        };
        attempted += 1;
        match port.update_item(&id, &desired).await {
            Ok(()) => {
                if let Some(association) = map.get_mut(&key) {
                    association.mark_synced();
                }
                info!(kind = K::NAME, parent_key = parent, id = %id, "Updated item");
                summary.updated.push(id);
            }
            Err(error) => {
                warn!(
                    kind = K::NAME,
                    parent_key = parent,
                    id = %id,
                    error = %error,
                    "Update failed"
                );
                failures.push(ItemFailure {
                    phase: Phase::Update,
                    key,
                    error,
                });
            }
        }
    }

    info!(
        kind = K::NAME,
        parent_key = parent,
        deleted = summary.deleted.len(),
        created = summary.created.len(),
        updated = summary.updated.len(),
        skipped = summary.skipped.len(),
        failed = failures.len(),
        "Sync finished"
    );

    if failures.is_empty() {
        Ok(summary)
    } else {
        Err(SyncError::Partial(SyncFailures {
            kind: K::NAME,
            attempted,
            failures,
            completed: summary,
        }))
    }
}
