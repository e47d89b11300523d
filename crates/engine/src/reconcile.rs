//! Entry points for an outer controller.
//!
//! [`observe`] is the read-only half of a pass: it answers "is the remote
//! side up to date?" and "did the desired record change?". [`reconcile`]
//! runs the same observation and then syncs whatever is outstanding.

use converge_core::{ItemKind, MutationPort};
use serde::Serialize;
use tracing::{debug, info};

use crate::association::AssociationMap;
use crate::classify::{classify, BucketSummary};
use crate::config::ReconcileConfig;
use crate::correlate::correlate;
use crate::error::ReconcileError;
use crate::resolve::{resolve_with, Resolution};
use crate::sync::{sync_with, CreatedItem, SyncError, SyncSummary};
use crate::validate::validate_desired;

/// What the outer control loop needs to decide its next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Every association is current; no mutating pass is needed.
    pub resource_up_to_date: bool,
    /// The desired collection was modified and should be persisted.
    pub resource_late_initialized: bool,
    pub summary: BucketSummary,
}

/// Result of [`observe`].
pub struct Observation<K: ItemKind> {
    pub associations: AssociationMap<K>,
    pub resolution: Resolution,
    pub report: ReconcileReport,
}

/// Resolve identifiers on `desired`, then correlate and classify.
///
/// `desired` is modified in place; `report.resource_late_initialized` says
/// whether it was.
pub fn observe<K: ItemKind>(
    desired: &mut [K::Desired],
    observed: &[K::Observed],
    config: &ReconcileConfig,
) -> Observation<K> {
    let resolution = resolve_with::<K>(desired, observed, config.late_initialize);
    let associations = correlate::<K>(desired, observed);
    let summary = classify(&associations).summary;

    let report = ReconcileReport {
        resource_up_to_date: associations.all_current(),
        resource_late_initialized: resolution.changed(),
        summary,
    };

    debug!(
        kind = K::NAME,
        desired = desired.len(),
        observed = observed.len(),
        current = summary.current,
        to_create = summary.to_create,
        to_delete = summary.to_delete,
        to_update = summary.to_update,
        late_initialized = report.resource_late_initialized,
        "Observed"
    );

    Observation {
        associations,
        resolution,
        report,
    }
}

/// Result of a [`reconcile`] pass that completed without error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome<B> {
    /// The report from the observation that preceded the sync.
    pub report: ReconcileReport,
    pub resolution: Resolution,
    /// `None` when everything was already current.
    pub sync: Option<SyncSummary<B>>,
    /// `desired` was modified (identifiers resolved, attributes back-filled,
    /// or identifiers of created items written back).
    pub desired_changed: bool,
}

/// Observe, then sync anything outstanding through `port`.
///
/// An empty `parent` fails the pass before `desired` is touched, even when
/// nothing would need syncing.
///
/// Identifiers of newly created items are written back into `desired`,
/// including when the sync partially fails, so the caller should persist
/// `desired` after an error too.
pub async fn reconcile<K, P>(
    parent: &str,
    desired: &mut [K::Desired],
    observed: &[K::Observed],
    port: &P,
    config: &ReconcileConfig,
) -> Result<ReconcileOutcome<K::BusinessKey>, ReconcileError<K::BusinessKey>>
where
    K: ItemKind,
    P: MutationPort<K> + ?Sized,
{
    if parent.trim().is_empty() {
        return Err(ReconcileError::Sync(SyncError::MissingParent { kind: K::NAME }));
    }
    if config.validate {
        validate_desired::<K>(desired)?;
    }

    let Observation {
        mut associations,
        resolution,
        report,
    } = observe::<K>(desired, observed, config);

    if report.resource_up_to_date {
        return Ok(ReconcileOutcome {
            report,
            desired_changed: resolution.changed(),
            resolution,
            sync: None,
        });
    }

    info!(
        kind = K::NAME,
        parent_key = parent,
        to_create = report.summary.to_create,
        to_delete = report.summary.to_delete,
        to_update = report.summary.to_update,
        "Syncing"
    );

    let result = sync_with(parent, &mut associations, port, config.prune).await;
    let written = match &result {
        Ok(summary) => write_back::<K>(desired, &summary.created),
        Err(SyncError::Partial(failures)) => write_back::<K>(desired, &failures.completed.created),
        Err(SyncError::MissingParent { .. }) => 0,
    };

    let summary = result?;
    Ok(ReconcileOutcome {
        report,
        desired_changed: resolution.changed() || written > 0,
        resolution,
        sync: Some(summary),
    })
}

/// Record identifiers of created items on the desired items they came from.
fn write_back<K: ItemKind>(
    desired: &mut [K::Desired],
    created: &[CreatedItem<K::BusinessKey>],
) -> usize {
    let mut written = 0;
    for item in created {
        let target = desired
            .iter_mut()
            .find(|d| K::correlation_key(d) == item.key);
        if let Some(target) = target {
            if K::desired_id(target) != Some(item.id.as_str()) {
                K::assign_id(target, &item.id);
                written += 1;
            }
        }
    }
    written
}
