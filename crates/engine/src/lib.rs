//! Identity-correlating reconciliation engine.
//!
//! Given the desired child items of one parent resource and a snapshot of
//! the same children as observed in a remote system, the engine works out
//! the create / update / delete calls that converge the remote system on
//! the desired state, and keeps item identity stable across passes even
//! when identifiers are unknown or stale.
//!
//! A pass runs in one direction:
//!
//! 1. [`resolve`] back-fills and repairs identifiers on the desired items
//!    (late initialisation).
//! 2. [`correlate`] pairs desired and observed items into an
//!    [`AssociationMap`].
//! 3. [`classify`] and the map's bucket queries report what is current and
//!    what needs work.
//! 4. [`sync`] drives the mutations through a
//!    [`MutationPort`](converge_core::MutationPort), delete → create → update.
//!
//! [`observe`] and [`reconcile`] bundle those steps for an outer controller.

pub mod association;
pub mod classify;
pub mod config;
pub mod correlate;
pub mod error;
pub mod reconcile;
pub mod resolve;
pub mod sync;
pub mod validate;

pub use association::{Association, AssociationKey, AssociationMap};
pub use classify::{classify, Bucket, BucketSummary, Buckets};
pub use config::{ConfigError, ReconcileConfig};
pub use correlate::correlate;
pub use error::ReconcileError;
pub use reconcile::{observe, reconcile, Observation, ReconcileOutcome, ReconcileReport};
pub use resolve::{resolve, resolve_with, IdentityRepair, Resolution};
pub use sync::{
    sync, sync_with, CreatedItem, ItemFailure, Phase, SyncError, SyncFailures, SyncSummary,
};
pub use validate::{validate_desired, ValidationError, ValidationErrors};
