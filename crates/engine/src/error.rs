use std::fmt;

use crate::sync::SyncError;
use crate::validate::ValidationErrors;

/// Errors from a full [`reconcile`](crate::reconcile) pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError<B: fmt::Debug + fmt::Display> {
    /// The desired collection broke the input contract; nothing was mutated.
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Sync(#[from] SyncError<B>),
}
