use std::fmt;

use serde::Serialize;

use crate::key::CorrelationKey;

/// The capability set a child item kind exposes to the reconciliation engine.
///
/// Implementors are usually zero-sized marker types; the engine only ever
/// calls the associated functions. One implementation exists per kind of
/// child item (gate conditions, profile rule activations, ...) and the same
/// correlate / classify / resolve / sync code runs for all of them.
///
/// ## Identity
///
/// A desired item may or may not carry a stable identifier. Observed items
/// always do. When the desired side has none, the engine falls back to
/// [`ItemKind::business_key`]. [`ItemKind::same_identity`] decides whether an
/// observed item is "the same logical item" as a desired one; the identity
/// resolver uses it to back-fill or repair identifiers.
///
/// ## Comparison
///
/// [`ItemKind::is_up_to_date`] must be total and side-effect free. Optional
/// desired fields that are unset constrain nothing.
pub trait ItemKind: Send + Sync + 'static {
    /// Human-readable kind name used in logs and error messages.
    const NAME: &'static str;

    /// The identifier is chosen by the client (e.g. a rule key) rather than
    /// allocated by the remote system. A desired identifier with no observed
    /// counterpart then means "not created yet", not "stale".
    const CLIENT_ASSIGNED_ID: bool = false;

    /// One element of the user-declared configuration list.
    type Desired: Clone + fmt::Debug + Send + Sync;

    /// One element as currently reported by the remote system.
    type Observed: Clone + fmt::Debug + Send + Sync;

    /// Fields that identify the same logical item before an identifier exists.
    type BusinessKey: Clone + Ord + fmt::Debug + fmt::Display + Serialize + Send + Sync + 'static;

    /// The stable identifier recorded on the desired item, if any.
    fn desired_id(desired: &Self::Desired) -> Option<&str>;

    /// Record a stable identifier on the desired item.
    fn assign_id(desired: &mut Self::Desired, id: &str);

    /// The stable identifier of an observed item.
    fn observed_id(observed: &Self::Observed) -> &str;

    fn business_key(desired: &Self::Desired) -> Self::BusinessKey;

    /// Whether `observed` is the same logical item as `desired`, judged only
    /// on fields that cannot change without changing identity.
    fn same_identity(desired: &Self::Desired, observed: &Self::Observed) -> bool;

    /// Whether every constrained attribute of `desired` matches `observed`.
    fn is_up_to_date(desired: &Self::Desired, observed: &Self::Observed) -> bool;

    /// Fill unset optional attributes of `desired` from `observed`.
    ///
    /// Must not touch the identifier. Returns `true` if anything was filled.
    fn late_initialize(desired: &mut Self::Desired, observed: &Self::Observed) -> bool;

    /// The key this desired item is correlated under.
    fn correlation_key(desired: &Self::Desired) -> CorrelationKey<Self::BusinessKey> {
        match Self::desired_id(desired) {
            Some(id) => CorrelationKey::Stable(id.to_string()),
            None => CorrelationKey::Business(Self::business_key(desired)),
        }
    }
}
