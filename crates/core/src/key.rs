use std::fmt;

use serde::Serialize;

/// The value used to pair a desired item with an observed item.
///
/// A `Stable` key is an identifier assigned by the remote system. A
/// `Business` key is derived from the desired item's identifying fields and
/// is only used while no identifier is known. Keeping the two apart in the
/// type means a synthetic key can never collide with a real identifier that
/// happens to render to the same string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CorrelationKey<B> {
    Stable(String),
    Business(B),
}

impl<B> CorrelationKey<B> {
    /// The remote identifier, if this key is one.
    pub fn stable_id(&self) -> Option<&str> {
        match self {
            CorrelationKey::Stable(id) => Some(id),
            CorrelationKey::Business(_) => None,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, CorrelationKey::Stable(_))
    }
}

impl<B: fmt::Display> fmt::Display for CorrelationKey<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationKey::Stable(id) => write!(f, "id:{}", id),
            CorrelationKey::Business(key) => write!(f, "new:{}", key),
        }
    }
}
