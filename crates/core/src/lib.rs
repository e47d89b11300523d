//! Shared seams for converge reconcilers.
//!
//! This crate holds no algorithms. It defines the capability set an item
//! kind must expose to be reconciled ([`ItemKind`]), the key that links a
//! desired item to an observed one ([`CorrelationKey`]), field-level
//! comparison helpers used by item-kind comparators, and the
//! [`MutationPort`] through which the engine talks to the remote system.

pub mod compare;
mod error;
mod key;
mod kind;
mod port;

pub use error::PortError;
pub use key::CorrelationKey;
pub use kind::ItemKind;
pub use port::MutationPort;
