use async_trait::async_trait;

use crate::error::PortError;
use crate::kind::ItemKind;

/// The write side of the remote system, as seen by the sync driver.
///
/// One implementation per remote API client. The engine issues calls one at
/// a time and treats each as atomic: it observes success or failure and
/// moves on. Retry, backoff, and timeouts are the implementation's concern.
///
/// Implementations must be `Send + Sync` so one client can be shared by
/// reconcile passes for different parent resources.
#[async_trait]
pub trait MutationPort<K: ItemKind>: Send + Sync {
    /// Create `desired` under the parent resource `parent` and return the
    /// item as the remote system now reports it, including its new identifier.
    async fn create_item(
        &self,
        parent: &str,
        desired: &K::Desired,
    ) -> Result<K::Observed, PortError>;

    /// Bring the item `id` in line with the attributes of `desired`.
    async fn update_item(&self, id: &str, desired: &K::Desired) -> Result<(), PortError>;

    /// Remove the item `id`.
    async fn delete_item(&self, id: &str) -> Result<(), PortError>;
}
