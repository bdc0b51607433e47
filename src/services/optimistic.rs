//! Optimistic relation toggles: show the new value at once, confirm against the
//! server, restore the exact previous value if the request fails.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::SyncResult;
use crate::models::RelationKey;
use crate::repositories::RestApi;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Request succeeded; `value` is what the store now holds.
    Confirmed {
        previous: Option<bool>,
        value: Option<bool>,
    },
    /// Request failed; the store holds `restored` again and shows `error`.
    RolledBack {
        restored: Option<bool>,
        error: String,
        error_id: Uuid,
    },
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed { .. })
    }
}

#[derive(Clone)]
pub struct OptimisticCoordinator {
    store: Store,
    api: Arc<dyn RestApi>,
}

impl OptimisticCoordinator {
    pub fn new(store: Store, api: Arc<dyn RestApi>) -> Self {
        Self { store, api }
    }

    /// Set `key` to `value` through [`RestApi::set_relation`].
    pub async fn mutate(&self, key: RelationKey, value: bool) -> MutationOutcome {
        let api = self.api.clone();
        self.mutate_with(key, value, async move { api.set_relation(key, value).await })
            .await
    }

    /// Same flow with a caller-supplied request. The key stays mutable while the
    /// request is in flight; a second mutation snapshots whatever is visible then.
    #[instrument(skip(self, request), fields(key = %key))]
    pub async fn mutate_with<F>(&self, key: RelationKey, value: bool, request: F) -> MutationOutcome
    where
        F: Future<Output = SyncResult<()>>,
    {
        let previous = self.store.begin_mutation(key, value).await;
        debug!(?previous, value, "optimistic value applied");

        match request.await {
            Ok(()) => {
                let authoritative = match self.api.fetch_relation(key).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "refetch failed; keeping optimistic value");
                        None
                    }
                };
                self.store.confirm_mutation(key, authoritative).await;
                let value = self.store.relation(key).await;
                debug!(?value, "mutation confirmed");
                MutationOutcome::Confirmed { previous, value }
            }
            Err(e) => {
                let error = e.user_message();
                let error_id = self
                    .store
                    .rollback_mutation(key, previous, error.clone())
                    .await;
                info!(error = %e, ?previous, "mutation rolled back");
                MutationOutcome::RolledBack {
                    restored: previous,
                    error,
                    error_id,
                }
            }
        }
    }
}
