use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::local::LocalStore;
use crate::remote::RemoteStore;
use crate::sync::{ChangeFeed, PollHandle};
use crate::types::{Status, Suggestion, SuggestionDraft};

/// CRUD access to the suggestion collection, independent of where it lives.
///
/// The store does no authorization. Gating status changes and deletes behind
/// admin mode is the caller's job.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// All suggestions, newest first.
    async fn list(&self) -> StoreResult<Vec<Suggestion>>;

    /// Validate and persist a new suggestion with status `pending`.
    async fn create(&self, draft: &SuggestionDraft) -> StoreResult<Suggestion>;

    async fn set_status(&self, id: &str, status: Status) -> StoreResult<Suggestion>;

    async fn delete(&self, id: &str) -> StoreResult<()>;

    fn changes(&self) -> &ChangeFeed;

    /// Human readable backend name for logs and the CLI.
    fn backend(&self) -> &'static str;

    /// Start detecting changes made by other clients, if the backend can.
    fn watch(&self) -> Option<PollHandle> {
        None
    }

    async fn get(&self, id: &str) -> StoreResult<Suggestion> {
        self.list()
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Flip between `pending` and `added`. Concurrent togglers race; last write wins.
    async fn toggle_status(&self, id: &str) -> StoreResult<Suggestion> {
        let current = self.get(id).await?;
        self.set_status(id, current.status.toggled()).await
    }
}

/// Pick the backend from configuration: the hosted table when one is
/// configured, the local slot otherwise.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SuggestionStore>> {
    match &config.backend {
        Some(remote) => {
            info!(url = %remote.url, "using hosted suggestion table");
            Ok(Arc::new(RemoteStore::new(remote)?))
        }
        None => {
            let db = Database::open(config.database_url.as_deref()).await?;
            info!("no backend configured, using local storage");
            Ok(Arc::new(LocalStore::new(db)))
        }
    }
}
