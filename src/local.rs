use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::storage::{Storage, SUGGESTIONS_SLOT};
use crate::store::SuggestionStore;
use crate::sync::ChangeFeed;
use crate::types::{sort_newest_first, Status, Suggestion, SuggestionDraft};

/// Local fallback: the whole list lives as JSON in a single storage slot.
///
/// There is no cross-client propagation in this mode, so the change feed is
/// disabled and callers refresh after their own writes.
pub struct LocalStore<S: Storage> {
    storage: S,
    // Serializes read-modify-write cycles on the slot.
    write_lock: Mutex<()>,
    feed: ChangeFeed,
}

impl<S: Storage> LocalStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage, write_lock: Mutex::new(()), feed: ChangeFeed::disabled() }
    }

    pub fn storage(&self) -> &S { &self.storage }

    async fn load(&self) -> StoreResult<Vec<Suggestion>> {
        let raw = self.storage.get_slot(SUGGESTIONS_SLOT).await.map_err(StoreError::Unavailable)?;
        let Some(raw) = raw else { return Ok(Vec::new()) };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut list: Vec<Suggestion> = serde_json::from_str(&raw)
            .context("local suggestion slot is corrupt")
            .map_err(StoreError::Unavailable)?;
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn save(&self, list: &[Suggestion]) -> StoreResult<()> {
        let payload = serde_json::to_string(list).map_err(StoreError::unavailable)?;
        self.storage
            .put_slot(SUGGESTIONS_SLOT, &payload)
            .await
            .map_err(StoreError::Unavailable)
    }
}

#[async_trait]
impl<S: Storage> SuggestionStore for LocalStore<S> {
    async fn list(&self) -> StoreResult<Vec<Suggestion>> {
        self.load().await
    }

    async fn create(&self, draft: &SuggestionDraft) -> StoreResult<Suggestion> {
        let valid = draft.validate()?;
        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await?;

        let created = Suggestion {
            id: uuid::Uuid::new_v4().to_string(),
            title: valid.title,
            kind: valid.kind,
            details: valid.details,
            status: Status::Pending,
            created_at: Utc::now(),
        };
        list.insert(0, created.clone());
        sort_newest_first(&mut list);
        self.save(&list).await?;

        info!(id = %created.id, title = %created.title, "suggestion created");
        Ok(created)
    }

    async fn set_status(&self, id: &str, status: Status) -> StoreResult<Suggestion> {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await?;
        let entry = list
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.status = status;
        let updated = entry.clone();
        self.save(&list).await?;

        debug!(%id, %status, "suggestion status set");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await?;
        let before = list.len();
        list.retain(|s| s.id != id);
        if list.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(&list).await?;

        info!(%id, "suggestion removed");
        Ok(())
    }

    fn changes(&self) -> &ChangeFeed { &self.feed }

    fn backend(&self) -> &'static str { "local" }
}
