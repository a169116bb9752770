//! Hosted suggestion table reached over a PostgREST-style HTTP API.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::BackendConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::SuggestionStore;
use crate::sync::{ChangeEvent, ChangeFeed, PollHandle};
use crate::types::{sort_newest_first, Status, Suggestion, SuggestionDraft};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETURN_ROWS: &str = "return=representation";

#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    table_url: Url,
    api_key: String,
    poll_interval: Duration,
    feed: ChangeFeed,
}

impl RemoteStore {
    pub fn new(cfg: &BackendConfig) -> anyhow::Result<Self> {
        let table_url = cfg
            .url
            .join("rest/v1/")
            .and_then(|u| u.join(&cfg.table))
            .with_context(|| format!("building table url for {}", cfg.table))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            table_url,
            api_key: cfg.api_key.clone(),
            poll_interval: cfg.poll_interval,
            feed: ChangeFeed::new(),
        })
    }

    pub fn table_url(&self) -> &Url { &self.table_url }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
    }

    async fn rows<T: serde::de::DeserializeOwned>(&self, req: RequestBuilder) -> StoreResult<Vec<T>> {
        let resp = ensure_success(req.send().await?).await?;
        let rows = resp.json::<Vec<T>>().await?;
        Ok(rows)
    }

    /// Cheap snapshot of the table used to detect changes made by other clients.
    async fn fingerprint(&self) -> StoreResult<Vec<Value>> {
        self.rows(
            self.request(Method::GET)
                .query(&[("select", "id,status"), ("order", "created_at.desc")]),
        )
        .await
    }

    /// Watch the table for changes made elsewhere and publish them on the feed.
    /// Polling stops when the returned handle is dropped.
    pub fn start_polling(&self) -> PollHandle {
        let store = self.clone();
        let every = self.poll_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<Vec<Value>> = None;
            loop {
                ticker.tick().await;
                match store.fingerprint().await {
                    Ok(now) => {
                        if last.as_ref().is_some_and(|prev| *prev != now) {
                            debug!("remote table changed");
                            store.feed.publish(ChangeEvent::Refreshed);
                        }
                        last = Some(now);
                    }
                    // Next tick tries again; the baseline is kept.
                    Err(e) => warn!("polling suggestion table failed: {e}"),
                }
            }
        });
        info!(interval_secs = every.as_secs(), "polling remote suggestion table");
        PollHandle::new(task)
    }
}

#[async_trait]
impl SuggestionStore for RemoteStore {
    async fn list(&self) -> StoreResult<Vec<Suggestion>> {
        let mut list: Vec<Suggestion> = self
            .rows(
                self.request(Method::GET)
                    .query(&[("select", "*"), ("order", "created_at.desc")]),
            )
            .await?;
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn create(&self, draft: &SuggestionDraft) -> StoreResult<Suggestion> {
        let valid = draft.validate()?;
        let created: Vec<Suggestion> = self
            .rows(self.request(Method::POST).header("Prefer", RETURN_ROWS).json(&valid))
            .await?;
        let created = created
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unavailable(anyhow!("backend returned no row for insert")))?;

        info!(id = %created.id, title = %created.title, "suggestion created");
        self.feed.publish(ChangeEvent::Inserted);
        Ok(created)
    }

    async fn get(&self, id: &str) -> StoreResult<Suggestion> {
        let filter = format!("eq.{id}");
        let found: Vec<Suggestion> = self
            .rows(self.request(Method::GET).query(&[("select", "*"), ("id", filter.as_str())]))
            .await?;
        found.into_iter().next().ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_status(&self, id: &str, status: Status) -> StoreResult<Suggestion> {
        let updated: Vec<Suggestion> = self
            .rows(
                self.request(Method::PATCH)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", RETURN_ROWS)
                    .json(&json!({ "status": status })),
            )
            .await?;
        let updated = updated.into_iter().next().ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        debug!(%id, %status, "suggestion status set");
        self.feed.publish(ChangeEvent::Updated);
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let removed: Vec<Value> = self
            .rows(
                self.request(Method::DELETE)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", RETURN_ROWS),
            )
            .await?;
        if removed.is_empty() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        info!(%id, "suggestion removed");
        self.feed.publish(ChangeEvent::Deleted);
        Ok(())
    }

    fn changes(&self) -> &ChangeFeed { &self.feed }

    fn backend(&self) -> &'static str { "remote" }

    fn watch(&self) -> Option<PollHandle> {
        Some(self.start_polling())
    }
}

async fn ensure_success(resp: Response) -> StoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Unavailable(anyhow!("backend returned {status}: {body}")))
}
