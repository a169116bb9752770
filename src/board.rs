//! Headless view state for the site: which page is showing and what the
//! suggestion box currently displays. Rendering is someone else's problem.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::SuggestionStore;
use crate::sync::{PollHandle, Subscription};
use crate::types::{sort_newest_first, Suggestion, SuggestionDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    GetStarted,
    Suggest,
    Donate,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Home, Page::GetStarted, Page::Suggest, Page::Donate];

    pub fn slug(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::GetStarted => "get-started",
            Page::Suggest => "suggest",
            Page::Donate => "donate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::GetStarted => "Get Started",
            Page::Suggest => "Suggestion Box",
            Page::Donate => "Donate",
        }
    }

    /// Unknown slugs land on the home page.
    pub fn from_slug(slug: &str) -> Page {
        Page::ALL
            .into_iter()
            .find(|p| p.slug().eq_ignore_ascii_case(slug.trim()))
            .unwrap_or_default()
    }
}

/// Navigation state, passed around explicitly.
#[derive(Debug, Clone, Default)]
pub struct Site {
    page: Page,
}

impl Site {
    pub fn page(&self) -> Page { self.page }

    pub fn navigate(&mut self, slug: &str) -> Page {
        self.page = Page::from_slug(slug);
        self.page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient, user-visible message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub kind: NoticeKind,
}

impl Notice {
    fn info(title: &str, description: impl Into<String>) -> Self {
        Self { title: title.to_string(), description: description.into(), kind: NoticeKind::Info }
    }

    fn error(description: impl Into<String>) -> Self {
        Self { title: "Error".to_string(), description: description.into(), kind: NoticeKind::Error }
    }
}

/// The suggestion box: cached list, admin flag and pending notices.
///
/// Admin mode is a local, unauthenticated toggle. It hides the status and
/// delete actions from casual visitors and secures nothing.
pub struct SuggestionBoard {
    store: Arc<dyn SuggestionStore>,
    items: Vec<Suggestion>,
    admin: bool,
    notices: Vec<Notice>,
    stale: Arc<AtomicBool>,
    subscription: Option<Subscription>,
    poller: Option<PollHandle>,
}

impl SuggestionBoard {
    pub fn new(store: Arc<dyn SuggestionStore>) -> Self {
        Self {
            store,
            items: Vec::new(),
            admin: false,
            notices: Vec::new(),
            stale: Arc::new(AtomicBool::new(false)),
            subscription: None,
            poller: None,
        }
    }

    pub fn items(&self) -> &[Suggestion] { &self.items }
    pub fn is_admin(&self) -> bool { self.admin }
    pub fn is_open(&self) -> bool { self.subscription.is_some() }
    pub fn is_stale(&self) -> bool { self.stale.load(Ordering::Acquire) }

    pub fn toggle_admin(&mut self) -> bool {
        self.admin = !self.admin;
        self.admin
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Start listening for changes, including writes by other clients when the
    /// backend can detect them, and load the list.
    pub async fn open(&mut self) {
        if self.subscription.is_none() {
            let stale = self.stale.clone();
            self.subscription = Some(self.store.changes().subscribe(move |event| {
                debug!(?event, "suggestions changed");
                stale.store(true, Ordering::Release);
            }));
            self.poller = self.store.watch();
        }
        self.refresh().await;
    }

    /// Leaving the view: stop polling and drop the subscription so neither leaks.
    pub fn close(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(sub) = self.subscription.take() {
            self.store.changes().unsubscribe(sub);
        }
    }

    /// Reload from the store. On failure the last known list is kept.
    pub async fn refresh(&mut self) -> bool {
        self.stale.store(false, Ordering::Release);
        match self.store.list().await {
            Ok(list) => {
                self.items = list;
                true
            }
            Err(e) => {
                warn!("loading suggestions failed: {e}");
                self.notices.push(Notice::error(format!("Could not load suggestions: {e}")));
                false
            }
        }
    }

    pub async fn sync_if_stale(&mut self) -> bool {
        if self.stale.swap(false, Ordering::AcqRel) {
            self.refresh().await
        } else {
            false
        }
    }

    pub async fn submit(&mut self, draft: &SuggestionDraft) -> StoreResult<Suggestion> {
        match self.store.create(draft).await {
            Ok(created) => {
                self.items.retain(|s| s.id != created.id);
                self.items.push(created.clone());
                sort_newest_first(&mut self.items);
                self.notices.push(Notice::info(
                    "Success!",
                    "Your suggestion has been submitted. Thank you!",
                ));
                Ok(created)
            }
            Err(e) => {
                self.notices.push(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Flip a suggestion's status. Ignored outside admin mode.
    pub async fn toggle(&mut self, id: &str) -> StoreResult<()> {
        if !self.admin {
            return Ok(());
        }
        let Some(idx) = self.items.iter().position(|s| s.id == id) else {
            return Err(self.fail(StoreError::NotFound(id.to_string())));
        };

        let previous = self.items[idx].status;
        self.items[idx].status = previous.toggled();
        match self.store.set_status(id, previous.toggled()).await {
            Ok(updated) => {
                if let Some(item) = self.items.iter_mut().find(|s| s.id == id) {
                    *item = updated;
                }
                Ok(())
            }
            Err(e) => {
                if let Some(item) = self.items.iter_mut().find(|s| s.id == id) {
                    item.status = previous;
                }
                Err(self.fail(e))
            }
        }
    }

    /// Delete a suggestion. Ignored outside admin mode.
    pub async fn remove(&mut self, id: &str) -> StoreResult<()> {
        if !self.admin {
            return Ok(());
        }
        let Some(idx) = self.items.iter().position(|s| s.id == id) else {
            return Err(self.fail(StoreError::NotFound(id.to_string())));
        };

        let removed = self.items.remove(idx);
        match self.store.delete(id).await {
            Ok(()) => {
                self.notices.push(Notice::info("Removed", "Suggestion has been removed"));
                Ok(())
            }
            Err(e) => {
                let at = idx.min(self.items.len());
                self.items.insert(at, removed);
                Err(self.fail(e))
            }
        }
    }

    fn fail(&mut self, e: StoreError) -> StoreError {
        self.notices.push(Notice::error(e.to_string()));
        e
    }
}

impl Drop for SuggestionBoard {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ChangeFeed;
    use crate::types::{ContentType, Status};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory store whose writes can be made to fail.
    struct FlakyStore {
        rows: Mutex<Vec<Suggestion>>,
        failing: AtomicBool,
        feed: ChangeFeed,
        watches: std::sync::atomic::AtomicUsize,
    }

    impl FlakyStore {
        fn with(rows: Vec<Suggestion>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                failing: AtomicBool::new(false),
                feed: ChangeFeed::new(),
                watches: Default::default(),
            })
        }

        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable(anyhow::anyhow!("offline")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SuggestionStore for FlakyStore {
        async fn list(&self) -> StoreResult<Vec<Suggestion>> {
            self.check()?;
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn create(&self, draft: &SuggestionDraft) -> StoreResult<Suggestion> {
            let v = draft.validate()?;
            self.check()?;
            let s = Suggestion {
                id: format!("r{}", self.rows.lock().unwrap().len() + 1),
                title: v.title,
                kind: v.kind,
                details: v.details,
                status: Status::Pending,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().insert(0, s.clone());
            self.feed.publish(crate::sync::ChangeEvent::Inserted);
            Ok(s)
        }

        async fn set_status(&self, id: &str, status: Status) -> StoreResult<Suggestion> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|s| s.id == id).ok_or_else(|| StoreError::NotFound(id.into()))?;
            row.status = status;
            Ok(row.clone())
        }

        async fn delete(&self, id: &str) -> StoreResult<()> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|s| s.id != id);
            if rows.len() == before { Err(StoreError::NotFound(id.into())) } else { Ok(()) }
        }

        fn changes(&self) -> &ChangeFeed { &self.feed }
        fn backend(&self) -> &'static str { "flaky" }

        fn watch(&self) -> Option<PollHandle> {
            self.watches.fetch_add(1, Ordering::SeqCst);
            Some(PollHandle::new(tokio::spawn(std::future::pending())))
        }
    }

    fn row(id: &str) -> Suggestion {
        Suggestion {
            id: id.into(),
            title: id.into(),
            kind: ContentType::Movies,
            details: None,
            status: Status::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_pages_fall_back_to_home() {
        let mut site = Site::default();
        assert_eq!(site.navigate("donate"), Page::Donate);
        assert_eq!(site.navigate("nowhere"), Page::Home);
        assert_eq!(Page::from_slug("Get-Started"), Page::GetStarted);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_list() {
        let store = FlakyStore::with(vec![row("a")]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;
        assert_eq!(board.items().len(), 1);

        store.failing.store(true, Ordering::SeqCst);
        assert!(!board.refresh().await);
        assert_eq!(board.items().len(), 1);
        assert_eq!(board.take_notices()[0].kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn actions_are_ignored_outside_admin_mode() {
        let store = FlakyStore::with(vec![row("a")]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;

        board.toggle("a").await.unwrap();
        board.remove("a").await.unwrap();
        assert_eq!(store.rows.lock().unwrap()[0].status, Status::Pending);
        assert_eq!(board.items().len(), 1);
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back() {
        let store = FlakyStore::with(vec![row("a")]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;
        board.toggle_admin();

        store.failing.store(true, Ordering::SeqCst);
        assert!(board.toggle("a").await.is_err());
        assert_eq!(board.items()[0].status, Status::Pending);

        store.failing.store(false, Ordering::SeqCst);
        board.toggle("a").await.unwrap();
        assert_eq!(board.items()[0].status, Status::Added);
    }

    #[tokio::test]
    async fn failed_remove_restores_position() {
        let store = FlakyStore::with(vec![row("a"), row("b"), row("c")]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;
        board.toggle_admin();

        store.failing.store(true, Ordering::SeqCst);
        assert!(board.remove("b").await.is_err());
        let ids: Vec<_> = board.items().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn change_events_mark_the_board_stale() {
        let store = FlakyStore::with(vec![]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;

        store.create(&SuggestionDraft::new(Some(ContentType::Music), "Blue", None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(board.is_stale());
        assert!(board.sync_if_stale().await);
        assert_eq!(board.items().len(), 1);
        assert!(!board.is_stale());
    }

    #[tokio::test]
    async fn close_unsubscribes() {
        let store = FlakyStore::with(vec![]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;
        assert!(board.is_open());

        board.close();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!board.is_open());
        assert_eq!(store.feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn open_starts_one_watcher_until_closed() {
        let store = FlakyStore::with(vec![]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;
        board.open().await;
        assert_eq!(store.watches.load(Ordering::SeqCst), 1);
        assert!(board.poller.is_some());

        board.close();
        assert!(board.poller.is_none());
        board.open().await;
        assert_eq!(store.watches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_submission_notifies_and_changes_nothing() {
        let store = FlakyStore::with(vec![]);
        let mut board = SuggestionBoard::new(store.clone());
        board.open().await;

        let err = board.submit(&SuggestionDraft::new(None, "Heat", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(board.items().is_empty());
        assert_eq!(board.take_notices()[0].description, "Please fill in all required fields");
    }
}
