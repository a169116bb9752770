//! Change notifications for the suggestion collection.
//!
//! The feed is a live-refresh signal, not a diff stream: subscribers are told
//! that *something* changed and are expected to call `list()` again.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Inserted,
    Updated,
    Deleted,
    /// Detected by polling; the kind of mutation is unknown.
    Refreshed,
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: Option<broadcast::Sender<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx: Some(tx) }
    }

    /// A feed that never delivers anything (local fallback mode).
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_live(&self) -> bool { self.tx.is_some() }

    pub fn publish(&self, event: ChangeEvent) {
        if let Some(tx) = &self.tx {
            // Err only means nobody is listening right now.
            let delivered = tx.send(event).unwrap_or(0);
            trace!(?event, delivered, "published change event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.receiver_count())
    }

    /// Run `on_change` for every change event until the returned handle is
    /// unsubscribed or dropped. Must be called inside a tokio runtime when the
    /// feed is live.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let Some(tx) = &self.tx else {
            return Subscription { task: None };
        };
        let mut rx = tx.subscribe();
        let on_change = Arc::new(on_change);
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => on_change(event),
                    // Missed events still mean the list changed; one refresh covers them all.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "subscriber lagged behind change feed");
                        on_change(ChangeEvent::Refreshed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription { task: Some(task) }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        subscription.cancel();
    }
}

impl Default for ChangeFeed {
    fn default() -> Self { Self::new() }
}

/// Handle to an active subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Background change detector; stops when dropped.
#[must_use = "dropping a PollHandle stops polling"]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
