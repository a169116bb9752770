pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod local;
pub mod mail;
pub mod onboarding;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::board::{Notice, NoticeKind, Page, Site, SuggestionBoard};
    pub use crate::config::Config;
    pub use crate::error::{SendError, StoreError};
    pub use crate::mail::{Email, EmailSender};
    pub use crate::store::SuggestionStore;
    pub use crate::sync::{ChangeEvent, Subscription};
    pub use crate::types::{ContentType, Status, Suggestion, SuggestionDraft};
    pub use crate::PembleBox;
}

use std::sync::Arc;

use anyhow::Result;

use crate::board::SuggestionBoard;
use crate::config::Config;
use crate::error::SendError;
use crate::mail::{mailer_from, EmailSender};
use crate::store::{open_store, SuggestionStore};

/// Library entry point. Owns the configured suggestion store and mail sender.
pub struct PembleBox {
    config: Config,
    store: Arc<dyn SuggestionStore>,
    mailer: Box<dyn EmailSender>,
}

impl PembleBox {
    /// Select the store backend and mailer from configuration. Local mode also
    /// opens (and migrates) the SQLite database.
    pub async fn connect(config: Config) -> Result<Self> {
        let store = open_store(&config).await?;
        let mailer = mailer_from(config.mail.as_ref())?;
        Ok(Self { config, store, mailer })
    }

    /// Assemble from parts; useful when embedding with a custom store or sender.
    pub fn from_parts(config: Config, store: Arc<dyn SuggestionStore>, mailer: Box<dyn EmailSender>) -> Self {
        Self { config, store, mailer }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn store(&self) -> Arc<dyn SuggestionStore> { self.store.clone() }

    /// A fresh suggestion box view over the shared store.
    pub fn board(&self) -> SuggestionBoard { SuggestionBoard::new(self.store.clone()) }

    /// Send an onboarding invite request to the configured admin address.
    pub async fn request_invite(&self, handle: &str) -> Result<(), SendError> {
        onboarding::request_invite(self.mailer.as_ref(), &self.config.admin_email, handle).await
    }
}
