use anyhow::Result;
use async_trait::async_trait;

/// Slot holding the serialized suggestion list in local fallback mode.
pub const SUGGESTIONS_SLOT: &str = "suggestions";

/// String-keyed slot storage: one opaque value per key.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_slot(&self, key: &str) -> Result<Option<String>>;
    async fn put_slot(&self, key: &str, value: &str) -> Result<()>;
}
