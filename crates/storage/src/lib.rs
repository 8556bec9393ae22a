use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

mod dir;
mod sqlite;

pub use dir::DirDraftStore;
pub use sqlite::SqliteDraftStore;

/// Durable name → blob map holding serialized drafts. Writes are
/// last-writer-wins; nothing is merged.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Stores `blob` under `name`. Returns `true` when an existing draft was replaced.
    async fn put(&self, name: &str, blob: &str) -> Result<bool>;
    async fn get(&self, name: &str) -> Result<Option<String>>;
    /// All known draft names, sorted.
    async fn list(&self) -> Result<Vec<String>>;
    /// Human-readable location of a draft, for status messages.
    fn location(&self, name: &str) -> String;
}

pub fn validate_draft_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("draft name cannot be empty");
    }
    if trimmed != name {
        bail!("draft name '{name}' has leading or trailing whitespace");
    }
    if name.contains('/') || name.contains('\\') {
        bail!("draft name '{name}' must not contain path separators");
    }
    if name.starts_with('.') {
        bail!("draft name '{name}' must not start with '.'");
    }
    Ok(())
}

#[derive(Default)]
pub struct MemoryDraftStore {
    drafts: RwLock<BTreeMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn put(&self, name: &str, blob: &str) -> Result<bool> {
        validate_draft_name(name)?;
        let previous = self
            .drafts
            .write()
            .await
            .insert(name.to_string(), blob.to_string());
        Ok(previous.is_some())
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.drafts.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.drafts.read().await.keys().cloned().collect())
    }

    fn location(&self, name: &str) -> String {
        format!("memory:{name}")
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
