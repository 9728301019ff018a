//! Extension-local persistent storage.
//!
//! The only durable state is the per-origin saved selection rectangle,
//! stored under `selection:<origin>`. The slide session itself is never
//! persisted.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::geometry::Rect;

/// Key under which the selection for `origin` is stored.
#[must_use]
pub fn selection_key(origin: &str) -> String {
    format!("selection:{origin}")
}

/// Origin (`scheme://host[:port]`) of a page URL.
pub fn origin_of(page_url: &str) -> Result<String> {
    let parsed = url::Url::parse(page_url).with_context(|| format!("invalid page URL {page_url}"))?;
    Ok(parsed.origin().ascii_serialization())
}

/// JSON key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Persist `rect` as the saved selection of `origin`.
pub async fn save_selection(store: &dyn KeyValueStore, origin: &str, rect: Rect) -> Result<()> {
    let value = serde_json::to_value(rect).context("failed to encode selection")?;
    store.set(&selection_key(origin), value).await
}

/// Saved selection of `origin`, if any.
pub async fn load_selection(store: &dyn KeyValueStore, origin: &str) -> Result<Option<Rect>> {
    match store.get(&selection_key(origin)).await? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("corrupt selection for {origin}")),
    }
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&entries).context("failed to encode store")?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        tracing::debug!("Stored {} in {}", key, self.path.display());
        Ok(())
    }
}
