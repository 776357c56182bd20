//! Client-side caches
//!
//! A [`CacheEntry`] pairs a fetched file with the UTC day it was fetched on.
//! The client keeps entries in memory and, when configured, mirrors them to an
//! [`ExternalCache`] so they survive restarts. External caches store plain
//! strings by key; failures there are never fatal to a lookup.

use crate::published::DualDateFile;
use async_trait::async_trait;
use chrono::NaiveDate;
use llmprice_core::error::{LlmPriceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const KEY_PREFIX: &str = "llmprice:";

/// A fetched file and the day it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// UTC day (client clock) of the fetch
    pub fetched_on: NaiveDate,
    /// The fetched file, before any overlay
    pub data: DualDateFile,
}

impl CacheEntry {
    /// Create an entry
    pub fn new(fetched_on: NaiveDate, data: DualDateFile) -> Self {
        Self { fetched_on, data }
    }

    /// Whether the entry was fetched on `today`
    pub fn is_fresh(&self, today: NaiveDate) -> bool {
        self.fetched_on == today
    }

    /// External cache key for a provider
    pub fn key(provider: &str) -> String {
        format!("{KEY_PREFIX}{provider}")
    }
}

/// String key/value store used to persist cache entries across restarts.
#[async_trait]
pub trait ExternalCache: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// External cache held in process memory
#[derive(Debug, Default)]
pub struct MemoryCache {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExternalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// External cache storing one file per key in a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Cache in `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under the platform cache directory (`~/.cache/llmprice` on Linux)
    pub fn in_default_dir() -> Result<Self> {
        let base = dirs::cache_dir()
            .ok_or_else(|| LlmPriceError::Config("Cannot determine cache directory".into()))?;
        Ok(Self::new(base.join("llmprice")))
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl ExternalCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LlmPriceError::Cache(format!("cannot read '{key}': {e}"))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| LlmPriceError::Cache(format!("cannot create cache dir: {e}")))?;
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|e| LlmPriceError::Cache(format!("cannot write '{key}': {e}")))
    }
}
