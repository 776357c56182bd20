//! Durable storage for provider histories
//!
//! The store talks to storage through [`HistoryBackend`]. Two backends ship
//! with the crate: one JSON document per provider on disk, and an in-memory
//! map for tests and embedding.

use async_trait::async_trait;
use llmprice_core::error::{LlmPriceError, Result};
use llmprice_core::types::ProviderHistory;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Storage boundary for provider histories.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Load a provider's history, `None` if it was never saved.
    async fn load(&self, provider: &str) -> Result<Option<ProviderHistory>>;

    /// Persist a provider's history, replacing the stored copy.
    ///
    /// Must return an error if the history was not durably written.
    async fn save(&self, history: &ProviderHistory) -> Result<()>;
}

/// Check that a provider id is safe to use as a storage key and file name.
pub fn validate_provider_id(provider: &str) -> Result<()> {
    let valid = !provider.is_empty()
        && !provider.starts_with('.')
        && provider
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(LlmPriceError::InvalidArgument(format!(
            "invalid provider id '{provider}': use ASCII letters, digits, '-', '_' or '.'"
        )))
    }
}

/// One `<provider>.json` file per provider in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Store histories in `dir`, created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the history files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, provider: &str) -> PathBuf {
        self.dir.join(format!("{provider}.json"))
    }

    /// Provider ids with a stored history, sorted
    pub fn list_providers(&self) -> Vec<String> {
        if !self.dir.exists() {
            return Vec::new();
        }

        let mut providers: Vec<String> = walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        providers.sort();
        providers
    }
}

#[async_trait]
impl HistoryBackend for JsonFileBackend {
    async fn load(&self, provider: &str) -> Result<Option<ProviderHistory>> {
        validate_provider_id(provider)?;
        let path = self.path_for(provider);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history for {} at {}", provider, path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let history: ProviderHistory = serde_json::from_str(&content)?;
        if history.provider != provider {
            return Err(LlmPriceError::Config(format!(
                "{} holds history for '{}', expected '{}'",
                path.display(),
                history.provider,
                provider
            )));
        }
        Ok(Some(history))
    }

    async fn save(&self, history: &ProviderHistory) -> Result<()> {
        validate_provider_id(&history.provider)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&history.provider);
        let tmp = self.dir.join(format!(".{}.json.tmp", history.provider));
        let content = serde_json::to_vec_pretty(history)?;

        tokio::fs::write(&tmp, &content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(
            "Saved {} events for {} to {}",
            history.changes.len(),
            history.provider,
            path.display()
        );
        Ok(())
    }
}

/// Histories kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    histories: Mutex<HashMap<String, ProviderHistory>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryBackend {
    async fn load(&self, provider: &str) -> Result<Option<ProviderHistory>> {
        let histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        Ok(histories.get(provider).cloned())
    }

    async fn save(&self, history: &ProviderHistory) -> Result<()> {
        let mut histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        histories.insert(history.provider.clone(), history.clone());
        Ok(())
    }
}
