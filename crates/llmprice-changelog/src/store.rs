//! Change-log store
//!
//! Owns the read → diff → append → write cycle for provider histories. Each
//! provider has its own async lock so two applies for the same provider never
//! interleave, while different providers proceed independently.

use crate::backend::{HistoryBackend, validate_provider_id};
use crate::diff::diff;
use crate::snapshot::{ProviderSnapshot, provider_snapshot, snapshot};
use chrono::{DateTime, Utc};
use llmprice_core::error::Result;
use llmprice_core::provider::PriceSource;
use llmprice_core::types::{ChangeEvent, PriceRecord, ProviderHistory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Append-only price history per provider on top of a storage backend
pub struct ChangeLogStore<B> {
    backend: B,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<B: HistoryBackend> ChangeLogStore<B> {
    /// Create a store over `backend`
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying storage backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn provider_lock(&self, provider: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Record a freshly observed price list for a provider.
    ///
    /// Returns the events appended to the history, empty when nothing
    /// changed. The history is saved even then so `last_crawled` advances.
    /// Any storage error is returned; events are only reported once saved.
    pub async fn apply_observed_prices(
        &self,
        provider: &str,
        source_url: &str,
        new_prices: &[PriceRecord],
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>> {
        validate_provider_id(provider)?;
        for record in new_prices {
            record.validate()?;
        }

        let lock = self.provider_lock(provider).await;
        let _guard = lock.lock().await;

        let mut history = match self.backend.load(provider).await? {
            Some(history) => history,
            None => {
                info!("Starting new price history for {}", provider);
                ProviderHistory::new(provider, source_url, observed_at)
            }
        };

        let current = snapshot(&history);
        let events = diff(&current, new_prices, observed_at.date_naive());

        history.append(events.iter().cloned());
        history.last_crawled = observed_at;
        history.source_url = source_url.to_string();

        self.backend.save(&history).await?;

        if events.is_empty() {
            debug!("No price changes for {}", provider);
        } else {
            info!(
                "Recorded {} price change(s) for {} ({} total)",
                events.len(),
                provider,
                history.changes.len()
            );
        }

        Ok(events)
    }

    /// Observe a source's prices and apply them
    pub async fn crawl(
        &self,
        source: &dyn PriceSource,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>> {
        let prices = source.fetch_prices().await?;
        self.apply_observed_prices(source.provider(), source.source_url(), &prices, observed_at)
            .await
    }

    /// Load a provider's history
    pub async fn load(&self, provider: &str) -> Result<Option<ProviderHistory>> {
        validate_provider_id(provider)?;
        self.backend.load(provider).await
    }

    /// Persist a provider's history as is
    pub async fn save(&self, history: &ProviderHistory) -> Result<()> {
        let lock = self.provider_lock(&history.provider).await;
        let _guard = lock.lock().await;
        self.backend.save(history).await
    }

    /// Publisher view of a provider's current prices
    pub async fn provider_snapshot(&self, provider: &str) -> Result<Option<ProviderSnapshot>> {
        Ok(self.load(provider).await?.as_ref().map(provider_snapshot))
    }
}
