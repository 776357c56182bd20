//! Common test utilities and helpers for llmprice tests
//!
//! Record builders, fixed timestamps, and an in-memory "CDN" fetcher that
//! serves whatever was last published from a change-log store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use llmprice_changelog::{
    ChangeLogStore, HistoryBackend, previous_provider_snapshot, provider_snapshot,
};
use llmprice_core::{LlmPriceError, PriceRecord, Result};
use llmprice_pricing::{DualDateFile, PricingFetcher};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source URL used by tests
pub const OPENAI_URL: &str = "https://openai.com/api/pricing";

/// A day in January 2025
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

/// Noon UTC on a day in January 2025
pub fn noon(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap()
}

/// Builder for test price records
pub struct RecordBuilder {
    record: PriceRecord,
}

impl RecordBuilder {
    /// Start from a model id with $1/$2 per million tokens
    pub fn new(model_id: &str) -> Self {
        Self {
            record: PriceRecord::new(model_id, model_id.to_uppercase(), 1.0, 2.0),
        }
    }

    pub fn input(mut self, input: f64) -> Self {
        self.record.input = input;
        self
    }

    pub fn output(mut self, output: f64) -> Self {
        self.record.output = output;
        self
    }

    pub fn cached(mut self, cached: f64) -> Self {
        self.record.cached = Some(cached);
        self
    }

    pub fn context_window(mut self, tokens: u64) -> Self {
        self.record.context_window = Some(tokens);
        self
    }

    pub fn build(self) -> PriceRecord {
        self.record
    }
}

/// Serves published dual-date files from memory and counts fetches
#[derive(Default)]
pub struct PublishedFiles {
    files: Mutex<HashMap<String, DualDateFile>>,
    fetches: AtomicUsize,
}

impl PublishedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a provider's current and previous-day snapshots
    pub async fn publish<B: HistoryBackend>(
        &self,
        store: &ChangeLogStore<B>,
        provider: &str,
    ) -> Result<DualDateFile> {
        let history = store
            .load(provider)
            .await?
            .ok_or_else(|| LlmPriceError::ProviderNotFound(provider.to_string()))?;
        let current = provider_snapshot(&history);
        let previous = previous_provider_snapshot(&history);
        let file = DualDateFile::from_snapshots(&current, previous.as_ref());

        self.put(provider, file.clone());
        Ok(file)
    }

    /// Serve `file` for `provider`
    pub fn put(&self, provider: &str, file: DualDateFile) {
        self.files
            .lock()
            .unwrap()
            .insert(provider.to_string(), file);
    }

    /// Number of fetches served so far
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PricingFetcher for PublishedFiles {
    async fn fetch(&self, provider: &str) -> Result<DualDateFile> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .get(provider)
            .cloned()
            .ok_or_else(|| LlmPriceError::Fetch(format!("{provider}.json returned HTTP 404")))
    }
}
