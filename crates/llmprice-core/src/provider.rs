//! Price source trait for scrapers
//!
//! This module defines the `PriceSource` trait that anything able to produce
//! a provider's current price list implements. Scrapers are independent
//! implementations of this trait; the change-log store only sees the
//! `PriceRecord`s they return.

use crate::error::{LlmPriceError, Result};
use crate::types::PriceRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Something that can observe a provider's current prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Provider identifier the prices belong to
    fn provider(&self) -> &str;

    /// Canonical URL the prices are published at
    fn source_url(&self) -> &str;

    /// Observe the provider's current price list, in no particular order.
    async fn fetch_prices(&self) -> Result<Vec<PriceRecord>>;
}

/// Prices read from a JSON array of `PriceRecord`s, or held in memory.
///
/// Used to feed hand-maintained or externally scraped price lists into the
/// change log.
#[derive(Debug, Clone)]
pub struct StaticPriceSource {
    provider: String,
    source_url: String,
    origin: Origin,
}

#[derive(Debug, Clone)]
enum Origin {
    File(PathBuf),
    Records(Vec<PriceRecord>),
}

impl StaticPriceSource {
    /// Source backed by a JSON file, read on every fetch
    pub fn from_file(
        provider: impl Into<String>,
        source_url: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider: provider.into(),
            source_url: source_url.into(),
            origin: Origin::File(path.into()),
        }
    }

    /// Source returning a fixed list
    pub fn from_records(
        provider: impl Into<String>,
        source_url: impl Into<String>,
        records: Vec<PriceRecord>,
    ) -> Self {
        Self {
            provider: provider.into(),
            source_url: source_url.into(),
            origin: Origin::Records(records),
        }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn source_url(&self) -> &str {
        &self.source_url
    }

    async fn fetch_prices(&self) -> Result<Vec<PriceRecord>> {
        match &self.origin {
            Origin::Records(records) => Ok(records.clone()),
            Origin::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    LlmPriceError::Config(format!(
                        "Cannot read price list {}: {e}",
                        path.display()
                    ))
                })?;
                let records: Vec<PriceRecord> = serde_json::from_str(&content)?;
                debug!(
                    "Loaded {} prices for {} from {}",
                    records.len(),
                    self.provider,
                    path.display()
                );
                Ok(records)
            }
        }
    }
}
