//! Fetching published pricing files

use crate::published::DualDateFile;
use async_trait::async_trait;
use llmprice_core::error::{LlmPriceError, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Downloads the published file for a provider.
#[async_trait]
pub trait PricingFetcher: Send + Sync {
    /// Fetch and decode the provider's current dual-date file
    async fn fetch(&self, provider: &str) -> Result<DualDateFile>;
}

/// Fetches `<base_url>/<provider>.json` over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with reqwest's default client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a fetcher whose requests give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// URL of a provider's file
    pub fn url_for(&self, provider: &str) -> String {
        format!("{}/{provider}.json", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PricingFetcher for HttpFetcher {
    async fn fetch(&self, provider: &str) -> Result<DualDateFile> {
        let url = self.url_for(provider);
        debug!("Fetching pricing from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmPriceError::Fetch(format!("{url} returned HTTP {status}")));
        }

        let body = response.text().await?;
        let file: DualDateFile = serde_json::from_str(&body)?;
        info!(
            "Fetched {} prices for {} dated {}",
            file.current.models.len(),
            provider,
            file.current.date
        );
        Ok(file)
    }
}
