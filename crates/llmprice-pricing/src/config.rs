//! Pricing client configuration

use crate::cache::ExternalCache;
use crate::published::{Deprecation, PriceFields};
use chrono::TimeDelta;
use llmprice_core::error::{LlmPriceError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Providers with remotely published pricing files
pub const BUILTIN_PROVIDERS: &[&str] = &[
    "anthropic",
    "aws-bedrock",
    "azure",
    "deepseek",
    "google",
    "groq",
    "mistral",
    "openai",
    "openrouter",
    "together",
    "xai",
];

/// Whether a provider has a remotely published file
pub fn is_builtin(provider: &str) -> bool {
    BUILTIN_PROVIDERS.contains(&provider)
}

/// Custom prices: provider → model id → fields
pub type CustomProviders = HashMap<String, BTreeMap<String, PriceFields>>;

/// Called the first time a client sees a provider's deprecation marker
pub type DeprecationCallback = Arc<dyn Fn(&str, &Deprecation) + Send + Sync>;

/// Options of a [`PricingClient`](crate::client::PricingClient)
#[derive(Clone, Default)]
pub struct PricingClientConfig {
    /// Never fetch; only custom providers are available
    pub offline: bool,
    /// Custom prices merged over remote data, winning on id collision
    pub custom_providers: CustomProviders,
    /// Shift applied to the clock before deciding what "today" is
    pub time_offset_ms: i64,
    /// Persistent cache shared across client instances
    pub external_cache: Option<Arc<dyn ExternalCache>>,
    /// Replaces the default deprecation warning
    pub on_deprecation: Option<DeprecationCallback>,
    /// Silence the default deprecation warning
    pub suppress_deprecation_warnings: bool,
}

impl PricingClientConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set offline mode
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Register custom prices for a provider, replacing earlier ones
    pub fn custom_provider(
        mut self,
        provider: impl Into<String>,
        models: BTreeMap<String, PriceFields>,
    ) -> Self {
        self.custom_providers.insert(provider.into(), models);
        self
    }

    /// Register all custom providers at once
    pub fn custom_providers(mut self, providers: CustomProviders) -> Self {
        self.custom_providers = providers;
        self
    }

    /// Shift the client clock
    pub fn time_offset_ms(mut self, offset: i64) -> Self {
        self.time_offset_ms = offset;
        self
    }

    /// Providers a client with this configuration can answer for, sorted
    pub fn providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self.custom_providers.keys().cloned().collect();
        if !self.offline {
            providers.extend(BUILTIN_PROVIDERS.iter().map(|p| p.to_string()));
        }
        providers.sort();
        providers.dedup();
        providers
    }

    /// The clock offset as a duration, or `Config` if it cannot be represented
    pub fn time_offset(&self) -> Result<TimeDelta> {
        TimeDelta::try_milliseconds(self.time_offset_ms).ok_or_else(|| {
            LlmPriceError::Config(format!(
                "time offset of {}ms is out of range",
                self.time_offset_ms
            ))
        })
    }

    /// Persist cache entries in `cache`
    pub fn external_cache(mut self, cache: Arc<dyn ExternalCache>) -> Self {
        self.external_cache = Some(cache);
        self
    }

    /// Handle deprecation markers with `callback`
    pub fn on_deprecation<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &Deprecation) + Send + Sync + 'static,
    {
        self.on_deprecation = Some(Arc::new(callback));
        self
    }

    /// Silence the default deprecation warning
    pub fn suppress_deprecation_warnings(mut self, suppress: bool) -> Self {
        self.suppress_deprecation_warnings = suppress;
        self
    }
}

impl fmt::Debug for PricingClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<_> = self.custom_providers.keys().collect();
        custom.sort();
        f.debug_struct("PricingClientConfig")
            .field("offline", &self.offline)
            .field("custom_providers", &custom)
            .field("time_offset_ms", &self.time_offset_ms)
            .field("external_cache", &self.external_cache.is_some())
            .field("on_deprecation", &self.on_deprecation.is_some())
            .field(
                "suppress_deprecation_warnings",
                &self.suppress_deprecation_warnings,
            )
            .finish()
    }
}

/// Read custom providers from a JSON file shaped like
/// `{ "<provider>": { "<model>": { "input": 1.0, "output": 2.0 } } }`.
pub async fn read_custom_providers(path: &Path) -> Result<CustomProviders> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        LlmPriceError::Config(format!(
            "Cannot read custom providers {}: {e}",
            path.display()
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        LlmPriceError::Config(format!(
            "Invalid custom providers file {}: {e}",
            path.display()
        ))
    })
}
