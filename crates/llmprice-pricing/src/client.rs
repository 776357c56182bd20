//! Daily-caching pricing client
//!
//! Resolves a provider's published file at most once per UTC day, merges
//! custom overlays, and answers price and cost lookups against it.
//!
//! # Examples
//!
//! ```no_run
//! use llmprice_pricing::{PricingClient, PricingClientConfig, TokenUsage};
//!
//! # async fn example() -> llmprice_core::Result<()> {
//! let client = PricingClient::http(PricingClientConfig::new(), "https://prices.example.com/v1");
//!
//! let pricing = client.get_model_pricing("openai", "gpt-4o").await?;
//! if pricing.stale {
//!     eprintln!("prices are from {}", pricing.date);
//! }
//!
//! let cost = client
//!     .calculate_cost("openai", "gpt-4o", TokenUsage::new(12_000, 800).with_cached(10_000))
//!     .await?;
//! println!("${:.4}", cost.cost.total_cost);
//! # Ok(())
//! # }
//! ```

use crate::cache::CacheEntry;
use crate::config::{PricingClientConfig, is_builtin};
use crate::cost_calculator::{CostCalculator, CostResult, TokenUsage};
use crate::fetcher::{HttpFetcher, PricingFetcher};
use crate::published::{DatedSnapshot, DualDateFile, PriceFields};
use chrono::NaiveDate;
use llmprice_core::clock::{Clock, SystemClock};
use llmprice_core::error::{LlmPriceError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a model price lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPricingResult {
    /// Provider queried
    pub provider: String,
    /// Model queried
    pub model: String,
    /// Published price fields
    pub pricing: PriceFields,
    /// Day of the snapshot the price came from
    pub date: NaiveDate,
    /// Whether that day is before the client's today
    pub stale: bool,
}

/// Result of a cost calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCost {
    /// Provider queried
    pub provider: String,
    /// Model queried
    pub model: String,
    /// Cost breakdown
    #[serde(flatten)]
    pub cost: CostResult,
    /// Day of the snapshot the price came from
    pub date: NaiveDate,
    /// Whether that day is before the client's today
    pub stale: bool,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Client over published pricing files
///
/// Cache state and the set of providers already warned about deprecation
/// belong to the instance; [`clear_cache`](Self::clear_cache) resets both.
pub struct PricingClient {
    config: PricingClientConfig,
    fetcher: Arc<dyn PricingFetcher>,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<String, Slot>>,
    warned: std::sync::Mutex<HashSet<String>>,
}

impl PricingClient {
    /// Create a client fetching through `fetcher`
    pub fn new(config: PricingClientConfig, fetcher: Arc<dyn PricingFetcher>) -> Self {
        Self {
            config,
            fetcher,
            clock: Arc::new(SystemClock),
            slots: Mutex::new(HashMap::new()),
            warned: std::sync::Mutex::new(HashSet::new()),
        }
    }

    /// Create a client fetching `<base_url>/<provider>.json`
    pub fn http(config: PricingClientConfig, base_url: impl Into<String>) -> Self {
        Self::new(config, Arc::new(HttpFetcher::new(base_url)))
    }

    /// Replace the clock used to decide what "today" is
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The client configuration
    pub fn config(&self) -> &PricingClientConfig {
        &self.config
    }

    /// Today's UTC date per the client clock and configured offset.
    ///
    /// Fails with `Config` when the offset pushes the clock out of range.
    pub fn today(&self) -> Result<NaiveDate> {
        let offset = self.config.time_offset()?;
        self.clock
            .now()
            .checked_add_signed(offset)
            .map(|now| now.date_naive())
            .ok_or_else(|| {
                LlmPriceError::Config(format!(
                    "time offset of {}ms moves the clock out of range",
                    self.config.time_offset_ms
                ))
            })
    }

    /// Providers this client can answer for, sorted
    pub fn providers(&self) -> Vec<String> {
        self.config.providers()
    }

    /// Drop all cached files and forget which deprecations were signaled
    pub async fn clear_cache(&self) {
        self.slots.lock().await.clear();
        self.warned.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Price of a model, failing with `ModelNotFound` if the provider lacks it
    pub async fn get_model_pricing(
        &self,
        provider: &str,
        model_id: &str,
    ) -> Result<ModelPricingResult> {
        let file = self.fetch_provider(provider).await?;
        let today = self.today()?;
        let snapshot = file.resolve(today);

        let Some(pricing) = snapshot.models.get(model_id) else {
            return Err(LlmPriceError::ModelNotFound {
                provider: provider.to_string(),
                model: model_id.to_string(),
                available: snapshot.model_ids(),
            });
        };

        if snapshot.date != file.current.date {
            debug!(
                "{} data dated {} is ahead of {}, serving {} data",
                provider, file.current.date, today, snapshot.date
            );
        }

        Ok(ModelPricingResult {
            provider: provider.to_string(),
            model: model_id.to_string(),
            pricing: pricing.clone(),
            date: snapshot.date,
            stale: today > snapshot.date,
        })
    }

    /// Like [`get_model_pricing`](Self::get_model_pricing) but `None` for an
    /// unknown model. Other failures are still returned.
    pub async fn get_model_pricing_or_none(
        &self,
        provider: &str,
        model_id: &str,
    ) -> Result<Option<ModelPricingResult>> {
        match self.get_model_pricing(provider, model_id).await {
            Ok(result) => Ok(Some(result)),
            Err(LlmPriceError::ModelNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Model ids of the snapshot lookups are answered from, sorted
    pub async fn list_models(&self, provider: &str) -> Result<Vec<String>> {
        let file = self.fetch_provider(provider).await?;
        Ok(file.resolve(self.today()?).model_ids())
    }

    /// Cost of a usage for a model
    pub async fn calculate_cost(
        &self,
        provider: &str,
        model_id: &str,
        usage: TokenUsage,
    ) -> Result<ModelCost> {
        if usage.cached() > usage.input_tokens {
            return Err(LlmPriceError::InvalidArgument(format!(
                "cached input tokens ({}) exceed input tokens ({})",
                usage.cached(),
                usage.input_tokens
            )));
        }

        let resolved = self.get_model_pricing(provider, model_id).await?;
        let cost = CostCalculator::calculate_from_pricing(&usage, &resolved.pricing).ok_or_else(
            || LlmPriceError::UnsupportedPricingModel {
                provider: provider.to_string(),
                model: model_id.to_string(),
            },
        )?;

        Ok(ModelCost {
            provider: resolved.provider,
            model: resolved.model,
            cost,
            date: resolved.date,
            stale: resolved.stale,
        })
    }

    /// The provider's full file, overlay included
    pub async fn get_raw_provider_data(&self, provider: &str) -> Result<DualDateFile> {
        self.fetch_provider(provider).await
    }

    async fn fetch_provider(&self, provider: &str) -> Result<DualDateFile> {
        let today = self.today()?;
        let overlay = self.config.custom_providers.get(provider);

        if self.config.offline || !is_builtin(provider) {
            return match overlay {
                Some(models) => Ok(Self::synthesize(models, today)),
                None => Err(LlmPriceError::ProviderNotFound(provider.to_string())),
            };
        }

        let mut file = self.fetch_remote(provider, today).await?;
        self.signal_deprecation(provider, &file);

        if let Some(models) = overlay {
            file.merge_overlay(models);
        }
        Ok(file)
    }

    fn synthesize(models: &BTreeMap<String, PriceFields>, today: NaiveDate) -> DualDateFile {
        DualDateFile::single(DatedSnapshot::new(today, models.clone()))
    }

    async fn slot(&self, provider: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        slots
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Resolve a built-in provider's file through the caches and the fetcher.
    ///
    /// The provider's slot stays locked for the whole resolution so concurrent
    /// callers wait for one fetch instead of issuing their own.
    async fn fetch_remote(&self, provider: &str, today: NaiveDate) -> Result<DualDateFile> {
        let slot = self.slot(provider).await;
        let mut entry = slot.lock().await;

        let fresh_in_memory = entry.as_ref().is_some_and(|e| e.is_fresh(today));
        if !fresh_in_memory {
            if let Some(external) = self.read_external(provider).await {
                let newer = entry
                    .as_ref()
                    .is_none_or(|current| external.fetched_on >= current.fetched_on);
                if newer {
                    *entry = Some(external);
                }
            }
        }

        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(today) {
                debug!("Cache hit for {} ({})", provider, today);
                return Ok(cached.data.clone());
            }
        }

        debug!("Cache miss for {} ({}), fetching", provider, today);
        let file = match self.fetcher.fetch(provider).await {
            Ok(file) => file,
            Err(e) => {
                return match entry.as_ref() {
                    Some(cached) => {
                        warn!(
                            "Failed to fetch pricing for {}: {}. Using data fetched on {}",
                            provider, e, cached.fetched_on
                        );
                        Ok(cached.data.clone())
                    }
                    None => Err(e),
                };
            }
        };

        Self::check_clock(provider, today, file.current.date)?;

        let fresh = CacheEntry::new(today, file);
        self.write_external(provider, &fresh).await;
        let data = fresh.data.clone();
        *entry = Some(fresh);

        info!("Cached pricing for {} dated {}", provider, data.current.date);
        Ok(data)
    }

    /// Data dated today or yesterday is accepted; anything else means one of
    /// the two clocks is wrong.
    fn check_clock(provider: &str, today: NaiveDate, data_date: NaiveDate) -> Result<()> {
        let days_diff = (today - data_date).num_days();
        if (0..=1).contains(&days_diff) {
            return Ok(());
        }
        Err(LlmPriceError::ClockMismatch {
            provider: provider.to_string(),
            local_date: today,
            data_date,
            days_diff,
        })
    }

    async fn read_external(&self, provider: &str) -> Option<CacheEntry> {
        let cache = self.config.external_cache.as_ref()?;
        let key = CacheEntry::key(provider);

        let raw = match cache.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("External cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Ignoring undecodable external cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn write_external(&self, provider: &str, entry: &CacheEntry) {
        let Some(cache) = self.config.external_cache.as_ref() else {
            return;
        };
        let key = CacheEntry::key(provider);

        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cannot encode cache entry for {}: {}", provider, e);
                return;
            }
        };
        if let Err(e) = cache.set(&key, raw).await {
            warn!("External cache write failed for {}: {}", key, e);
        }
    }

    fn signal_deprecation(&self, provider: &str, file: &DualDateFile) {
        let Some(deprecation) = file.deprecated.as_ref() else {
            return;
        };

        let first_time = self
            .warned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(provider.to_string());
        if !first_time {
            return;
        }

        if let Some(callback) = self.config.on_deprecation.as_ref() {
            callback(provider, deprecation);
        } else if !self.config.suppress_deprecation_warnings {
            warn!(
                "Pricing data for {} is deprecated since {} (frozen at {}): {}{}",
                provider,
                deprecation.since,
                deprecation.data_frozen_at,
                deprecation.message,
                deprecation
                    .upgrade_guide
                    .as_deref()
                    .map(|url| format!(" See {url}"))
                    .unwrap_or_default()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ExternalCache, MemoryCache};
    use crate::published::Deprecation;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use llmprice_core::clock::FixedClock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio_test::assert_err;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn noon(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap()
    }

    fn file_dated(date: NaiveDate) -> DualDateFile {
        let mut models = BTreeMap::new();
        models.insert("gpt-4o".to_string(), PriceFields::tokens(2.5, 10.0).with_cached(1.25));
        models.insert("gpt-4o-mini".to_string(), PriceFields::tokens(0.15, 0.6));
        models.insert(
            "dall-e-3".to_string(),
            PriceFields {
                image: Some(serde_json::json!({ "standard": 0.04 })),
                ..PriceFields::default()
            },
        );
        DualDateFile::single(DatedSnapshot::new(date, models))
    }

    #[derive(Default)]
    struct MockFetcher {
        files: std::sync::Mutex<HashMap<String, DualDateFile>>,
        calls: std::sync::Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockFetcher {
        fn serving(provider: &str, file: DualDateFile) -> Arc<Self> {
            let fetcher = Self::default();
            fetcher.set(provider, file);
            Arc::new(fetcher)
        }

        fn set(&self, provider: &str, file: DualDateFile) {
            self.files.lock().unwrap().insert(provider.to_string(), file);
        }

        fn calls(&self, provider: &str) -> usize {
            self.calls.lock().unwrap().get(provider).copied().unwrap_or(0)
        }

        fn total(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PricingFetcher for MockFetcher {
        async fn fetch(&self, provider: &str) -> Result<DualDateFile> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.calls.lock().unwrap().entry(provider.to_string()).or_default() += 1;
            tokio::task::yield_now().await;

            if self.fail.load(Ordering::SeqCst) {
                return Err(LlmPriceError::Fetch("connection refused".into()));
            }
            self.files
                .lock()
                .unwrap()
                .get(provider)
                .cloned()
                .ok_or_else(|| LlmPriceError::Fetch(format!("{provider} returned HTTP 404")))
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl ExternalCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(LlmPriceError::Cache("unavailable".into()))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<()> {
            Err(LlmPriceError::Cache("unavailable".into()))
        }
    }

    fn client_at(
        config: PricingClientConfig,
        fetcher: Arc<MockFetcher>,
        now: DateTime<Utc>,
    ) -> (PricingClient, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now));
        let client = PricingClient::new(config, fetcher).with_clock(clock.clone());
        (client, clock)
    }

    #[tokio::test]
    async fn test_same_day_lookups_fetch_once_per_provider() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        fetcher.set("anthropic", file_dated(day(2)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));

        client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        client.get_model_pricing("openai", "gpt-4o-mini").await.unwrap();
        assert_eq!(fetcher.total(), 1);

        client.get_model_pricing("anthropic", "gpt-4o").await.unwrap();
        assert_eq!(fetcher.total(), 2);

        client.list_models("openai").await.unwrap();
        assert_eq!(fetcher.calls("openai"), 1);
        assert_eq!(fetcher.total(), 2);
    }

    #[tokio::test]
    async fn test_next_day_refetches() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, clock) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));

        client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        clock.set(noon(3));
        fetcher.set("openai", file_dated(day(3)));
        let result = client.get_model_pricing("openai", "gpt-4o").await.unwrap();

        assert_eq!(fetcher.calls("openai"), 2);
        assert_eq!(result.date, day(3));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));

        let lookups = (0..6).map(|_| client.get_model_pricing("openai", "gpt-4o"));
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fetcher.total(), 1);
    }

    #[tokio::test]
    async fn test_staleness_flag() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(1)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));
        let stale = client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert!(stale.stale);
        assert_eq!(stale.date, day(1));

        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));
        let fresh = client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert!(!fresh.stale);
    }

    #[tokio::test]
    async fn test_clock_mismatch_when_data_is_days_old() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(1)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(4));

        let err = assert_err!(client.get_model_pricing("openai", "gpt-4o").await);
        match err {
            LlmPriceError::ClockMismatch {
                local_date,
                data_date,
                days_diff,
                ..
            } => {
                assert_eq!(local_date, day(4));
                assert_eq!(data_date, day(1));
                assert!(days_diff > 1);
            }
            other => panic!("expected ClockMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clock_mismatch_when_data_is_from_the_future() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(3)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));

        let err = assert_err!(client.get_model_pricing("openai", "gpt-4o").await);
        assert!(matches!(
            err,
            LlmPriceError::ClockMismatch { days_diff: -1, .. }
        ));
    }

    #[tokio::test]
    async fn test_time_offset_shifts_today() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(1)));
        let config = PricingClientConfig::new().time_offset_ms(-3_600_000);
        let just_after_midnight = Utc.with_ymd_and_hms(2025, 1, 2, 0, 30, 0).unwrap();
        let (client, _) = client_at(config, fetcher, just_after_midnight);

        assert_eq!(client.today().unwrap(), day(1));
        let result = client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert!(!result.stale);
    }

    #[tokio::test]
    async fn test_out_of_range_time_offset_is_a_config_error() {
        for offset in [i64::MAX, i64::MIN] {
            let config = PricingClientConfig::new().offline(true).time_offset_ms(offset);
            let (client, _) = client_at(config, Arc::new(MockFetcher::default()), noon(2));

            assert!(matches!(client.today(), Err(LlmPriceError::Config(_))));
            let err = assert_err!(client.list_models("openai").await);
            assert!(matches!(err, LlmPriceError::Config(_)));
        }
    }

    fn with_removed_model() -> DualDateFile {
        let mut file = file_dated(day(2));
        let mut previous = file.current.models.clone();
        previous.insert("gpt-3.5-turbo".to_string(), PriceFields::tokens(0.5, 1.5));
        file.previous = Some(DatedSnapshot::new(day(1), previous));
        file
    }

    #[tokio::test]
    async fn test_model_removed_from_current_is_not_found() {
        let fetcher = MockFetcher::serving("openai", with_removed_model());
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));

        let err = assert_err!(client.get_model_pricing("openai", "gpt-3.5-turbo").await);
        match err {
            LlmPriceError::ModelNotFound { available, .. } => {
                assert_eq!(available, client.list_models("openai").await.unwrap());
                assert!(!available.contains(&"gpt-3.5-turbo".to_string()));
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_previous_answers_when_current_is_ahead_of_today() {
        let fetcher = MockFetcher::serving("openai", with_removed_model());
        let (client, clock) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));
        client.get_model_pricing("openai", "gpt-4o").await.unwrap();

        // Clock steps back across midnight and the refetch fails, so the cached file answers.
        clock.set(Utc.with_ymd_and_hms(2025, 1, 1, 23, 0, 0).unwrap());
        fetcher.fail.store(true, Ordering::SeqCst);

        let result = client
            .get_model_pricing("openai", "gpt-3.5-turbo")
            .await
            .unwrap();
        assert_eq!(result.date, day(1));
        assert!(!result.stale);
        assert!(
            client
                .list_models("openai")
                .await
                .unwrap()
                .contains(&"gpt-3.5-turbo".to_string())
        );
    }

    #[tokio::test]
    async fn test_model_not_found_lists_available() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));

        let err = assert_err!(client.get_model_pricing("openai", "gpt-9").await);
        match err {
            LlmPriceError::ModelNotFound { available, .. } => {
                assert_eq!(available, vec!["dall-e-3", "gpt-4o", "gpt-4o-mini"]);
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }

        assert!(
            client
                .get_model_pricing_or_none("openai", "gpt-9")
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            client.get_model_pricing_or_none("nobody", "gpt-9").await,
            Err(LlmPriceError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_overlay_takes_precedence() {
        let mut custom = BTreeMap::new();
        custom.insert("gpt-4o".to_string(), PriceFields::tokens(1.0, 4.0));
        custom.insert("gpt-4o-ft".to_string(), PriceFields::tokens(3.75, 15.0));
        let config = PricingClientConfig::new().custom_provider("openai", custom);
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, _) = client_at(config, fetcher.clone(), noon(2));

        let result = client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert_eq!(result.pricing, PriceFields::tokens(1.0, 4.0));
        assert_eq!(result.pricing.cached, None);

        let models = client.list_models("openai").await.unwrap();
        assert!(models.contains(&"gpt-4o-ft".to_string()));
        assert!(models.contains(&"gpt-4o-mini".to_string()));
        assert_eq!(fetcher.total(), 1);
    }

    #[tokio::test]
    async fn test_custom_only_provider_is_synthesized_without_fetch() {
        let mut custom = BTreeMap::new();
        custom.insert("llama-3-70b".to_string(), PriceFields::tokens(0.5, 0.5));
        let config = PricingClientConfig::new().custom_provider("local", custom);
        let fetcher = Arc::new(MockFetcher::default());
        let (client, _) = client_at(config, fetcher.clone(), noon(5));

        let result = client.get_model_pricing("local", "llama-3-70b").await.unwrap();
        assert_eq!(result.date, day(5));
        assert!(!result.stale);
        assert_eq!(fetcher.total(), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let fetcher = Arc::new(MockFetcher::default());
        let (client, _) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));

        let err = assert_err!(client.list_models("acme").await);
        assert!(matches!(err, LlmPriceError::ProviderNotFound(p) if p == "acme"));
        assert_eq!(fetcher.total(), 0);
    }

    #[tokio::test]
    async fn test_offline_only_serves_custom_providers() {
        let mut custom = BTreeMap::new();
        custom.insert("gpt-4o".to_string(), PriceFields::tokens(2.5, 10.0));
        let config = PricingClientConfig::new()
            .offline(true)
            .custom_provider("openai", custom);
        let fetcher = MockFetcher::serving("anthropic", file_dated(day(2)));
        let (client, _) = client_at(config, fetcher.clone(), noon(2));

        assert!(client.get_model_pricing("openai", "gpt-4o").await.is_ok());
        assert!(matches!(
            client.list_models("anthropic").await,
            Err(LlmPriceError::ProviderNotFound(_))
        ));
        assert_eq!(fetcher.total(), 0);
        assert_eq!(client.providers(), vec!["openai".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_stale_cache() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, clock) = client_at(PricingClientConfig::new(), fetcher.clone(), noon(2));
        client.get_model_pricing("openai", "gpt-4o").await.unwrap();

        clock.set(noon(3));
        fetcher.fail.store(true, Ordering::SeqCst);
        let result = client.get_model_pricing("openai", "gpt-4o").await.unwrap();

        assert_eq!(fetcher.calls("openai"), 2);
        assert_eq!(result.date, day(2));
        assert!(result.stale);
    }

    #[tokio::test]
    async fn test_fetch_failure_without_cache_propagates() {
        let fetcher = Arc::new(MockFetcher::default());
        fetcher.fail.store(true, Ordering::SeqCst);
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));

        let err = assert_err!(client.get_model_pricing("openai", "gpt-4o").await);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_external_cache_survives_new_client() {
        let cache: Arc<MemoryCache> = Arc::new(MemoryCache::new());
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));

        let config = PricingClientConfig::new().external_cache(cache.clone());
        let (first, _) = client_at(config.clone(), fetcher.clone(), noon(2));
        first.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert!(cache.get("llmprice:openai").await.unwrap().is_some());

        let (second, _) = client_at(config, fetcher.clone(), noon(2));
        second.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert_eq!(fetcher.total(), 1);
    }

    #[tokio::test]
    async fn test_broken_external_cache_is_ignored() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let config = PricingClientConfig::new().external_cache(Arc::new(BrokenCache));
        let (client, _) = client_at(config, fetcher.clone(), noon(2));

        assert!(client.get_model_pricing("openai", "gpt-4o").await.is_ok());
        assert!(client.get_model_pricing("openai", "gpt-4o-mini").await.is_ok());
        assert_eq!(fetcher.total(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_external_entry_is_a_miss() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set("llmprice:openai", "not json".to_string())
            .await
            .unwrap();
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let config = PricingClientConfig::new().external_cache(cache);
        let (client, _) = client_at(config, fetcher.clone(), noon(2));

        assert!(client.get_model_pricing("openai", "gpt-4o").await.is_ok());
        assert_eq!(fetcher.total(), 1);
    }

    #[tokio::test]
    async fn test_deprecation_signaled_once() {
        let deprecation = Deprecation {
            since: day(1),
            data_frozen_at: day(2),
            message: "This feed moved".to_string(),
            upgrade_guide: None,
        };
        let fetcher =
            MockFetcher::serving("openai", file_dated(day(2)).with_deprecation(deprecation));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let config = PricingClientConfig::new().on_deprecation(move |provider, d| {
            assert_eq!(provider, "openai");
            assert_eq!(d.message, "This feed moved");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let (client, _) = client_at(config, fetcher, noon(2));

        for _ in 0..3 {
            client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        client.clear_cache().await;
        client.get_model_pricing("openai", "gpt-4o").await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_calculate_cost() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));

        let result = client
            .calculate_cost("openai", "gpt-4o", TokenUsage::new(1_000_000, 1_000_000))
            .await
            .unwrap();
        assert!((result.cost.input_cost - 2.5).abs() < 1e-9);
        assert!((result.cost.output_cost - 10.0).abs() < 1e-9);
        assert!((result.cost.total_cost - 12.5).abs() < 1e-9);
        assert!(!result.cost.used_cached_pricing);
        assert!(!result.stale);

        let cached = client
            .calculate_cost(
                "openai",
                "gpt-4o",
                TokenUsage::new(1_000_000, 0).with_cached(1_000_000),
            )
            .await
            .unwrap();
        assert!((cached.cost.input_cost - 1.25).abs() < 1e-9);
        assert!(cached.cost.used_cached_pricing);
    }

    #[tokio::test]
    async fn test_calculate_cost_rejects_non_token_pricing() {
        let fetcher = MockFetcher::serving("openai", file_dated(day(2)));
        let (client, _) = client_at(PricingClientConfig::new(), fetcher, noon(2));

        let err = assert_err!(
            client
                .calculate_cost("openai", "dall-e-3", TokenUsage::new(10, 10))
                .await
        );
        assert!(matches!(err, LlmPriceError::UnsupportedPricingModel { .. }));

        let err = assert_err!(
            client
                .calculate_cost("openai", "gpt-4o", TokenUsage::new(10, 10).with_cached(11))
                .await
        );
        assert!(matches!(err, LlmPriceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_raw_provider_data_includes_deprecation() {
        let deprecation = Deprecation {
            since: day(1),
            data_frozen_at: day(1),
            message: "frozen".to_string(),
            upgrade_guide: Some("https://example.com/upgrade".to_string()),
        };
        let fetcher =
            MockFetcher::serving("openai", file_dated(day(2)).with_deprecation(deprecation));
        let config = PricingClientConfig::new().suppress_deprecation_warnings(true);
        let (client, _) = client_at(config, fetcher, noon(2));

        let raw = client.get_raw_provider_data("openai").await.unwrap();
        assert_eq!(raw.current.date, day(2));
        assert!(raw.deprecated.is_some());
    }
}
