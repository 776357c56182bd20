//! llmprice - Track LLM price changes and query published pricing
//!
//! This library provides functionality to:
//! - Diff observed price lists against an append-only change log per provider
//! - Rebuild current prices by replaying that log and publish them as
//!   dual-date files
//! - Query published files through a client that fetches at most once per
//!   provider per day, merges custom prices, and flags stale data
//! - Calculate token costs from the resolved prices
//!
//! # Examples
//!
//! ```no_run
//! use llmprice::{ChangeLogStore, JsonFileBackend, PriceRecord};
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() -> llmprice::Result<()> {
//!     let store = ChangeLogStore::new(JsonFileBackend::new("history"));
//!     let observed = vec![PriceRecord::new("gpt-4o", "GPT-4o", 2.5, 10.0)];
//!
//!     let events = store
//!         .apply_observed_prices("openai", "https://openai.com/api/pricing", &observed, Utc::now())
//!         .await?;
//!     println!("{} change(s)", events.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod output;

pub use llmprice_changelog::{
    ChangeLogStore, HistoryBackend, JsonFileBackend, MemoryBackend, ProviderSnapshot,
    previous_provider_snapshot, provider_snapshot,
};
pub use llmprice_core::{
    ChangeEvent, ChangeKind, Clock, LlmPriceError, PriceRecord, PriceSource, ProviderHistory,
    Result, Snapshot, StaticPriceSource, SystemClock,
};
pub use llmprice_pricing::{
    DualDateFile, FileCache, ModelCost, ModelPricingResult, PricingClient, PricingClientConfig,
    TokenUsage,
};
