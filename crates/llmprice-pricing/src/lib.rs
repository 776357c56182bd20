//! Pricing client and cost calculator for llmprice
//!
//! This crate consumes the published dual-date pricing files: it fetches
//! them at most once per provider per UTC day, keeps them in an in-memory and
//! an optional external cache, overlays caller-supplied custom prices, and
//! answers price and cost queries while flagging stale data and broken
//! clocks.

pub mod cache;
pub mod client;
pub mod config;
pub mod cost_calculator;
pub mod fetcher;
pub mod published;

pub use cache::{CacheEntry, ExternalCache, FileCache, MemoryCache};
pub use client::{ModelCost, ModelPricingResult, PricingClient};
pub use config::{BUILTIN_PROVIDERS, DeprecationCallback, PricingClientConfig};
pub use cost_calculator::{CostCalculator, CostResult, TokenUsage};
pub use fetcher::{HttpFetcher, PricingFetcher};
pub use published::{DatedSnapshot, Deprecation, DualDateFile, PriceFields};
