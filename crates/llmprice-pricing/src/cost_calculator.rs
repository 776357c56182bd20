//! Cost calculator module for computing usage costs
//!
//! Pure token-to-USD arithmetic over published per-million-token rates. The
//! pricing client resolves the rates; this module only does the math.
//!
//! # Examples
//!
//! ```
//! use llmprice_pricing::cost_calculator::{CostCalculator, TokenUsage};
//! use llmprice_pricing::published::PriceFields;
//!
//! let pricing = PriceFields::tokens(2.5, 10.0);
//! let usage = TokenUsage::new(1_000_000, 1_000_000);
//! let cost = CostCalculator::calculate_from_pricing(&usage, &pricing).unwrap();
//! assert!((cost.total_cost - 12.5).abs() < 1e-9);
//! ```

use crate::published::PriceFields;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Token counts of one request or an aggregate
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// All input tokens, including cached ones
    pub input_tokens: u64,
    /// Output tokens
    pub output_tokens: u64,
    /// Portion of `input_tokens` served from the provider's prompt cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u64>,
}

impl TokenUsage {
    /// Usage without cached input
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cached_input_tokens: None,
        }
    }

    /// Mark part of the input as cached
    pub fn with_cached(mut self, cached_input_tokens: u64) -> Self {
        self.cached_input_tokens = Some(cached_input_tokens);
        self
    }

    /// Cached input tokens, zero when unset
    pub fn cached(&self) -> u64 {
        self.cached_input_tokens.unwrap_or(0)
    }
}

/// Cost of a usage in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResult {
    /// Cost of all input tokens, cached and uncached
    pub input_cost: f64,
    /// Cost of output tokens
    pub output_cost: f64,
    /// `input_cost + output_cost`
    pub total_cost: f64,
    /// Whether some input was billed at the cached rate
    pub used_cached_pricing: bool,
}

/// Calculates costs based on token usage and pricing
pub struct CostCalculator;

impl CostCalculator {
    /// Calculate cost from published pricing.
    ///
    /// Returns `None` when the pricing has no input or output token rate.
    pub fn calculate_from_pricing(usage: &TokenUsage, pricing: &PriceFields) -> Option<CostResult> {
        let input = pricing.input?;
        let output = pricing.output?;
        Some(Self::calculate_from_rates(usage, input, output, pricing.cached))
    }

    /// Calculate cost from per-million-token rates.
    ///
    /// Cached input tokens are billed at `cached_rate` when present and at
    /// `input_rate` otherwise; the remaining input tokens always at
    /// `input_rate`.
    pub fn calculate_from_rates(
        usage: &TokenUsage,
        input_rate: f64,
        output_rate: f64,
        cached_rate: Option<f64>,
    ) -> CostResult {
        let cached_tokens = usage.cached().min(usage.input_tokens);
        let uncached_tokens = usage.input_tokens - cached_tokens;

        let cached_cost =
            cached_tokens as f64 / TOKENS_PER_MILLION * cached_rate.unwrap_or(input_rate);
        let uncached_cost = uncached_tokens as f64 / TOKENS_PER_MILLION * input_rate;
        let input_cost = uncached_cost + cached_cost;
        let output_cost = usage.output_tokens as f64 / TOKENS_PER_MILLION * output_rate;
        let total_cost = input_cost + output_cost;

        debug!(
            "Calculated cost: ${:.6} for {} input / {} output tokens",
            total_cost, usage.input_tokens, usage.output_tokens
        );

        CostResult {
            input_cost,
            output_cost,
            total_cost,
            used_cached_pricing: cached_tokens > 0 && cached_rate.is_some(),
        }
    }
}
