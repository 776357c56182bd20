//! CLI interface for llmprice
//!
//! Two groups of commands share one binary. Change-log commands (`apply`,
//! `snapshot`, `history`) work on the local history directory. Client commands
//! (`price`, `models`, `cost`, `raw`) query published pricing files through a
//! daily-caching [`PricingClient`](llmprice_pricing::PricingClient).
//!
//! # Example
//!
//! ```bash
//! # Record today's observed prices for openai
//! llmprice apply openai --prices openai-prices.json --source-url https://openai.com/api/pricing
//!
//! # Emit the dual-date file to publish
//! llmprice snapshot openai --dual > openai.json
//!
//! # Query a published file
//! LLMPRICE_BASE_URL=https://prices.example.com/v1 llmprice cost openai gpt-4o --input 12000 --output 800
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use llmprice_core::error::{LlmPriceError, Result};
use std::path::PathBuf;

/// Track LLM price changes and query published pricing
#[derive(Parser, Debug, Clone)]
#[command(name = "llmprice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Only show warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory holding provider histories
    #[arg(long, env = "LLMPRICE_HISTORY_DIR", global = true)]
    pub history_dir: Option<PathBuf>,

    /// Base URL of the published pricing files
    #[arg(long, env = "LLMPRICE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Directory of the persistent pricing cache
    #[arg(long, env = "LLMPRICE_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Keep fetched pricing in memory only
    #[arg(long, global = true, conflicts_with = "cache_dir")]
    pub no_cache: bool,

    /// Never fetch; answer from custom prices only
    #[arg(long, env = "LLMPRICE_OFFLINE", global = true)]
    pub offline: bool,

    /// Milliseconds added to the local clock before picking "today"
    #[arg(
        long,
        env = "LLMPRICE_TIME_OFFSET_MS",
        default_value_t = 0,
        allow_negative_numbers = true,
        global = true
    )]
    pub time_offset_ms: i64,

    /// JSON file of custom prices: provider → model → price fields
    #[arg(long, global = true)]
    pub custom: Option<PathBuf>,

    /// HTTP timeout in seconds when fetching pricing
    #[arg(long, default_value_t = 10, global = true)]
    pub timeout: u64,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    // -- Change log ----------------------------------------------------------
    /// Diff observed prices against a provider's history and append the changes
    Apply {
        /// Provider id
        provider: String,

        /// JSON array of observed price records
        #[arg(long)]
        prices: PathBuf,

        /// Page the prices were scraped from
        #[arg(long, default_value = "")]
        source_url: String,

        /// Observation time (RFC 3339), defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },

    /// Show a provider's current prices rebuilt from its history
    Snapshot {
        /// Provider id
        provider: String,

        /// Emit the publishable dual-date file instead
        #[arg(long)]
        dual: bool,
    },

    /// Show a provider's change events
    History {
        /// Provider id
        provider: String,

        /// Only events for this model
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// Only events on or after this day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        since: Option<NaiveDate>,
    },

    /// List known providers
    Providers {
        /// List providers with a stored history instead
        #[arg(long)]
        stored: bool,
    },

    // -- Pricing client ------------------------------------------------------
    /// Show a model's published price
    Price {
        /// Provider id
        provider: String,
        /// Model id
        model: String,
    },

    /// List a provider's published models
    Models {
        /// Provider id
        provider: String,
    },

    /// Calculate the cost of a usage
    Cost {
        /// Provider id
        provider: String,

        /// Model id
        model: String,

        /// Input tokens, cached ones included
        #[arg(long, default_value_t = 0)]
        input: u64,

        /// Output tokens
        #[arg(long, default_value_t = 0)]
        output: u64,

        /// Input tokens served from the prompt cache
        #[arg(long)]
        cached: Option<u64>,
    },

    /// Dump a provider's published file with custom prices merged in
    Raw {
        /// Provider id
        provider: String,
    },
}

impl Cli {
    /// History directory from the flag or environment, else the platform data
    /// directory (`~/.local/share/llmprice/history` on Linux)
    pub fn resolve_history_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.history_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("llmprice").join("history"))
            .ok_or_else(|| {
                LlmPriceError::Config(
                    "Cannot determine data directory; pass --history-dir".to_string(),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Value parsers
// ---------------------------------------------------------------------------

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LlmPriceError::InvalidDate(format!("'{s}': {e}")))
}

/// Parse a `YYYY-MM-DD` day
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    llmprice_core::types::parse_date(s)
}
