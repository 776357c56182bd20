//! Error types for llmprice
//!
//! This module defines the error types used throughout the llmprice crates.
//! Every failure the change-log store or the pricing client can report is a
//! distinct variant, so callers can branch on the kind instead of matching
//! on message strings.
//!
//! # Example
//!
//! ```
//! use llmprice_core::error::{LlmPriceError, Result};
//!
//! fn lookup(found: bool) -> Result<()> {
//!     if !found {
//!         return Err(LlmPriceError::ProviderNotFound("acme".into()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(matches!(lookup(false), Err(LlmPriceError::ProviderNotFound(_))));
//! ```

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for llmprice operations
#[derive(Error, Debug)]
pub enum LlmPriceError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error raised by the HTTP client
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The pricing endpoint answered, but not with usable data
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The resolved snapshot has no entry for the requested model
    #[error(
        "Model '{model}' not found for provider '{provider}'. Available models: {}",
        .available.join(", ")
    )]
    ModelNotFound {
        /// Provider that was queried
        provider: String,
        /// Model id that was requested
        model: String,
        /// Model ids the provider does know about
        available: Vec<String>,
    },

    /// No remote data and no custom overlay exist for the provider
    #[error(
        "Provider '{0}' not found. Check the spelling or register it as a custom provider"
    )]
    ProviderNotFound(String),

    /// The price record carries no token-based input/output pricing
    #[error("Model '{model}' of provider '{provider}' has no token-based pricing")]
    UnsupportedPricingModel {
        /// Provider that was queried
        provider: String,
        /// Model id that was requested
        model: String,
    },

    /// Published data is dated too far from the local clock
    #[error(
        "Clock mismatch for provider '{provider}': local date is {local_date}, data is dated {data_date} ({days_diff} day(s) apart). Check the system clock or timezone"
    )]
    ClockMismatch {
        /// Provider whose data was fetched
        provider: String,
        /// "Today" according to the client clock
        local_date: NaiveDate,
        /// Date of the fetched `current` snapshot
        data_date: NaiveDate,
        /// `local_date - data_date` in days; negative when data is ahead
        days_diff: i64,
    },

    /// A price record failed validation
    #[error("Invalid price for model '{model}': {reason}")]
    InvalidPrice {
        /// Offending model id
        model: String,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External cache failure
    #[error("Cache error: {0}")]
    Cache(String),
}

impl LlmPriceError {
    /// Whether this error came from fetching or decoding remote data
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Fetch(_) | Self::Io(_) | Self::Json(_)
        )
    }
}

/// Convenience type alias for Results in llmprice
pub type Result<T> = std::result::Result<T, LlmPriceError>;
