//! Core domain types for llmprice
//!
//! This module contains the value types shared by the change-log store and
//! the pricing client: a model's [`PriceRecord`], the [`ChangeEvent`] entries
//! of a provider's append-only log, the [`ProviderHistory`] that owns that log
//! and the [`Snapshot`] obtained by replaying it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LlmPriceError, Result};

/// Current state of a provider's prices: model id to its latest record,
/// ordered by model id.
pub type Snapshot = BTreeMap<String, PriceRecord>;

/// Pricing of one model at a point in time
///
/// Prices are USD per one million tokens. Records are never mutated once
/// created; a price change is represented by a new record.
///
/// # Examples
/// ```
/// use llmprice_core::types::PriceRecord;
///
/// let record = PriceRecord::new("gpt-4o", "GPT-4o", 2.5, 10.0)
///     .with_cached(1.25)
///     .with_context_window(128_000);
/// assert_eq!(record.cached, Some(1.25));
/// assert!(record.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    /// Model identifier, unique within a provider
    #[serde(rename = "id")]
    pub model_id: String,
    /// Human readable model name
    pub name: String,
    /// Input price per million tokens
    pub input: f64,
    /// Output price per million tokens
    pub output: f64,
    /// Cached-input price per million tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<f64>,
    /// Context window size in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
    /// Maximum output tokens per request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    /// Free-form extra data, ignored when detecting price changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PriceRecord {
    /// Create a record with the mandatory fields
    pub fn new(model_id: impl Into<String>, name: impl Into<String>, input: f64, output: f64) -> Self {
        Self {
            model_id: model_id.into(),
            name: name.into(),
            input,
            output,
            cached: None,
            context_window: None,
            max_output_tokens: None,
            metadata: None,
        }
    }

    /// Set the cached-input price
    pub fn with_cached(mut self, cached: f64) -> Self {
        self.cached = Some(cached);
        self
    }

    /// Set the context window
    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window = Some(tokens);
        self
    }

    /// Set the max output tokens
    pub fn with_max_output_tokens(mut self, tokens: u64) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Attach free-form metadata
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Reject records that must never enter a change log.
    ///
    /// The model id must be non-empty and every price finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(LlmPriceError::InvalidPrice {
                model: self.model_id.clone(),
                reason: "model id is empty".to_string(),
            });
        }

        let prices = [
            ("input", Some(self.input)),
            ("output", Some(self.output)),
            ("cached", self.cached),
        ];
        for (field, value) in prices {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(LlmPriceError::InvalidPrice {
                        model: self.model_id.clone(),
                        reason: format!("{field} price must be a non-negative number, got {value}"),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Kind of a change event, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ChangeKind {
    /// Model appeared for the first time (or reappeared after removal)
    #[display("added")]
    Added,
    /// A comparable field of an existing model changed
    #[display("updated")]
    Updated,
    /// Model disappeared from the provider's price list
    #[display("removed")]
    Removed,
}

/// Payload of a change event
///
/// Only `Updated` carries the record it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    /// New model
    Added {
        /// The model's first record
        model: PriceRecord,
    },
    /// Changed model
    Updated {
        /// The new record
        model: PriceRecord,
        /// The record it replaces
        previous: PriceRecord,
    },
    /// Removed model
    Removed {
        /// The last known record
        model: PriceRecord,
    },
}

/// One entry in a provider's append-only change log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Day the change was observed
    pub date: NaiveDate,
    /// What changed
    #[serde(flatten)]
    pub change: Change,
}

impl ChangeEvent {
    /// Create an `added` event
    pub fn added(date: NaiveDate, model: PriceRecord) -> Self {
        Self {
            date,
            change: Change::Added { model },
        }
    }

    /// Create an `updated` event
    pub fn updated(date: NaiveDate, model: PriceRecord, previous: PriceRecord) -> Self {
        Self {
            date,
            change: Change::Updated { model, previous },
        }
    }

    /// Create a `removed` event
    pub fn removed(date: NaiveDate, model: PriceRecord) -> Self {
        Self {
            date,
            change: Change::Removed { model },
        }
    }

    /// The kind of this event
    pub fn kind(&self) -> ChangeKind {
        match self.change {
            Change::Added { .. } => ChangeKind::Added,
            Change::Updated { .. } => ChangeKind::Updated,
            Change::Removed { .. } => ChangeKind::Removed,
        }
    }

    /// The record this event is about (the new one for `updated`)
    pub fn model(&self) -> &PriceRecord {
        match &self.change {
            Change::Added { model } | Change::Updated { model, .. } | Change::Removed { model } => {
                model
            }
        }
    }

    /// The replaced record, only present for `updated`
    pub fn previous(&self) -> Option<&PriceRecord> {
        match &self.change {
            Change::Updated { previous, .. } => Some(previous),
            _ => None,
        }
    }

    /// Model id this event is about
    pub fn model_id(&self) -> &str {
        &self.model().model_id
    }
}

/// A provider's full price history
///
/// Events are only ever appended. Their order in `changes` is the replay
/// order, even if a backfill put an older `date` after a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHistory {
    /// Provider identifier, e.g. `openai`
    pub provider: String,
    /// Where the prices were scraped from
    pub source_url: String,
    /// When the provider was last crawled
    pub last_crawled: DateTime<Utc>,
    /// Append-only event log
    #[serde(default)]
    pub changes: Vec<ChangeEvent>,
}

impl ProviderHistory {
    /// Start an empty history for a provider
    pub fn new(
        provider: impl Into<String>,
        source_url: impl Into<String>,
        last_crawled: DateTime<Utc>,
    ) -> Self {
        Self {
            provider: provider.into(),
            source_url: source_url.into(),
            last_crawled,
            changes: Vec::new(),
        }
    }

    /// Append events in order
    pub fn append(&mut self, events: impl IntoIterator<Item = ChangeEvent>) {
        self.changes.extend(events);
    }

    /// Number of events in the log
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the log has no events
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| LlmPriceError::InvalidDate(format!("'{s}', expected YYYY-MM-DD")))
}
