//! Published dual-date pricing file
//!
//! The file clients download for a provider holds the `current` day's
//! prices, optionally the `previous` day's, and an optional deprecation
//! marker:
//!
//! ```json
//! {
//!   "current": { "date": "2025-01-02", "models": { "gpt-4o": { "input": 2.5, "output": 10 } } },
//!   "previous": { "date": "2025-01-01", "models": { } },
//!   "deprecated": { "since": "2025-06-01", "dataFrozenAt": "2025-06-01", "message": "..." }
//! }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use llmprice_changelog::ProviderSnapshot;
use llmprice_core::types::PriceRecord;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::BTreeMap;

/// Price fields of one model as published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFields {
    /// Input price per million tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<f64>,
    /// Output price per million tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<f64>,
    /// Cached-input price per million tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<f64>,
    /// Context window in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<u64>,
    /// Max output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output: Option<u64>,
    /// Image pricing variants, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<serde_json::Value>,
    /// Audio pricing variants, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<serde_json::Value>,
    /// Video pricing variants, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<serde_json::Value>,
}

impl PriceFields {
    /// Token pricing with input and output rates
    pub fn tokens(input: f64, output: f64) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
            ..Self::default()
        }
    }

    /// Set the cached-input rate
    pub fn with_cached(mut self, cached: f64) -> Self {
        self.cached = Some(cached);
        self
    }

    /// Whether both input and output token rates are present
    pub fn has_token_pricing(&self) -> bool {
        self.input.is_some() && self.output.is_some()
    }
}

impl From<&PriceRecord> for PriceFields {
    fn from(record: &PriceRecord) -> Self {
        Self {
            input: Some(record.input),
            output: Some(record.output),
            cached: record.cached,
            context: record.context_window,
            max_output: record.max_output_tokens,
            ..Self::default()
        }
    }
}

/// A provider's models as of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedSnapshot {
    /// Day the prices apply to
    pub date: NaiveDate,
    /// Model id to published fields
    #[serde(default)]
    pub models: BTreeMap<String, PriceFields>,
}

impl DatedSnapshot {
    /// Create a snapshot for `date`
    pub fn new(date: NaiveDate, models: BTreeMap<String, PriceFields>) -> Self {
        Self { date, models }
    }

    /// Model ids, sorted
    pub fn model_ids(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }
}

impl From<&ProviderSnapshot> for DatedSnapshot {
    fn from(snapshot: &ProviderSnapshot) -> Self {
        Self {
            date: snapshot.date,
            models: snapshot
                .models
                .iter()
                .map(|record| (record.model_id.clone(), PriceFields::from(record)))
                .collect(),
        }
    }
}

/// Marker announcing that a feed is no longer maintained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deprecation {
    /// When the deprecation took effect
    #[serde(deserialize_with = "day_or_timestamp")]
    pub since: NaiveDate,
    /// Last day the data was updated
    #[serde(deserialize_with = "day_or_timestamp")]
    pub data_frozen_at: NaiveDate,
    /// Explanation for users
    pub message: String,
    /// Where to read about migrating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_guide: Option<String>,
}

/// Accept `YYYY-MM-DD` or an RFC 3339 timestamp, keeping the UTC day.
fn day_or_timestamp<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(day) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| <D::Error as de::Error>::custom(format!("invalid date or timestamp: {raw}")))
}

/// The file published for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualDateFile {
    /// Most recently published day
    pub current: DatedSnapshot,
    /// The day before, kept through the publish window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<DatedSnapshot>,
    /// Present when the feed is deprecated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecation>,
}

impl DualDateFile {
    /// A file with only a `current` snapshot
    pub fn single(current: DatedSnapshot) -> Self {
        Self {
            current,
            previous: None,
            deprecated: None,
        }
    }

    /// Assemble a file from the change log's provider snapshots
    pub fn from_snapshots(current: &ProviderSnapshot, previous: Option<&ProviderSnapshot>) -> Self {
        Self {
            current: current.into(),
            previous: previous.map(DatedSnapshot::from),
            deprecated: None,
        }
    }

    /// Mark the file as deprecated
    pub fn with_deprecation(mut self, deprecation: Deprecation) -> Self {
        self.deprecated = Some(deprecation);
        self
    }

    /// The snapshot that answers lookups on `today`.
    ///
    /// `current` unless it is dated after `today` and a `previous` dated on
    /// or before `today` exists. Lookups never mix the two snapshots.
    pub fn resolve(&self, today: NaiveDate) -> &DatedSnapshot {
        if self.current.date <= today {
            return &self.current;
        }
        match self.previous.as_ref() {
            Some(previous) if previous.date <= today => previous,
            _ => &self.current,
        }
    }

    /// Overlay custom entries onto both snapshots; custom entries replace
    /// remote entries with the same id entirely.
    pub fn merge_overlay(&mut self, overlay: &BTreeMap<String, PriceFields>) {
        for snapshot in std::iter::once(&mut self.current).chain(self.previous.as_mut()) {
            for (model_id, fields) in overlay {
                snapshot.models.insert(model_id.clone(), fields.clone());
            }
        }
    }
}
