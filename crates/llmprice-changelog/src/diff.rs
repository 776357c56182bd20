//! Diff engine
//!
//! Computes the change events that turn a provider's current snapshot into a
//! freshly observed price list. Pure: no clock, no I/O.

use chrono::NaiveDate;
use llmprice_core::types::{ChangeEvent, PriceRecord, Snapshot};
use std::collections::BTreeMap;
use tracing::warn;

/// A field whose change makes a model `updated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparableField {
    /// Input price
    Input,
    /// Output price
    Output,
    /// Cached-input price
    Cached,
    /// Context window size
    ContextWindow,
    /// Max output tokens
    MaxOutputTokens,
}

/// Every field compared when detecting an update. Display name and metadata
/// are not compared.
pub const COMPARABLE_FIELDS: [ComparableField; 5] = [
    ComparableField::Input,
    ComparableField::Output,
    ComparableField::Cached,
    ComparableField::ContextWindow,
    ComparableField::MaxOutputTokens,
];

impl ComparableField {
    /// Whether `a` and `b` disagree on this field. Prices compare exactly.
    pub fn differs(self, a: &PriceRecord, b: &PriceRecord) -> bool {
        match self {
            Self::Input => a.input != b.input,
            Self::Output => a.output != b.output,
            Self::Cached => a.cached != b.cached,
            Self::ContextWindow => a.context_window != b.context_window,
            Self::MaxOutputTokens => a.max_output_tokens != b.max_output_tokens,
        }
    }
}

/// Whether any comparable field differs between two records of one model
pub fn has_price_change(current: &PriceRecord, observed: &PriceRecord) -> bool {
    COMPARABLE_FIELDS
        .iter()
        .any(|field| field.differs(current, observed))
}

/// Compute the events needed to move from `current` to `observed`.
///
/// `observed` may be in any order. If a model id appears more than once the
/// last occurrence wins. Output order is additions and updates by model id,
/// followed by removals by model id.
pub fn diff(current: &Snapshot, observed: &[PriceRecord], date: NaiveDate) -> Vec<ChangeEvent> {
    let mut indexed: BTreeMap<&str, &PriceRecord> = BTreeMap::new();
    for record in observed {
        if indexed.insert(record.model_id.as_str(), record).is_some() {
            warn!(
                "Model {} observed more than once, keeping the last record",
                record.model_id
            );
        }
    }

    let mut events = Vec::new();

    for (model_id, record) in &indexed {
        match current.get(*model_id) {
            None => events.push(ChangeEvent::added(date, (*record).clone())),
            Some(existing) if has_price_change(existing, record) => events.push(
                ChangeEvent::updated(date, (*record).clone(), existing.clone()),
            ),
            Some(_) => {}
        }
    }

    for (model_id, existing) in current {
        if !indexed.contains_key(model_id.as_str()) {
            events.push(ChangeEvent::removed(date, existing.clone()));
        }
    }

    events
}
