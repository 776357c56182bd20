//! Snapshot replay
//!
//! A provider's current prices are never stored; they are rebuilt by
//! replaying its change log from the first event every time.

use chrono::NaiveDate;
use llmprice_core::types::{Change, ChangeEvent, PriceRecord, ProviderHistory, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Replay events in insertion order into a snapshot.
///
/// `added` and `updated` set the model's record, `removed` deletes it. A
/// `removed` for a model that is not present is ignored.
pub fn replay<'a>(events: impl IntoIterator<Item = &'a ChangeEvent>) -> Snapshot {
    let mut state = Snapshot::new();
    for event in events {
        match &event.change {
            Change::Added { model } | Change::Updated { model, .. } => {
                state.insert(model.model_id.clone(), model.clone());
            }
            Change::Removed { model } => {
                if state.remove(&model.model_id).is_none() {
                    trace!("Ignoring removal of unknown model {}", model.model_id);
                }
            }
        }
    }
    state
}

/// Current snapshot of a provider history
pub fn snapshot(history: &ProviderHistory) -> Snapshot {
    replay(&history.changes)
}

/// The view handed to the publisher: a provider's models as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    /// Provider identifier
    pub provider: String,
    /// Day of the last crawl
    pub date: NaiveDate,
    /// Current records, sorted by model id
    pub models: Vec<PriceRecord>,
}

/// Build the publisher view of a history
pub fn provider_snapshot(history: &ProviderHistory) -> ProviderSnapshot {
    ProviderSnapshot {
        provider: history.provider.clone(),
        date: history.last_crawled.date_naive(),
        models: snapshot(history).into_values().collect(),
    }
}

/// Publisher view of the day before the last crawl.
///
/// Replays only events dated before the last crawl day. `None` when the
/// history has no such events.
pub fn previous_provider_snapshot(history: &ProviderHistory) -> Option<ProviderSnapshot> {
    let current_day = history.last_crawled.date_naive();
    let earlier: Vec<&ChangeEvent> = history
        .changes
        .iter()
        .filter(|event| event.date < current_day)
        .collect();
    if earlier.is_empty() {
        return None;
    }

    Some(ProviderSnapshot {
        provider: history.provider.clone(),
        date: current_day.pred_opt()?,
        models: replay(earlier).into_values().collect(),
    })
}
