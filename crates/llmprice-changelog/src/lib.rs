//! Price change log for llmprice
//!
//! This crate keeps one append-only log of `added`/`updated`/`removed`
//! events per provider, computes the events between the current state and a
//! freshly observed price list, and replays a log into its current snapshot.

pub mod backend;
pub mod diff;
pub mod snapshot;
pub mod store;

pub use backend::{HistoryBackend, JsonFileBackend, MemoryBackend, validate_provider_id};
pub use diff::{COMPARABLE_FIELDS, ComparableField, diff, has_price_change};
pub use snapshot::{
    ProviderSnapshot, previous_provider_snapshot, provider_snapshot, replay, snapshot,
};
pub use store::ChangeLogStore;
