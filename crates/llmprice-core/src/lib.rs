//! Core types, traits, and utilities for llmprice
//!
//! This crate provides the price and change-event value types, the
//! price-source capability trait, the clock abstraction and the error
//! taxonomy shared by every other llmprice crate.

pub mod clock;
pub mod error;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LlmPriceError, Result};
pub use provider::{PriceSource, StaticPriceSource};
pub use types::{Change, ChangeEvent, ChangeKind, PriceRecord, ProviderHistory, Snapshot};
