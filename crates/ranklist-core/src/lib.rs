//! ranklist-core — domain logic for the ranklist ranked-list engine.
//!
//! This crate owns the data model, position store backends, comparison
//! resolution, and the rank mutation protocol.

pub mod core;
pub mod model;
pub mod store;

pub use crate::core::{Preference, RankEngine, RankError, RankResult, RankingSession, SessionStep};
pub use crate::model::{EntryId, EntryPayload, ItemId, OwnerId, RankedEntry};
