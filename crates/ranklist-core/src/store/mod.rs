//! Position store backends for ranklist.
//!
//! The store is the engine's only persistence seam. Each trait method maps
//! to one single-record call against the backing record store; there are no
//! multi-record transactions, which is why the mutator's write ordering
//! matters (see `core::mutator`).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;

use crate::model::{EntryId, ItemId, OwnerId, RankedEntry};

/// Thin persistence contract for ranked entries.
///
/// Every method is atomic at the single-row level and nothing more. Errors
/// at this layer are untyped (`anyhow`); the service layer maps them to
/// `RankError::Unavailable`.
pub trait PositionStore: Send + Sync {
    /// Register an owner. Idempotent: registering an existing owner is a no-op.
    fn create_owner(&self, owner_id: &OwnerId) -> Result<()>;

    /// Check whether an owner has been registered.
    fn owner_exists(&self, owner_id: &OwnerId) -> Result<bool>;

    /// Fetch the entry for `(owner, item)`, if any.
    fn get(&self, owner_id: &OwnerId, item_id: &ItemId) -> Result<Option<RankedEntry>>;

    /// Fetch the entry occupying `position` for an owner, if any.
    ///
    /// During a mid-shift window more than one entry can transiently hold
    /// the same position; this returns the first by entry id.
    fn get_by_position(&self, owner_id: &OwnerId, position: u32) -> Result<Option<RankedEntry>>;

    /// All entries for an owner, ordered ascending by position (ties broken
    /// by entry id so repair is deterministic).
    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<RankedEntry>>;

    /// Insert a new entry row.
    fn create(&self, entry: &RankedEntry) -> Result<()>;

    /// Rewrite the position of an existing entry row.
    fn update_position(&self, id: &EntryId, position: u32) -> Result<()>;

    /// Delete an entry row.
    fn delete(&self, id: &EntryId) -> Result<()>;
}
