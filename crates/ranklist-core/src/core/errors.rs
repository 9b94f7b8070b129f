//! Typed error types for the ranklist service layer.

use thiserror::Error;

/// Result type alias for ranking operations.
pub type RankResult<T> = Result<T, RankError>;

/// Errors that can occur in the ranking engine.
///
/// Dense-permutation breaches are not represented here: the engine detects
/// them internally and runs the repair pass instead of surfacing them.
#[derive(Debug, Error)]
pub enum RankError {
    /// The owner has never been registered.
    #[error("Owner not found: {owner_id}")]
    OwnerNotFound { owner_id: String },

    /// No entry exists for the given (owner, item) pair.
    #[error("No ranked entry for item '{item_id}' in {owner_id}'s list")]
    EntryNotFound { owner_id: String, item_id: String },

    /// The item is already ranked for this owner. Re-rank instead of
    /// inserting a second time.
    #[error("Item '{item_id}' is already ranked in {owner_id}'s list")]
    DuplicateEntry { owner_id: String, item_id: String },

    /// A session was committed before the binary search resolved.
    #[error("Ranking session has unanswered comparisons; resolve it before committing")]
    SessionUnresolved,

    /// A record store call failed. The surrounding operation may be
    /// partially applied; the next successful read repairs the numbering.
    #[error("Ranking store unavailable (operation may be partially applied)")]
    Unavailable(#[source] anyhow::Error),

    /// An internal engine error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RankError {
    pub(crate) fn owner_not_found(owner_id: &crate::model::OwnerId) -> Self {
        Self::OwnerNotFound {
            owner_id: owner_id.to_string(),
        }
    }

    pub(crate) fn entry_not_found(
        owner_id: &crate::model::OwnerId,
        item_id: &crate::model::ItemId,
    ) -> Self {
        Self::EntryNotFound {
            owner_id: owner_id.to_string(),
            item_id: item_id.to_string(),
        }
    }

    pub(crate) fn duplicate_entry(
        owner_id: &crate::model::OwnerId,
        item_id: &crate::model::ItemId,
    ) -> Self {
        Self::DuplicateEntry {
            owner_id: owner_id.to_string(),
            item_id: item_id.to_string(),
        }
    }
}
