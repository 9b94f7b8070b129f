//! Consistent ordered reads of an owner's list.

use crate::model::{ItemId, OwnerId, RankedEntry};
use crate::store::PositionStore;

use super::{RankError, RankResult};

/// Read-side service: produces the ordered list the resolver compares
/// against, excluding the item being re-ranked so it never compares
/// against itself.
pub struct SnapshotProvider<'a> {
    store: &'a dyn PositionStore,
}

impl<'a> SnapshotProvider<'a> {
    pub(crate) const fn new(store: &'a dyn PositionStore) -> Self {
        Self { store }
    }

    /// All entries for `owner_id` ascending by position, omitting
    /// `exclude_item_id` when supplied.
    ///
    /// An owner with zero entries yields an empty list; only an
    /// unregistered owner is an error.
    ///
    /// # Errors
    ///
    /// `OwnerNotFound` for an unregistered owner, `Unavailable` if the
    /// store cannot be read.
    pub fn snapshot(
        &self,
        owner_id: &OwnerId,
        exclude_item_id: Option<&ItemId>,
    ) -> RankResult<Vec<RankedEntry>> {
        if !self
            .store
            .owner_exists(owner_id)
            .map_err(RankError::Unavailable)?
        {
            return Err(RankError::owner_not_found(owner_id));
        }

        let mut entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;

        if let Some(exclude) = exclude_item_id {
            entries.retain(|e| &e.item_id != exclude);
        }

        Ok(entries)
    }

}

/// True when `entries` (sorted ascending by position) occupy exactly
/// positions `1..=N`.
pub(crate) fn positions_are_dense(entries: &[RankedEntry]) -> bool {
    entries
        .iter()
        .enumerate()
        .all(|(i, e)| e.position as usize == i + 1)
}
