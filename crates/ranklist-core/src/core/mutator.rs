//! Transactional position maintenance: insert, move, remove, repair.
//!
//! The backing store offers no multi-row transactions, so the shift phase
//! relies on write ordering to keep readers safe: up-shifts (increments)
//! run from the highest affected position downward, down-shifts
//! (decrements) from the lowest affected position upward. Either way no
//! reader observes two entries at the same position from the write
//! sequence itself.
//!
//! A crash between shift writes leaves a gap in the numbering. The repair
//! pass re-sorts entries by their last-known position (entry id breaking
//! ties) and rewrites `1..=N`; it is idempotent and runs transparently on
//! the next read.
//!
//! All mutating methods assume the caller holds the owner's critical
//! section (see `core::mod`).

use tracing::{debug, warn};

use crate::model::{EntryPayload, ItemId, OwnerId, RankedEntry};
use crate::store::PositionStore;

use super::snapshot::positions_are_dense;
use super::{RankError, RankResult};

/// Write-side service for one position store.
pub struct RankMutator<'a> {
    store: &'a dyn PositionStore,
}

impl<'a> RankMutator<'a> {
    pub(crate) const fn new(store: &'a dyn PositionStore) -> Self {
        Self { store }
    }

    /// Insert a new entry at `index`, shifting everything at or after it
    /// up by one. `index` is clamped into the live `[1, N+1]` (last-writer-
    /// wins when the resolving snapshot went stale).
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` if the item is already ranked for this owner;
    /// `Unavailable` if a store write fails (the shift may be partially
    /// applied — the next read repairs it).
    pub fn insert(
        &self,
        owner_id: &OwnerId,
        item_id: &ItemId,
        index: u32,
        payload: EntryPayload,
    ) -> RankResult<RankedEntry> {
        if self
            .store
            .get(owner_id, item_id)
            .map_err(RankError::Unavailable)?
            .is_some()
        {
            return Err(RankError::duplicate_entry(owner_id, item_id));
        }

        let entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;
        let index = clamp_index(index, entries.len(), owner_id);

        self.shift_up_from(&entries, index)?;

        let entry = RankedEntry::new(owner_id.clone(), item_id.clone(), index, payload)?;
        self.store.create(&entry).map_err(RankError::Unavailable)?;
        debug!(owner = %owner_id, item = %item_id, position = index, "inserted entry");
        Ok(entry)
    }

    /// Re-rank an existing entry to `new_index`, computed against the list
    /// without it (the resolver's snapshot excluded it). Deletes the old
    /// record, closes the gap, then re-inserts.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the item is not ranked; `Unavailable` on store
    /// failure mid-sequence.
    pub fn shift_move(
        &self,
        owner_id: &OwnerId,
        item_id: &ItemId,
        new_index: u32,
    ) -> RankResult<RankedEntry> {
        let old = self
            .store
            .get(owner_id, item_id)
            .map_err(RankError::Unavailable)?
            .ok_or_else(|| RankError::entry_not_found(owner_id, item_id))?;

        self.store.delete(&old.id).map_err(RankError::Unavailable)?;
        let entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;
        self.shift_down_above(&entries, old.position)?;

        // The gap is closed; insert against the N-1-sized list.
        let entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;
        let new_index = clamp_index(new_index, entries.len(), owner_id);
        self.shift_up_from(&entries, new_index)?;

        let entry = RankedEntry::new(owner_id.clone(), item_id.clone(), new_index, old.payload)?;
        self.store.create(&entry).map_err(RankError::Unavailable)?;
        debug!(
            owner = %owner_id, item = %item_id,
            from = old.position, to = new_index,
            "moved entry"
        );
        Ok(entry)
    }

    /// Remove an entry and close the gap it leaves.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the item is not ranked; `Unavailable` on store
    /// failure mid-sequence.
    pub fn remove(&self, owner_id: &OwnerId, item_id: &ItemId) -> RankResult<RankedEntry> {
        let entry = self
            .store
            .get(owner_id, item_id)
            .map_err(RankError::Unavailable)?
            .ok_or_else(|| RankError::entry_not_found(owner_id, item_id))?;

        self.store
            .delete(&entry.id)
            .map_err(RankError::Unavailable)?;
        let entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;
        self.shift_down_above(&entries, entry.position)?;
        debug!(owner = %owner_id, item = %item_id, position = entry.position, "removed entry");
        Ok(entry)
    }

    /// Rewrite positions to a dense `1..=N`, keeping the order given by
    /// (last-known position, entry id). Idempotent: a valid list is left
    /// untouched. Returns the number of entries rewritten.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the store cannot be read or written.
    pub fn repair(&self, owner_id: &OwnerId) -> RankResult<usize> {
        let entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;

        let mut rewritten = 0;
        for (i, entry) in entries.iter().enumerate() {
            let want = u32::try_from(i).map_err(anyhow::Error::from)? + 1;
            if entry.position != want {
                self.store
                    .update_position(&entry.id, want)
                    .map_err(RankError::Unavailable)?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    /// Run the repair pass only when the numbering is not dense.
    ///
    /// Returns the number of entries rewritten (0 when already valid).
    pub(crate) fn repair_if_needed(&self, owner_id: &OwnerId) -> RankResult<usize> {
        let entries = self
            .store
            .list_by_owner(owner_id)
            .map_err(RankError::Unavailable)?;
        if positions_are_dense(&entries) {
            return Ok(0);
        }

        warn!(owner = %owner_id, "position numbering not dense; running repair pass");
        let rewritten = self.repair(owner_id)?;
        warn!(owner = %owner_id, rewritten, "repair pass complete");
        Ok(rewritten)
    }

    /// Increment positions `>= index`, highest first.
    fn shift_up_from(&self, entries: &[RankedEntry], index: u32) -> RankResult<()> {
        for entry in entries.iter().rev().filter(|e| e.position >= index) {
            self.store
                .update_position(&entry.id, entry.position + 1)
                .map_err(RankError::Unavailable)?;
        }
        Ok(())
    }

    /// Decrement positions `> above`, lowest first.
    fn shift_down_above(&self, entries: &[RankedEntry], above: u32) -> RankResult<()> {
        for entry in entries.iter().filter(|e| e.position > above) {
            self.store
                .update_position(&entry.id, entry.position - 1)
                .map_err(RankError::Unavailable)?;
        }
        Ok(())
    }
}

/// Clamp a resolved index into the live `[1, N+1]`.
#[allow(clippy::cast_possible_truncation)]
fn clamp_index(index: u32, n: usize, owner_id: &OwnerId) -> u32 {
    let max = n as u32 + 1;
    let clamped = index.clamp(1, max);
    if clamped != index {
        debug!(owner = %owner_id, index, clamped, "resolved index out of live bounds; clamped");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn owner() -> OwnerId {
        OwnerId::new("alice")
    }

    fn setup(items: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_owner(&owner()).unwrap();
        for (i, item) in items.iter().enumerate() {
            let entry = RankedEntry::new(
                owner(),
                ItemId::new(*item),
                u32::try_from(i).unwrap() + 1,
                EntryPayload::default(),
            )
            .unwrap();
            store.create(&entry).unwrap();
        }
        store
    }

    fn order_of(store: &MemoryStore) -> Vec<String> {
        store
            .list_by_owner(&owner())
            .unwrap()
            .into_iter()
            .map(|e| e.item_id.as_str().to_string())
            .collect()
    }

    fn positions_of(store: &MemoryStore) -> Vec<u32> {
        store
            .list_by_owner(&owner())
            .unwrap()
            .into_iter()
            .map(|e| e.position)
            .collect()
    }

    #[test]
    fn test_insert_into_empty() {
        let store = setup(&[]);
        let mutator = RankMutator::new(&store);

        let entry = mutator
            .insert(&owner(), &ItemId::new("a"), 1, EntryPayload::default())
            .unwrap();
        assert_eq!(entry.position, 1);
        assert_eq!(positions_of(&store), vec![1]);
    }

    #[test]
    fn test_insert_at_front_shifts_everything() {
        let store = setup(&["a", "b", "c"]);
        let mutator = RankMutator::new(&store);

        mutator
            .insert(&owner(), &ItemId::new("x"), 1, EntryPayload::default())
            .unwrap();
        assert_eq!(order_of(&store), vec!["x", "a", "b", "c"]);
        assert_eq!(positions_of(&store), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_insert_in_middle() {
        let store = setup(&["a", "b", "c"]);
        let mutator = RankMutator::new(&store);

        mutator
            .insert(&owner(), &ItemId::new("x"), 2, EntryPayload::default())
            .unwrap();
        assert_eq!(order_of(&store), vec!["a", "x", "b", "c"]);
        assert_eq!(positions_of(&store), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_insert_duplicate_is_conflict() {
        let store = setup(&["a"]);
        let mutator = RankMutator::new(&store);

        let err = mutator
            .insert(&owner(), &ItemId::new("a"), 1, EntryPayload::default())
            .unwrap_err();
        assert!(matches!(err, RankError::DuplicateEntry { .. }));
        assert_eq!(positions_of(&store), vec![1], "no shift applied");
    }

    #[test]
    fn test_insert_clamps_stale_index() {
        let store = setup(&["a", "b"]);
        let mutator = RankMutator::new(&store);

        // Resolved against a longer list that has since shrunk.
        mutator
            .insert(&owner(), &ItemId::new("x"), 9, EntryPayload::default())
            .unwrap();
        assert_eq!(order_of(&store), vec!["a", "b", "x"]);

        mutator
            .insert(&owner(), &ItemId::new("y"), 0, EntryPayload::default())
            .unwrap();
        assert_eq!(order_of(&store), vec!["y", "a", "b", "x"]);
    }

    #[test]
    fn test_remove_closes_gap() {
        let store = setup(&["a", "b", "c"]);
        let mutator = RankMutator::new(&store);

        mutator.remove(&owner(), &ItemId::new("b")).unwrap();
        assert_eq!(order_of(&store), vec!["a", "c"]);
        assert_eq!(positions_of(&store), vec![1, 2]);
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let store = setup(&["a"]);
        let mutator = RankMutator::new(&store);

        let err = mutator.remove(&owner(), &ItemId::new("zz")).unwrap_err();
        assert!(matches!(err, RankError::EntryNotFound { .. }));
    }

    #[test]
    fn test_insert_then_remove_roundtrips_other_positions() {
        let store = setup(&["a", "b", "c", "d"]);
        let mutator = RankMutator::new(&store);

        let before: Vec<(String, u32)> = store
            .list_by_owner(&owner())
            .unwrap()
            .into_iter()
            .map(|e| (e.item_id.as_str().to_string(), e.position))
            .collect();

        mutator
            .insert(&owner(), &ItemId::new("x"), 2, EntryPayload::default())
            .unwrap();
        mutator.remove(&owner(), &ItemId::new("x")).unwrap();

        let after: Vec<(String, u32)> = store
            .list_by_owner(&owner())
            .unwrap()
            .into_iter()
            .map(|e| (e.item_id.as_str().to_string(), e.position))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_equals_remove_then_insert() {
        for new_index in 1..=4u32 {
            let moved = setup(&["a", "b", "c", "d"]);
            let composed = setup(&["a", "b", "c", "d"]);

            RankMutator::new(&moved)
                .shift_move(&owner(), &ItemId::new("b"), new_index)
                .unwrap();

            let m = RankMutator::new(&composed);
            m.remove(&owner(), &ItemId::new("b")).unwrap();
            m.insert(&owner(), &ItemId::new("b"), new_index, EntryPayload::default())
                .unwrap();

            assert_eq!(
                order_of(&moved),
                order_of(&composed),
                "new_index={new_index}"
            );
            assert_eq!(positions_of(&moved), vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_move_missing_is_not_found() {
        let store = setup(&["a"]);
        let err = RankMutator::new(&store)
            .shift_move(&owner(), &ItemId::new("zz"), 1)
            .unwrap_err();
        assert!(matches!(err, RankError::EntryNotFound { .. }));
    }

    #[test]
    fn test_move_preserves_payload() {
        let store = setup(&["a", "b"]);
        let mutator = RankMutator::new(&store);
        let payload = EntryPayload {
            platforms: vec!["pc".to_string()],
            note: Some("goty".to_string()),
        };
        mutator
            .insert(&owner(), &ItemId::new("x"), 3, payload.clone())
            .unwrap();

        mutator.shift_move(&owner(), &ItemId::new("x"), 1).unwrap();
        let entry = store.get(&owner(), &ItemId::new("x")).unwrap().unwrap();
        assert_eq!(entry.payload, payload);
        assert_eq!(entry.position, 1);
    }

    #[test]
    fn test_partial_shift_leaves_gap_never_duplicate() {
        let store = setup(&["a", "b", "c"]);
        let mutator = RankMutator::new(&store);

        // Up-shift runs highest-first: first write moves c from 3 to 4,
        // the second (b to 3) is made to fail.
        store.fail_after(1);
        let err = mutator
            .insert(&owner(), &ItemId::new("x"), 1, EntryPayload::default())
            .unwrap_err();
        assert!(matches!(err, RankError::Unavailable(_)));
        store.clear_fault();

        let positions = positions_of(&store);
        assert_eq!(positions, vec![1, 2, 4], "gap, not a duplicate");
        let mut deduped = positions.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), positions.len());
    }

    #[test]
    fn test_repair_recovers_partial_shift() {
        let store = setup(&["a", "b", "c"]);
        let mutator = RankMutator::new(&store);

        store.fail_after(1);
        let _ = mutator.insert(&owner(), &ItemId::new("x"), 1, EntryPayload::default());
        store.clear_fault();

        let rewritten = mutator.repair_if_needed(&owner()).unwrap();
        assert_eq!(rewritten, 1);
        assert_eq!(order_of(&store), vec!["a", "b", "c"]);
        assert_eq!(positions_of(&store), vec![1, 2, 3]);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let store = setup(&["a", "b", "c"]);
        let mutator = RankMutator::new(&store);

        assert_eq!(mutator.repair(&owner()).unwrap(), 0);
        assert_eq!(mutator.repair(&owner()).unwrap(), 0);
        assert_eq!(mutator.repair_if_needed(&owner()).unwrap(), 0);
        assert_eq!(order_of(&store), vec!["a", "b", "c"]);
    }
}
