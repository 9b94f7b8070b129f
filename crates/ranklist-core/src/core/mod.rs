//! Service layer for ranklist-core.
//!
//! Provides the typed, high-level API for ranked-list maintenance: begin a
//! ranking session, answer its comparisons, commit the resolved index, and
//! remove or list entries. The engine encapsulates the store behind a
//! trait object and enforces the per-owner write serialization the
//! dense-permutation invariant depends on.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ranklist_core::core::{Preference, RankEngine};
//! use ranklist_core::model::{EntryPayload, ItemId, OwnerId};
//! use ranklist_core::store::MemoryStore;
//!
//! let engine = RankEngine::new(Arc::new(MemoryStore::new()));
//! let owner = OwnerId::new("alice");
//! engine.create_owner(&owner).unwrap();
//!
//! let mut session = engine
//!     .begin_ranking(&owner, &ItemId::new("celeste"), EntryPayload::default())
//!     .unwrap();
//! session.resolve_with(|_probe| Preference::Worse);
//! let entry = engine.commit(session).unwrap();
//! assert_eq!(entry.position, 1);
//! ```

pub mod errors;
pub mod mutator;
pub mod session;
pub mod snapshot;

pub use errors::{RankError, RankResult};
pub use mutator::RankMutator;
pub use session::{Preference, RankingSession, SessionStep};
pub use snapshot::SnapshotProvider;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::model::{EntryPayload, ItemId, OwnerId, RankedEntry};
use crate::store::PositionStore;

use session::SessionKind;

/// Registry handing out one exclusive section per owner.
///
/// The lock covers the full shift-then-write sequence of a mutation and is
/// never held across a session's interactive suspension: sessions resolve
/// against a stale-but-consistent snapshot and the commit clamps into the
/// live bounds (last-writer-wins).
#[derive(Default)]
struct OwnerLocks {
    inner: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    fn lock_for(&self, owner_id: &OwnerId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(owner_id.clone()).or_default())
    }
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Facade over the ranked-list maintenance engine.
///
/// All invariants are scoped per owner; operations for different owners
/// never contend.
pub struct RankEngine {
    store: Arc<dyn PositionStore>,
    locks: OwnerLocks,
}

impl RankEngine {
    #[must_use]
    pub fn new(store: Arc<dyn PositionStore>) -> Self {
        Self {
            store,
            locks: OwnerLocks::default(),
        }
    }

    /// Register an owner. Idempotent.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the store write fails.
    pub fn create_owner(&self, owner_id: &OwnerId) -> RankResult<()> {
        self.store
            .create_owner(owner_id)
            .map_err(RankError::Unavailable)
    }

    /// The owner's list, ascending by position.
    ///
    /// Runs the repair pass first if the numbering is found non-dense
    /// (self-healing after a crash mid-shift).
    ///
    /// # Errors
    ///
    /// `OwnerNotFound` for an unregistered owner; `Unavailable` on store
    /// failure.
    pub fn list(&self, owner_id: &OwnerId) -> RankResult<Vec<RankedEntry>> {
        self.consistent_snapshot(owner_id, None)
    }

    /// Start ranking a new item. The session is read-only; nothing is
    /// persisted until [`Self::commit`].
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` if the item is already ranked (re-rank instead);
    /// `OwnerNotFound`; `Unavailable`.
    pub fn begin_ranking(
        &self,
        owner_id: &OwnerId,
        item_id: &ItemId,
        payload: EntryPayload,
    ) -> RankResult<RankingSession> {
        if self
            .store
            .get(owner_id, item_id)
            .map_err(RankError::Unavailable)?
            .is_some()
        {
            return Err(RankError::duplicate_entry(owner_id, item_id));
        }

        let snapshot = self.consistent_snapshot(owner_id, None)?;
        debug!(owner = %owner_id, item = %item_id, n = snapshot.len(), "ranking session started");
        Ok(RankingSession::new(
            SessionKind::Ranking,
            owner_id.clone(),
            item_id.clone(),
            payload,
            snapshot,
        ))
    }

    /// Start re-ranking an already-ranked item. The snapshot excludes the
    /// item so it never compares against itself.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the item is not ranked; `OwnerNotFound`;
    /// `Unavailable`.
    pub fn begin_rerank(&self, owner_id: &OwnerId, item_id: &ItemId) -> RankResult<RankingSession> {
        let existing = self
            .store
            .get(owner_id, item_id)
            .map_err(RankError::Unavailable)?
            .ok_or_else(|| RankError::entry_not_found(owner_id, item_id))?;

        let snapshot = self.consistent_snapshot(owner_id, Some(item_id))?;
        debug!(owner = %owner_id, item = %item_id, n = snapshot.len(), "rerank session started");
        Ok(RankingSession::new(
            SessionKind::Rerank,
            owner_id.clone(),
            item_id.clone(),
            existing.payload,
            snapshot,
        ))
    }

    /// Commit a resolved session: enter the owner's critical section,
    /// repair if needed, clamp the resolved index into the live bounds,
    /// and perform the insert (or delete-and-reinsert for a re-rank).
    ///
    /// # Errors
    ///
    /// `SessionUnresolved` if comparisons remain unanswered;
    /// `DuplicateEntry` if another session ranked the same item first;
    /// `EntryNotFound` if a re-ranked item was removed meanwhile;
    /// `Unavailable` on store failure (possibly partially applied).
    pub fn commit(&self, session: RankingSession) -> RankResult<RankedEntry> {
        let index = session.resolved_index().ok_or(RankError::SessionUnresolved)?;
        let owner_id = session.owner_id().clone();
        let item_id = session.item_id().clone();
        let kind = session.kind();

        let lock = self.locks.lock_for(&owner_id);
        let _guard = hold(&lock);

        let mutator = RankMutator::new(self.store.as_ref());
        mutator.repair_if_needed(&owner_id)?;

        match kind {
            SessionKind::Ranking => {
                mutator.insert(&owner_id, &item_id, index, session.into_payload())
            }
            SessionKind::Rerank => mutator.shift_move(&owner_id, &item_id, index),
        }
    }

    /// Remove an entry and close the gap it leaves.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if the item is not ranked; `Unavailable` on store
    /// failure.
    pub fn remove_entry(&self, owner_id: &OwnerId, item_id: &ItemId) -> RankResult<()> {
        let lock = self.locks.lock_for(owner_id);
        let _guard = hold(&lock);

        let mutator = RankMutator::new(self.store.as_ref());
        mutator.repair_if_needed(owner_id)?;
        mutator.remove(owner_id, item_id)?;
        Ok(())
    }

    /// Run the repair pass explicitly, regardless of current validity.
    ///
    /// Returns the number of entries whose position was rewritten.
    ///
    /// # Errors
    ///
    /// `Unavailable` on store failure.
    pub fn repair(&self, owner_id: &OwnerId) -> RankResult<usize> {
        let lock = self.locks.lock_for(owner_id);
        let _guard = hold(&lock);
        RankMutator::new(self.store.as_ref()).repair(owner_id)
    }

    /// Ordered snapshot with transparent repair-on-read.
    fn consistent_snapshot(
        &self,
        owner_id: &OwnerId,
        exclude: Option<&ItemId>,
    ) -> RankResult<Vec<RankedEntry>> {
        let provider = SnapshotProvider::new(self.store.as_ref());
        let entries = provider.snapshot(owner_id, exclude)?;

        // Exclusion hides one position, so validate the raw read only.
        if exclude.is_none() && !snapshot::positions_are_dense(&entries) {
            let lock = self.locks.lock_for(owner_id);
            let _guard = hold(&lock);
            RankMutator::new(self.store.as_ref()).repair_if_needed(owner_id)?;
            return provider.snapshot(owner_id, exclude);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn owner() -> OwnerId {
        OwnerId::new("alice")
    }

    fn engine_with_store() -> (RankEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = RankEngine::new(Arc::clone(&store) as Arc<dyn PositionStore>);
        engine.create_owner(&owner()).unwrap();
        (engine, store)
    }

    /// Insert an item by resolving against a fixed total order.
    fn rank_item(engine: &RankEngine, order: &[&str], item: &str) {
        let rank = |i: &str| order.iter().position(|o| *o == i).unwrap();
        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new(item), EntryPayload::default())
            .unwrap();
        session.resolve_with(|probe| {
            if rank(item) < rank(probe.item_id.as_str()) {
                Preference::Better
            } else {
                Preference::Worse
            }
        });
        engine.commit(session).unwrap();
    }

    fn items_of(engine: &RankEngine) -> Vec<String> {
        engine
            .list(&owner())
            .unwrap()
            .into_iter()
            .map(|e| e.item_id.as_str().to_string())
            .collect()
    }

    fn assert_dense(engine: &RankEngine) {
        let positions: Vec<u32> = engine
            .list(&owner())
            .unwrap()
            .iter()
            .map(|e| e.position)
            .collect();
        let expected: Vec<u32> = (1..=u32::try_from(positions.len()).unwrap()).collect();
        assert_eq!(positions, expected);
    }

    #[test]
    fn test_concrete_scenario() {
        let (engine, _) = engine_with_store();

        // Empty list, insert A: position 1, no comparisons.
        let session = engine
            .begin_ranking(&owner(), &ItemId::new("A"), EntryPayload::default())
            .unwrap();
        assert_eq!(session.comparisons_asked(), 0);
        let a = engine.commit(session).unwrap();
        assert_eq!(a.position, 1);

        // Insert B, judged worse than A.
        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new("B"), EntryPayload::default())
            .unwrap();
        assert_eq!(session.probe().unwrap().item_id.as_str(), "A");
        session.decide(Preference::Worse);
        engine.commit(session).unwrap();
        assert_eq!(items_of(&engine), vec!["A", "B"]);

        // Insert C, better than everything: two comparisons, one of them
        // against A.
        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new("C"), EntryPayload::default())
            .unwrap();
        session.resolve_with(|_| Preference::Better);
        assert_eq!(session.comparisons_asked(), 2);
        engine.commit(session).unwrap();
        assert_eq!(items_of(&engine), vec!["C", "A", "B"]);

        // Remove A.
        engine.remove_entry(&owner(), &ItemId::new("A")).unwrap();
        assert_eq!(items_of(&engine), vec!["C", "B"]);
        assert_dense(&engine);
    }

    #[test]
    fn test_oracle_order_converges_for_any_insertion_order() {
        let order = ["w", "x", "y", "z", "q", "p"];
        let insertion_orders: [&[&str]; 3] = [
            &["w", "x", "y", "z", "q", "p"],
            &["p", "q", "z", "y", "x", "w"],
            &["y", "p", "w", "q", "z", "x"],
        ];

        for insertion in insertion_orders {
            let (engine, _) = engine_with_store();
            for item in insertion {
                rank_item(&engine, &order, item);
            }
            assert_eq!(items_of(&engine), order.to_vec(), "insertion {insertion:?}");
            assert_dense(&engine);
        }
    }

    #[test]
    fn test_begin_ranking_rejects_duplicate() {
        let (engine, _) = engine_with_store();
        rank_item(&engine, &["a"], "a");

        let err = engine
            .begin_ranking(&owner(), &ItemId::new("a"), EntryPayload::default())
            .unwrap_err();
        assert!(matches!(err, RankError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_begin_rerank_requires_existing_entry() {
        let (engine, _) = engine_with_store();
        let err = engine
            .begin_rerank(&owner(), &ItemId::new("ghost"))
            .unwrap_err();
        assert!(matches!(err, RankError::EntryNotFound { .. }));
    }

    #[test]
    fn test_rerank_excludes_item_and_moves_it() {
        let order = ["a", "b", "c", "d"];
        let (engine, _) = engine_with_store();
        for item in order {
            rank_item(&engine, &order, item);
        }

        // Move d to the top.
        let mut session = engine.begin_rerank(&owner(), &ItemId::new("d")).unwrap();
        assert_eq!(session.snapshot_len(), 3, "snapshot excludes the item");
        session.resolve_with(|_| Preference::Better);
        let entry = engine.commit(session).unwrap();
        assert_eq!(entry.position, 1);
        assert_eq!(items_of(&engine), vec!["d", "a", "b", "c"]);
        assert_dense(&engine);
    }

    #[test]
    fn test_commit_unresolved_session_is_rejected() {
        let (engine, _) = engine_with_store();
        rank_item(&engine, &["a"], "a");

        let session = engine
            .begin_ranking(&owner(), &ItemId::new("b"), EntryPayload::default())
            .unwrap();
        assert!(!session.is_resolved());
        let err = engine.commit(session).unwrap_err();
        assert!(matches!(err, RankError::SessionUnresolved));
    }

    #[test]
    fn test_abandoned_session_persists_nothing() {
        let (engine, _) = engine_with_store();
        rank_item(&engine, &["a"], "a");

        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new("b"), EntryPayload::default())
            .unwrap();
        session.decide(Preference::Worse);
        drop(session);

        assert_eq!(items_of(&engine), vec!["a"]);
    }

    #[test]
    fn test_unregistered_owner() {
        let (engine, _) = engine_with_store();
        let err = engine.list(&OwnerId::new("ghost")).unwrap_err();
        assert!(matches!(err, RankError::OwnerNotFound { .. }));
    }

    #[test]
    fn test_stale_session_lands_at_clamped_edge() {
        // Session resolved against a 3-item snapshot (index 4); the list
        // shrinks to one entry before commit. Last-writer-wins: the commit
        // clamps to the live end instead of rejecting.
        let (engine, _) = engine_with_store();
        for item in ["a", "b", "c"] {
            rank_item(&engine, &["a", "b", "c"], item);
        }

        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new("x"), EntryPayload::default())
            .unwrap();
        session.resolve_with(|_| Preference::Worse);
        assert_eq!(session.resolved_index(), Some(4));

        engine.remove_entry(&owner(), &ItemId::new("b")).unwrap();
        engine.remove_entry(&owner(), &ItemId::new("c")).unwrap();

        let entry = engine.commit(session).unwrap();
        assert_eq!(entry.position, 2);
        assert_eq!(items_of(&engine), vec!["a", "x"]);
        assert_dense(&engine);
    }

    #[test]
    fn test_list_self_heals_after_partial_shift() {
        let (engine, store) = engine_with_store();
        for item in ["a", "b", "c"] {
            rank_item(&engine, &["a", "b", "c"], item);
        }

        // Crash an insert mid-shift.
        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new("x"), EntryPayload::default())
            .unwrap();
        session.resolve_with(|_| Preference::Better);
        store.fail_after(1);
        let err = engine.commit(session).unwrap_err();
        assert!(matches!(err, RankError::Unavailable(_)));
        store.clear_fault();

        // The next read repairs transparently.
        assert_eq!(items_of(&engine), vec!["a", "b", "c"]);
        assert_dense(&engine);
    }

    // ========================================================================
    // Interleaving tests (per-owner exclusivity)
    // ========================================================================

    /// Replays the shift phases of an insert and a remove interleaved at
    /// the raw store level, with no owner lock. The insert plans its
    /// shifts against a read that the remove then invalidates, producing a
    /// duplicate position.
    #[test]
    fn test_unsynchronized_interleaving_produces_duplicate_position() {
        let store = MemoryStore::new();
        store.create_owner(&owner()).unwrap();
        let mut entries = Vec::new();
        for (i, item) in ["a", "b", "c"].iter().enumerate() {
            let entry = RankedEntry::new(
                owner(),
                ItemId::new(*item),
                u32::try_from(i).unwrap() + 1,
                EntryPayload::default(),
            )
            .unwrap();
            store.create(&entry).unwrap();
            entries.push(entry);
        }
        let (a, b, c) = (&entries[0], &entries[1], &entries[2]);

        // Insert-at-1 plans shifts from a stale read: c 3->4, b 2->3, a 1->2.
        store.update_position(&c.id, 4).unwrap();

        // Remove of `a` runs to completion in between: delete a, b 2->1, c 4->3.
        store.delete(&a.id).unwrap();
        store.update_position(&b.id, 1).unwrap();
        store.update_position(&c.id, 3).unwrap();

        // Insert resumes its stale plan: b 2->3 (b is at 1 now, but the
        // plan only knows ids), then creates the new entry at 1.
        store.update_position(&b.id, 3).unwrap();
        let new_entry =
            RankedEntry::new(owner(), ItemId::new("x"), 1, EntryPayload::default()).unwrap();
        store.create(&new_entry).unwrap();

        let positions: Vec<u32> = store
            .list_by_owner(&owner())
            .unwrap()
            .iter()
            .map(|e| e.position)
            .collect();
        assert_eq!(positions, vec![1, 3, 3], "duplicate position reached");
    }

    /// The same two operations through the engine, racing on threads: the
    /// per-owner critical section serializes them and the result is a
    /// dense permutation either way.
    #[test]
    fn test_locked_engine_serializes_concurrent_mutations() {
        let (engine, _) = engine_with_store();
        let engine = Arc::new(engine);
        for item in ["a", "b", "c"] {
            rank_item(&engine, &["a", "b", "c"], item);
        }

        let mut session = engine
            .begin_ranking(&owner(), &ItemId::new("x"), EntryPayload::default())
            .unwrap();
        session.resolve_with(|_| Preference::Better);

        let inserter = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.commit(session).map(|_| ()))
        };
        let remover = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.remove_entry(&owner(), &ItemId::new("a")))
        };

        inserter.join().expect("inserter panicked").unwrap();
        remover.join().expect("remover panicked").unwrap();

        let entries = engine.list(&owner()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_dense(&engine);
        assert!(entries.iter().any(|e| e.item_id.as_str() == "x"));
        assert!(entries.iter().all(|e| e.item_id.as_str() != "a"));
    }

    #[test]
    fn test_explicit_repair_reports_zero_on_valid_list() {
        let (engine, _) = engine_with_store();
        for item in ["a", "b"] {
            rank_item(&engine, &["a", "b"], item);
        }
        assert_eq!(engine.repair(&owner()).unwrap(), 0);
    }
}
