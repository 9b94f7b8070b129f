//! In-memory position store.
//!
//! Backs the engine in tests and supports fault injection: `fail_after(n)`
//! makes every mutation after the nth fail, which is how the partial-shift
//! recovery properties are exercised.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};

use crate::model::{EntryId, ItemId, OwnerId, RankedEntry};
use crate::store::PositionStore;

/// HashMap-backed store with optional fault injection.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<EntryId, RankedEntry>>,
    owners: Mutex<HashSet<OwnerId>>,
    /// Remaining mutation budget; `None` means unlimited.
    mutations_left: Mutex<Option<u32>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `n` mutations (create/update/delete) succeed, then fail
    /// every subsequent one until [`Self::clear_fault`] is called.
    pub fn fail_after(&self, n: u32) {
        *self
            .mutations_left
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(n);
    }

    /// Remove any injected fault.
    pub fn clear_fault(&self) {
        *self
            .mutations_left
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn consume_budget(&self) -> Result<()> {
        let mut budget = self
            .mutations_left
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(left) = budget.as_mut() {
            if *left == 0 {
                bail!("injected store failure");
            }
            *left -= 1;
        }
        Ok(())
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<EntryId, RankedEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionStore for MemoryStore {
    fn create_owner(&self, owner_id: &OwnerId) -> Result<()> {
        self.owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(owner_id.clone());
        Ok(())
    }

    fn owner_exists(&self, owner_id: &OwnerId) -> Result<bool> {
        Ok(self
            .owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(owner_id))
    }

    fn get(&self, owner_id: &OwnerId, item_id: &ItemId) -> Result<Option<RankedEntry>> {
        Ok(self
            .lock_entries()
            .values()
            .find(|e| &e.owner_id == owner_id && &e.item_id == item_id)
            .cloned())
    }

    fn get_by_position(&self, owner_id: &OwnerId, position: u32) -> Result<Option<RankedEntry>> {
        let entries = self.lock_entries();
        let mut matches: Vec<&RankedEntry> = entries
            .values()
            .filter(|e| &e.owner_id == owner_id && e.position == position)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|e| (*e).clone()))
    }

    fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<RankedEntry>> {
        let entries = self.lock_entries();
        let mut owned: Vec<RankedEntry> = entries
            .values()
            .filter(|e| &e.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        Ok(owned)
    }

    fn create(&self, entry: &RankedEntry) -> Result<()> {
        self.consume_budget()?;
        let mut entries = self.lock_entries();
        if entries
            .values()
            .any(|e| e.owner_id == entry.owner_id && e.item_id == entry.item_id)
        {
            bail!(
                "Entry already exists for ({}, {})",
                entry.owner_id,
                entry.item_id
            );
        }
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn update_position(&self, id: &EntryId, position: u32) -> Result<()> {
        self.consume_budget()?;
        let mut entries = self.lock_entries();
        let Some(entry) = entries.get_mut(id) else {
            bail!("No entry row with id {id}");
        };
        entry.position = position;
        entry.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn delete(&self, id: &EntryId) -> Result<()> {
        self.consume_budget()?;
        let mut entries = self.lock_entries();
        if entries.remove(id).is_none() {
            bail!("No entry row with id {id}");
        }
        Ok(())
    }
}
