//! Interactive binary-insertion search over an owner's ranked list.
//!
//! A [`RankingSession`] converts a pairwise preference oracle (usually a
//! human) into a target insertion index in `[1, N+1]`. The session is
//! read-only: it holds a snapshot taken at `begin_*` time and touches no
//! store state, so abandoning it at any point persists nothing.

use crate::model::{EntryPayload, ItemId, OwnerId, RankedEntry};

/// The caller's judgement of the candidate against the current probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// The candidate ranks above (closer to 1 than) the probe.
    Better,
    /// The candidate ranks below the probe.
    Worse,
    /// The caller cannot decide. Tie policy: treated as `Worse`.
    Undecided,
}

/// Result of answering one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    /// Another comparison is needed, against the named item.
    Probe(ItemId),
    /// The search has converged on a 1-based insertion index.
    Resolved(u32),
}

/// Whether the session inserts a new item or re-ranks an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionKind {
    Ranking,
    Rerank,
}

/// One in-flight ranking decision procedure.
///
/// Maintains a closed candidate-index interval `[lo, hi]` initialised to
/// `[1, N+1]` over the snapshot and narrows it by probing the middle entry,
/// asking at most `ceil(log2(N+1))` comparisons. The degenerate cases fall
/// out: an empty snapshot resolves to index 1 immediately, a single entry
/// asks exactly one comparison.
#[derive(Debug)]
pub struct RankingSession {
    kind: SessionKind,
    owner_id: OwnerId,
    item_id: ItemId,
    payload: EntryPayload,
    snapshot: Vec<RankedEntry>,
    lo: u32,
    hi: u32,
    comparisons: u32,
}

impl RankingSession {
    pub(crate) fn new(
        kind: SessionKind,
        owner_id: OwnerId,
        item_id: ItemId,
        payload: EntryPayload,
        snapshot: Vec<RankedEntry>,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let n = snapshot.len() as u32;
        Self {
            kind,
            owner_id,
            item_id,
            payload,
            snapshot,
            lo: 1,
            hi: n + 1,
            comparisons: 0,
        }
    }

    pub(crate) const fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub const fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    #[must_use]
    pub const fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub const fn payload(&self) -> &EntryPayload {
        &self.payload
    }

    pub(crate) fn into_payload(self) -> EntryPayload {
        self.payload
    }

    /// Number of entries the candidate is being ranked against.
    #[must_use]
    pub fn snapshot_len(&self) -> usize {
        self.snapshot.len()
    }

    /// Comparisons answered so far.
    #[must_use]
    pub const fn comparisons_asked(&self) -> u32 {
        self.comparisons
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.lo >= self.hi
    }

    /// The resolved 1-based insertion index, once the search has converged.
    #[must_use]
    pub const fn resolved_index(&self) -> Option<u32> {
        if self.is_resolved() {
            Some(self.lo)
        } else {
            None
        }
    }

    /// The entry the caller must judge the candidate against, or `None`
    /// once the search has converged.
    #[must_use]
    pub fn probe(&self) -> Option<&RankedEntry> {
        if self.is_resolved() {
            return None;
        }
        self.snapshot.get(self.mid() as usize - 1)
    }

    /// Answer the pending comparison and advance the search one step.
    ///
    /// Calling this on an already-resolved session just reports the
    /// resolved index again.
    pub fn decide(&mut self, preference: Preference) -> SessionStep {
        if self.is_resolved() {
            return SessionStep::Resolved(self.lo);
        }

        let mid = self.mid();
        self.comparisons += 1;
        match preference {
            Preference::Better => self.hi = mid,
            Preference::Worse | Preference::Undecided => self.lo = mid + 1,
        }

        self.probe().map_or(SessionStep::Resolved(self.lo), |entry| {
            SessionStep::Probe(entry.item_id.clone())
        })
    }

    /// Drive the search to completion with a preference callback.
    ///
    /// Returns the resolved insertion index.
    pub fn resolve_with<F>(&mut self, mut judge: F) -> u32
    where
        F: FnMut(&RankedEntry) -> Preference,
    {
        while let Some(probe) = self.probe() {
            let preference = judge(probe);
            self.decide(preference);
        }
        self.lo
    }

    const fn mid(&self) -> u32 {
        (self.lo + self.hi) / 2
    }
}
