//! Domain types for ranked lists: identifiers, entries, payloads.
//!
//! Entry IDs are short, human-readable slugs: en-xxxxxxxx

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for entry IDs
const ENTRY_PREFIX: &str = "en";

/// Length of the random suffix (in base36 chars)
const SUFFIX_LEN: usize = 8;

/// Identifier of a list owner. Supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a ranked subject (a game). Unique within one owner's list,
/// not globally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of one ranked entry. Assigned at creation, immutable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap an existing id string (e.g. read back from the store).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new entry ID (e.g., "en-1d3f99az").
    ///
    /// # Errors
    ///
    /// Returns an error if the OS entropy source is unavailable.
    pub fn generate() -> Result<Self> {
        Ok(Self(format!("{ENTRY_PREFIX}-{}", base36_suffix(SUFFIX_LEN)?)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check if a string looks like a valid entry ID
#[must_use]
pub fn is_entry_id(s: &str) -> bool {
    s.starts_with("en-") && s.len() == 3 + SUFFIX_LEN
}

/// Generate a base36 suffix from OS entropy.
#[allow(clippy::cast_possible_truncation)]
fn base36_suffix(len: usize) -> Result<String> {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).context("Failed to read OS entropy for id generation")?;
    let num = u64::from_le_bytes(bytes);

    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut result = String::new();
    let mut n = num;
    while result.len() < len {
        result.push(CHARS[(n % 36) as usize] as char);
        n /= 36;
    }

    Ok(result)
}

/// Owner-supplied metadata attached to an entry. Opaque to the ranking
/// engine; carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPayload {
    /// Platform tags (e.g. "pc", "switch").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One ranked item and its position within an owner's list.
///
/// Positions for an owner always form a dense permutation of `1..=N`:
/// no duplicates, no gaps, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub id: EntryId,
    pub owner_id: OwnerId,
    pub item_id: ItemId,
    /// 1-based position in the owner's list.
    pub position: u32,
    pub payload: EntryPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RankedEntry {
    /// Build a new entry at the given position with fresh timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if id generation fails.
    pub fn new(
        owner_id: OwnerId,
        item_id: ItemId,
        position: u32,
        payload: EntryPayload,
    ) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: EntryId::generate()?,
            owner_id,
            item_id,
            position,
            payload,
            created_at: now,
            updated_at: now,
        })
    }
}
