//! Implementations of `ranklist list` and `ranklist remove`.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use ranklist_core::model::{ItemId, OwnerId, RankedEntry};

use crate::cli::commands::open_engine;
use crate::output::{Formatter, OutputFormat};

#[derive(Debug, Serialize)]
struct EntryLine<'a> {
    position: u32,
    item_id: &'a str,
    platforms: &'a [String],
    note: Option<&'a str>,
    entry_id: &'a str,
}

impl<'a> EntryLine<'a> {
    fn from_entry(entry: &'a RankedEntry) -> Self {
        Self {
            position: entry.position,
            item_id: entry.item_id.as_str(),
            platforms: &entry.payload.platforms,
            note: entry.payload.note.as_deref(),
            entry_id: entry.id.as_str(),
        }
    }
}

/// Print an owner's list in position order.
#[tracing::instrument(skip(db_path, format))]
pub fn run_list(db_path: &Path, owner: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(db_path)?;
    let entries = engine.list(&OwnerId::new(owner))?;

    let lines: Vec<EntryLine<'_>> = entries.iter().map(EntryLine::from_entry).collect();
    let formatter = Formatter::new(format);
    formatter.print_list(&lines, &format!("No ranked items for {owner}."))?;
    Ok(())
}

/// Remove an item from an owner's list.
#[tracing::instrument(skip(db_path, format))]
pub fn run_remove(db_path: &Path, owner: &str, item: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(db_path)?;
    engine.remove_entry(&OwnerId::new(owner), &ItemId::new(item))?;

    let formatter = Formatter::new(format);
    formatter.print(&serde_json::json!({
        "owner_id": owner,
        "item_id": item,
        "status": "removed",
    }))?;
    Ok(())
}
