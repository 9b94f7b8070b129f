//! Implementations of `ranklist add` and `ranklist rerank`.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use ranklist_core::model::{EntryPayload, ItemId, OwnerId, RankedEntry};
use ranklist_core::RankEngine;

use crate::cli::commands::{open_engine, prompt::resolve_interactively};
use crate::output::{Formatter, OutputFormat};

#[derive(Debug, Serialize)]
struct RankOutcome<'a> {
    position: u32,
    item_id: &'a str,
    owner_id: &'a str,
    comparisons: u32,
    entry_id: &'a str,
}

/// Rank a new item interactively and commit it.
#[tracing::instrument(skip(db_path, platforms, note, format))]
pub fn run_add(
    db_path: &Path,
    owner: &str,
    item: &str,
    platforms: Vec<String>,
    note: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let engine = open_engine(db_path)?;
    let payload = EntryPayload { platforms, note };
    let session = engine.begin_ranking(&OwnerId::new(owner), &ItemId::new(item), payload)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    rank_to_completion(&engine, session, &mut input, format)
}

/// Re-rank an existing item interactively and commit the move.
#[tracing::instrument(skip(db_path, format))]
pub fn run_rerank(db_path: &Path, owner: &str, item: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(db_path)?;
    let session = engine.begin_rerank(&OwnerId::new(owner), &ItemId::new(item))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    rank_to_completion(&engine, session, &mut input, format)
}

fn rank_to_completion<R: BufRead>(
    engine: &RankEngine,
    mut session: ranklist_core::RankingSession,
    input: &mut R,
    format: OutputFormat,
) -> Result<()> {
    let mut stderr = io::stderr().lock();
    resolve_interactively(&mut session, input, &mut stderr)?;
    stderr.flush()?;

    let comparisons = session.comparisons_asked();
    let entry = engine.commit(session)?;
    print_outcome(&entry, comparisons, format)
}

fn print_outcome(entry: &RankedEntry, comparisons: u32, format: OutputFormat) -> Result<()> {
    let formatter = Formatter::new(format);
    formatter.print(&RankOutcome {
        position: entry.position,
        item_id: entry.item_id.as_str(),
        owner_id: entry.owner_id.as_str(),
        comparisons,
        entry_id: entry.id.as_str(),
    })
}
