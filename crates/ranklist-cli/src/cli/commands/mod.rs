//! Implementations of `ranklist` subcommands.

mod doctor;
mod entries;
mod init;
mod prompt;
mod rank;

pub use doctor::run_doctor;
pub use entries::{run_list, run_remove};
pub use init::run_init;
pub use rank::{run_add, run_rerank};

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use ranklist_core::store::SqliteStore;
use ranklist_core::RankEngine;

/// Open the store at `db_path` and wrap it in an engine.
pub(crate) fn open_engine(db_path: &Path) -> Result<RankEngine> {
    let store = SqliteStore::open(db_path)?;
    Ok(RankEngine::new(Arc::new(store)))
}
