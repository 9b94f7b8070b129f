//! Implementation of `ranklist init`.

use std::path::Path;

use anyhow::Result;
use ranklist_core::model::OwnerId;

use crate::cli::commands::open_engine;
use crate::output::{Formatter, OutputFormat};

/// Register an owner in the store. Idempotent.
#[tracing::instrument(skip(db_path, format))]
pub fn run_init(db_path: &Path, owner: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(db_path)?;
    let owner_id = OwnerId::new(owner);
    engine.create_owner(&owner_id)?;

    let formatter = Formatter::new(format);
    formatter.print(&serde_json::json!({
        "owner_id": owner,
        "status": "registered",
    }))?;
    Ok(())
}
