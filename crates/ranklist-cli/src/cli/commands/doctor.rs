//! Implementation of `ranklist doctor`.

use std::path::Path;

use anyhow::Result;
use ranklist_core::model::OwnerId;

use crate::cli::commands::open_engine;
use crate::output::{Formatter, OutputFormat};

/// Run the position repair pass explicitly and report what it rewrote.
#[tracing::instrument(skip(db_path, format))]
pub fn run_doctor(db_path: &Path, owner: &str, format: OutputFormat) -> Result<()> {
    let engine = open_engine(db_path)?;
    let owner_id = OwnerId::new(owner);

    // Surface OwnerNotFound before reporting a healthy empty list.
    engine.list(&owner_id)?;
    let rewritten = engine.repair(&owner_id)?;

    let formatter = Formatter::new(format);
    formatter.print(&serde_json::json!({
        "owner_id": owner,
        "rewritten": rewritten,
        "status": if rewritten == 0 { "healthy" } else { "repaired" },
    }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::run_init;

    #[test]
    fn test_doctor_on_healthy_list() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ranklist.db");
        run_init(&db, "alice", OutputFormat::Text).unwrap();

        run_doctor(&db, "alice", OutputFormat::Text).unwrap();
    }

    #[test]
    fn test_doctor_unknown_owner_errors() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ranklist.db");
        run_init(&db, "alice", OutputFormat::Text).unwrap();

        assert!(run_doctor(&db, "ghost", OutputFormat::Text).is_err());
    }
}
