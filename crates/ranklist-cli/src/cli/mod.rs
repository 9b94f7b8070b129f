//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Maintain strictly-ordered personal game rankings
#[derive(Parser, Debug)]
#[command(name = "ranklist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format: text (default) or JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the ranklist database (default: $RANKLIST_DB or ./ranklist.db)
    #[arg(long, global = true, env = "RANKLIST_DB", default_value = "ranklist.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a list owner
    Init {
        /// Owner identifier
        owner: String,
    },

    /// Rank a new item by answering pairwise comparisons
    Add {
        /// Owner identifier
        owner: String,

        /// Item identifier (the game)
        item: String,

        /// Platform tags (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,

        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },

    /// Re-rank an already-ranked item
    Rerank {
        /// Owner identifier
        owner: String,

        /// Item identifier
        item: String,
    },

    /// Remove an item from the list
    Remove {
        /// Owner identifier
        owner: String,

        /// Item identifier
        item: String,
    },

    /// Show the ordered list
    List {
        /// Owner identifier
        owner: String,
    },

    /// Check the position numbering and repair it if needed
    Doctor {
        /// Owner identifier
        owner: String,
    },
}
