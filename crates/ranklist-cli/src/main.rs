//! ranklist - comparison-driven personal game ranking

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::commands::{run_add, run_doctor, run_init, run_list, run_remove, run_rerank};
use cli::{Cli, Commands};
use output::OutputFormat;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::Init { owner } => {
            run_init(&cli.db, &owner, format)?;
        }

        Commands::Add {
            owner,
            item,
            platforms,
            note,
        } => {
            run_add(&cli.db, &owner, &item, platforms, note, format)?;
        }

        Commands::Rerank { owner, item } => {
            run_rerank(&cli.db, &owner, &item, format)?;
        }

        Commands::Remove { owner, item } => {
            run_remove(&cli.db, &owner, &item, format)?;
        }

        Commands::List { owner } => {
            run_list(&cli.db, &owner, format)?;
        }

        Commands::Doctor { owner } => {
            run_doctor(&cli.db, &owner, format)?;
        }
    }

    Ok(())
}
