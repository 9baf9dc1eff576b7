// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gai` — CL lifecycle orchestration.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gai", about = "Change-list lifecycle orchestration", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the scheduler loop
    Loop(commands::loop_cmd::LoopArgs),
    /// Find a (possibly renamed) ChangeSpec and recommit it
    Commit(commands::commit::CommitArgs),
    /// Revert a mailed CL (prune + rename + mark Reverted)
    Revert(commands::lifecycle::NameArgs),
    /// Archive a CL (archive + rename + mark Archived)
    Archive(commands::lifecycle::NameArgs),
    /// Restore a Reverted/Archived CL
    Restore(commands::lifecycle::NameArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result: Result<()> = match cli.command {
        Commands::Loop(args) => commands::loop_cmd::run(args),
        Commands::Commit(args) => commands::commit::run(args),
        Commands::Revert(args) => commands::lifecycle::revert(args),
        Commands::Archive(args) => commands::lifecycle::archive(args),
        Commands::Restore(args) => commands::lifecycle::restore(args),
    };

    if let Err(err) = result {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
