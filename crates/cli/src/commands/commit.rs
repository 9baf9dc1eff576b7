// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gai commit <name>` — restore/commit glue.
//!
//! Finds the named ChangeSpec (tolerating lifecycle renames) and puts
//! it back into circulation from the current working directory's
//! checkout.

use anyhow::{Context, Result};
use clap::Args;
use gai_engine::LoopConfig;

#[derive(Args)]
pub struct CommitArgs {
    /// ChangeSpec name (a renamed `name__<N>` variant also matches)
    name: String,
}

pub fn run(args: CommitArgs) -> Result<()> {
    let engine = super::build_engine(LoopConfig::default());
    let cs = super::find_changespec(&engine, &args.name)?;
    let workspace = std::env::current_dir().context("cannot resolve working directory")?;

    engine
        .commit_changespec(&cs.name, &cs.file_path, &workspace)
        .with_context(|| format!("commit failed for {}", cs.name))?;
    tracing::info!(cl = %cs.name, "committed");
    Ok(())
}
