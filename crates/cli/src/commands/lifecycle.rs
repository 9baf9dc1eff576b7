// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gai revert` / `gai archive` / `gai restore`.

use anyhow::{Context, Result};
use clap::Args;
use gai_engine::LoopConfig;

#[derive(Args)]
pub struct NameArgs {
    /// ChangeSpec name
    name: String,
}

pub fn revert(args: NameArgs) -> Result<()> {
    let engine = super::build_engine(LoopConfig::default());
    let cs = super::find_changespec(&engine, &args.name)?;
    let new_name = engine
        .revert_changespec(&cs)
        .with_context(|| format!("revert failed for {}", cs.name))?;
    tracing::info!(cl = %cs.name, new = %new_name, "reverted");
    Ok(())
}

pub fn archive(args: NameArgs) -> Result<()> {
    let engine = super::build_engine(LoopConfig::default());
    let cs = super::find_changespec(&engine, &args.name)?;
    let new_name = engine
        .archive_changespec(&cs)
        .with_context(|| format!("archive failed for {}", cs.name))?;
    tracing::info!(cl = %cs.name, new = %new_name, "archived");
    Ok(())
}

pub fn restore(args: NameArgs) -> Result<()> {
    let engine = super::build_engine(LoopConfig::default());
    let cs = super::find_changespec(&engine, &args.name)?;
    let base = engine
        .restore_changespec(&cs)
        .with_context(|| format!("restore failed for {}", cs.name))?;
    tracing::info!(cl = %cs.name, base = %base, "restored");
    Ok(())
}
