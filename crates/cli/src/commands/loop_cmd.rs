// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gai loop` — the scheduler.

use anyhow::{Context, Result};
use clap::Args;
use gai_core::query::Query;
use gai_engine::{LoopConfig, Scheduler};
use std::time::Duration;

#[derive(Args)]
pub struct LoopArgs {
    /// Full-cycle interval in seconds (status and comment checks)
    #[arg(long, default_value_t = 300)]
    interval: u64,

    /// Hook-tick interval in seconds (liveness and completion)
    #[arg(long, default_value_t = 1)]
    hook_interval: u64,

    /// Seconds after which a RUNNING hook is reaped as a zombie
    #[arg(long, default_value_t = gai_engine::config::DEFAULT_ZOMBIE_TIMEOUT_SECONDS)]
    zombie_timeout: u64,

    /// Global cap on concurrent runners (!-prefixed hooks are exempt)
    #[arg(long, default_value_t = 5)]
    max_runners: usize,

    /// Scoping query (e.g. "status:Drafted name:auth")
    #[arg(long, default_value = "")]
    query: String,
}

pub fn run(args: LoopArgs) -> Result<()> {
    let query = if args.query.is_empty() {
        None
    } else {
        Some(Query::parse(&args.query).context("invalid --query")?)
    };

    let config = LoopConfig {
        interval: Duration::from_secs(args.interval),
        hook_interval: Duration::from_secs(args.hook_interval),
        zombie_timeout: Duration::from_secs(args.zombie_timeout),
        max_runners: args.max_runners,
        query,
        ..LoopConfig::default()
    };
    let engine = super::build_engine(config);

    // The projects directory must at least be readable to start.
    let projects = engine.gai.projects_dir();
    if projects.exists() && std::fs::read_dir(&projects).is_err() {
        anyhow::bail!("projects directory is unreadable: {}", projects.display());
    }

    let scheduler = Scheduler::new(engine);
    let shutdown = scheduler.shutdown_flag();
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())
        .context("failed to install SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown)
        .context("failed to install SIGTERM handler")?;

    scheduler.run();
    Ok(())
}
