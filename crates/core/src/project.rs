// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-file level model: the `RUNNING:` claims block plus the CLs.

use crate::changespec::ChangeSpec;
use crate::suffix::SuffixKind;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Foreground/tmux checkout pool.
pub const PRIMARY_POOL: RangeInclusive<u32> = 1..=8;
/// Scheduler pool used by hooks, mentors, and lifecycle ops.
pub const SCHEDULER_POOL: RangeInclusive<u32> = 100..=199;
/// Agent-runner pool (crs, fix-hook, summarize-hook, mentor runners).
pub const LOOP_POOL: RangeInclusive<u32> = 200..=299;

/// Which numbered-workspace pool a caller allocates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Primary,
    Scheduler,
    Loop,
}

impl PoolKind {
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            PoolKind::Primary => PRIMARY_POOL,
            PoolKind::Scheduler => SCHEDULER_POOL,
            PoolKind::Loop => LOOP_POOL,
        }
    }
}

/// One lease row in the `RUNNING:` block.
///
/// A claim owns its workspace directory for the life of the PID or until
/// explicitly released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceClaim {
    pub workspace_num: u32,
    pub workflow: String,
    pub pid: i32,
    pub cl_name: String,
    pub artifacts_timestamp: Option<String>,
}

impl WorkspaceClaim {
    pub fn new(
        workspace_num: u32,
        workflow: impl Into<String>,
        pid: i32,
        cl_name: impl Into<String>,
    ) -> Self {
        Self {
            workspace_num,
            workflow: workflow.into(),
            pid,
            cl_name: cl_name.into(),
            artifacts_timestamp: None,
        }
    }
}

/// Parsed contents of one `.gp` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub path: PathBuf,
    pub claims: Vec<WorkspaceClaim>,
    pub changespecs: Vec<ChangeSpec>,
}

impl ProjectSpec {
    pub fn changespec(&self, name: &str) -> Option<&ChangeSpec> {
        self.changespecs.iter().find(|cs| cs.name == name)
    }

    /// First free number in the pool, or None if exhausted.
    pub fn first_available_workspace(&self, pool: PoolKind) -> Option<u32> {
        pool.range().find(|n| !self.claims.iter().any(|c| c.workspace_num == *n))
    }
}

/// Total live runners across a set of CLs: running-process hook lines
/// plus running-agent lines on hooks, comments, and mentors. This is the
/// on-disk component of the global `max_runners` budget.
pub fn count_all_runners(changespecs: &[ChangeSpec]) -> usize {
    changespecs.iter().map(|cs| cs.count_runners()).sum()
}

/// Count only running agents (crs/fix/summarize/mentor lines).
pub fn count_running_agents(changespecs: &[ChangeSpec]) -> usize {
    changespecs
        .iter()
        .map(|cs| {
            let hook_agents = cs
                .hooks
                .iter()
                .flat_map(|h| &h.status_lines)
                .filter(|sl| sl.suffix_kind() == Some(SuffixKind::RunningAgent))
                .count();
            let comment_agents = cs
                .comments
                .iter()
                .filter(|c| c.suffix_kind() == Some(SuffixKind::RunningAgent))
                .count();
            let mentor_agents = cs
                .mentors
                .iter()
                .flat_map(|m| &m.status_lines)
                .filter(|sl| sl.suffix_kind() == Some(SuffixKind::RunningAgent))
                .count();
            hook_agents + comment_agents + mentor_agents
        })
        .sum()
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
