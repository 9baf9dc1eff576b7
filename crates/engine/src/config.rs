// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loop configuration.

use gai_core::query::Query;
use std::time::Duration;

/// Default time after which a RUNNING hook or agent is a zombie (2 hours).
pub const DEFAULT_ZOMBIE_TIMEOUT_SECONDS: u64 = 2 * 60 * 60;

/// Grace window between "PID disappeared" and "declared DEAD without a
/// completion marker".
pub const PENDING_DEAD_TIMEOUT_SECONDS: u64 = 60;

/// Retries (and spacing) for reading a completion marker right after a
/// process looks dead, covering filesystem sync delay.
pub const COMPLETION_MAX_RETRIES: u32 = 3;
pub const COMPLETION_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Hooks every new CL gets seeded with, in order. `!` bypasses the
/// runner limit and the fix-hook pipeline; `$` skips proposal entries.
pub const REQUIRED_CHANGESPEC_HOOKS: [&str; 2] = ["!$bb_hg_presubmit", "$bb_hg_lint"];

/// Commands the agent launcher spawns. Bodies live outside this
/// workspace; each must write the `===WORKFLOW_COMPLETE===` marker to
/// its output file when done.
#[derive(Debug, Clone)]
pub struct AgentCommands {
    pub crs: String,
    pub fix_hook: String,
    pub summarize_hook: String,
    pub mentor: String,
}

impl Default for AgentCommands {
    fn default() -> Self {
        Self {
            crs: "gai-crs-runner".to_string(),
            fix_hook: "gai-fix-hook-runner".to_string(),
            summarize_hook: "gai-summarize-hook-runner".to_string(),
            mentor: "gai-mentor-runner".to_string(),
        }
    }
}

/// Commands the background checks spawn.
#[derive(Debug, Clone)]
pub struct CheckCommands {
    pub is_cl_submitted: String,
    pub critique_comments: String,
}

impl Default for CheckCommands {
    fn default() -> Self {
        Self {
            is_cl_submitted: "is_cl_submitted".to_string(),
            critique_comments: "critique_comments".to_string(),
        }
    }
}

/// Scheduler configuration, mostly from CLI flags.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Full-cycle interval (background checks).
    pub interval: Duration,
    /// Hook-tick interval (liveness/completion).
    pub hook_interval: Duration,
    /// RUNNING age past which a hook is reaped as a zombie.
    pub zombie_timeout: Duration,
    /// Global cap on live runners; `!`-prefixed hooks are exempt.
    pub max_runners: usize,
    /// Optional scoping query.
    pub query: Option<Query>,
    pub agents: AgentCommands,
    pub checks: CheckCommands,
    /// Output substrings that make the hook wrapper retry. This is
    /// configuration, not code.
    pub retriable_patterns: Vec<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            hook_interval: Duration::from_secs(1),
            zombie_timeout: Duration::from_secs(DEFAULT_ZOMBIE_TIMEOUT_SECONDS),
            max_runners: 5,
            query: None,
            agents: AgentCommands::default(),
            checks: CheckCommands::default(),
            retriable_patterns: vec!["Per user memory limit reached".to_string()],
        }
    }
}
