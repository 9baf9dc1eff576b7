// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook entries and their per-commit-entry status lines.

use crate::entry::EntryId;
use crate::suffix::{Suffix, SuffixKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Execution status of one hook attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookStatus {
    Running,
    Passed,
    Failed,
    Dead,
}

crate::simple_display! {
    HookStatus {
        Running => "RUNNING",
        Passed => "PASSED",
        Failed => "FAILED",
        Dead => "DEAD",
    }
}

impl FromStr for HookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(HookStatus::Running),
            "PASSED" => Ok(HookStatus::Passed),
            "FAILED" => Ok(HookStatus::Failed),
            "DEAD" => Ok(HookStatus::Dead),
            other => Err(format!("unknown hook status: {other}")),
        }
    }
}

/// One attempt of a hook against one commit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStatusLine {
    pub entry: EntryId,
    /// Launch stamp (`YYmmdd_HHMMSS`); also keys the output file.
    pub timestamp: String,
    pub status: HookStatus,
    pub duration: Option<String>,
    pub suffix: Option<Suffix>,
}

impl HookStatusLine {
    pub fn running(entry: EntryId, timestamp: impl Into<String>, pid: i32) -> Self {
        Self {
            entry,
            timestamp: timestamp.into(),
            status: HookStatus::Running,
            duration: None,
            suffix: Some(Suffix::new(SuffixKind::RunningProcess, pid.to_string())),
        }
    }

    pub fn suffix_kind(&self) -> Option<SuffixKind> {
        self.suffix.as_ref().map(|s| s.kind)
    }

    pub fn suffix_value(&self) -> Option<&str> {
        self.suffix.as_ref().map(|s| s.value.as_str())
    }

    /// PID for `running_process`-suffixed lines.
    pub fn process_pid(&self) -> Option<i32> {
        match &self.suffix {
            Some(s) if s.kind == SuffixKind::RunningProcess => s.value.parse().ok(),
            Some(s) if s.kind == SuffixKind::PendingDeadProcess => {
                s.value.split('|').next()?.trim().parse().ok()
            }
            _ => None,
        }
    }
}

/// A verification command attached to a CL.
///
/// The stored command may carry prefixes: `!` bypasses the runner limit
/// and skips the fix-hook pipeline on failure; `$` skips runs against
/// proposal entries. Both may appear in either order (`!$`, `$!`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEntry {
    pub command: String,
    pub status_lines: Vec<HookStatusLine>,
}

impl HookEntry {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), status_lines: Vec::new() }
    }

    fn prefix_len(&self) -> usize {
        self.command.len() - self.command.trim_start_matches(['!', '$']).len()
    }

    /// `!`-prefixed: unlimited (ignores the runner cap) and no fix-hook hints.
    pub fn skip_fix_hook(&self) -> bool {
        self.command[..self.prefix_len()].contains('!')
    }

    /// `$`-prefixed: never run against proposal entries.
    pub fn skip_proposal_runs(&self) -> bool {
        self.command[..self.prefix_len()].contains('$')
    }

    /// The command to actually execute, prefixes stripped.
    pub fn run_command(&self) -> &str {
        &self.command[self.prefix_len()..]
    }

    /// Status line for a specific commit entry, if attempted.
    pub fn status_line_for_entry(&self, entry: &EntryId) -> Option<&HookStatusLine> {
        self.status_lines.iter().find(|sl| &sl.entry == entry)
    }

    /// The status line with the highest entry id.
    pub fn latest_status_line(&self) -> Option<&HookStatusLine> {
        self.status_lines.iter().max_by(|a, b| a.entry.cmp(&b.entry))
    }

    /// Status of the latest attempt, if any.
    pub fn status(&self) -> Option<HookStatus> {
        self.latest_status_line().map(|sl| sl.status)
    }

    /// Whether any status line is RUNNING or owned by a running agent.
    pub fn has_any_running_status(&self) -> bool {
        self.status_lines.iter().any(|sl| {
            sl.status == HookStatus::Running || sl.suffix_kind() == Some(SuffixKind::RunningAgent)
        })
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
