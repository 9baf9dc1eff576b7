// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook run eligibility.

use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus};
use gai_core::timestamps;

/// Whether a proposal may run this hook: the parent entry PASSED, or
/// the parent's status-line suffix names this very proposal (the
/// fix-hook exception — that proposal exists to fix this failure).
fn parent_passed_or_is_fix_proposal(hook: &HookEntry, entry: &EntryId) -> bool {
    let parent = entry.base();
    let Some(parent_line) = hook.status_line_for_entry(&parent) else {
        return false; // no parent attempt yet: wait
    };
    if parent_line.suffix_value() == Some(entry.to_string().as_str()) {
        return true;
    }
    parent_line.status == HookStatus::Passed
}

/// Whether this hook needs a run for the given entry id.
///
/// A run is due when no status line exists for the entry. `$`-prefixed
/// hooks never run against proposals; proposals additionally need the
/// parent gate above.
pub fn hook_needs_run(hook: &HookEntry, entry: &EntryId) -> bool {
    if hook.skip_proposal_runs() && entry.is_proposal() {
        return false;
    }
    if hook.status_line_for_entry(entry).is_some() {
        return false;
    }
    if entry.is_proposal() && !parent_passed_or_is_fix_proposal(hook, entry) {
        return false;
    }
    true
}

/// Entry ids from `entry_ids` this hook still needs to run against.
pub fn entries_needing_hook_run(hook: &HookEntry, entry_ids: &[EntryId]) -> Vec<EntryId> {
    entry_ids.iter().filter(|id| hook_needs_run(hook, id)).cloned().collect()
}

/// Whether the latest attempt has been RUNNING past the timeout.
pub fn is_hook_zombie(clock: &impl Clock, hook: &HookEntry, zombie_timeout_seconds: u64) -> bool {
    if hook.status() != Some(HookStatus::Running) {
        return false;
    }
    let Some(line) = hook.latest_status_line() else {
        return false;
    };
    matches!(
        timestamps::age_seconds(clock, &line.timestamp),
        Some(age) if age > zombie_timeout_seconds as f64
    )
}

/// Whether any hook has a RUNNING line for this specific entry.
pub fn entry_has_running_hooks(hooks: &[HookEntry], entry: &EntryId) -> bool {
    hooks.iter().any(|hook| {
        hook.status_lines
            .iter()
            .any(|sl| &sl.entry == entry && sl.status == HookStatus::Running)
    })
}

/// Whether any hook's latest attempt is RUNNING.
pub fn has_running_hooks(hooks: &[HookEntry]) -> bool {
    hooks.iter().any(|hook| hook.status() == Some(HookStatus::Running))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
