// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook suffix mutations and bulk operations.
//!
//! These all re-read fresh state under the exclusive lock before
//! writing; callers never push stale snapshots through them.

use crate::process::try_kill_process_group;
use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus};
use gai_core::suffix::{extract_pid_from_agent_suffix, Suffix, SuffixKind};
use gai_storage::{ProjectFile, StorageError};
use indexmap::IndexMap;

/// Set the suffix of one hook's status line (latest line when `entry`
/// is None). Returns false when nothing matched.
pub fn set_hook_suffix(
    pf: &ProjectFile,
    cl_name: &str,
    hook_command: &str,
    entry: Option<&EntryId>,
    suffix: Suffix,
) -> Result<bool, StorageError> {
    let hooks = pf.read_hooks(cl_name)?;
    let mut updates: IndexMap<String, HookEntry> = IndexMap::new();
    let mut found = false;

    for hook in &hooks {
        if hook.command != hook_command {
            continue;
        }
        let target = match entry {
            Some(id) => hook.status_line_for_entry(id).cloned(),
            None => hook.latest_status_line().cloned(),
        };
        let Some(target) = target else {
            continue;
        };
        let mut updated = hook.clone();
        for sl in updated.status_lines.iter_mut() {
            if sl.entry == target.entry {
                sl.suffix = Some(suffix.clone());
                found = true;
            }
        }
        updates.insert(updated.command.clone(), updated);
    }

    if !found {
        return Ok(false);
    }
    pf.merge_hook_updates(cl_name, &updates)?;
    Ok(true)
}

/// Atomically check eligibility and claim a hook for the fix-hook
/// workflow.
///
/// Under the lock: the status line must still be FAILED with
/// `summarize_complete` and a non-empty summary. The line is rewritten
/// to `claiming_fix` with the summary preserved, and the summary is
/// returned. Serializes races between concurrent schedulers — exactly
/// one claimant wins.
pub fn try_claim_hook_for_fix(
    pf: &ProjectFile,
    cl_name: &str,
    hook_command: &str,
    entry: &EntryId,
    claiming_token: &str,
) -> Result<Option<String>, StorageError> {
    let message = format!("Claim fix-hook for {cl_name}");
    let entry = entry.clone();
    let hook_command = hook_command.to_string();
    let claiming_token = claiming_token.to_string();

    pf.mutate_with_model(&message, move |model, lines| {
        let Some(cs) = model.changespec(cl_name) else {
            return Ok(None);
        };
        let Some(hook) = cs.hook_by_command(&hook_command) else {
            return Ok(None);
        };
        let Some(sl) = hook.status_line_for_entry(&entry) else {
            return Ok(None);
        };
        if sl.status != HookStatus::Failed {
            return Ok(None);
        }
        let Some(suffix) = &sl.suffix else {
            return Ok(None);
        };
        if suffix.kind != SuffixKind::SummarizeComplete || suffix.value.is_empty() {
            return Ok(None); // already claimed or not ready
        }
        let summary = suffix.value.clone();

        let mut hooks = cs.hooks.clone();
        for h in hooks.iter_mut() {
            if h.command != hook_command {
                continue;
            }
            for line in h.status_lines.iter_mut() {
                if line.entry == entry {
                    line.suffix = Some(Suffix::with_summary(
                        SuffixKind::ClaimingFix,
                        claiming_token.clone(),
                        Some(summary.clone()),
                    ));
                }
            }
        }
        gai_storage::fields::replace_block_field(
            lines,
            cl_name,
            "HOOKS:",
            gai_storage::serialize::hooks_field_lines(&hooks),
        );
        Ok(Some(summary))
    })
}

/// Rerun (clear status lines for the given entries) and/or delete hooks
/// by command, killing their running processes and agents first.
pub fn rerun_delete_hooks_by_command(
    pf: &ProjectFile,
    cl_name: &str,
    commands_to_rerun: &[String],
    commands_to_delete: &[String],
    entry_ids_to_clear: &[EntryId],
) -> Result<(), StorageError> {
    let hooks = pf.read_hooks(cl_name)?;

    // Kill anything live on the affected hooks before touching rows.
    for hook in &hooks {
        let affected = commands_to_rerun.contains(&hook.command)
            || commands_to_delete.contains(&hook.command);
        if !affected {
            continue;
        }
        for sl in &hook.status_lines {
            let pid = match sl.suffix_kind() {
                Some(SuffixKind::RunningProcess) => sl.process_pid(),
                Some(SuffixKind::RunningAgent) => {
                    sl.suffix_value().and_then(extract_pid_from_agent_suffix)
                }
                _ => None,
            };
            if let Some(pid) = pid {
                try_kill_process_group(pid);
            }
        }
    }

    let message = format!("Rerun/delete hooks for {cl_name}");
    pf.mutate_with_model(&message, |model, lines| {
        let Some(cs) = model.changespec(cl_name) else {
            return Err(StorageError::ChangeSpecNotFound { name: cl_name.to_string() });
        };
        let mut kept: Vec<HookEntry> = Vec::new();
        for hook in &cs.hooks {
            if commands_to_delete.contains(&hook.command) {
                continue;
            }
            let mut hook = hook.clone();
            if commands_to_rerun.contains(&hook.command) {
                hook.status_lines.retain(|sl| !entry_ids_to_clear.contains(&sl.entry));
            }
            kept.push(hook);
        }
        gai_storage::fields::replace_block_field(
            lines,
            cl_name,
            "HOOKS:",
            gai_storage::serialize::hooks_field_lines(&kept),
        );
        Ok(())
    })
}

/// Reset `$`-prefixed hooks after a sync/reword so the loop re-runs
/// them against the latest entry. Kills their live processes first.
pub fn reset_dollar_hooks(pf: &ProjectFile, cl_name: &str) -> Result<bool, StorageError> {
    let cs = pf.read_changespec(cl_name)?;
    let Some(last_entry) = cs.last_entry_id() else {
        return Ok(false);
    };
    let dollar_commands: Vec<String> = cs
        .hooks
        .iter()
        .filter(|h| h.skip_proposal_runs())
        .map(|h| h.command.clone())
        .collect();
    if dollar_commands.is_empty() {
        return Ok(false);
    }
    rerun_delete_hooks_by_command(pf, cl_name, &dollar_commands, &[], &[last_entry])?;
    Ok(true)
}

#[cfg(test)]
#[path = "mutations_tests.rs"]
mod tests;
