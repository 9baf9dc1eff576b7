// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tick hook supervision: completion, the two-phase dead-process
//! protocol, zombie reaping, and starting stale hooks.
//!
//! Completion is checked BEFORE liveness: a finished process is no
//! longer running but must be recorded as PASSED/FAILED from its exit
//! code, not DEAD. A dead PID without a marker first gets a short
//! re-read retry (filesystem sync lag), then a `pending_dead_process`
//! grace window, and only after that window elapses is the line
//! declared DEAD.

use crate::config::{
    COMPLETION_MAX_RETRIES, COMPLETION_RETRY_DELAY, PENDING_DEAD_TIMEOUT_SECONDS,
};
use crate::engine::Engine;
use crate::hooks::execution::check_hook_completion;
use crate::hooks::mutations::set_hook_suffix;
use crate::hooks::status::{
    entries_needing_hook_run, entry_has_running_hooks, has_running_hooks, is_hook_zombie,
};
use crate::process::{is_process_running, try_kill_process_group};
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus, HookStatusLine};
use gai_core::suffix::{Suffix, SuffixKind};
use gai_core::timestamps;
use indexmap::IndexMap;
use std::collections::BTreeSet;

impl<C: Clock> Engine<C> {
    /// One supervision pass over a CL's hooks. Returns human-readable
    /// update messages and the number of limited runners started.
    pub fn check_hooks(&self, cs: &ChangeSpec, runners_started_this_cycle: usize) -> (Vec<String>, usize) {
        let mut updates: Vec<String> = Vec::new();
        let mut hooks_started = 0usize;
        if cs.hooks.is_empty() {
            return (updates, hooks_started);
        }

        // Terminal statuses still observe completion of RUNNING hooks;
        // they just never start new ones.
        let halts = cs.status.halts_new_runs();
        let entry_ids = cs.current_and_proposal_entry_ids();

        let mut modified: IndexMap<String, HookEntry> = IndexMap::new();
        let mut final_hooks: Vec<HookEntry> = Vec::new();
        let mut entries_needing: BTreeSet<EntryId> = BTreeSet::new();
        let mut completed_entries: BTreeSet<EntryId> = BTreeSet::new();

        for hook in &cs.hooks {
            // A stale agent stamp means a fix-hook died without report.
            if let Some(sl) = hook.latest_status_line() {
                if let Some(value) = sl.suffix_value() {
                    if timestamps::is_suffix_stale(
                        &self.clock,
                        value,
                        self.config.zombie_timeout.as_secs(),
                    ) {
                        let pf = self.project_file(&cs.file_path);
                        let _ = set_hook_suffix(
                            &pf,
                            &cs.name,
                            &hook.command,
                            Some(&sl.entry.clone()),
                            Suffix::error("ZOMBIE"),
                        );
                        updates.push(format!(
                            "Hook '{}' stale fix-hook marked as ZOMBIE",
                            hook.command
                        ));
                    }
                }
            }

            if let Some(done) = self.complete_first_running(cs, hook, &mut completed_entries) {
                updates.push(describe_completion(&hook.command, &done, ""));
                modified.insert(done.command.clone(), done.clone());
                final_hooks.push(done);
                continue;
            }

            if let Some((resolved, message)) = self.resolve_pending_dead(cs, hook, &mut completed_entries)
            {
                if let Some(resolved) = resolved {
                    updates.push(message);
                    modified.insert(resolved.command.clone(), resolved.clone());
                    final_hooks.push(resolved);
                } else {
                    // Still inside the grace window.
                    if !message.is_empty() {
                        tracing::debug!(cl = %cs.name, hook = %hook.command, "{message}");
                    }
                    final_hooks.push(hook.clone());
                }
                continue;
            }

            if let Some((updated, message)) = self.detect_dead_process(cs, hook, &mut completed_entries)
            {
                updates.push(message);
                modified.insert(updated.command.clone(), updated.clone());
                final_hooks.push(updated);
                continue;
            }

            if is_hook_zombie(&self.clock, hook, self.config.zombie_timeout.as_secs()) {
                let (reaped, message) = self.reap_zombie(cs, hook, &mut completed_entries);
                updates.push(message);
                modified.insert(reaped.command.clone(), reaped.clone());
                final_hooks.push(reaped);
                continue;
            }

            if !halts && !hook.has_any_running_status() {
                // One run at a time per hook; collect what is stale.
                entries_needing.extend(entries_needing_hook_run(hook, &entry_ids));
            }
            final_hooks.push(hook.clone());
        }

        // Phase 2: start stale hooks, newest entries last so accepted
        // entries launch before their proposals.
        if !entries_needing.is_empty() && !halts {
            let current_running = self.global_running_count() + runners_started_this_cycle;
            let available = self.config.max_runners.saturating_sub(current_running);
            let mut limit_logged = false;

            for entry in &entries_needing {
                let skip_limited = hooks_started >= available;
                if skip_limited && !limit_logged {
                    tracing::info!(
                        cl = %cs.name,
                        current_running,
                        limit = self.config.max_runners,
                        "at runner limit; only starting unlimited hooks"
                    );
                    limit_logged = true;
                }
                if cs.entry_by_id(entry).is_none() {
                    continue;
                }
                let started = self.start_stale_hooks(cs, entry, skip_limited);
                updates.extend(started.updates);
                hooks_started += started.limited_count;

                for started_hook in started.hooks {
                    if let Some(slot) =
                        final_hooks.iter_mut().find(|h| h.command == started_hook.command)
                    {
                        *slot = started_hook.clone();
                    }
                    modified.insert(started_hook.command.clone(), started_hook);
                }
            }
        }

        // Aggregate the tick's mutations into one merge-based write so
        // hooks added concurrently by other tools survive.
        if !modified.is_empty() {
            let pf = self.project_file(&cs.file_path);
            if let Err(err) = pf.merge_hook_updates(&cs.name, &modified) {
                tracing::warn!(cl = %cs.name, %err, "hook update failed; will retry next tick");
            }
        }

        // Release workspaces for entries whose hooks have all settled;
        // newer entries keep theirs while still running.
        for entry in &completed_entries {
            if !entry_has_running_hooks(&final_hooks, entry) {
                self.release_entry_workspace(cs, entry);
            }
        }
        if !has_running_hooks(&final_hooks) {
            self.release_all_entry_workspaces(cs);
        }

        (updates, hooks_started)
    }

    /// Check the first RUNNING line of a hook for a completion marker.
    fn complete_first_running(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        completed_entries: &mut BTreeSet<EntryId>,
    ) -> Option<HookEntry> {
        if !hook.has_any_running_status() {
            return None;
        }
        let running = hook
            .status_lines
            .iter()
            .find(|sl| sl.status == HookStatus::Running && sl.suffix_kind() != Some(SuffixKind::PendingDeadProcess))?;
        let done = check_hook_completion(&self.gai, &self.clock, cs, hook, running)?;
        for sl in &hook.status_lines {
            if sl.status == HookStatus::Running {
                completed_entries.insert(sl.entry.clone());
            }
        }
        Some(replace_line(hook, &running.entry.clone(), done))
    }

    /// Resolve lines already in the pending-dead grace window: recover
    /// on a late marker, or confirm DEAD after the window elapses.
    ///
    /// Returns None when the hook has no pending-dead line; otherwise
    /// `(Some(updated), message)` on a state change or `(None, note)`
    /// while still waiting.
    fn resolve_pending_dead(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        completed_entries: &mut BTreeSet<EntryId>,
    ) -> Option<(Option<HookEntry>, String)> {
        let pending = hook.status_lines.iter().find(|sl| {
            sl.status == HookStatus::Running
                && sl.suffix_kind() == Some(SuffixKind::PendingDeadProcess)
        })?;

        // A marker may have landed late: recover to PASSED/FAILED.
        if let Some(done) = check_hook_completion(&self.gai, &self.clock, cs, hook, pending) {
            completed_entries.insert(pending.entry.clone());
            let message = describe_completion(&hook.command, &replace_line(hook, &pending.entry, done.clone()), " (recovered from pending dead)");
            return Some((Some(replace_line(hook, &pending.entry.clone(), done)), message));
        }

        // Suffix format: "<pid> | PENDING_DEAD:<stamp>"
        let stamp = pending
            .suffix_value()
            .and_then(|v| v.split("PENDING_DEAD:").nth(1))
            .map(str::trim)
            .map(str::to_string);
        let Some(stamp) = stamp else {
            return Some((None, String::new()));
        };
        let age = timestamps::age_seconds(&self.clock, &stamp);
        tracing::debug!(
            cl = %cs.name,
            hook = %hook.command,
            stamp,
            ?age,
            timeout = PENDING_DEAD_TIMEOUT_SECONDS,
            "pending-dead check"
        );

        match age {
            Some(age) if age >= PENDING_DEAD_TIMEOUT_SECONDS as f64 => {
                let now = timestamps::now_stamp(&self.clock);
                let pid = pending
                    .suffix_value()
                    .and_then(|v| v.split('|').next())
                    .map(str::trim)
                    .unwrap_or("?")
                    .to_string();
                let description = format!(
                    "{pid} | [{now}] Process confirmed dead after {PENDING_DEAD_TIMEOUT_SECONDS}s timeout."
                );
                completed_entries.insert(pending.entry.clone());
                let mut dead = pending.clone();
                dead.status = HookStatus::Dead;
                dead.suffix = Some(Suffix::new(SuffixKind::KilledProcess, description));
                let message = format!(
                    "Hook '{}' -> DEAD (confirmed after {PENDING_DEAD_TIMEOUT_SECONDS}s)",
                    hook.command
                );
                Some((Some(replace_line(hook, &pending.entry.clone(), dead)), message))
            }
            _ => Some((None, "pending-dead: still waiting".to_string())),
        }
    }

    /// First phase of the dead-process protocol: the PID is gone but no
    /// marker is present. Retry the read briefly, then mark the line
    /// `pending_dead_process` to open the grace window.
    fn detect_dead_process(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        completed_entries: &mut BTreeSet<EntryId>,
    ) -> Option<(HookEntry, String)> {
        let line = hook.status_lines.iter().find(|sl| {
            sl.status == HookStatus::Running
                && sl.suffix_kind() == Some(SuffixKind::RunningProcess)
        })?;
        let pid = line.process_pid()?;
        if is_process_running(pid) {
            return None;
        }

        // Completion markers and file writes may not have synced when
        // the PID vanishes; retry the read before opening the window.
        for _ in 0..COMPLETION_MAX_RETRIES {
            std::thread::sleep(COMPLETION_RETRY_DELAY);
            if let Some(done) = check_hook_completion(&self.gai, &self.clock, cs, hook, line) {
                for sl in &hook.status_lines {
                    if sl.status == HookStatus::Running {
                        completed_entries.insert(sl.entry.clone());
                    }
                }
                let updated = replace_line(hook, &line.entry.clone(), done);
                let message = describe_completion(&hook.command, &updated, "");
                return Some((updated, message));
            }
        }

        let stamp = timestamps::now_stamp(&self.clock);
        let mut pending = line.clone();
        pending.status = HookStatus::Running; // stays RUNNING while pending
        pending.suffix = Some(Suffix::new(
            SuffixKind::PendingDeadProcess,
            format!("{pid} | PENDING_DEAD:{stamp}"),
        ));
        let message = format!(
            "Hook '{}' -> PENDING_DEAD (will confirm in {PENDING_DEAD_TIMEOUT_SECONDS}s)",
            hook.command
        );
        Some((replace_line(hook, &line.entry.clone(), pending), message))
    }

    /// Kill a RUNNING hook that has outlived the zombie timeout.
    fn reap_zombie(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        completed_entries: &mut BTreeSet<EntryId>,
    ) -> (HookEntry, String) {
        let age = hook
            .latest_status_line()
            .and_then(|sl| timestamps::age_seconds(&self.clock, &sl.timestamp));
        let runtime = age.map(timestamps::format_duration).unwrap_or_else(|| "unknown".to_string());
        let now = timestamps::now_stamp(&self.clock);
        let description =
            format!("[{now}] Killed zombie hook that has been running for {runtime}.");

        let mut updated = hook.clone();
        for sl in updated.status_lines.iter_mut() {
            if sl.status != HookStatus::Running {
                continue;
            }
            completed_entries.insert(sl.entry.clone());
            if let Some(pid) = sl.process_pid() {
                try_kill_process_group(pid);
            }
            let value = match sl.suffix_value() {
                Some(old) if !old.is_empty() => format!("{old} | {description}"),
                _ => description.clone(),
            };
            sl.status = HookStatus::Dead;
            sl.suffix = Some(Suffix::new(SuffixKind::KilledProcess, value));
        }
        let message = format!("Hook '{}' -> DEAD - (~$: {runtime} zombie)", hook.command);
        tracing::warn!(cl = %cs.name, hook = %hook.command, runtime, "zombie hook reaped");
        (updated, message)
    }

    /// Live runners across every project file plus nothing else: the
    /// on-disk component of the global budget.
    pub fn global_running_count(&self) -> usize {
        let mut count = 0;
        for path in self.gai.find_all_project_files() {
            match self.project_file(&path).read() {
                Ok(project) => count += gai_core::project::count_all_runners(&project.changespecs),
                Err(err) => tracing::warn!(path = %path.display(), %err, "skipping unreadable project"),
            }
        }
        count
    }
}

fn replace_line(hook: &HookEntry, entry: &EntryId, new_line: HookStatusLine) -> HookEntry {
    let mut updated = hook.clone();
    for sl in updated.status_lines.iter_mut() {
        if &sl.entry == entry {
            *sl = new_line;
            break;
        }
    }
    updated
}

fn describe_completion(command: &str, hook: &HookEntry, note: &str) -> String {
    let status =
        hook.status().map(|s| s.to_string()).unwrap_or_else(|| "UNKNOWN".to_string());
    let duration = hook
        .latest_status_line()
        .and_then(|sl| sl.duration.clone())
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();
    format!("Hook '{command}' -> {status}{duration}{note}")
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
