// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting stale hooks against leased workspaces.
//!
//! Regular entries share one workspace per entry id (workflow name
//! `axe(hooks)-<id>`); all hooks of one proposal share one workspace
//! with the proposal's diff imported once before any hook starts. A
//! workspace claimed for entry `3` stays claimed while entry `4` claims
//! its own — older entries' hooks are allowed to finish in parallel.

use crate::engine::Engine;
use crate::hooks::status::hook_needs_run;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::hook::HookEntry;
use gai_core::project::{PoolKind, WorkspaceClaim};
use gai_core::suffix::{Suffix, SuffixKind};
use gai_storage::ProjectFile;
use std::path::Path;

/// Workflow name for an entry's shared hook workspace.
pub fn hooks_workflow_name(entry: &EntryId) -> String {
    format!("axe(hooks)-{entry}")
}

/// Outcome of one start pass for one entry id.
pub struct StartedHooks {
    pub updates: Vec<String>,
    pub hooks: Vec<HookEntry>,
    /// Hooks counted against the runner budget (`!`-prefixed are not).
    pub limited_count: usize,
}

impl StartedHooks {
    fn empty() -> Self {
        Self { updates: Vec::new(), hooks: Vec::new(), limited_count: 0 }
    }
}

impl<C: Clock> Engine<C> {
    /// Start every hook that is stale for `entry`, sharing one
    /// workspace. With `skip_limited`, only `!`-prefixed hooks start
    /// (the runner budget is exhausted).
    pub fn start_stale_hooks(
        &self,
        cs: &ChangeSpec,
        entry: &EntryId,
        skip_limited: bool,
    ) -> StartedHooks {
        if cs.hooks.is_empty() || cs.status.halts_new_runs() {
            return StartedHooks::empty();
        }

        if entry.is_proposal() {
            self.start_stale_hooks_for_proposal(cs, entry, skip_limited)
        } else {
            self.start_stale_hooks_shared(cs, entry, skip_limited)
        }
    }

    /// Existing claim for this CL + workflow, if one survives from a
    /// prior tick.
    fn existing_claim(&self, pf: &ProjectFile, cs: &ChangeSpec, workflow: &str) -> Option<u32> {
        pf.claimed_workspaces()
            .ok()?
            .into_iter()
            .find(|c| c.cl_name == cs.name && c.workflow == workflow)
            .map(|c| c.workspace_num)
    }

    fn claim_hooks_workspace(
        &self,
        pf: &ProjectFile,
        cs: &ChangeSpec,
        workflow: &str,
    ) -> Option<(u32, bool)> {
        if let Some(num) = self.existing_claim(pf, cs, workflow) {
            return Some((num, false));
        }
        let num = match pf.first_available_workspace(PoolKind::Scheduler) {
            Ok(num) => num,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "no scheduler workspace available");
                return None;
            }
        };
        let claim =
            WorkspaceClaim::new(num, workflow, std::process::id() as i32, cs.name.clone());
        match pf.claim_workspace(claim) {
            Ok(true) => Some((num, true)),
            Ok(false) => {
                tracing::warn!(cl = %cs.name, num, "lost workspace claim race");
                None
            }
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "workspace claim failed");
                None
            }
        }
    }

    fn release(&self, pf: &ProjectFile, cs: &ChangeSpec, num: u32, workflow: &str) {
        if let Err(err) = pf.release_workspace(num, workflow, &cs.name) {
            tracing::warn!(cl = %cs.name, num, %err, "workspace release failed");
        }
    }

    /// Checkout the CL into the workspace; clean first.
    fn prepare_workspace(&self, cs: &ChangeSpec, dir: &Path) -> bool {
        if let Err(err) = self.vcs.clean(dir) {
            tracing::warn!(cl = %cs.name, %err, "clean failed before checkout");
        }
        match self.vcs.checkout(dir, &cs.name) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "checkout failed");
                false
            }
        }
    }

    fn start_hooks_in_workspace(
        &self,
        cs: &ChangeSpec,
        entry: &EntryId,
        workspace_dir: &Path,
        skip_limited: bool,
        proposal: bool,
    ) -> StartedHooks {
        let mut started = StartedHooks::empty();
        for hook in &cs.hooks {
            if proposal && hook.skip_proposal_runs() {
                continue;
            }
            // The runner budget only gates limited hooks; `!`-prefixed
            // hooks always start.
            if skip_limited && !hook.skip_fix_hook() {
                continue;
            }
            if !hook_needs_run(hook, entry) {
                continue;
            }

            // Timestamps key output files; space launches one second
            // apart so each run gets a unique stamp.
            if !started.hooks.is_empty() {
                std::thread::sleep(std::time::Duration::from_secs(1));
            }

            match self.start_hook_background(cs, hook, workspace_dir, entry) {
                Ok((line, _output)) => {
                    let mut updated = hook.clone();
                    updated.status_lines.push(line);
                    started.hooks.push(updated);
                    if !hook.skip_fix_hook() {
                        started.limited_count += 1;
                    }
                    started
                        .updates
                        .push(format!("Hook '{}' -> RUNNING (started for entry {entry})", hook.command));
                }
                Err(err) => {
                    tracing::warn!(cl = %cs.name, hook = %hook.command, %err, "hook start failed");
                }
            }
        }
        started
    }

    fn start_stale_hooks_shared(
        &self,
        cs: &ChangeSpec,
        entry: &EntryId,
        skip_limited: bool,
    ) -> StartedHooks {
        let pf = self.project_file(&cs.file_path);
        let workflow = hooks_workflow_name(entry);
        let Some((num, newly_claimed)) = self.claim_hooks_workspace(&pf, cs, &workflow) else {
            return StartedHooks::empty();
        };
        let dir = self.workspace_dir(&cs.project_basename(), num);
        if !dir.is_dir() {
            tracing::warn!(cl = %cs.name, dir = %dir.display(), "workspace directory missing");
            if newly_claimed {
                self.release(&pf, cs, num, &workflow);
            }
            return StartedHooks::empty();
        }

        if !self.prepare_workspace(cs, &dir) {
            if newly_claimed {
                self.release(&pf, cs, num, &workflow);
            }
            return StartedHooks::empty();
        }

        let started = self.start_hooks_in_workspace(cs, entry, &dir, skip_limited, false);
        if started.hooks.is_empty() {
            // Nothing launched; do not sit on the lease.
            self.release(&pf, cs, num, &workflow);
        }
        started
    }

    fn start_stale_hooks_for_proposal(
        &self,
        cs: &ChangeSpec,
        entry: &EntryId,
        skip_limited: bool,
    ) -> StartedHooks {
        let Some(commit) = cs.entry_by_id(entry) else {
            return StartedHooks::empty();
        };
        if commit.is_broken_proposal() {
            tracing::debug!(cl = %cs.name, %entry, "skipping broken proposal");
            return StartedHooks::empty();
        }
        let Some(diff) = commit.diff.clone() else {
            tracing::warn!(cl = %cs.name, %entry, "proposal has no diff; cannot run hooks");
            return StartedHooks::empty();
        };

        let pf = self.project_file(&cs.file_path);
        let workflow = hooks_workflow_name(entry);
        let Some((num, newly_claimed)) = self.claim_hooks_workspace(&pf, cs, &workflow) else {
            return StartedHooks::empty();
        };
        let dir = self.workspace_dir(&cs.project_basename(), num);
        if !dir.is_dir() {
            tracing::warn!(cl = %cs.name, dir = %dir.display(), "workspace directory missing");
            if newly_claimed {
                self.release(&pf, cs, num, &workflow);
            }
            return StartedHooks::empty();
        }

        // Only a fresh claim updates and imports; a reused workspace
        // already carries the proposal's diff.
        if newly_claimed {
            if !self.prepare_workspace(cs, &dir) {
                self.release(&pf, cs, num, &workflow);
                return StartedHooks::empty();
            }
            if let Err(err) = self.vcs.apply_diff(&dir, Path::new(&diff)) {
                tracing::warn!(cl = %cs.name, %entry, %err, "proposal diff failed to apply");
                // Mark it broken so the loop stops retrying.
                let _ = pf.update_commit_entry_suffix(
                    &cs.name,
                    entry,
                    Some(Suffix::new(SuffixKind::Killed, "BROKEN PROPOSAL")),
                );
                let _ = self.vcs.clean(&dir);
                self.release(&pf, cs, num, &workflow);
                return StartedHooks::empty();
            }
        }

        let started = self.start_hooks_in_workspace(cs, entry, &dir, skip_limited, true);
        if started.hooks.is_empty() {
            let _ = self.vcs.clean(&dir);
            self.release(&pf, cs, num, &workflow);
        }
        started
    }

    /// Release the workspace for one finished entry. Proposal
    /// workspaces are cleaned first (uncommitted import).
    pub fn release_entry_workspace(&self, cs: &ChangeSpec, entry: &EntryId) {
        let pf = self.project_file(&cs.file_path);
        let workflow = hooks_workflow_name(entry);
        let Ok(claims) = pf.claimed_workspaces() else {
            return;
        };
        for claim in claims {
            if claim.cl_name == cs.name && claim.workflow == workflow {
                if entry.is_proposal() {
                    let dir = self.workspace_dir(&cs.project_basename(), claim.workspace_num);
                    let _ = self.vcs.clean(&dir);
                }
                self.release(&pf, cs, claim.workspace_num, &workflow);
                tracing::info!(
                    cl = %cs.name,
                    num = claim.workspace_num,
                    %entry,
                    "released hook workspace"
                );
                break;
            }
        }
    }

    /// Release every `axe(hooks)-*` workspace this CL still holds.
    pub fn release_all_entry_workspaces(&self, cs: &ChangeSpec) {
        let pf = self.project_file(&cs.file_path);
        let Ok(claims) = pf.claimed_workspaces() else {
            return;
        };
        for claim in claims {
            if claim.cl_name == cs.name && claim.workflow.starts_with("axe(hooks)-") {
                let entry_part = claim.workflow.trim_start_matches("axe(hooks)-");
                if entry_part.chars().any(|c| c.is_ascii_lowercase()) {
                    let dir = self.workspace_dir(&cs.project_basename(), claim.workspace_num);
                    let _ = self.vcs.clean(&dir);
                }
                self.release(&pf, cs, claim.workspace_num, &claim.workflow);
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
