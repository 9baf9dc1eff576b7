// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle operations: revert, archive, restore.
//!
//! All three bypass status-machine validation, cancel whatever is
//! running first (SIGTERM to process groups, never SIGKILL), and
//! cascade the `__<N>` rename through PARENT references and workspace
//! claims.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::mentors::set_mentor_status;
use crate::process::try_kill_process_group;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::hook::HookStatus;
use gai_core::mentor::MentorStatus;
use gai_core::project::{PoolKind, WorkspaceClaim};
use gai_core::status::ClStatus;
use gai_core::suffix::{extract_pid_from_agent_suffix, extract_stamp_from_agent_suffix, Suffix, SuffixKind};
use gai_core::timestamps;
use gai_storage::paths::{has_lifecycle_suffix, next_lifecycle_suffix, strip_lifecycle_suffix};
use gai_storage::ProjectFile;
use indexmap::IndexMap;
use std::path::PathBuf;

/// A held scheduler-pool lease that releases itself.
struct Lease {
    pf: ProjectFile,
    num: u32,
    workflow: String,
    cl_name: String,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let _ = self.pf.release_workspace(self.num, &self.workflow, &self.cl_name);
    }
}

impl<C: Clock> Engine<C> {
    fn lease_scheduler_workspace(
        &self,
        cs: &ChangeSpec,
        workflow: String,
    ) -> Result<(Lease, PathBuf), EngineError> {
        let pf = self.project_file(&cs.file_path);
        let num = pf
            .first_available_workspace(PoolKind::Scheduler)
            .map_err(|_| EngineError::WorkspaceUnavailable)?;
        let claim =
            WorkspaceClaim::new(num, workflow.clone(), std::process::id() as i32, cs.name.clone());
        if !pf.claim_workspace(claim)? {
            return Err(EngineError::WorkspaceUnavailable);
        }
        let dir = self.workspace_dir(&cs.project_basename(), num);
        if !dir.is_dir() {
            let lease = Lease { pf, num, workflow, cl_name: cs.name.clone() };
            drop(lease);
            return Err(EngineError::WorkspaceMissing(dir.display().to_string()));
        }
        Ok((Lease { pf, num, workflow, cl_name: cs.name.clone() }, dir))
    }

    /// Kill every running hook/agent/mentor on a CL and persist the
    /// suffix transitions to `killed_*`. Workspaces held by killed
    /// mentors are released in the same burst.
    pub fn kill_and_persist_all_running_processes(&self, cs: &ChangeSpec, reason: &str) {
        let pf = self.project_file(&cs.file_path);
        let now = timestamps::now_stamp(&self.clock);
        let described = format!("[{now}] {reason}");

        // Hooks: running processes and running agents.
        let mut modified: IndexMap<String, gai_core::HookEntry> = IndexMap::new();
        for hook in &cs.hooks {
            let mut updated = hook.clone();
            let mut touched = false;
            for sl in updated.status_lines.iter_mut() {
                match sl.suffix_kind() {
                    Some(SuffixKind::RunningProcess) | Some(SuffixKind::PendingDeadProcess) => {
                        if let Some(pid) = sl.process_pid() {
                            try_kill_process_group(pid);
                        }
                        let old = sl.suffix_value().unwrap_or_default();
                        sl.suffix = Some(Suffix::new(
                            SuffixKind::KilledProcess,
                            format!("{old} | {described}"),
                        ));
                        sl.status = HookStatus::Dead;
                        touched = true;
                    }
                    Some(SuffixKind::RunningAgent) => {
                        if let Some(pid) =
                            sl.suffix_value().and_then(extract_pid_from_agent_suffix)
                        {
                            try_kill_process_group(pid);
                        }
                        let value = sl.suffix_value().unwrap_or_default().to_string();
                        let summary = sl.suffix.as_ref().and_then(|s| s.summary.clone());
                        sl.suffix =
                            Some(Suffix::with_summary(SuffixKind::KilledAgent, value, summary));
                        touched = true;
                    }
                    _ => {}
                }
            }
            if touched {
                modified.insert(updated.command.clone(), updated);
            }
        }
        if !modified.is_empty() {
            if let Err(err) = pf.merge_hook_updates(&cs.name, &modified) {
                tracing::warn!(cl = %cs.name, %err, "kill persistence failed for hooks");
            }
        }

        // Comments: running responder agents.
        let mut comments = cs.comments.clone();
        let mut comments_touched = false;
        for comment in comments.iter_mut() {
            if comment.suffix_kind() == Some(SuffixKind::RunningAgent) {
                if let Some(pid) = comment.suffix_value().and_then(extract_pid_from_agent_suffix)
                {
                    try_kill_process_group(pid);
                }
                let value = comment.suffix_value().unwrap_or_default().to_string();
                comment.suffix = Some(Suffix::new(SuffixKind::KilledAgent, value));
                comments_touched = true;
            }
        }
        if comments_touched {
            if let Err(err) = pf.update_comments_field(&cs.name, &comments) {
                tracing::warn!(cl = %cs.name, %err, "kill persistence failed for comments");
            }
        }

        // Mentors: kill, mark, and release their workspaces.
        for round in &cs.mentors {
            for sl in &round.status_lines {
                if sl.suffix_kind() != Some(SuffixKind::RunningAgent) {
                    continue;
                }
                let token = sl.suffix_value().unwrap_or_default().to_string();
                if let Some(pid) = extract_pid_from_agent_suffix(&token) {
                    try_kill_process_group(pid);
                }
                let _ = set_mentor_status(
                    &pf,
                    &cs.name,
                    &round.entry,
                    &sl.profile_name,
                    &sl.mentor_name,
                    MentorStatus::Dead,
                    sl.duration.clone(),
                    Some(Suffix::new(SuffixKind::KilledAgent, token.clone())),
                );
                if let Some(stamp) = extract_stamp_from_agent_suffix(&token) {
                    let workflow = format!("axe(mentor)-{}-{stamp}", sl.mentor_name);
                    if let Ok(claims) = pf.claimed_workspaces() {
                        for claim in claims {
                            if claim.workflow == workflow && claim.cl_name == cs.name {
                                let _ = pf.release_workspace(
                                    claim.workspace_num,
                                    &workflow,
                                    &cs.name,
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    /// Revert a mailed-but-unwanted CL: kill its workers, save its
    /// diff, prune the revision, rename with a `__<N>` suffix, and mark
    /// it Reverted with the CL url cleared.
    pub fn revert_changespec(&self, cs: &ChangeSpec) -> Result<String, EngineError> {
        if cs.cl.is_none() {
            return Err(EngineError::Refused(
                "ChangeSpec does not have a valid CL set".to_string(),
            ));
        }
        self.kill_and_persist_all_running_processes(cs, "Killed hook running on reverted CL.");

        let pf = self.project_file(&cs.file_path);
        let all = pf.read()?.changespecs;
        if has_active_children(cs, &all, &[ClStatus::Reverted]) {
            return Err(EngineError::Refused(
                "Cannot revert: other ChangeSpecs have this one as their parent".to_string(),
            ));
        }

        let new_name = lifecycle_new_name(cs, &all);
        let (lease, dir) =
            self.lease_scheduler_workspace(cs, format!("revert-{}", cs.name))?;
        self.vcs.checkout(&dir, &cs.name)?;

        self.save_diff(cs, &new_name, &dir, self.gai.reverted_dir())?;
        self.vcs.prune(&dir, &cs.name)?;
        // Release before the rename rewrites claim rows, or the release
        // key no longer matches.
        drop(lease);

        if new_name != cs.name {
            self.rename_with_references(&pf, &cs.name, &new_name)?;
        }
        pf.transition_status(&new_name, &ClStatus::Reverted, false)?;
        pf.set_cl_field(&new_name, None)?;
        tracing::info!(cl = %cs.name, new = %new_name, "reverted");
        Ok(new_name)
    }

    /// Archive a CL: like revert, but children must already be
    /// terminal, the revision is archived rather than pruned, and the
    /// CL url is preserved.
    pub fn archive_changespec(&self, cs: &ChangeSpec) -> Result<String, EngineError> {
        if cs.cl.is_none() {
            return Err(EngineError::Refused(
                "ChangeSpec does not have a valid CL set".to_string(),
            ));
        }
        self.kill_and_persist_all_running_processes(cs, "Killed hook running on archived CL.");

        let pf = self.project_file(&cs.file_path);
        let all = pf.read()?.changespecs;
        if has_active_children(cs, &all, &[ClStatus::Archived, ClStatus::Reverted]) {
            return Err(EngineError::Refused(
                "Cannot archive: other ChangeSpecs have this one as their parent \
                 and are not Archived or Reverted"
                    .to_string(),
            ));
        }

        let new_name = lifecycle_new_name(cs, &all);
        let (lease, dir) =
            self.lease_scheduler_workspace(cs, format!("archive-{}", cs.name))?;
        self.vcs.checkout(&dir, &cs.name)?;

        self.save_diff(cs, &new_name, &dir, self.gai.archived_dir())?;
        self.vcs.archive(&dir, &cs.name)?;
        // Release before the rename rewrites claim rows, or the release
        // key no longer matches.
        drop(lease);

        if new_name != cs.name {
            self.rename_with_references(&pf, &cs.name, &new_name)?;
        }
        pf.transition_status(&new_name, &ClStatus::Archived, false)?;
        tracing::info!(cl = %cs.name, new = %new_name, "archived");
        Ok(new_name)
    }

    /// Restore a Reverted/Archived CL: strip the rename suffix, clear
    /// hook rows for the last entry so the loop re-runs them, re-apply
    /// the saved diff on top of the parent, and recommit.
    pub fn restore_changespec(&self, cs: &ChangeSpec) -> Result<String, EngineError> {
        if !matches!(cs.status, ClStatus::Reverted | ClStatus::Archived) {
            return Err(EngineError::Refused(format!(
                "ChangeSpec status is '{}', not 'Reverted' or 'Archived'",
                cs.status
            )));
        }
        self.kill_and_persist_all_running_processes(cs, "Killed hook running on restored CL.");

        let base_name = strip_lifecycle_suffix(&cs.name).to_string();
        let pf = self.project_file(&cs.file_path);

        if base_name != cs.name {
            self.rename_with_references(&pf, &cs.name, &base_name)?;
        }

        // Clear the last entry's hook rows so the loop re-runs them.
        if let Some(last_entry) = cs.last_entry_id() {
            self.clear_hook_rows_for_entry(&pf, &base_name, &last_entry)?;
        }

        let (_lease, dir) =
            self.lease_scheduler_workspace(cs, format!("restore-{base_name}"))?;
        let target = match &cs.parent {
            Some(parent) => parent.clone(),
            None => self.vcs.get_default_parent_revision(&dir)?,
        };
        self.vcs.checkout(&dir, &target)?;

        // The saved diff lives under reverted/ or archived/.
        let reverted = self.gai.reverted_dir().join(format!("{}.diff", cs.name));
        let archived = self.gai.archived_dir().join(format!("{}.diff", cs.name));
        let diff = if reverted.exists() {
            reverted
        } else if archived.exists() {
            archived
        } else {
            return Err(EngineError::Refused(
                "Diff file not found in reverted or archived directory".to_string(),
            ));
        };
        self.vcs.apply_patch(&dir, &diff)?;

        self.commit_changespec(&base_name, &cs.file_path, &dir)?;
        tracing::info!(cl = %cs.name, base = %base_name, "restored");
        Ok(base_name)
    }

    /// The `gai commit` glue: put a (possibly just-restored) CL back
    /// into circulation — status WIP, required hooks present, commit
    /// description rewritten from the spec.
    pub fn commit_changespec(
        &self,
        name: &str,
        project_file: &std::path::Path,
        workspace_dir: &std::path::Path,
    ) -> Result<(), EngineError> {
        let pf = self.project_file(project_file);
        let cs = pf.read_changespec(name)?;

        let description = self.vcs.prepare_description_for_reword(&cs.description);
        if !description.is_empty() {
            self.vcs.reword(workspace_dir, &description)?;
        }

        for hook in crate::config::REQUIRED_CHANGESPEC_HOOKS {
            pf.add_hook(name, hook)?;
        }
        if cs.status != ClStatus::Wip {
            pf.transition_status(name, &ClStatus::Wip, false)?;
        }
        Ok(())
    }

    fn rename_with_references(
        &self,
        pf: &ProjectFile,
        old: &str,
        new: &str,
    ) -> Result<(), EngineError> {
        pf.rename_changespec(old, new)?;
        pf.update_claims_cl_name(old, new)?;
        pf.update_parent_references(old, new)?;
        Ok(())
    }

    fn clear_hook_rows_for_entry(
        &self,
        pf: &ProjectFile,
        name: &str,
        entry: &EntryId,
    ) -> Result<(), EngineError> {
        let hooks = pf.read_hooks(name)?;
        if hooks.is_empty() {
            return Ok(());
        }
        let mut updated = hooks.clone();
        for hook in updated.iter_mut() {
            hook.status_lines.retain(|sl| &sl.entry != entry);
        }
        pf.update_hooks_field(name, &updated)?;
        Ok(())
    }

    fn save_diff(
        &self,
        cs: &ChangeSpec,
        new_name: &str,
        workspace_dir: &std::path::Path,
        target_dir: PathBuf,
    ) -> Result<(), EngineError> {
        let diff = self.vcs.diff_revision(workspace_dir, &cs.name)?;
        let dir = self.gai.ensure_dir(target_dir)?;
        std::fs::write(dir.join(format!("{new_name}.diff")), diff)?;
        Ok(())
    }
}

/// Whether any non-terminal CL cites this one as its parent.
/// `terminal` is the status set children may legitimately be in.
pub fn has_active_children(cs: &ChangeSpec, all: &[ChangeSpec], terminal: &[ClStatus]) -> bool {
    all.iter().any(|other| {
        other.parent.as_deref() == Some(cs.name.as_str()) && !terminal.contains(&other.status)
    })
}

/// New name for a lifecycle rename: smallest non-colliding `__<N>`
/// suffix. A WIP CL that already carries a suffix keeps its name.
pub fn lifecycle_new_name(cs: &ChangeSpec, all: &[ChangeSpec]) -> String {
    if cs.status == ClStatus::Wip && has_lifecycle_suffix(&cs.name) {
        return cs.name.clone();
    }
    let existing: Vec<String> = all.iter().map(|other| other.name.clone()).collect();
    let suffix = next_lifecycle_suffix(&cs.name, &existing);
    format!("{}__{suffix}", cs.name)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
