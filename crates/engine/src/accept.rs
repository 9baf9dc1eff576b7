// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The proposal accept flow.
//!
//! Accepting `Na` folds its diff into the commit (apply-diff + amend)
//! and renumbers: the proposal becomes the next accepted entry.
//! Rejecting everything is one atomic write that marks the remaining
//! proposals BROKEN and advances the CL status.

use crate::engine::Engine;
use crate::error::EngineError;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::status::{render_status_field, ClStatus};
use gai_core::suffix::{Suffix, SuffixKind};
use gai_storage::fields::replace_block_field;
use gai_storage::{serialize, StorageError};
use std::path::Path;

impl<C: Clock> Engine<C> {
    /// Accept a proposal without user interaction. Returns true on
    /// success; failures are logged and leave the proposal in place.
    pub fn auto_accept_proposal(
        &self,
        cs: &ChangeSpec,
        proposal: &EntryId,
        workspace_dir: &Path,
    ) -> bool {
        match self.accept_proposal(cs, proposal, workspace_dir) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %proposal, %err, "auto-accept failed");
                false
            }
        }
    }

    /// Accept `proposal`: apply its diff in the workspace currently
    /// checked out at this CL, amend, and renumber history.
    pub fn accept_proposal(
        &self,
        cs: &ChangeSpec,
        proposal: &EntryId,
        workspace_dir: &Path,
    ) -> Result<(), EngineError> {
        if !proposal.is_proposal() {
            return Err(EngineError::Refused(format!("{proposal} is not a proposal id")));
        }
        let entry = cs
            .entry_by_id(proposal)
            .ok_or_else(|| EngineError::Refused(format!("proposal ({proposal}) not found")))?;
        let diff = entry
            .diff
            .clone()
            .ok_or_else(|| EngineError::Refused(format!("proposal ({proposal}) has no diff")))?;
        let note = entry.note.clone();

        self.vcs.apply_diff(workspace_dir, Path::new(&diff))?;
        self.vcs.amend(workspace_dir, &note)?;

        // Renumber: the proposal becomes the next accepted entry.
        let pf = self.project_file(&cs.file_path);
        let proposal = proposal.clone();
        pf.rewrite_history(
            &cs.name,
            &format!("Accept proposal ({proposal}) for {}", cs.name),
            move |mut commits| {
                let next = commits
                    .iter()
                    .filter(|e| !e.is_proposal())
                    .map(|e| e.id.number)
                    .max()
                    .unwrap_or(0)
                    + 1;
                if let Some(pos) = commits.iter().position(|e| e.id == proposal) {
                    let mut accepted = commits.remove(pos);
                    accepted.id = EntryId::accepted(next);
                    accepted.suffix = None;
                    commits.push(accepted);
                }
                commits
            },
        )?;
        Ok(())
    }

    /// Idempotently ensure a test hook exists for each changed target.
    pub fn ensure_test_target_hooks(
        &self,
        cs: &ChangeSpec,
        targets: &[String],
    ) -> Result<(), EngineError> {
        let pf = self.project_file(&cs.file_path);
        for target in targets {
            pf.add_hook(&cs.name, &format!("bb_rabbit_test {target}"))?;
        }
        Ok(())
    }

    /// Reject all live proposals and advance the status — one write.
    ///
    /// With `mail`, STATUS becomes Mailed; otherwise the CL keeps its
    /// Drafted status and gains the READY-TO-MAIL suffix.
    pub fn reject_proposals_and_mark(
        &self,
        cs: &ChangeSpec,
        mail: bool,
    ) -> Result<(), EngineError> {
        // Mailing supersedes whatever is still running against the
        // proposals being rejected.
        self.kill_and_persist_all_running_processes(cs, "Killed hook on mark-ready-to-mail.");

        let pf = self.project_file(&cs.file_path);
        let name = cs.name.clone();
        let message = if mail {
            format!("Reject proposals and mark {name} Mailed")
        } else {
            format!("Reject proposals and mark {name} READY TO MAIL")
        };

        pf.mutate_with_model(&message, |model, lines| {
            let current = model
                .changespec(&name)
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.clone() })?;

            let mut commits = current.commits.clone();
            for entry in commits.iter_mut() {
                if entry.is_proposal() && !entry.is_broken_proposal() {
                    entry.suffix = Some(Suffix::new(SuffixKind::Killed, "BROKEN PROPOSAL"));
                }
            }
            replace_block_field(lines, &name, "HISTORY:", serialize::history_field_lines(&commits));

            let status_value = if mail {
                render_status_field(&ClStatus::Mailed, false)
            } else {
                render_status_field(&current.status, true)
            };
            gai_storage::fields::replace_scalar_field(lines, &name, "STATUS:", Some(status_value));
            Ok(())
        })?;
        Ok(())
    }
}

/// Parse proposal metadata out of a workflow completion payload line
/// (`TEST_TARGETS: //a:b,//c:d`).
pub fn parse_changed_test_targets(content: &str) -> Vec<String> {
    content
        .lines()
        .rev()
        .find_map(|l| l.trim().strip_prefix("TEST_TARGETS:"))
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "accept_tests.rs"]
mod tests;
