// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handling agent workflow completion.
//!
//! Every tick the scheduler scans agent-owned status lines, reads each
//! agent's output file for the completion marker, and folds the result
//! back: auto-accept for successful proposals, attention markers for
//! failures, workspace release in all cases.

use crate::engine::Engine;
use crate::workflows::monitor::{
    check_workflow_completion, running_crs_workflows, running_fix_hook_workflows,
    running_summarize_hook_workflows, workflow_output_path,
};
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::suffix::{Suffix, SuffixKind};
use gai_storage::ProjectFile;
use std::path::PathBuf;

impl<C: Clock> Engine<C> {
    /// Check completion of running CRS / fix-hook / summarize-hook
    /// workflows and fold their results into the project file.
    pub fn check_and_complete_workflows(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        updates.extend(self.complete_crs(cs));
        updates.extend(self.complete_fix_hooks(cs));
        updates.extend(self.complete_summarize_hooks(cs));
        updates
    }

    fn find_claim(&self, pf: &ProjectFile, cl_name: &str, workflow: &str) -> Option<(u32, PathBuf)> {
        let claims = pf.claimed_workspaces().ok()?;
        let claim =
            claims.into_iter().find(|c| c.cl_name == cl_name && c.workflow == workflow)?;
        let project = pf
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some((claim.workspace_num, self.workspace_dir(&project, claim.workspace_num)))
    }

    fn release_claim(&self, pf: &ProjectFile, cl_name: &str, workflow: &str) {
        if let Some((num, _)) = self.find_claim(pf, cl_name, workflow) {
            let _ = pf.release_workspace(num, workflow, cl_name);
        }
    }

    fn complete_crs(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let pf = self.project_file(&cs.file_path);

        for (reviewer, stamp) in running_crs_workflows(cs) {
            let output = workflow_output_path(&self.gai, &cs.name, "crs", &stamp);
            let Some((proposal, exit_code)) = check_workflow_completion(&output) else {
                continue;
            };
            let workflow = format!("loop(crs)-{reviewer}");

            if exit_code == 0 && proposal.is_some() {
                let proposal = proposal.unwrap_or_else(|| EntryId::accepted(0));
                let accepted = match self.find_claim(&pf, &cs.name, &workflow) {
                    Some((_, dir)) => {
                        // Re-read: the file may have moved under us.
                        match pf.read_changespec(&cs.name) {
                            Ok(current) => self.auto_accept_proposal(&current, &proposal, &dir),
                            Err(_) => false,
                        }
                    }
                    None => false,
                };
                if accepted {
                    // Clear the agent tag; the comment row itself stays.
                    self.set_comment_suffix(&pf, &cs.name, &reviewer, None);
                    updates.push(format!(
                        "CRS workflow [{reviewer}] -> COMPLETED, auto-accepted ({proposal})"
                    ));
                } else {
                    self.set_comment_suffix(
                        &pf,
                        &cs.name,
                        &reviewer,
                        Some(Suffix::error("Unresolved Critique Comments")),
                    );
                    updates.push(format!("CRS workflow [{reviewer}] -> FAILED to auto-accept"));
                }
            } else {
                self.set_comment_suffix(
                    &pf,
                    &cs.name,
                    &reviewer,
                    Some(Suffix::error("Unresolved Critique Comments")),
                );
                updates.push(format!("CRS workflow [{reviewer}] -> FAILED (exit {exit_code})"));
            }
            self.release_claim(&pf, &cs.name, &workflow);
        }
        updates
    }

    fn complete_fix_hooks(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let pf = self.project_file(&cs.file_path);

        for (hook_command, stamp, entry, _summary) in running_fix_hook_workflows(cs) {
            let output = workflow_output_path(&self.gai, &cs.name, "fix-hook", &stamp);
            let Some((proposal, exit_code)) = check_workflow_completion(&output) else {
                continue;
            };
            let workflow = format!("loop(fix-hook)-{stamp}");

            // Fresh summary: the line may have changed since our snapshot.
            let current_summary = pf
                .read_changespec(&cs.name)
                .ok()
                .and_then(|current| {
                    current
                        .hook_by_command(&hook_command)
                        .and_then(|h| h.status_line_for_entry(&entry))
                        .and_then(|sl| sl.suffix.as_ref().and_then(|s| s.summary.clone()))
                });

            if let (Some(proposal), 0) = (&proposal, exit_code) {
                // Point the line at the proposal that addresses it.
                let _ = crate::hooks::mutations::set_hook_suffix(
                    &pf,
                    &cs.name,
                    &hook_command,
                    Some(&entry),
                    Suffix::with_summary(
                        SuffixKind::EntryRef,
                        proposal.to_string(),
                        current_summary,
                    ),
                );

                match self.find_claim(&pf, &cs.name, &workflow) {
                    Some((_, dir)) => {
                        let accepted = match pf.read_changespec(&cs.name) {
                            Ok(current) => self.auto_accept_proposal(&current, proposal, &dir),
                            Err(_) => false,
                        };
                        if accepted {
                            updates.push(format!(
                                "fix-hook workflow '{hook_command}' -> COMPLETED, auto-accepted ({proposal})"
                            ));
                        } else {
                            updates.push(format!(
                                "fix-hook workflow '{hook_command}' -> proposal ({proposal}) created, auto-accept failed"
                            ));
                        }
                    }
                    None => {
                        updates.push(format!(
                            "fix-hook workflow '{hook_command}' -> proposal ({proposal}) created (no workspace for auto-accept)"
                        ));
                    }
                }
            } else {
                // Keep the summary reachable; lead with the output path
                // so the log is one keystroke away.
                let summary = match current_summary {
                    Some(summary) => format!("{} | {summary}", shorten_path(&output)),
                    None => shorten_path(&output),
                };
                let _ = crate::hooks::mutations::set_hook_suffix(
                    &pf,
                    &cs.name,
                    &hook_command,
                    Some(&entry),
                    Suffix::with_summary(SuffixKind::Error, "fix-hook Failed", Some(summary)),
                );
                updates
                    .push(format!("fix-hook workflow '{hook_command}' -> FAILED (exit {exit_code})"));
            }
            self.release_claim(&pf, &cs.name, &workflow);
        }
        updates
    }

    fn complete_summarize_hooks(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let pf = self.project_file(&cs.file_path);

        for (hook_command, stamp, entry, _) in running_summarize_hook_workflows(cs) {
            let output = workflow_output_path(&self.gai, &cs.name, "summarize-hook", &stamp);
            let Some((_, exit_code)) = check_workflow_completion(&output) else {
                continue;
            };

            if exit_code == 0 {
                // The runner wrote the summary as the line's suffix
                // itself; read it back and stamp it summarize_complete.
                let summary = read_summary_payload(&output);
                let _ = crate::hooks::mutations::set_hook_suffix(
                    &pf,
                    &cs.name,
                    &hook_command,
                    Some(&entry),
                    Suffix::new(SuffixKind::SummarizeComplete, summary),
                );
                updates.push(format!("summarize-hook workflow '{hook_command}' -> COMPLETED"));

                // Chain straight into fix-hook for accepted entries.
                if !entry.is_proposal() {
                    if let Ok(current) = pf.read_changespec(&cs.name) {
                        if let Some(hook) = current.hook_by_command(&hook_command) {
                            if let Some(update) =
                                self.start_fix_hook_workflow(&current, hook, &entry)
                            {
                                updates.push(update);
                            }
                        }
                    }
                }
            } else {
                let _ = crate::hooks::mutations::set_hook_suffix(
                    &pf,
                    &cs.name,
                    &hook_command,
                    Some(&entry),
                    Suffix::error("Hook Command Failed"),
                );
                updates.push(format!(
                    "summarize-hook workflow '{hook_command}' -> FAILED (exit {exit_code})"
                ));
            }
        }
        updates
    }

    fn set_comment_suffix(
        &self,
        pf: &ProjectFile,
        cl_name: &str,
        reviewer: &str,
        suffix: Option<Suffix>,
    ) {
        let Ok(current) = pf.read_changespec(cl_name) else {
            return;
        };
        let mut comments = current.comments.clone();
        for entry in comments.iter_mut() {
            if entry.reviewer == reviewer {
                entry.suffix = suffix.clone();
            }
        }
        if let Err(err) = pf.update_comments_field(cl_name, &comments) {
            tracing::warn!(cl = %cl_name, %err, "failed to update comment suffix");
        }
    }
}

/// The summary an agent produced: everything before the completion
/// marker, collapsed to one line.
fn read_summary_payload(output: &std::path::Path) -> String {
    let content = std::fs::read_to_string(output).unwrap_or_default();
    let body = content
        .split(crate::workflows::monitor::WORKFLOW_COMPLETE_MARKER)
        .next()
        .unwrap_or("");
    let line = body.lines().rev().map(str::trim).find(|l| !l.is_empty());
    line.unwrap_or("Hook Command Failed").to_string()
}

/// `~`-relative rendering for paths under the home directory.
fn shorten_path(path: &std::path::Path) -> String {
    if let Some(home) = std::env::var_os("HOME") {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
#[path = "completer_tests.rs"]
mod tests;
