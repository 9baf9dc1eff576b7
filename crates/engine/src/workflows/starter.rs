// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launching agent workflows.
//!
//! The spawn order matters: the subprocess starts first so the claim
//! carries its real PID; a failed claim terminates the subprocess. The
//! status-line tag (`<agent>-<pid>-<ts>`, kind `running_agent`) is the
//! record concurrent ticks use to avoid double-launching.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::hooks::execution::hook_output_path;
use crate::hooks::mutations::{set_hook_suffix, try_claim_hook_for_fix};
use crate::hooks::queries::{failing_hook_entries_for_fix, failing_hook_entries_for_summarize};
use crate::workflows::monitor::workflow_output_path;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::comment::CommentEntry;
use gai_core::entry::EntryId;
use gai_core::hook::HookEntry;
use gai_core::project::{PoolKind, WorkspaceClaim};
use gai_core::suffix::{Suffix, SuffixKind};
use gai_core::timestamps;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Outcome of one start pass over a CL.
pub struct StartedWorkflows {
    pub updates: Vec<String>,
    pub started: usize,
}

impl<C: Clock> Engine<C> {
    fn spawn_runner(
        &self,
        command: &str,
        args: &[&str],
        cwd: Option<&Path>,
        output_path: &Path,
    ) -> Result<Child, EngineError> {
        self.gai.ensure_dir(self.gai.workflows_dir())?;
        let output_file = std::fs::File::create(output_path)?;
        let stderr_file = output_file.try_clone()?;
        let mut cmd = Command::new(command);
        cmd.args(args).stdout(Stdio::from(output_file)).stderr(Stdio::from(stderr_file));
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        Ok(cmd.process_group(0).spawn()?)
    }

    fn terminate(child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }

    /// Lease the workspace the agent is already running in, with its
    /// real PID. A lost claim terminates the subprocess.
    fn claim_agent_workspace(
        &self,
        cs: &ChangeSpec,
        workflow: &str,
        num: u32,
        child: &mut Child,
    ) -> bool {
        let pf = self.project_file(&cs.file_path);
        let claim = WorkspaceClaim::new(num, workflow, child.id() as i32, cs.name.clone());
        match pf.claim_workspace(claim) {
            Ok(true) => true,
            Ok(false) | Err(_) => {
                tracing::warn!(cl = %cs.name, num, "workspace claim failed; terminating agent");
                Self::terminate(child);
                false
            }
        }
    }

    /// Prepare a loop workspace: clean, then check out the CL.
    fn checkout_for_agent(&self, cs: &ChangeSpec, num: u32) -> Option<PathBuf> {
        let dir = self.workspace_dir(&cs.project_basename(), num);
        if !dir.is_dir() {
            tracing::warn!(cl = %cs.name, dir = %dir.display(), "workspace directory missing");
            return None;
        }
        if let Err(err) = self.vcs.clean(&dir) {
            tracing::warn!(cl = %cs.name, %err, "clean failed");
        }
        match self.vcs.checkout(&dir, &cs.name) {
            Ok(_) => Some(dir),
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "checkout failed");
                None
            }
        }
    }

    /// Start a CRS run for one comment entry.
    pub fn start_crs_workflow(&self, cs: &ChangeSpec, comment: &CommentEntry) -> Option<String> {
        let stamp = timestamps::now_stamp(&self.clock);
        let workflow = format!("loop(crs)-{}", comment.reviewer);

        let pf = self.project_file(&cs.file_path);
        let num = pf.first_available_workspace(PoolKind::Loop).ok()?;
        let dir = self.checkout_for_agent(cs, num)?;

        let output = workflow_output_path(&self.gai, &cs.name, "crs", &stamp);
        let comments_file = shellexpand_home(&comment.file_path);
        let crs_cmd = self.config.agents.crs.clone();
        let args = [
            cs.name.as_str(),
            &cs.file_path.to_string_lossy().into_owned(),
            &comments_file,
            &comment.reviewer,
            &dir.to_string_lossy().into_owned(),
            &output.to_string_lossy().into_owned(),
        ]
        .map(str::to_string);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let mut child = match self.spawn_runner(&crs_cmd, &arg_refs, Some(&dir), &output) {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "failed to start CRS subprocess");
                return None;
            }
        };
        let pid = child.id() as i32;
        if !self.claim_agent_workspace(cs, &workflow, num, &mut child) {
            return None;
        }

        let mut comments = cs.comments.clone();
        for entry in comments.iter_mut() {
            if entry.reviewer == comment.reviewer {
                entry.suffix =
                    Some(Suffix::new(SuffixKind::RunningAgent, format!("crs-{pid}-{stamp}")));
            }
        }
        if let Err(err) = pf.update_comments_field(&cs.name, &comments) {
            tracing::warn!(cl = %cs.name, %err, "failed to tag comment row");
        }
        Some(format!("CRS workflow -> RUNNING for [{}]", comment.reviewer))
    }

    /// Start a fix-hook run for one failing hook attempt. The summary
    /// must already be claimed (`try_claim_hook_for_fix`).
    pub fn start_fix_hook_workflow(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        entry: &EntryId,
    ) -> Option<String> {
        let stamp = timestamps::now_stamp(&self.clock);
        let workflow = format!("loop(fix-hook)-{stamp}");
        let pf = self.project_file(&cs.file_path);

        // Atomic claim: exactly one scheduler wins the handoff token.
        let claiming = format!("claiming-{stamp}");
        let summary =
            match try_claim_hook_for_fix(&pf, &cs.name, &hook.command, entry, &claiming) {
                Ok(Some(summary)) => summary,
                Ok(None) => {
                    tracing::debug!(
                        cl = %cs.name,
                        hook = %hook.command,
                        %entry,
                        "fix-hook not claimable (already claimed or no summary)"
                    );
                    return None;
                }
                Err(err) => {
                    tracing::warn!(cl = %cs.name, %err, "fix-hook claim failed");
                    return None;
                }
            };

        // Past this point the line is ours (claiming_fix); on any
        // failure restore the summary so a later tick can retry.
        let restore = |reason: &str| {
            tracing::warn!(cl = %cs.name, hook = %hook.command, reason, "fix-hook start aborted");
            let _ = set_hook_suffix(
                &pf,
                &cs.name,
                &hook.command,
                Some(entry),
                Suffix::new(SuffixKind::SummarizeComplete, summary.clone()),
            );
        };

        let num = match pf.first_available_workspace(PoolKind::Loop) {
            Ok(num) => num,
            Err(_) => {
                restore("no loop workspace available");
                return None;
            }
        };
        let Some(dir) = self.checkout_for_agent(cs, num) else {
            restore("workspace preparation failed");
            return None;
        };

        let hook_output = hook
            .status_line_for_entry(entry)
            .map(|sl| hook_output_path(&self.gai, &cs.name, &sl.timestamp))
            .unwrap_or_default();
        let output = workflow_output_path(&self.gai, &cs.name, "fix-hook", &stamp);
        let fix_cmd = self.config.agents.fix_hook.clone();
        let args = [
            cs.name.as_str(),
            &cs.file_path.to_string_lossy().into_owned(),
            &hook.command,
            &hook_output.to_string_lossy().into_owned(),
            &dir.to_string_lossy().into_owned(),
            &output.to_string_lossy().into_owned(),
            &entry.to_string(),
        ]
        .map(str::to_string);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let mut child = match self.spawn_runner(&fix_cmd, &arg_refs, Some(&dir), &output) {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "failed to start fix-hook subprocess");
                restore("spawn failed");
                return None;
            }
        };
        let pid = child.id() as i32;
        if !self.claim_agent_workspace(cs, &workflow, num, &mut child) {
            restore("workspace claim lost");
            return None;
        }

        // Tag the line as agent-owned, summary preserved alongside.
        let tagged = Suffix::with_summary(
            SuffixKind::RunningAgent,
            format!("fix_hook-{pid}-{stamp}"),
            Some(summary),
        );
        if let Err(err) = set_hook_suffix(&pf, &cs.name, &hook.command, Some(entry), tagged) {
            tracing::warn!(cl = %cs.name, %err, "failed to tag fix-hook line");
        }
        Some(format!("fix-hook workflow -> RUNNING for '{}' ({entry})", hook.command))
    }

    /// Start a summarize-hook run. Needs no workspace: it only reads
    /// the hook output file.
    pub fn start_summarize_hook_workflow(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        entry: &EntryId,
    ) -> Option<String> {
        let stamp = timestamps::now_stamp(&self.clock);
        let pf = self.project_file(&cs.file_path);

        let hook_output = hook
            .status_line_for_entry(entry)
            .map(|sl| hook_output_path(&self.gai, &cs.name, &sl.timestamp));
        let Some(hook_output) = hook_output.filter(|p| p.exists()) else {
            tracing::warn!(cl = %cs.name, hook = %hook.command, "no hook output to summarize");
            let _ = set_hook_suffix(
                &pf,
                &cs.name,
                &hook.command,
                Some(entry),
                Suffix::error("Hook Command Failed"),
            );
            return Some(format!(
                "summarize-hook workflow '{}' ({entry}) -> no output to summarize",
                hook.command
            ));
        };

        let output = workflow_output_path(&self.gai, &cs.name, "summarize-hook", &stamp);
        let cmd = self.config.agents.summarize_hook.clone();
        let args = [
            cs.name.as_str(),
            &cs.file_path.to_string_lossy().into_owned(),
            &hook.command,
            &hook_output.to_string_lossy().into_owned(),
            &output.to_string_lossy().into_owned(),
            &entry.to_string(),
        ]
        .map(str::to_string);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let child = match self.spawn_runner(&cmd, &arg_refs, None, &output) {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "failed to start summarize-hook subprocess");
                return None;
            }
        };
        let pid = child.id() as i32;
        let tag = Suffix::new(SuffixKind::RunningAgent, format!("summarize_hook-{pid}-{stamp}"));
        if let Err(err) = set_hook_suffix(&pf, &cs.name, &hook.command, Some(entry), tag) {
            tracing::warn!(cl = %cs.name, %err, "failed to tag summarize-hook line");
        }
        Some(format!("summarize-hook workflow -> RUNNING for '{}' ({entry})", hook.command))
    }

    /// Start every stale workflow for this CL, within the runner budget.
    pub fn start_stale_workflows(
        &self,
        cs: &ChangeSpec,
        runners_started_this_cycle: usize,
    ) -> StartedWorkflows {
        let mut out = StartedWorkflows { updates: Vec::new(), started: 0 };
        if cs.status.halts_new_runs() {
            return out;
        }

        let current_running = self.global_running_count() + runners_started_this_cycle;
        if current_running >= self.config.max_runners {
            tracing::debug!(
                cl = %cs.name,
                current_running,
                limit = self.config.max_runners,
                "skipping workflow start: at runner limit"
            );
            return out;
        }
        let available = self.config.max_runners - current_running;
        let entry_ids = cs.current_and_proposal_entry_ids();

        // CRS for comment rows with no suffix yet.
        for comment in cs.comments.iter().filter(|c| {
            matches!(c.reviewer.as_str(), "critique" | "critique:me") && c.suffix.is_none()
        }) {
            if out.started >= available {
                return out;
            }
            if let Some(update) = self.start_crs_workflow(cs, comment) {
                out.updates.push(update);
                out.started += 1;
                self.space_launches();
            }
        }

        // fix-hook for summarized failures on accepted entries.
        for (hook, entry) in failing_hook_entries_for_fix(&cs.hooks, &entry_ids) {
            if out.started >= available {
                return out;
            }
            if let Some(update) = self.start_fix_hook_workflow(cs, hook, &entry) {
                out.updates.push(update);
                out.started += 1;
                self.space_launches();
            }
        }

        // summarize-hook for fresh failures.
        for (hook, entry) in failing_hook_entries_for_summarize(&cs.hooks, &entry_ids) {
            if out.started >= available {
                return out;
            }
            if let Some(update) = self.start_summarize_hook_workflow(cs, hook, &entry) {
                out.updates.push(update);
                out.started += 1;
                self.space_launches();
            }
        }

        out
    }

    /// Stamps key output files; keep launches a second apart.
    fn space_launches(&self) {
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}

fn shellexpand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
#[path = "starter_tests.rs"]
mod tests;
