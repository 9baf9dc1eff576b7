// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detecting running workflows and their completion.

use gai_core::changespec::ChangeSpec;
use gai_core::entry::EntryId;
use gai_core::suffix::{extract_agent_kind, extract_stamp_from_agent_suffix, SuffixKind};
use gai_storage::paths::{safe_filename, GaiDir};
use std::path::PathBuf;

/// Line an agent runner writes to its output file when finished:
/// `===WORKFLOW_COMPLETE=== [PROPOSAL: <id>] EXIT_CODE: <n>`
pub const WORKFLOW_COMPLETE_MARKER: &str = "===WORKFLOW_COMPLETE===";

/// Output file for one workflow run:
/// `<workflows>/<safe_cl_name>_<type>-<ts>.txt`.
pub fn workflow_output_path(gai: &GaiDir, cl_name: &str, kind: &str, stamp: &str) -> PathBuf {
    let safe = safe_filename(cl_name);
    gai.workflows_dir().join(format!("{safe}_{kind}-{stamp}.txt"))
}

/// Parse an output file for the completion marker. Returns
/// `(proposal_id, exit_code)` once present; the last marker wins.
pub fn check_workflow_completion(path: &std::path::Path) -> Option<(Option<EntryId>, i32)> {
    let content = std::fs::read_to_string(path).ok()?;
    let marker_pos = content.rfind(WORKFLOW_COMPLETE_MARKER)?;
    let after = content[marker_pos + WORKFLOW_COMPLETE_MARKER.len()..].trim();

    let mut proposal: Option<EntryId> = None;
    let mut exit_code: i32 = 1;
    let mut tokens = after.split_whitespace();
    while let Some(token) = tokens.next() {
        match token {
            "PROPOSAL:" => {
                proposal = tokens.next().and_then(|t| t.parse().ok());
            }
            "EXIT_CODE:" => {
                exit_code = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(1);
            }
            _ => break,
        }
    }
    Some((proposal, exit_code))
}

/// Running CRS workflows: `(reviewer, stamp)` for comment rows owned by
/// a crs agent.
pub fn running_crs_workflows(cs: &ChangeSpec) -> Vec<(String, String)> {
    cs.comments
        .iter()
        .filter(|c| c.suffix_kind() == Some(SuffixKind::RunningAgent))
        .filter_map(|c| {
            let value = c.suffix_value()?;
            if extract_agent_kind(value)? != "crs" {
                return None;
            }
            Some((c.reviewer.clone(), extract_stamp_from_agent_suffix(value)?))
        })
        .collect()
}

/// Running fix-hook workflows: `(hook command, stamp, entry, summary)`.
pub fn running_fix_hook_workflows(cs: &ChangeSpec) -> Vec<(String, String, EntryId, Option<String>)> {
    hook_agent_rows(cs, "fix_hook")
}

/// Running summarize-hook workflows: `(hook command, stamp, entry, _)`.
pub fn running_summarize_hook_workflows(
    cs: &ChangeSpec,
) -> Vec<(String, String, EntryId, Option<String>)> {
    hook_agent_rows(cs, "summarize_hook")
}

fn hook_agent_rows(cs: &ChangeSpec, kind: &str) -> Vec<(String, String, EntryId, Option<String>)> {
    let mut rows = Vec::new();
    for hook in &cs.hooks {
        for sl in &hook.status_lines {
            if sl.suffix_kind() != Some(SuffixKind::RunningAgent) {
                continue;
            }
            let Some(value) = sl.suffix_value() else {
                continue;
            };
            if extract_agent_kind(value).as_deref() != Some(kind) {
                continue;
            }
            let Some(stamp) = extract_stamp_from_agent_suffix(value) else {
                continue;
            };
            let summary = sl.suffix.as_ref().and_then(|s| s.summary.clone());
            rows.push((hook.command.clone(), stamp, sl.entry.clone(), summary));
        }
    }
    rows
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
