// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suffix transforms the slow loop applies each cycle.
//!
//! Old entries lose their attention markers, terminal CLs are swept
//! clean, and the READY-TO-MAIL suffix is kept consistent with the
//! gates that justify it.

use crate::engine::Engine;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::status::ClStatus;
use gai_core::suffix::{Suffix, SuffixKind};
use gai_core::{all_hooks_passed_for_entries, has_any_error_suffix, is_parent_ready_for_mail};
use indexmap::IndexMap;

impl<C: Clock> Engine<C> {
    /// Remove error suffixes from old proposals (proposals whose base
    /// number is below the latest accepted entry).
    pub fn transform_old_proposal_suffixes(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let Some(last_accepted) = cs.last_accepted_number() else {
            return updates;
        };
        let pf = self.project_file(&cs.file_path);

        for entry in &cs.commits {
            if entry.is_proposal()
                && entry.id.number < last_accepted
                && entry.suffix_kind() == Some(SuffixKind::Error)
            {
                match pf.update_commit_entry_suffix(&cs.name, &entry.id, None) {
                    Ok(true) => {
                        updates.push(format!("Cleared suffix from old proposal ({})", entry.id))
                    }
                    Ok(false) => {}
                    Err(err) => tracing::warn!(cl = %cs.name, %err, "suffix clear failed"),
                }
            }
        }
        updates
    }

    /// Strip error markers from hook lines on entries older than the
    /// latest accepted one (`!: msg` becomes plain `msg`). Visual noise
    /// reduction only — the text stays.
    pub fn strip_old_entry_error_markers(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let Some(last_accepted) = cs.last_accepted_number() else {
            return updates;
        };
        if cs.hooks.is_empty() {
            return updates;
        }
        let pf = self.project_file(&cs.file_path);
        let mut modified: IndexMap<String, gai_core::HookEntry> = IndexMap::new();

        for hook in &cs.hooks {
            let mut updated = hook.clone();
            let mut touched = false;
            for sl in updated.status_lines.iter_mut() {
                if sl.entry.number < last_accepted
                    && sl.suffix_kind() == Some(SuffixKind::Error)
                {
                    let value = sl.suffix_value().unwrap_or_default().to_string();
                    updates.push(format!(
                        "Stripped error marker from HOOK '{}' ({}): {}",
                        hook.command, sl.entry, value
                    ));
                    let summary = sl.suffix.as_ref().and_then(|s| s.summary.clone());
                    sl.suffix = Some(Suffix::with_summary(SuffixKind::Plain, value, summary));
                    touched = true;
                }
            }
            if touched {
                modified.insert(updated.command.clone(), updated);
            }
        }

        if !modified.is_empty() {
            if let Err(err) = pf.merge_hook_updates(&cs.name, &modified) {
                tracing::warn!(cl = %cs.name, %err, "marker strip failed");
                return Vec::new();
            }
        }
        updates
    }

    /// Terminal-status cleanup for Reverted/Submitted CLs: attention
    /// markers are acknowledged across HISTORY, HOOKS, and COMMENTS.
    /// Idempotent — a second pass finds nothing to do.
    pub fn acknowledge_terminal_status_markers(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        if !matches!(cs.status, ClStatus::Reverted | ClStatus::Submitted) {
            return updates;
        }
        let pf = self.project_file(&cs.file_path);

        // HISTORY: error and running-agent suffixes are removed.
        for entry in &cs.commits {
            if matches!(
                entry.suffix_kind(),
                Some(SuffixKind::Error) | Some(SuffixKind::RunningAgent)
            ) {
                let value = entry.suffix.as_ref().map(|s| s.value.clone()).unwrap_or_default();
                match pf.update_commit_entry_suffix(&cs.name, &entry.id, None) {
                    Ok(true) => {
                        updates.push(format!("Cleared HISTORY ({}) suffix: {value}", entry.id))
                    }
                    Ok(false) => {}
                    Err(err) => tracing::warn!(cl = %cs.name, %err, "history cleanup failed"),
                }
            }
        }

        // HOOKS: errors become plain, running agents become killed.
        let mut modified: IndexMap<String, gai_core::HookEntry> = IndexMap::new();
        for hook in &cs.hooks {
            let mut updated = hook.clone();
            let mut touched = false;
            for sl in updated.status_lines.iter_mut() {
                match sl.suffix_kind() {
                    Some(SuffixKind::RunningAgent) => {
                        let value = sl.suffix_value().unwrap_or_default().to_string();
                        updates.push(format!(
                            "Converted HOOK '{}' ({}) to killed_agent: {value}",
                            hook.command, sl.entry
                        ));
                        sl.suffix = Some(Suffix::new(SuffixKind::KilledAgent, value));
                        touched = true;
                    }
                    Some(SuffixKind::Error) => {
                        let value = sl.suffix_value().unwrap_or_default().to_string();
                        if !value.is_empty() {
                            updates.push(format!(
                                "Stripped error marker from HOOK '{}' ({}): {value}",
                                hook.command, sl.entry
                            ));
                            let summary = sl.suffix.as_ref().and_then(|s| s.summary.clone());
                            sl.suffix =
                                Some(Suffix::with_summary(SuffixKind::Plain, value, summary));
                            touched = true;
                        }
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
                tracing::warn!(cl = %cs.name, %err, "terminal hook cleanup failed");
            }
        }

        // COMMENTS: error and running-agent suffixes are cleared.
        let mut comments = cs.comments.clone();
        let mut comment_updates = Vec::new();
        for comment in comments.iter_mut() {
            if matches!(
                comment.suffix_kind(),
                Some(SuffixKind::Error) | Some(SuffixKind::RunningAgent)
            ) {
                comment_updates.push(format!(
                    "Cleared COMMENT [{}] suffix: {}",
                    comment.reviewer,
                    comment.suffix_value().unwrap_or_default()
                ));
                comment.suffix = None;
            }
        }
        if !comment_updates.is_empty() {
            match pf.update_comments_field(&cs.name, &comments) {
                Ok(()) => updates.extend(comment_updates),
                Err(err) => tracing::warn!(cl = %cs.name, %err, "comment cleanup failed"),
            }
        }

        updates
    }

    /// Keep the READY-TO-MAIL suffix consistent with its gates:
    /// Drafted base status, no error suffixes, parent ready, all hooks
    /// PASSED for the live entry and its proposals.
    pub fn check_ready_to_mail(&self, cs: &ChangeSpec, all: &[ChangeSpec]) -> Vec<String> {
        let mut updates = Vec::new();
        if cs.status != ClStatus::Drafted {
            return updates;
        }

        let has_errors = has_any_error_suffix(cs);
        let parent_ready = is_parent_ready_for_mail(cs, all);
        let entry_ids = cs.current_and_proposal_entry_ids();
        let hooks_passed =
            !entry_ids.is_empty() && all_hooks_passed_for_entries(cs, &entry_ids);
        let conditions_met = !has_errors && parent_ready && hooks_passed;

        let pf = self.project_file(&cs.file_path);
        if conditions_met && !cs.ready_to_mail {
            match pf.set_ready_to_mail(&cs.name, true) {
                Ok(true) => updates.push("Added READY TO MAIL suffix".to_string()),
                Ok(false) => {}
                Err(err) => tracing::warn!(cl = %cs.name, %err, "ready-to-mail set failed"),
            }
        } else if !conditions_met && cs.ready_to_mail {
            let reason = if has_errors {
                "error suffix appeared"
            } else if !parent_ready {
                "parent no longer ready"
            } else {
                "hooks not all passed"
            };
            match pf.set_ready_to_mail(&cs.name, false) {
                Ok(true) => updates.push(format!("Removed READY TO MAIL suffix ({reason})")),
                Ok(false) => {}
                Err(err) => tracing::warn!(cl = %cs.name, %err, "ready-to-mail clear failed"),
            }
        }
        updates
    }
}

#[cfg(test)]
#[path = "transforms_tests.rs"]
mod tests;
