// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook queries feeding the fix-hook / summarize-hook pipeline.
//!
//! The pipeline for a FAILED hook attempt:
//!   FAILED (no suffix) → summarize-hook → `%: <summary>` → fix-hook
//!   claim (`claiming-<ts>`) → running agent → proposal ref or error.
//! Proposal-entry failures stop after the summary — fixes happen on the
//! accepted entry, not on candidate amends.

use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus};
use gai_core::suffix::SuffixKind;

/// `(hook, entry)` pairs ready for a fix-hook launch: FAILED on an
/// accepted entry, summary present (`summarize_complete`), not
/// `!`-prefixed.
pub fn failing_hook_entries_for_fix<'a>(
    hooks: &'a [HookEntry],
    entry_ids: &[EntryId],
) -> Vec<(&'a HookEntry, EntryId)> {
    let mut result = Vec::new();
    for hook in hooks {
        if hook.skip_fix_hook() || hook.status_lines.is_empty() {
            continue;
        }
        for entry in entry_ids {
            if entry.is_proposal() {
                continue;
            }
            let Some(sl) = hook.status_line_for_entry(entry) else {
                continue;
            };
            if sl.status != HookStatus::Failed {
                continue;
            }
            if sl.suffix_kind() != Some(SuffixKind::SummarizeComplete) {
                continue;
            }
            if sl.suffix_value().map(str::is_empty).unwrap_or(true) {
                continue;
            }
            result.push((hook, entry.clone()));
        }
    }
    result
}

/// `(hook, entry)` pairs ready for a summarize-hook launch: FAILED with
/// no suffix yet. Both accepted and proposal entries qualify; accepted
/// entries chain into fix-hook once the summary lands.
pub fn failing_hook_entries_for_summarize<'a>(
    hooks: &'a [HookEntry],
    entry_ids: &[EntryId],
) -> Vec<(&'a HookEntry, EntryId)> {
    let mut result = Vec::new();
    for hook in hooks {
        if hook.status_lines.is_empty() {
            continue;
        }
        for entry in entry_ids {
            let Some(sl) = hook.status_line_for_entry(entry) else {
                continue;
            };
            if sl.status != HookStatus::Failed {
                continue;
            }
            if sl.suffix.is_some() {
                continue;
            }
            result.push((hook, entry.clone()));
        }
    }
    result
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod tests;
