// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ChangeSpec aggregate: one CL and everything attached to it.
//!
//! A ChangeSpec is a read-mostly snapshot of one CL's block in its
//! project file. Mutations never happen on the snapshot — they go back
//! through `gai-storage` under the file lock.

use crate::comment::CommentEntry;
use crate::entry::EntryId;
use crate::hook::{HookEntry, HookStatus};
use crate::mentor::MentorEntry;
use crate::status::ClStatus;
use crate::suffix::{Suffix, SuffixKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A commit entry in the HISTORY field: an accepted amend or a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub id: EntryId,
    pub note: String,
    pub diff: Option<String>,
    pub suffix: Option<Suffix>,
}

impl CommitEntry {
    pub fn accepted(number: u32, note: impl Into<String>) -> Self {
        Self { id: EntryId::accepted(number), note: note.into(), diff: None, suffix: None }
    }

    pub fn is_proposal(&self) -> bool {
        self.id.is_proposal()
    }

    pub fn suffix_kind(&self) -> Option<SuffixKind> {
        self.suffix.as_ref().map(|s| s.kind)
    }

    pub fn is_broken_proposal(&self) -> bool {
        matches!(&self.suffix, Some(s) if s.value == "BROKEN PROPOSAL")
    }
}

/// One CL: the unit the scheduler iterates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSpec {
    pub name: String,
    pub description: String,
    pub kickstart: Option<String>,
    pub cl: Option<String>,
    pub bug: Option<String>,
    pub parent: Option<String>,
    pub status: ClStatus,
    pub ready_to_mail: bool,
    pub test_targets: Vec<TestTarget>,
    pub commits: Vec<CommitEntry>,
    pub hooks: Vec<HookEntry>,
    pub comments: Vec<CommentEntry>,
    pub mentors: Vec<MentorEntry>,
    /// Path of the project file this CL was read from.
    pub file_path: PathBuf,
}

/// A test target line, optionally tagged `(FAILED)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTarget {
    pub target: String,
    pub failed: bool,
}

impl ChangeSpec {
    /// Basename of the owning project (`<project>.gp` → `<project>`).
    pub fn project_basename(&self) -> String {
        self.file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Highest accepted (non-proposal) entry number, if any.
    pub fn last_accepted_number(&self) -> Option<u32> {
        self.commits.iter().filter(|e| !e.is_proposal()).map(|e| e.id.number).max()
    }

    /// Id of the last HISTORY entry in file order.
    pub fn last_entry_id(&self) -> Option<EntryId> {
        self.commits.last().map(|e| e.id.clone())
    }

    /// The live entry ids: the highest accepted entry plus its proposals.
    ///
    /// With HISTORY (1), (2), (3), (3a) this returns ["3", "3a"]; older
    /// entries are historical and the loop leaves them alone.
    pub fn current_and_proposal_entry_ids(&self) -> Vec<EntryId> {
        let Some(current) = self.last_accepted_number() else {
            return Vec::new();
        };
        let mut ids = vec![EntryId::accepted(current)];
        for entry in &self.commits {
            if entry.id.number == current && entry.is_proposal() {
                ids.push(entry.id.clone());
            }
        }
        ids
    }

    pub fn entry_by_id(&self, id: &EntryId) -> Option<&CommitEntry> {
        self.commits.iter().find(|e| &e.id == id)
    }

    pub fn hook_by_command(&self, command: &str) -> Option<&HookEntry> {
        self.hooks.iter().find(|h| h.command == command)
    }

    pub fn comment_by_reviewer(&self, reviewer: &str) -> Option<&CommentEntry> {
        self.comments.iter().find(|c| c.reviewer == reviewer)
    }

    pub fn mentor_entry_for(&self, id: &EntryId) -> Option<&MentorEntry> {
        self.mentors.iter().find(|m| &m.entry == id)
    }

    /// Runners this CL currently holds: running-process hook lines plus
    /// running-agent lines across hooks, comments, and mentors.
    pub fn count_runners(&self) -> usize {
        let hook_runners = self
            .hooks
            .iter()
            .flat_map(|h| &h.status_lines)
            .filter(|sl| {
                matches!(
                    sl.suffix_kind(),
                    Some(SuffixKind::RunningProcess) | Some(SuffixKind::RunningAgent)
                )
            })
            .count();
        let comment_runners = self
            .comments
            .iter()
            .filter(|c| c.suffix_kind() == Some(SuffixKind::RunningAgent))
            .count();
        let mentor_runners = self
            .mentors
            .iter()
            .flat_map(|m| &m.status_lines)
            .filter(|sl| sl.suffix_kind() == Some(SuffixKind::RunningAgent))
            .count();
        hook_runners + comment_runners + mentor_runners
    }
}

/// Whether any error-suffix attention marker exists anywhere on this CL.
pub fn has_any_error_suffix(cs: &ChangeSpec) -> bool {
    let history = cs.commits.iter().any(|e| e.suffix_kind() == Some(SuffixKind::Error));
    let hooks = cs
        .hooks
        .iter()
        .flat_map(|h| &h.status_lines)
        .any(|sl| sl.suffix_kind() == Some(SuffixKind::Error));
    let comments = cs.comments.iter().any(|c| c.suffix_kind() == Some(SuffixKind::Error));
    history || hooks || comments
}

/// Whether the parent gate for mailing holds: no parent, parent missing
/// (deleted — proceed), or parent Submitted/Mailed.
pub fn is_parent_ready_for_mail(cs: &ChangeSpec, all: &[ChangeSpec]) -> bool {
    let Some(parent_name) = &cs.parent else {
        return true;
    };
    match all.iter().find(|other| &other.name == parent_name) {
        Some(parent) => matches!(parent.status, ClStatus::Submitted | ClStatus::Mailed),
        None => true,
    }
}

/// Whether every hook has PASSED for every given entry id.
///
/// `$`-prefixed hooks are exempt for proposal ids (they never run there);
/// everything else needs a PASSED line for each id.
pub fn all_hooks_passed_for_entries(cs: &ChangeSpec, entry_ids: &[EntryId]) -> bool {
    for hook in &cs.hooks {
        for id in entry_ids {
            if hook.skip_proposal_runs() && id.is_proposal() {
                continue;
            }
            match hook.status_line_for_entry(id) {
                Some(sl) if sl.status == HookStatus::Passed => {}
                _ => return false,
            }
        }
    }
    true
}

crate::builder! {
    pub struct ChangeSpecBuilder => ChangeSpec {
        into {
            name: String = "test_cl",
            description: String = "Test CL.",
            file_path: PathBuf = "/tmp/test/test.gp",
        }
        set {
            status: ClStatus = ClStatus::Wip,
            ready_to_mail: bool = false,
            test_targets: Vec<TestTarget> = Vec::new(),
            commits: Vec<CommitEntry> = Vec::new(),
            hooks: Vec<HookEntry> = Vec::new(),
            comments: Vec<CommentEntry> = Vec::new(),
            mentors: Vec<MentorEntry> = Vec::new(),
        }
        option {
            kickstart: String = None,
            cl: String = None,
            bug: String = None,
            parent: String = None,
        }
    }
}

#[cfg(test)]
#[path = "changespec_tests.rs"]
mod tests;
