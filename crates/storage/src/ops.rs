// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain-level mutations on project files.
//!
//! Each operation is one lock acquisition: re-read, rewrite the target
//! region, atomic replace, git commit. Callers holding stale snapshots
//! use the merge variants, which re-read structured state under the
//! lock before writing.

use crate::error::StorageError;
use crate::fields::{find_cl_region, replace_block_field, replace_scalar_field, scalar_field_value};
use crate::project_file::ProjectFile;
use crate::serialize;
use gai_core::changespec::CommitEntry;
use gai_core::comment::CommentEntry;
use gai_core::entry::EntryId;
use gai_core::hook::HookEntry;
use gai_core::mentor::MentorEntry;
use gai_core::status::{parse_status_field, render_status_field, ClStatus};
use gai_core::suffix::Suffix;
use indexmap::IndexMap;

impl ProjectFile {
    /// Transition a CL's STATUS. With `validate`, the edge must exist in
    /// the status machine; lifecycle ops pass `false`. Returns the old
    /// base status. Any READY-TO-MAIL suffix is dropped by a transition.
    pub fn transition_status(
        &self,
        name: &str,
        to: &ClStatus,
        validate: bool,
    ) -> Result<ClStatus, StorageError> {
        let message = format!("Update STATUS for {name} to {to}");
        self.mutate_lines(&message, |lines| {
            let current = scalar_field_value(lines, name, "STATUS:")
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
            let (old, _ready) = parse_status_field(&current);
            if validate {
                old.validate_transition(to)?;
            }
            replace_scalar_field(lines, name, "STATUS:", Some(render_status_field(to, false)));
            Ok(old)
        })
    }

    /// Set or clear the READY-TO-MAIL suffix without touching the base
    /// status. Returns false if the flag already had the wanted value.
    pub fn set_ready_to_mail(&self, name: &str, ready: bool) -> Result<bool, StorageError> {
        let message = if ready {
            format!("Mark {name} READY TO MAIL")
        } else {
            format!("Clear READY TO MAIL for {name}")
        };
        self.mutate_lines(&message, |lines| {
            let current = scalar_field_value(lines, name, "STATUS:")
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
            let (status, had) = parse_status_field(&current);
            if had == ready {
                return Ok(false);
            }
            replace_scalar_field(lines, name, "STATUS:", Some(render_status_field(&status, ready)));
            Ok(true)
        })
    }

    /// Set or clear the CL url field.
    pub fn set_cl_field(&self, name: &str, cl: Option<&str>) -> Result<(), StorageError> {
        let message = match cl {
            Some(url) => format!("Set CL for {name} to {url}"),
            None => format!("Reset CL for {name}"),
        };
        self.mutate_lines(&message, |lines| {
            if !replace_scalar_field(lines, name, "CL:", cl.map(str::to_string)) {
                return Err(StorageError::ChangeSpecNotFound { name: name.to_string() });
            }
            Ok(())
        })
    }

    /// Rewrite the NAME field of one CL (lifecycle renames).
    pub fn rename_changespec(&self, old: &str, new: &str) -> Result<(), StorageError> {
        let message = format!("Rename ChangeSpec {old} to {new}");
        self.mutate_lines(&message, |lines| {
            let region = find_cl_region(lines, old)
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: old.to_string() })?;
            lines[region.start] = format!("NAME: {new}");
            Ok(())
        })
    }

    /// Point every `PARENT: old` at `new`.
    pub fn update_parent_references(&self, old: &str, new: &str) -> Result<usize, StorageError> {
        let message = format!("Update PARENT references {old} -> {new}");
        self.mutate_lines(&message, |lines| {
            let mut updated = 0;
            for line in lines.iter_mut() {
                if line.trim_end().strip_prefix("PARENT:").map(str::trim) == Some(old) {
                    *line = format!("PARENT: {new}");
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    /// Overwrite the HOOKS field of one CL.
    pub fn update_hooks_field(&self, name: &str, hooks: &[HookEntry]) -> Result<(), StorageError> {
        let message = format!("Update HOOKS for {name}");
        self.mutate_lines(&message, |lines| {
            if !replace_block_field(lines, name, "HOOKS:", serialize::hooks_field_lines(hooks)) {
                return Err(StorageError::ChangeSpecNotFound { name: name.to_string() });
            }
            Ok(())
        })
    }

    /// Merge hook updates with current disk state.
    ///
    /// A caller that started from a stale snapshot passes only the hooks
    /// it modified, keyed by command. Hooks added concurrently by other
    /// writers are preserved untouched.
    pub fn merge_hook_updates(
        &self,
        name: &str,
        updates: &IndexMap<String, HookEntry>,
    ) -> Result<(), StorageError> {
        let message = format!("Update HOOKS for {name}");
        self.mutate_with_model(&message, |model, lines| {
            let current = model
                .changespec(name)
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
            let merged: Vec<HookEntry> = current
                .hooks
                .iter()
                .map(|hook| updates.get(&hook.command).cloned().unwrap_or_else(|| hook.clone()))
                .collect();
            replace_block_field(lines, name, "HOOKS:", serialize::hooks_field_lines(&merged));
            Ok(())
        })
    }

    /// Append a hook if its command is not already present (idempotent).
    pub fn add_hook(&self, name: &str, command: &str) -> Result<bool, StorageError> {
        let message = format!("Add hook to {name}");
        self.mutate_with_model(&message, |model, lines| {
            let current = model
                .changespec(name)
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
            if current.hooks.iter().any(|h| h.command == command) {
                return Ok(false);
            }
            let mut hooks = current.hooks.clone();
            hooks.push(HookEntry::new(command));
            replace_block_field(lines, name, "HOOKS:", serialize::hooks_field_lines(&hooks));
            Ok(true)
        })
    }

    /// Overwrite the COMMENTS field of one CL.
    pub fn update_comments_field(
        &self,
        name: &str,
        comments: &[CommentEntry],
    ) -> Result<(), StorageError> {
        let message = format!("Update COMMENTS for {name}");
        self.mutate_lines(&message, |lines| {
            if !replace_block_field(
                lines,
                name,
                "COMMENTS:",
                serialize::comments_field_lines(comments),
            ) {
                return Err(StorageError::ChangeSpecNotFound { name: name.to_string() });
            }
            Ok(())
        })
    }

    /// Overwrite the MENTORS field of one CL.
    pub fn update_mentors_field(
        &self,
        name: &str,
        mentors: &[MentorEntry],
    ) -> Result<(), StorageError> {
        let message = format!("Update MENTORS for {name}");
        self.mutate_lines(&message, |lines| {
            if !replace_block_field(
                lines,
                name,
                "MENTORS:",
                serialize::mentors_field_lines(mentors),
            ) {
                return Err(StorageError::ChangeSpecNotFound { name: name.to_string() });
            }
            Ok(())
        })
    }

    /// Overwrite the HISTORY field of one CL.
    pub fn update_history_field(
        &self,
        name: &str,
        commits: &[CommitEntry],
    ) -> Result<(), StorageError> {
        let message = format!("Update HISTORY for {name}");
        self.mutate_lines(&message, |lines| {
            if !replace_block_field(
                lines,
                name,
                "HISTORY:",
                serialize::history_field_lines(commits),
            ) {
                return Err(StorageError::ChangeSpecNotFound { name: name.to_string() });
            }
            Ok(())
        })
    }

    /// Rewrite the HISTORY field through a closure over fresh state.
    pub fn rewrite_history(
        &self,
        name: &str,
        message: &str,
        f: impl FnOnce(Vec<CommitEntry>) -> Vec<CommitEntry>,
    ) -> Result<(), StorageError> {
        self.mutate_with_model(message, |model, lines| {
            let current = model
                .changespec(name)
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
            let commits = f(current.commits.clone());
            replace_block_field(lines, name, "HISTORY:", serialize::history_field_lines(&commits));
            Ok(())
        })
    }

    /// Set or remove the suffix of one HISTORY entry.
    pub fn update_commit_entry_suffix(
        &self,
        name: &str,
        entry: &EntryId,
        suffix: Option<Suffix>,
    ) -> Result<bool, StorageError> {
        let message = format!("Update HISTORY ({entry}) suffix for {name}");
        let entry = entry.clone();
        self.mutate_with_model(&message, |model, lines| {
            let current = model
                .changespec(name)
                .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
            let mut commits = current.commits.clone();
            let Some(target) = commits.iter_mut().find(|e| e.id == entry) else {
                return Ok(false);
            };
            target.suffix = suffix;
            replace_block_field(lines, name, "HISTORY:", serialize::history_field_lines(&commits));
            Ok(true)
        })
    }

    /// Append a commit entry (accepted or proposal) to HISTORY.
    pub fn add_commit_entry(&self, name: &str, entry: CommitEntry) -> Result<(), StorageError> {
        let id = entry.id.clone();
        self.rewrite_history(name, &format!("Add HISTORY ({id}) to {name}"), move |mut commits| {
            commits.push(entry);
            commits
        })
    }

    /// Raw serialized text of one CL block (viewer support).
    pub fn raw_changespec_text(&self, name: &str) -> Result<String, StorageError> {
        let project = self.read()?;
        let cs = project
            .changespec(name)
            .ok_or_else(|| StorageError::ChangeSpecNotFound { name: name.to_string() })?;
        Ok(serialize::changespec_lines(cs).join("\n"))
    }

    /// Re-parse hook state for one CL under the shared lock. Used by
    /// engines that need fresh hook rows mid-tick.
    pub fn read_hooks(&self, name: &str) -> Result<Vec<HookEntry>, StorageError> {
        Ok(self.read_changespec(name)?.hooks)
    }
}

/// Eligible rebase parents in one project: every other CL whose status
/// allows new children.
pub fn eligible_parents(
    project: &gai_core::project::ProjectSpec,
    exclude: &str,
) -> Vec<(String, ClStatus)> {
    project
        .changespecs
        .iter()
        .filter(|cs| cs.name != exclude && cs.status.is_eligible_parent())
        .map(|cs| (cs.name.clone(), cs.status.clone()))
        .collect()
}

/// Parse helper re-export for engines that need line-level access.
pub use crate::parse::parse_project as parse_project_content;

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
