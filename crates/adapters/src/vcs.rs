// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The VcsProvider capability.
//!
//! Every operation runs against one workspace directory and returns
//! `Ok(detail)` or a [`VcsError`] carrying the tool output. Failures
//! are never fatal to the engine: callers log, release the workspace,
//! annotate the relevant status line, and continue.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("vcs command failed: {detail}")]
    CommandFailed { detail: String },
    #[error("vcs command timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("vcs command not found: {command}")]
    NotFound { command: String },
}

pub type VcsResult = Result<String, VcsError>;

/// Capability object over one VCS checkout.
///
/// `workspace` is the checkout directory the operation runs in; the
/// engine resolves it from the lease registry before calling.
pub trait VcsProvider: Send + Sync {
    /// Update the checkout to a revision (branch name, bookmark, or the
    /// provider's default parent).
    fn checkout(&self, workspace: &Path, rev: &str) -> VcsResult;

    /// Drop uncommitted changes, leaving a clean working copy.
    fn clean(&self, workspace: &Path) -> VcsResult;

    /// Apply a patch file without committing.
    fn apply_patch(&self, workspace: &Path, patch_path: &Path) -> VcsResult;

    /// Apply a diff file without committing (proposal import).
    fn apply_diff(&self, workspace: &Path, diff_path: &Path) -> VcsResult;

    /// Fold the working copy into the current commit with a new note.
    fn amend(&self, workspace: &Path, note: &str) -> VcsResult;

    /// Remove a revision entirely.
    fn prune(&self, workspace: &Path, rev: &str) -> VcsResult;

    /// Archive a revision (kept but hidden).
    fn archive(&self, workspace: &Path, rev: &str) -> VcsResult;

    /// Diff of one revision against its parent.
    fn diff_revision(&self, workspace: &Path, rev: &str) -> VcsResult;

    /// Rewrite the current commit description.
    fn reword(&self, workspace: &Path, description: &str) -> VcsResult;

    /// Append a `Key: value` tag to the current commit description.
    fn reword_add_tag(&self, workspace: &Path, key: &str, value: &str) -> VcsResult;

    /// Commit description of a revision.
    fn get_description(&self, workspace: &Path, rev: &str, short: bool) -> VcsResult;

    /// Revision new CLs branch from when no parent is set.
    fn get_default_parent_revision(&self, workspace: &Path) -> VcsResult;

    /// Normalize a description before rewording (strip tool tags etc.).
    fn prepare_description_for_reword(&self, text: &str) -> String {
        text.trim_end().to_string()
    }
}
