// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort git history for the state directory.
//!
//! Every successful project-file mutation produces one commit with a
//! human-readable message. Commit failure is logged but never fails the
//! mutation — git here is an audit trail, not the durability mechanism.

use crate::paths::GaiDir;
use std::path::Path;
use std::process::Command;

const GITIGNORE: &str = "# Lock files\n*.lock\n\n# Temp files from atomic writes\n.tmp_*\n";

/// Initialize `<root>/.git` with a `.gitignore` if absent.
pub fn ensure_repo(gai: &GaiDir) -> std::io::Result<()> {
    let git_dir = gai.root().join(".git");
    if git_dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(gai.root())?;
    let init = Command::new("git").arg("init").current_dir(gai.root()).output()?;
    if !init.status.success() {
        tracing::warn!(
            root = %gai.root().display(),
            stderr = %String::from_utf8_lossy(&init.stderr),
            "git init failed"
        );
        return Ok(());
    }
    std::fs::write(gai.root().join(".gitignore"), GITIGNORE)?;
    Ok(())
}

/// Stage `file` and commit with `message`. Only files inside the state
/// root are committed; everything here is best-effort.
pub fn commit_file(gai: &GaiDir, file: &Path, message: &str) {
    let Ok(canonical_root) = gai.root().canonicalize() else {
        return;
    };
    let Ok(canonical_file) = file.canonicalize() else {
        return;
    };
    if !canonical_file.starts_with(&canonical_root) {
        return;
    }

    if let Err(err) = ensure_repo(gai) {
        tracing::warn!(error = %err, "could not ensure git repo for state dir");
        return;
    }

    let add = Command::new("git")
        .arg("add")
        .arg(&canonical_file)
        .current_dir(gai.root())
        .output();
    if let Err(err) = add {
        tracing::warn!(error = %err, "git add failed");
        return;
    }

    // "Nothing to commit" is an expected outcome, not an error.
    let commit = Command::new("git")
        .args(["commit", "-m", message, "--"])
        .arg(&canonical_file)
        .current_dir(gai.root())
        .output();
    match commit {
        Ok(output) if !output.status.success() => {
            tracing::debug!(
                message,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "git commit was a no-op or failed"
            );
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "git commit failed to spawn"),
    }
}

#[cfg(test)]
#[path = "git_mirror_tests.rs"]
mod tests;
