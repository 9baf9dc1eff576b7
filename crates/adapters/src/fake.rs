// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fake provider for engine tests.
//!
//! Records every call and returns scripted failures for operations the
//! test arms via `fail_on`.

use crate::vcs::{VcsError, VcsProvider, VcsResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub op: String,
    pub workspace: String,
    pub arg: String,
}

#[derive(Clone, Default)]
pub struct FakeVcs {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing_ops: Arc<Mutex<HashSet<String>>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `op` fail.
    pub fn fail_on(&self, op: &str) {
        self.failing_ops.lock().insert(op.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<RecordedCall> {
        self.calls.lock().iter().filter(|c| c.op == op).cloned().collect()
    }

    fn record(&self, op: &str, workspace: &Path, arg: &str) -> VcsResult {
        self.calls.lock().push(RecordedCall {
            op: op.to_string(),
            workspace: workspace.to_string_lossy().into_owned(),
            arg: arg.to_string(),
        });
        if self.failing_ops.lock().contains(op) {
            Err(VcsError::CommandFailed { detail: format!("{op} scripted to fail") })
        } else {
            Ok(String::new())
        }
    }
}

impl VcsProvider for FakeVcs {
    fn checkout(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.record("checkout", workspace, rev)
    }

    fn clean(&self, workspace: &Path) -> VcsResult {
        self.record("clean", workspace, "")
    }

    fn apply_patch(&self, workspace: &Path, patch_path: &Path) -> VcsResult {
        self.record("apply_patch", workspace, &patch_path.to_string_lossy())
    }

    fn apply_diff(&self, workspace: &Path, diff_path: &Path) -> VcsResult {
        self.record("apply_diff", workspace, &diff_path.to_string_lossy())
    }

    fn amend(&self, workspace: &Path, note: &str) -> VcsResult {
        self.record("amend", workspace, note)
    }

    fn prune(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.record("prune", workspace, rev)
    }

    fn archive(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.record("archive", workspace, rev)
    }

    fn diff_revision(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.record("diff_revision", workspace, rev)?;
        Ok(format!("diff for {rev}\n"))
    }

    fn reword(&self, workspace: &Path, description: &str) -> VcsResult {
        self.record("reword", workspace, description)
    }

    fn reword_add_tag(&self, workspace: &Path, key: &str, value: &str) -> VcsResult {
        self.record("reword_add_tag", workspace, &format!("{key}={value}"))
    }

    fn get_description(&self, workspace: &Path, rev: &str, _short: bool) -> VcsResult {
        self.record("get_description", workspace, rev)?;
        Ok(format!("description of {rev}"))
    }

    fn get_default_parent_revision(&self, workspace: &Path) -> VcsResult {
        self.record("get_default_parent_revision", workspace, "")?;
        Ok("p4head".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn records_calls_and_scripted_failures() {
        let fake = FakeVcs::new();
        let ws = PathBuf::from("/ws/1");
        fake.checkout(&ws, "my_cl").unwrap();
        fake.fail_on("prune");
        assert!(fake.prune(&ws, "my_cl").is_err());

        assert_eq!(fake.calls_for("checkout").len(), 1);
        assert_eq!(fake.calls_for("prune").len(), 1);
        assert_eq!(fake.calls_for("checkout")[0].arg, "my_cl");
    }
}
