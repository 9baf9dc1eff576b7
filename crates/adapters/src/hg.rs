// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess adapter over the workstation `bb_hg_*` tool belt.

use crate::vcs::{VcsError, VcsProvider, VcsResult};
use std::io::{Read, Seek};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Checkout/update bound; history surgery gets longer.
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(300);
pub const REBASE_TIMEOUT: Duration = Duration::from_secs(600);

const WAIT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct HgProvider;

impl HgProvider {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, workspace: &Path, program: &str, args: &[&str]) -> VcsResult {
        self.run_with_timeout(workspace, program, args, None)
    }

    /// Run a command, capturing combined output to unlinked temp files
    /// (no pipe-buffer deadlock) and killing the process group's leader
    /// past the deadline.
    fn run_with_timeout(
        &self,
        workspace: &Path,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> VcsResult {
        tracing::debug!(program, ?args, workspace = %workspace.display(), "vcs command");
        let io_err = |err: std::io::Error| VcsError::CommandFailed { detail: err.to_string() };
        let mut stdout = tempfile::tempfile().map_err(io_err)?;
        let mut stderr = tempfile::tempfile().map_err(io_err)?;

        let spawned = Command::new(program)
            .args(args)
            .current_dir(workspace)
            .stdout(Stdio::from(stdout.try_clone().map_err(io_err)?))
            .stderr(Stdio::from(stderr.try_clone().map_err(io_err)?))
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(VcsError::NotFound { command: program.to_string() });
            }
            Err(err) => return Err(VcsError::CommandFailed { detail: err.to_string() }),
        };

        let deadline = timeout.map(|t| Instant::now() + t);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(VcsError::Timeout {
                                seconds: timeout.unwrap_or_default().as_secs(),
                            });
                        }
                    }
                    std::thread::sleep(WAIT_POLL);
                }
                Err(err) => return Err(VcsError::CommandFailed { detail: err.to_string() }),
            }
        };

        let mut out = String::new();
        let mut err_out = String::new();
        stdout.rewind().map_err(io_err)?;
        stderr.rewind().map_err(io_err)?;
        stdout.read_to_string(&mut out).map_err(io_err)?;
        stderr.read_to_string(&mut err_out).map_err(io_err)?;

        if status.success() {
            Ok(out)
        } else {
            let detail = if !err_out.trim().is_empty() {
                err_out.trim().to_string()
            } else if !out.trim().is_empty() {
                out.trim().to_string()
            } else {
                "no error output".to_string()
            };
            Err(VcsError::CommandFailed { detail })
        }
    }
}

impl VcsProvider for HgProvider {
    fn checkout(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.run_with_timeout(workspace, "bb_hg_update", &[rev], Some(UPDATE_TIMEOUT))
    }

    fn clean(&self, workspace: &Path) -> VcsResult {
        self.run(workspace, "bb_hg_clean", &[])
    }

    fn apply_patch(&self, workspace: &Path, patch_path: &Path) -> VcsResult {
        self.run(workspace, "hg", &["import", "--no-commit", &patch_path.to_string_lossy()])
    }

    fn apply_diff(&self, workspace: &Path, diff_path: &Path) -> VcsResult {
        self.run(workspace, "hg", &["import", "--no-commit", &diff_path.to_string_lossy()])
    }

    fn amend(&self, workspace: &Path, note: &str) -> VcsResult {
        self.run(workspace, "bb_hg_amend", &[note])
    }

    fn prune(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.run(workspace, "bb_hg_prune", &[rev])
    }

    fn archive(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.run(workspace, "bb_hg_archive", &[rev])
    }

    fn diff_revision(&self, workspace: &Path, rev: &str) -> VcsResult {
        self.run(workspace, "hg", &["diff", "-c", rev])
    }

    fn reword(&self, workspace: &Path, description: &str) -> VcsResult {
        self.run(workspace, "bb_hg_reword", &[description])
    }

    fn reword_add_tag(&self, workspace: &Path, key: &str, value: &str) -> VcsResult {
        let tag = format!("{key}={value}");
        self.run(workspace, "bb_hg_reword", &["--add-tag", &tag])
    }

    fn get_description(&self, workspace: &Path, rev: &str, short: bool) -> VcsResult {
        let template = if short { "{desc|firstline}" } else { "{desc}" };
        self.run(workspace, "hg", &["log", "-r", rev, "-T", template])
    }

    fn get_default_parent_revision(&self, workspace: &Path) -> VcsResult {
        let _ = workspace;
        Ok("p4head".to_string())
    }
}
