// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background checks: CL submission and critique comments.
//!
//! Checks are spawned by the slow cycle as detached subprocesses
//! wrapped to emit `===CHECK_COMPLETE=== EXIT_CODE: <n>`; results are
//! polled by the fast cycle. Pending state lives entirely in the
//! checks directory — a marker-less output file IS the pending check.

use crate::engine::Engine;
use crate::sync_cache;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::comment::{CommentEntry, REVIEWER_CRITIQUE, REVIEWER_CRITIQUE_ME};
use gai_core::status::ClStatus;
use gai_core::suffix::SuffixKind;
use gai_core::timestamps;
use gai_storage::paths::safe_filename;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Line the check wrapper emits when finished.
pub const CHECK_COMPLETE_MARKER: &str = "===CHECK_COMPLETE=== EXIT_CODE: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    ClSubmitted,
    ReviewerComments,
    AuthorComments,
}

impl CheckType {
    pub fn slug(self) -> &'static str {
        match self {
            CheckType::ClSubmitted => "cl-submitted",
            CheckType::ReviewerComments => "reviewer-comments",
            CheckType::AuthorComments => "author-comments",
        }
    }

    pub const ALL: [CheckType; 3] =
        [CheckType::ClSubmitted, CheckType::ReviewerComments, CheckType::AuthorComments];
}

fn check_output_path(gai: &gai_storage::GaiDir, name: &str, check: CheckType, stamp: &str) -> PathBuf {
    gai.checks_dir().join(format!("{}_{}-{stamp}.txt", safe_filename(name), check.slug()))
}

/// All check output files for one CL and type, pending first.
fn check_files(gai: &gai_storage::GaiDir, name: &str, check: CheckType) -> Vec<PathBuf> {
    let prefix = format!("{}_{}-", safe_filename(name), check.slug());
    let Ok(entries) = std::fs::read_dir(gai.checks_dir()) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|f| f.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn parse_check_completion(path: &std::path::Path) -> Option<(i32, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let pos = content.rfind(CHECK_COMPLETE_MARKER)?;
    let exit: i32 = content[pos + CHECK_COMPLETE_MARKER.len()..]
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some((exit, content[..pos].to_string()))
}

impl<C: Clock> Engine<C> {
    /// Whether a check of this type is already in flight for the CL.
    pub fn has_pending_check(&self, cs: &ChangeSpec, check: CheckType) -> bool {
        check_files(&self.gai, &cs.name, check)
            .iter()
            .any(|path| parse_check_completion(path).is_none())
    }

    fn spawn_check(&self, cs: &ChangeSpec, check: CheckType, command: String) -> Option<String> {
        if self.gai.ensure_dir(self.gai.checks_dir()).is_err() {
            return None;
        }
        let stamp = timestamps::now_stamp(&self.clock);
        let output = check_output_path(&self.gai, &cs.name, check, &stamp);

        let script = format!(
            "#!/bin/bash\n( {command} )\nexit_code=$?\necho \"{CHECK_COMPLETE_MARKER}$exit_code\"\nsync\nexit $exit_code\n"
        );
        let wrapper = (|| -> std::io::Result<PathBuf> {
            let mut file = tempfile::Builder::new().suffix(".sh").tempfile()?;
            file.write_all(script.as_bytes())?;
            let (_f, path) = file.keep().map_err(|e| e.error)?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
            Ok(path)
        })();
        let wrapper = match wrapper {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "check wrapper write failed");
                return None;
            }
        };

        let spawned = (|| -> std::io::Result<()> {
            let out = std::fs::File::create(&output)?;
            let err_file = out.try_clone()?;
            Command::new(&wrapper)
                .stdout(Stdio::from(out))
                .stderr(Stdio::from(err_file))
                .process_group(0)
                .spawn()?;
            Ok(())
        })();
        match spawned {
            Ok(()) => Some(format!("{} check -> RUNNING", check.slug())),
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "check spawn failed");
                None
            }
        }
    }

    /// Start the background checks that are due for this CL. Called by
    /// the slow cycle; `bypass_cache` covers the first-cycle leaf rule.
    pub fn start_pending_checks(
        &self,
        cs: &ChangeSpec,
        all: &[ChangeSpec],
        bypass_cache: bool,
    ) -> Vec<String> {
        let mut updates = Vec::new();
        let parent_submitted = parent_is_submitted(cs, all);

        // Submission check: Mailed CLs only, behind the freshness cache.
        let status_check_due = cs.status == ClStatus::Mailed
            && (bypass_cache
                || sync_cache::should_check(
                    &self.gai,
                    &self.clock,
                    &cs.name,
                    self.config.interval.as_secs(),
                ));
        if status_check_due && parent_submitted && cs.cl.is_some() {
            if !self.has_pending_check(cs, CheckType::ClSubmitted) {
                sync_cache::update_last_checked(&self.gai, &self.clock, &cs.name);
                let cl = cs.cl.clone().unwrap_or_default();
                let command = format!("{} {cl}", self.config.checks.is_cl_submitted);
                if let Some(update) = self.spawn_check(cs, CheckType::ClSubmitted, command) {
                    updates.push(update);
                }
            }

            // Reviewer comments: only once mailed with a submitted parent.
            if !self.has_pending_check(cs, CheckType::ReviewerComments)
                && comment_check_due(cs, REVIEWER_CRITIQUE)
            {
                let command =
                    format!("{} {}", self.config.checks.critique_comments, cs.name);
                if let Some(update) = self.spawn_check(cs, CheckType::ReviewerComments, command) {
                    updates.push(update);
                }
            }
        }

        // Author comments: Drafted/Mailed, and only while no reviewer
        // comment artifact exists.
        if matches!(cs.status, ClStatus::Drafted | ClStatus::Mailed)
            && cs.comment_by_reviewer(REVIEWER_CRITIQUE).is_none()
            && !self.has_pending_check(cs, CheckType::AuthorComments)
            && comment_check_due(cs, REVIEWER_CRITIQUE_ME)
        {
            let command = format!("{} --me {}", self.config.checks.critique_comments, cs.name);
            if let Some(update) = self.spawn_check(cs, CheckType::AuthorComments, command) {
                updates.push(update);
            }
        }

        updates
    }

    /// Poll completed checks and apply their results. Called by the
    /// fast cycle.
    pub fn check_pending_checks(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        for check in CheckType::ALL {
            for path in check_files(&self.gai, &cs.name, check) {
                let Some((exit_code, payload)) = parse_check_completion(&path) else {
                    continue;
                };
                match check {
                    CheckType::ClSubmitted => {
                        if exit_code == 0 && payload.contains("SUBMITTED") {
                            let pf = self.project_file(&cs.file_path);
                            match pf.transition_status(&cs.name, &ClStatus::Submitted, false) {
                                Ok(old) => {
                                    sync_cache::clear_entry(&self.gai, &cs.name);
                                    updates.push(format!("Status changed {old} -> Submitted"));
                                }
                                Err(err) => {
                                    tracing::warn!(cl = %cs.name, %err, "submit transition failed")
                                }
                            }
                        }
                    }
                    CheckType::ReviewerComments => {
                        updates.extend(self.apply_comment_artifact(
                            cs,
                            REVIEWER_CRITIQUE,
                            exit_code,
                            &payload,
                        ));
                    }
                    CheckType::AuthorComments => {
                        updates.extend(self.apply_comment_artifact(
                            cs,
                            REVIEWER_CRITIQUE_ME,
                            exit_code,
                            &payload,
                        ));
                    }
                }
                let _ = std::fs::remove_file(&path);
            }
        }
        updates
    }

    /// Record the comment artifact a check produced. The payload's last
    /// non-empty line is the JSON artifact path; an empty payload means
    /// no comments were found.
    fn apply_comment_artifact(
        &self,
        cs: &ChangeSpec,
        reviewer: &str,
        exit_code: i32,
        payload: &str,
    ) -> Vec<String> {
        if exit_code != 0 {
            return Vec::new();
        }
        let Some(artifact) = payload.lines().rev().map(str::trim).find(|l| !l.is_empty())
        else {
            return Vec::new();
        };

        let pf = self.project_file(&cs.file_path);
        let Ok(current) = pf.read_changespec(&cs.name) else {
            return Vec::new();
        };
        let mut comments = current.comments.clone();
        match comments.iter_mut().find(|c| c.reviewer == reviewer) {
            Some(existing) => {
                existing.file_path = artifact.to_string();
                existing.suffix = None;
            }
            None => comments.push(CommentEntry::new(reviewer, artifact)),
        }
        match pf.update_comments_field(&cs.name, &comments) {
            Ok(()) => vec![format!("Comments found for [{reviewer}]: {artifact}")],
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "comment artifact write failed");
                Vec::new()
            }
        }
    }
}

/// Comment checks restart when no row exists, or when the existing row
/// carries an error suffix (a previous responder failed).
fn comment_check_due(cs: &ChangeSpec, reviewer: &str) -> bool {
    match cs.comment_by_reviewer(reviewer) {
        None => true,
        Some(entry) => entry.suffix_kind() == Some(SuffixKind::Error),
    }
}

/// Whether the CL's parent gate for submission checks holds: no parent,
/// a Submitted parent, or a parent that no longer exists.
pub fn parent_is_submitted(cs: &ChangeSpec, all: &[ChangeSpec]) -> bool {
    let Some(parent) = &cs.parent else {
        return true;
    };
    match all.iter().find(|other| &other.name == parent) {
        Some(parent) => parent.status == ClStatus::Submitted,
        None => true,
    }
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
