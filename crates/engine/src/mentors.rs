// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mentor rounds: configured reviewer profiles invited onto each
//! accepted commit entry once its hooks have settled.
//!
//! A mentor's lifecycle: a STARTING row is registered before the
//! subprocess exists (the row is what stops concurrent ticks from
//! double-launching), the runner is spawned detached, the row becomes
//! RUNNING with the agent token, and the runner itself reports PASSED/
//! FAILED through `set_mentor_status`. The loop only supervises
//! zombies.

use crate::engine::Engine;
use crate::process::try_kill_process_group;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::hook::HookStatus;
use gai_core::mentor::{MentorEntry, MentorProfileRef, MentorStatus, MentorStatusLine};
use gai_core::project::{PoolKind, WorkspaceClaim};
use gai_core::suffix::{extract_pid_from_agent_suffix, Suffix, SuffixKind};
use gai_core::timestamps;
use gai_storage::{GaiDir, ProjectFile, StorageError};
use regex::Regex;
use serde::Deserialize;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

/// One configured mentor profile.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MentorProfile {
    pub name: String,
    pub mentors: Vec<String>,
    /// Profiles with this flag may start while the CL is still WIP.
    #[serde(default)]
    pub run_on_wip: bool,
    /// Glob-ish filters over changed file paths; empty matches all.
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentorConfig {
    #[serde(default, rename = "profile")]
    pub profiles: Vec<MentorProfile>,
}

impl MentorConfig {
    /// Load from `<gai>/mentors.toml`; a missing or invalid file means
    /// no mentors are configured.
    pub fn load(gai: &GaiDir) -> Self {
        let Ok(content) = std::fs::read_to_string(gai.mentors_config()) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "mentors.toml is invalid; ignoring");
                Self::default()
            }
        }
    }
}

impl MentorProfile {
    /// Whether the profile applies to a commit, judged by its diff's
    /// changed files. No patterns means the profile always applies.
    pub fn matches_changed_files(&self, changed: &[String]) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|pattern| {
            let regex = glob_to_regex(pattern);
            changed.iter().any(|file| regex.as_ref().map(|r| r.is_match(file)).unwrap_or(false))
        })
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// File paths touched by a unified diff (`+++ b/<path>` headers).
pub fn changed_files_from_diff(diff: &str) -> Vec<String> {
    diff.lines()
        .filter_map(|l| l.strip_prefix("+++ "))
        .map(|p| p.strip_prefix("b/").unwrap_or(p).trim().to_string())
        .filter(|p| p != "/dev/null")
        .collect()
}

/// Update one mentor status line in place (used by the mentor runner
/// subprocess when it finishes, and by the zombie sweep).
pub fn set_mentor_status(
    pf: &ProjectFile,
    cl_name: &str,
    entry: &EntryId,
    profile: &str,
    mentor: &str,
    status: MentorStatus,
    duration: Option<String>,
    suffix: Option<Suffix>,
) -> Result<bool, StorageError> {
    let current = pf.read_changespec(cl_name)?;
    let mut mentors = current.mentors.clone();
    let mut found = false;
    for round in mentors.iter_mut() {
        if &round.entry != entry {
            continue;
        }
        for sl in round.status_lines.iter_mut() {
            if sl.profile_name == profile && sl.mentor_name == mentor {
                sl.status = status;
                sl.duration = duration.clone();
                sl.suffix = suffix.clone();
                found = true;
            }
        }
        // Keep the completed/total counts on the header current.
        for profile_ref in round.profiles.iter_mut() {
            let done = round
                .status_lines
                .iter()
                .filter(|sl| {
                    sl.profile_name == profile_ref.name
                        && matches!(sl.status, MentorStatus::Passed | MentorStatus::Failed)
                })
                .count() as u32;
            profile_ref.completed = done;
        }
    }
    if !found {
        return Ok(false);
    }
    pf.update_mentors_field(cl_name, &mentors)?;
    Ok(true)
}

/// Clear `#WIP` flags once a CL has left WIP, letting the remaining
/// profiles join the round.
pub fn clear_mentor_wip_flags(pf: &ProjectFile, cl_name: &str) -> Result<bool, StorageError> {
    let current = pf.read_changespec(cl_name)?;
    if !current.mentors.iter().any(|m| m.is_wip) {
        return Ok(false);
    }
    let mut mentors = current.mentors.clone();
    for round in mentors.iter_mut() {
        round.is_wip = false;
    }
    pf.update_mentors_field(cl_name, &mentors)?;
    Ok(true)
}

impl<C: Clock> Engine<C> {
    /// One mentor pass over a CL: reap zombies, then invite missing
    /// mentors onto the latest accepted entry.
    pub fn check_mentors(&self, cs: &ChangeSpec, runners_started_this_cycle: usize) -> (Vec<String>, usize) {
        let mut updates = Vec::new();
        let mut started = 0usize;

        updates.extend(self.reap_mentor_zombies(cs));

        if cs.status.halts_new_runs() {
            return (updates, started);
        }

        // Rounds opened while the CL was WIP unlock once it leaves WIP.
        if cs.status != gai_core::ClStatus::Wip && cs.mentors.iter().any(|m| m.is_wip) {
            let pf = self.project_file(&cs.file_path);
            match clear_mentor_wip_flags(&pf, &cs.name) {
                Ok(true) => updates.push("Cleared mentor #WIP flags".to_string()),
                Ok(false) => {}
                Err(err) => tracing::warn!(cl = %cs.name, %err, "wip flag clear failed"),
            }
        }

        let config = MentorConfig::load(&self.gai);
        if config.profiles.is_empty() {
            return (updates, started);
        }
        let Some(last_accepted) = cs.last_accepted_number() else {
            return (updates, started);
        };
        let entry = EntryId::accepted(last_accepted);

        // Mentors wait until every hook has PASSED for the entry.
        if !self.hooks_ready_for_mentors(cs, &entry) {
            return (updates, started);
        }

        let changed = self.changed_files_for_entry(cs, &entry);
        let is_wip = cs.status == gai_core::ClStatus::Wip;
        let existing = cs.mentor_entry_for(&entry);

        let mut current_running =
            self.global_running_count() + runners_started_this_cycle;

        for profile in &config.profiles {
            if is_wip && !profile.run_on_wip {
                continue;
            }
            if !profile.matches_changed_files(&changed) {
                continue;
            }
            for mentor in &profile.mentors {
                let already = existing
                    .map(|round| round.status_line_for(&profile.name, mentor).is_some())
                    .unwrap_or(false);
                if already {
                    continue;
                }
                if current_running + started >= self.config.max_runners {
                    tracing::debug!(cl = %cs.name, "mentor start deferred: at runner limit");
                    return (updates, started);
                }
                if let Some(update) = self.start_mentor(cs, &entry, profile, mentor, is_wip) {
                    updates.push(update);
                    started += 1;
                } else {
                    // Re-derive the budget if the launch failed oddly.
                    current_running = self.global_running_count() + runners_started_this_cycle;
                }
            }
        }
        (updates, started)
    }

    fn hooks_ready_for_mentors(&self, cs: &ChangeSpec, entry: &EntryId) -> bool {
        if cs.hooks.is_empty() {
            return false;
        }
        cs.hooks.iter().all(|hook| {
            matches!(
                hook.status_line_for_entry(entry),
                Some(sl) if sl.status == HookStatus::Passed
            )
        })
    }

    fn changed_files_for_entry(&self, cs: &ChangeSpec, entry: &EntryId) -> Vec<String> {
        let Some(commit) = cs.entry_by_id(entry) else {
            return Vec::new();
        };
        let Some(diff_path) = &commit.diff else {
            return Vec::new();
        };
        match std::fs::read_to_string(diff_path) {
            Ok(diff) => changed_files_from_diff(&diff),
            Err(_) => Vec::new(),
        }
    }

    /// Register the STARTING row, then spawn the runner and upgrade the
    /// row to RUNNING with the agent token.
    fn start_mentor(
        &self,
        cs: &ChangeSpec,
        entry: &EntryId,
        profile: &MentorProfile,
        mentor: &str,
        is_wip: bool,
    ) -> Option<String> {
        let pf = self.project_file(&cs.file_path);
        let stamp = timestamps::now_stamp(&self.clock);

        if !self.register_starting_row(&pf, cs, entry, profile, mentor, is_wip, &stamp) {
            return None;
        }

        let num = match pf.first_available_workspace(PoolKind::Loop) {
            Ok(num) => num,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "no workspace for mentor");
                self.fail_mentor_row(&pf, cs, entry, profile, mentor, "no workspace available");
                return None;
            }
        };
        let dir = self.workspace_dir(&cs.project_basename(), num);
        if !dir.is_dir() {
            self.fail_mentor_row(&pf, cs, entry, profile, mentor, "workspace directory missing");
            return None;
        }
        if let Err(err) = self.vcs.clean(&dir) {
            tracing::warn!(cl = %cs.name, %err, "clean failed before mentor checkout");
        }
        if self.vcs.checkout(&dir, &cs.name).is_err() {
            self.fail_mentor_row(&pf, cs, entry, profile, mentor, "bb_hg_update_failed");
            return None;
        }

        let output = crate::workflows::monitor::workflow_output_path(
            &self.gai,
            &cs.name,
            &format!("mentor-{mentor}"),
            &stamp,
        );
        let spawn = (|| -> std::io::Result<std::process::Child> {
            self.gai.ensure_dir(self.gai.workflows_dir())?;
            let out = std::fs::File::create(&output)?;
            let err_file = out.try_clone()?;
            Ok(Command::new(&self.config.agents.mentor)
                .args([
                    cs.name.as_str(),
                    &cs.file_path.to_string_lossy().into_owned(),
                    &entry.to_string(),
                    &profile.name,
                    mentor,
                    &dir.to_string_lossy().into_owned(),
                    &output.to_string_lossy().into_owned(),
                ])
                .current_dir(&dir)
                .stdout(Stdio::from(out))
                .stderr(Stdio::from(err_file))
                .process_group(0)
                .spawn()?)
        })();
        let mut child = match spawn {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(cl = %cs.name, %err, "mentor spawn failed");
                self.fail_mentor_row(&pf, cs, entry, profile, mentor, "spawn failed");
                return None;
            }
        };
        let pid = child.id() as i32;

        let workflow = format!("axe(mentor)-{mentor}-{stamp}");
        let claim = WorkspaceClaim::new(num, workflow, pid, cs.name.clone());
        match pf.claim_workspace(claim) {
            Ok(true) => {}
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                self.fail_mentor_row(&pf, cs, entry, profile, mentor, "workspace claim lost");
                return None;
            }
        }

        let token = format!("mentor_{mentor}-{pid}-{stamp}");
        let _ = set_mentor_status(
            &pf,
            &cs.name,
            entry,
            &profile.name,
            mentor,
            MentorStatus::Running,
            None,
            Some(Suffix::new(SuffixKind::RunningAgent, token)),
        );
        Some(format!("Mentor {}:{mentor} -> RUNNING for ({entry})", profile.name))
    }

    /// Add the STARTING row (and the round header if this is the first
    /// mentor of the round). Returns false if the row already exists.
    #[allow(clippy::too_many_arguments)]
    fn register_starting_row(
        &self,
        pf: &ProjectFile,
        cs: &ChangeSpec,
        entry: &EntryId,
        profile: &MentorProfile,
        mentor: &str,
        is_wip: bool,
        stamp: &str,
    ) -> bool {
        let Ok(current) = pf.read_changespec(&cs.name) else {
            return false;
        };
        let mut mentors = current.mentors.clone();
        let round = match mentors.iter_mut().find(|m| &m.entry == entry) {
            Some(round) => round,
            None => {
                mentors.push(MentorEntry {
                    entry: entry.clone(),
                    profiles: Vec::new(),
                    status_lines: Vec::new(),
                    is_wip,
                });
                match mentors.last_mut() {
                    Some(round) => round,
                    None => return false,
                }
            }
        };
        if round.status_line_for(&profile.name, mentor).is_some() {
            return false; // another tick won the race
        }
        if !round.profiles.iter().any(|p| p.name == profile.name) {
            round.profiles.push(MentorProfileRef {
                name: profile.name.clone(),
                completed: 0,
                total: profile.mentors.len() as u32,
            });
        }
        round.status_lines.push(MentorStatusLine {
            profile_name: profile.name.clone(),
            mentor_name: mentor.to_string(),
            status: MentorStatus::Starting,
            timestamp: stamp.to_string(),
            duration: None,
            suffix: None,
        });
        pf.update_mentors_field(&cs.name, &mentors).is_ok()
    }

    fn fail_mentor_row(
        &self,
        pf: &ProjectFile,
        cs: &ChangeSpec,
        entry: &EntryId,
        profile: &MentorProfile,
        mentor: &str,
        reason: &str,
    ) {
        let _ = set_mentor_status(
            pf,
            &cs.name,
            entry,
            &profile.name,
            mentor,
            MentorStatus::Failed,
            None,
            Some(Suffix::error(reason)),
        );
    }

    /// Kill mentor agents that have been running past the zombie
    /// timeout; release their workspaces.
    fn reap_mentor_zombies(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let pf = self.project_file(&cs.file_path);

        for round in &cs.mentors {
            for sl in &round.status_lines {
                if !matches!(sl.status, MentorStatus::Running | MentorStatus::Starting) {
                    continue;
                }
                let Some(age) = timestamps::age_seconds(&self.clock, &sl.timestamp) else {
                    continue;
                };
                if age <= self.config.zombie_timeout.as_secs() as f64 {
                    continue;
                }

                if let Some(value) = sl.suffix_value() {
                    if let Some(pid) = extract_pid_from_agent_suffix(value) {
                        try_kill_process_group(pid);
                    }
                }
                let now = timestamps::now_stamp(&self.clock);
                let token = sl.suffix_value().unwrap_or_default().to_string();
                let _ = set_mentor_status(
                    &pf,
                    &cs.name,
                    &round.entry,
                    &sl.profile_name,
                    &sl.mentor_name,
                    MentorStatus::Dead,
                    sl.duration.clone(),
                    Some(Suffix::new(
                        SuffixKind::KilledAgent,
                        format!("{token} | [{now}] Killed zombie mentor."),
                    )),
                );
                // Release the workspace the mentor held.
                if let Some(stamp) = gai_core::suffix::extract_stamp_from_agent_suffix(&token) {
                    let workflow = format!("axe(mentor)-{}-{stamp}", sl.mentor_name);
                    if let Ok(claims) = pf.claimed_workspaces() {
                        for claim in claims {
                            if claim.workflow == workflow && claim.cl_name == cs.name {
                                let _ = pf.release_workspace(
                                    claim.workspace_num,
                                    &workflow,
                                    &cs.name,
                                );
                            }
                        }
                    }
                }
                updates.push(format!(
                    "Mentor {}:{} -> DEAD (zombie)",
                    sl.profile_name, sl.mentor_name
                ));
            }
        }
        updates
    }
}

#[cfg(test)]
#[path = "mentors_tests.rs"]
mod tests;
