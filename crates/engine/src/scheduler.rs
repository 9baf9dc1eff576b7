// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two-cadence scheduler.
//!
//! The fast tick (default 1 s) supervises liveness and completion; the
//! slow cycle (default 5 min) starts background checks and sweeps
//! orphaned leases. All queues are the on-disk file state itself — a
//! tick rediscovers its work from scratch every time.

use crate::engine::Engine;
use crate::process::try_kill_process_group;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::suffix::{extract_pid_from_agent_suffix, Suffix, SuffixKind};
use gai_core::timestamps;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Scheduler<C: Clock> {
    pub engine: Engine<C>,
    shutdown: Arc<AtomicBool>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(engine: Engine<C>) -> Self {
        Self { engine, shutdown: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag observed between ticks; setting it ends `run` gracefully.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run until the shutdown flag is raised.
    pub fn run(&self) {
        let config = &self.engine.config;
        tracing::info!(
            interval = ?config.interval,
            hook_interval = ?config.hook_interval,
            max_runners = config.max_runners,
            "loop started"
        );
        if let Some(query) = &config.query {
            if !query.is_empty() {
                tracing::info!(?query, "query filter active");
            }
        }

        let mut first_cycle = true;
        while !self.shutdown.load(Ordering::Relaxed) {
            self.run_check_cycle(first_cycle);
            first_cycle = false;

            let mut elapsed = std::time::Duration::ZERO;
            while elapsed < config.interval {
                if self.shutdown.load(Ordering::Relaxed) {
                    tracing::info!("loop stopped");
                    return;
                }
                std::thread::sleep(config.hook_interval);
                elapsed += config.hook_interval;
                if elapsed >= config.interval {
                    break;
                }
                self.run_hooks_cycle();
            }
        }
        tracing::info!("loop stopped");
    }

    /// All CLs across all project files, paired with their siblings for
    /// relational checks.
    fn load_projects(&self) -> Vec<gai_core::project::ProjectSpec> {
        let mut projects = Vec::new();
        for path in self.engine.gai.find_all_project_files() {
            match self.engine.project_file(&path).read() {
                Ok(project) => projects.push(project),
                Err(err) => {
                    // A corrupt file skips its CLs this tick; neighbors
                    // proceed.
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable project");
                }
            }
        }
        projects
    }

    fn matches_query(&self, cs: &ChangeSpec, all: &[ChangeSpec]) -> bool {
        match &self.engine.config.query {
            Some(query) => query.matches(cs, all),
            None => true,
        }
    }

    /// The fast tick: hook/agent supervision and suffix hygiene.
    /// Returns the number of updates logged.
    pub fn run_hooks_cycle(&self) -> usize {
        let projects = self.load_projects();
        let all: Vec<ChangeSpec> =
            projects.iter().flat_map(|p| p.changespecs.iter().cloned()).collect();
        let mut update_count = 0;

        // One budget across every CL this tick: on-disk runners plus
        // what this tick has already launched.
        let mut runners_started_this_cycle = 0usize;

        for cs in &all {
            if !self.matches_query(cs, &all) {
                continue;
            }
            let mut updates: Vec<String> = Vec::new();

            updates.extend(self.engine.check_pending_checks(cs));

            if !cs.hooks.is_empty() {
                let (hook_updates, hooks_started) =
                    self.engine.check_hooks(cs, runners_started_this_cycle);
                updates.extend(hook_updates);
                runners_started_this_cycle += hooks_started;
            }

            let (mentor_updates, mentors_started) =
                self.engine.check_mentors(cs, runners_started_this_cycle);
            updates.extend(mentor_updates);
            runners_started_this_cycle += mentors_started;

            updates.extend(self.engine.check_comment_zombies(cs));

            updates.extend(self.engine.check_and_complete_workflows(cs));
            let started = self.engine.start_stale_workflows(cs, runners_started_this_cycle);
            updates.extend(started.updates);
            runners_started_this_cycle += started.started;

            updates.extend(self.engine.transform_old_proposal_suffixes(cs));
            updates.extend(self.engine.strip_old_entry_error_markers(cs));
            updates.extend(self.engine.acknowledge_terminal_status_markers(cs));
            updates.extend(self.engine.check_ready_to_mail(cs, &all));

            for update in updates {
                tracing::info!(cl = %cs.name, "{update}");
                update_count += 1;
            }
        }
        update_count
    }

    /// The slow cycle: background checks and the orphan sweep. On the
    /// first cycle the freshness cache is bypassed for leaf CLs (no
    /// parent, or parent Submitted) for fast first-run discovery.
    pub fn run_check_cycle(&self, first_cycle: bool) -> usize {
        let projects = self.load_projects();
        let all: Vec<ChangeSpec> =
            projects.iter().flat_map(|p| p.changespecs.iter().cloned()).collect();
        let mut update_count = 0;

        for cs in &all {
            if !self.matches_query(cs, &all) {
                continue;
            }
            let bypass_cache = first_cycle && crate::checks::parent_is_submitted(cs, &all);
            for update in self.engine.start_pending_checks(cs, &all, bypass_cache) {
                tracing::info!(cl = %cs.name, "{update}");
                update_count += 1;
            }
        }

        for project in &projects {
            self.engine.cleanup_orphaned_workspace_claims(project);
        }

        if update_count > 0 {
            tracing::info!(update_count, "full cycle complete");
        }
        update_count
    }
}

impl<C: Clock> Engine<C> {
    /// Comment rows owned by an agent whose stamp has gone stale are
    /// zombies: terminate and mark killed.
    pub fn check_comment_zombies(&self, cs: &ChangeSpec) -> Vec<String> {
        let mut updates = Vec::new();
        let mut comments = cs.comments.clone();
        let mut touched = false;

        for comment in comments.iter_mut() {
            if comment.suffix_kind() != Some(SuffixKind::RunningAgent) {
                continue;
            }
            let Some(token) = comment.suffix_value().map(str::to_string) else {
                continue;
            };
            let Some(stamp) = gai_core::suffix::extract_stamp_from_agent_suffix(&token) else {
                continue;
            };
            let stale = matches!(
                timestamps::age_seconds(&self.clock, &stamp),
                Some(age) if age > self.config.zombie_timeout.as_secs() as f64
            );
            if !stale {
                continue;
            }
            if let Some(pid) = extract_pid_from_agent_suffix(&token) {
                try_kill_process_group(pid);
            }
            comment.suffix = Some(Suffix::new(SuffixKind::KilledAgent, token));
            touched = true;
            updates.push(format!("Comment [{}] agent -> killed (zombie)", comment.reviewer));
        }

        if touched {
            let pf = self.project_file(&cs.file_path);
            if let Err(err) = pf.update_comments_field(&cs.name, &comments) {
                tracing::warn!(cl = %cs.name, %err, "comment zombie persistence failed");
                return Vec::new();
            }
        }
        updates
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
