// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphaned workspace claim cleanup.
//!
//! A claim whose PID is gone and whose CL is terminal is an orphan —
//! usually a worker that died between claiming and registering, or a
//! revert that raced a mentor launch. Swept once per full cycle.

use crate::engine::Engine;
use crate::process::is_process_running;
use gai_core::clock::Clock;
use gai_core::project::ProjectSpec;

impl<C: Clock> Engine<C> {
    /// Release claims held by dead PIDs for terminal-status CLs.
    /// Returns the number of claims released.
    pub fn cleanup_orphaned_workspace_claims(&self, project: &ProjectSpec) -> usize {
        let terminal: Vec<&str> = project
            .changespecs
            .iter()
            .filter(|cs| cs.status.is_terminal())
            .map(|cs| cs.name.as_str())
            .collect();
        if terminal.is_empty() {
            return 0;
        }

        let pf = self.project_file(&project.path);
        let mut released = 0;
        for claim in &project.claims {
            if !terminal.contains(&claim.cl_name.as_str()) {
                continue;
            }
            if is_process_running(claim.pid) {
                continue;
            }
            match pf.release_workspace(claim.workspace_num, &claim.workflow, &claim.cl_name) {
                Ok(true) => {
                    released += 1;
                    tracing::info!(
                        num = claim.workspace_num,
                        workflow = %claim.workflow,
                        cl = %claim.cl_name,
                        "released orphaned workspace claim"
                    );
                }
                Ok(false) => {}
                Err(err) => tracing::warn!(%err, "orphan release failed"),
            }
        }
        released
    }
}
