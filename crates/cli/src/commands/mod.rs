// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod commit;
pub mod lifecycle;
pub mod loop_cmd;

use gai_adapters::HgProvider;
use gai_core::SystemClock;
use gai_engine::{Engine, LoopConfig};
use gai_storage::GaiDir;
use std::sync::Arc;

/// Engine wired for the workstation: real clock, hg adapter.
pub fn build_engine(config: LoopConfig) -> Engine<SystemClock> {
    Engine::new(GaiDir::resolve(), SystemClock, Arc::new(HgProvider::new()), config)
}

/// Locate the project file containing a CL, tolerating lifecycle
/// renames (`name` may match `name__<N>`).
pub fn find_changespec(
    engine: &Engine<SystemClock>,
    name: &str,
) -> anyhow::Result<gai_core::ChangeSpec> {
    for path in engine.gai.find_all_project_files() {
        let project = engine.project_file(&path).read()?;
        if let Some(cs) = project.changespec(name) {
            return Ok(cs.clone());
        }
        // Renamed variant: base name matches after stripping __<N>
        if let Some(cs) = project
            .changespecs
            .iter()
            .find(|cs| gai_storage::paths::strip_lifecycle_suffix(&cs.name) == name)
        {
            return Ok(cs.clone());
        }
    }
    anyhow::bail!("ChangeSpec not found: {name}")
}
