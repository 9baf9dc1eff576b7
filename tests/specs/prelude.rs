// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for the scenario specs.

use gai_adapters::FakeVcs;
use gai_core::{ChangeSpec, FakeClock};
use gai_engine::{Engine, LoopConfig, Scheduler};
use gai_storage::{GaiDir, ProjectFile};
use std::sync::Arc;

pub struct Env {
    _temp: tempfile::TempDir,
    pub gai: GaiDir,
    pub vcs: FakeVcs,
    pub scheduler: Scheduler<FakeClock>,
}

impl Env {
    /// Fresh state root with scheduler and agent workspace slots
    /// pre-created for the `web` project.
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    pub fn with_config(config: LoopConfig) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let gai = GaiDir::at(temp.path());
        gai.ensure_dir(gai.hooks_dir()).unwrap();
        gai.ensure_dir(gai.workflows_dir()).unwrap();
        gai.ensure_dir(gai.checks_dir()).unwrap();
        for num in (100..104).chain(200..204) {
            std::fs::create_dir_all(gai.workspace_dir("web", num)).unwrap();
        }
        let clock = FakeClock::new();
        clock.set_stamp("250801_120000");
        let vcs = FakeVcs::new();
        let engine = Engine::new(gai.clone(), clock, Arc::new(vcs.clone()), config);
        Self { _temp: temp, gai, vcs, scheduler: Scheduler::new(engine) }
    }

    pub fn engine(&self) -> &Engine<FakeClock> {
        &self.scheduler.engine
    }

    pub fn clock(&self) -> &FakeClock {
        &self.scheduler.engine.clock
    }

    /// Write the `web` project file and return its handle.
    pub fn write_project(&self, content: &str) -> ProjectFile {
        let gp = self.gai.project_file("web");
        std::fs::create_dir_all(gp.parent().unwrap()).unwrap();
        std::fs::write(&gp, content).unwrap();
        self.engine().project_file(&gp)
    }

    pub fn project(&self) -> ProjectFile {
        self.engine().project_file(self.gai.project_file("web"))
    }

    pub fn read(&self, name: &str) -> ChangeSpec {
        self.project().read_changespec(name).unwrap()
    }

    /// Poll until `predicate` holds or ~5 s pass.
    pub fn wait_until(&self, mut predicate: impl FnMut() -> bool) {
        for _ in 0..100 {
            if predicate() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        panic!("condition not reached within timeout");
    }
}
