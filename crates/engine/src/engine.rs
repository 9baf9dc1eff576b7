// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine handle: shared dependencies for every runtime operation.

use crate::config::LoopConfig;
use gai_adapters::VcsProvider;
use gai_core::clock::Clock;
use gai_storage::{GaiDir, ProjectFile};
use std::path::PathBuf;
use std::sync::Arc;

/// Dependencies threaded through hook supervision, agent launching,
/// lifecycle ops, and the scheduler. Cheap to clone.
#[derive(Clone)]
pub struct Engine<C: Clock> {
    pub gai: GaiDir,
    pub clock: C,
    pub vcs: Arc<dyn VcsProvider>,
    pub config: LoopConfig,
}

impl<C: Clock> Engine<C> {
    pub fn new(gai: GaiDir, clock: C, vcs: Arc<dyn VcsProvider>, config: LoopConfig) -> Self {
        Self { gai, clock, vcs, config }
    }

    /// Project-file handle bound to this engine's state root.
    pub fn project_file(&self, path: impl Into<PathBuf>) -> ProjectFile {
        ProjectFile::with_gai(path, self.gai.clone())
    }

    /// Workspace checkout directory for a numbered lease.
    pub fn workspace_dir(&self, project: &str, num: u32) -> PathBuf {
        self.gai.workspace_dir(project, num)
    }
}
