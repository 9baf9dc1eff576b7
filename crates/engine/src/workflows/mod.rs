// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent workflows: crs, fix-hook, summarize-hook.
//!
//! Agents are opaque subprocesses. The scheduler starts them detached,
//! leases them a workspace, tags the owning status line with
//! `<agent>-<pid>-<ts>`, and watches their output files for the
//! completion marker on later ticks.

pub mod completer;
pub mod monitor;
pub mod starter;

pub use monitor::{check_workflow_completion, workflow_output_path, WORKFLOW_COMPLETE_MARKER};
