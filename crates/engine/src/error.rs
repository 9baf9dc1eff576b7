// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.
//!
//! All of these are local errors: a failure on one CL never aborts the
//! tick. The scheduler logs with the CL name and proceeds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] gai_storage::StorageError),

    #[error(transparent)]
    Vcs(#[from] gai_adapters::VcsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to spawn subprocess: {0}")]
    SpawnFailure(String),

    #[error("no free workspace in the requested pool")]
    WorkspaceUnavailable,

    #[error("workspace directory missing: {0}")]
    WorkspaceMissing(String),

    #[error("agent prerequisite missing: {0}")]
    MissingPrerequisite(String),

    #[error("{0}")]
    Refused(String),
}
