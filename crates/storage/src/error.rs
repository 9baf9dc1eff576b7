// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A project file could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Another writer held the lock past the timeout. Callers surface
    /// this and move on; they do not retry inside the mutation.
    #[error("timeout waiting for lock on {path} after {timeout:?}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("ChangeSpec not found: {name}")]
    ChangeSpecNotFound { name: String },

    #[error(transparent)]
    Status(#[from] gai_core::StatusError),

    #[error("workspace #{num} is already claimed")]
    WorkspaceClaimed { num: u32 },

    #[error("no free workspace in the requested pool")]
    WorkspaceUnavailable,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
