// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gai-storage: persistence substrate for project files.
//!
//! A `.gp` file is both the source of truth for CL state and the
//! coordination medium between processes. Every mutation follows the
//! same shape: take the advisory lock, re-read, rewrite the target
//! region, replace the file atomically, and mirror the change into the
//! `~/.gai` git repo (best effort).

pub mod atomic;
pub mod error;
pub mod fields;
pub mod git_mirror;
pub mod lock;
pub mod ops;
pub mod parse;
pub mod paths;
pub mod project_file;
pub mod running;
pub mod serialize;

pub use error::{ParseError, StorageError};
pub use lock::{ProjectLock, DEFAULT_LOCK_TIMEOUT, LOCK_POLL_INTERVAL};
pub use paths::GaiDir;
pub use project_file::ProjectFile;
