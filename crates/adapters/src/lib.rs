// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gai-adapters: the VCS seam.
//!
//! The engine never shells out to VCS commands directly; it consumes a
//! [`VcsProvider`] capability. Concrete adapters wrap the workstation's
//! `bb_hg_*` tool belt; tests use the in-memory fake.

pub mod hg;
pub mod vcs;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeVcs;
pub use hg::HgProvider;
pub use vcs::{VcsError, VcsProvider, VcsResult};
