// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gai-core: Domain model for the GAI change-list orchestration engine.
//!
//! Everything in this crate is plain data plus the pure state-machine rules
//! that govern it. Persistence lives in `gai-storage`; process supervision
//! lives in `gai-engine`.

pub mod macros;

pub mod changespec;
pub mod clock;
pub mod comment;
pub mod entry;
pub mod hook;
pub mod mentor;
pub mod project;
pub mod query;
pub mod status;
pub mod suffix;
pub mod timestamps;

pub use changespec::{
    all_hooks_passed_for_entries, has_any_error_suffix, is_parent_ready_for_mail, ChangeSpec,
    CommitEntry, TestTarget,
};
#[cfg(any(test, feature = "test-support"))]
pub use changespec::ChangeSpecBuilder;
pub use clock::{Clock, FakeClock, SystemClock};
pub use comment::{CommentEntry, REVIEWER_CRITIQUE, REVIEWER_CRITIQUE_ME};
pub use entry::{is_proposal_entry, EntryId, EntryIdError};
pub use hook::{HookEntry, HookStatus, HookStatusLine};
pub use mentor::{MentorEntry, MentorProfileRef, MentorStatus, MentorStatusLine};
pub use project::{
    count_all_runners, PoolKind, ProjectSpec, WorkspaceClaim, LOOP_POOL, PRIMARY_POOL,
    SCHEDULER_POOL,
};
pub use query::{Query, QueryParseError};
pub use status::{ClStatus, StatusError, READY_TO_MAIL_SUFFIX};
pub use suffix::{
    extract_agent_kind, extract_pid_from_agent_suffix, extract_stamp_from_agent_suffix, Suffix,
    SuffixKind,
};
pub use timestamps::{
    age_seconds, display_stamp, duration_between, format_duration, is_suffix_stale, is_timestamp,
    now_stamp, TIMESTAMP_FORMAT,
};
