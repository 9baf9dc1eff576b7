// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review-comment artifacts attached to a CL.

use crate::suffix::{Suffix, SuffixKind};
use serde::{Deserialize, Serialize};

/// Reviewer name for external critique comments.
pub const REVIEWER_CRITIQUE: &str = "critique";
/// Reviewer name for the author's own unresolved comments.
pub const REVIEWER_CRITIQUE_ME: &str = "critique:me";

/// One `[<reviewer>] <path>` row in the COMMENTS field. The path names a
/// JSON artifact of comments produced by a background check; the suffix
/// tracks the responder agent working the comments off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub reviewer: String,
    pub file_path: String,
    pub suffix: Option<Suffix>,
}

impl CommentEntry {
    pub fn new(reviewer: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self { reviewer: reviewer.into(), file_path: file_path.into(), suffix: None }
    }

    pub fn suffix_kind(&self) -> Option<SuffixKind> {
        self.suffix.as_ref().map(|s| s.kind)
    }

    pub fn suffix_value(&self) -> Option<&str> {
        self.suffix.as_ref().map(|s| s.value.as_str())
    }
}
