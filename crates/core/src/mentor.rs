// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mentor review rounds attached to commit entries.
//!
//! A MENTORS row names the commit entry under review and the profiles
//! invited to it; each mentor of each profile gets its own status line.
//! The `#WIP` flag marks a round started while the CL was still WIP, so
//! only profiles configured to run on WIP participate.

use crate::entry::EntryId;
use crate::suffix::{Suffix, SuffixKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of one mentor's review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentorStatus {
    /// Row registered before the subprocess exists, so concurrent ticks
    /// won't double-launch.
    Starting,
    Running,
    Passed,
    Failed,
    Dead,
}

crate::simple_display! {
    MentorStatus {
        Starting => "STARTING",
        Running => "RUNNING",
        Passed => "PASSED",
        Failed => "FAILED",
        Dead => "DEAD",
    }
}

impl FromStr for MentorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING" => Ok(MentorStatus::Starting),
            "RUNNING" => Ok(MentorStatus::Running),
            "PASSED" => Ok(MentorStatus::Passed),
            "FAILED" => Ok(MentorStatus::Failed),
            "DEAD" => Ok(MentorStatus::Dead),
            other => Err(format!("unknown mentor status: {other}")),
        }
    }
}

/// A profile reference on the round header: `style[1/2]` means one of
/// two mentors in the `style` profile has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorProfileRef {
    pub name: String,
    pub completed: u32,
    pub total: u32,
}

/// One mentor's status line within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorStatusLine {
    pub profile_name: String,
    pub mentor_name: String,
    pub status: MentorStatus,
    pub timestamp: String,
    pub duration: Option<String>,
    pub suffix: Option<Suffix>,
}

impl MentorStatusLine {
    pub fn suffix_kind(&self) -> Option<SuffixKind> {
        self.suffix.as_ref().map(|s| s.kind)
    }

    pub fn suffix_value(&self) -> Option<&str> {
        self.suffix.as_ref().map(|s| s.value.as_str())
    }
}

/// A mentor round for one commit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorEntry {
    pub entry: EntryId,
    pub profiles: Vec<MentorProfileRef>,
    pub status_lines: Vec<MentorStatusLine>,
    pub is_wip: bool,
}

impl MentorEntry {
    pub fn status_line_for(&self, profile: &str, mentor: &str) -> Option<&MentorStatusLine> {
        self.status_lines
            .iter()
            .find(|sl| sl.profile_name == profile && sl.mentor_name == mentor)
    }

    /// Mentors already started for this round (any status counts: a
    /// STARTING row is exactly what prevents a second launch).
    pub fn started_mentors(&self) -> Vec<(String, String)> {
        self.status_lines
            .iter()
            .map(|sl| (sl.profile_name.clone(), sl.mentor_name.clone()))
            .collect()
    }
}
