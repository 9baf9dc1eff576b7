// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CL status machine.
//!
//! The adjacency table is enforced only when the caller asks for
//! validation; lifecycle operations (revert/archive/restore) transition
//! without it. Transient `…`-suffixed states come from interactive
//! tooling and are never persisted by the loops.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The `READY TO MAIL` attention suffix appended to a Drafted status.
pub const READY_TO_MAIL_SUFFIX: &str = " - (!: READY TO MAIL)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: ClStatus, to: ClStatus },
}

/// Lifecycle status of a CL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClStatus {
    Wip,
    Drafted,
    Mailed,
    Submitted,
    Reverted,
    Archived,
    /// In-flight state written by interactive tools (`Mailing…`). Loops
    /// treat these as opaque and never persist them.
    Transient(String),
}

impl fmt::Display for ClStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClStatus::Wip => f.write_str("WIP"),
            ClStatus::Drafted => f.write_str("Drafted"),
            ClStatus::Mailed => f.write_str("Mailed"),
            ClStatus::Submitted => f.write_str("Submitted"),
            ClStatus::Reverted => f.write_str("Reverted"),
            ClStatus::Archived => f.write_str("Archived"),
            ClStatus::Transient(s) => f.write_str(s),
        }
    }
}

impl FromStr for ClStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "WIP" => ClStatus::Wip,
            "Drafted" => ClStatus::Drafted,
            "Mailed" => ClStatus::Mailed,
            "Submitted" => ClStatus::Submitted,
            "Reverted" => ClStatus::Reverted,
            "Archived" => ClStatus::Archived,
            other => ClStatus::Transient(other.to_string()),
        })
    }
}

impl ClStatus {
    /// Statuses reached by revert/archive; CLs here are done for good
    /// unless restored.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClStatus::Reverted | ClStatus::Archived)
    }

    /// Statuses for which the loop stops launching new hooks and agents
    /// (completion of already-running work is still observed).
    pub fn halts_new_runs(&self) -> bool {
        matches!(self, ClStatus::Reverted | ClStatus::Submitted)
    }

    /// Statuses eligible as a rebase parent.
    pub fn is_eligible_parent(&self) -> bool {
        matches!(self, ClStatus::Wip | ClStatus::Drafted | ClStatus::Mailed)
    }

    /// Whether `self -> to` is a legal edge in the status machine.
    pub fn can_transition_to(&self, to: &ClStatus) -> bool {
        use ClStatus::*;
        matches!(
            (self, to),
            (Wip, Drafted)
                | (Drafted, Wip)
                | (Drafted, Mailed)
                | (Mailed, Drafted)
                | (Mailed, Submitted)
                | (Reverted, Wip)
        )
    }

    /// Validate a transition, returning an error on an illegal edge.
    pub fn validate_transition(&self, to: &ClStatus) -> Result<(), StatusError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(StatusError::InvalidTransition { from: self.clone(), to: to.clone() })
        }
    }
}

/// Parse a STATUS field value into its base status and READY-TO-MAIL flag.
pub fn parse_status_field(value: &str) -> (ClStatus, bool) {
    match value.strip_suffix(READY_TO_MAIL_SUFFIX) {
        Some(base) => (base.trim().parse().unwrap_or(ClStatus::Wip), true),
        None => (value.trim().parse().unwrap_or(ClStatus::Wip), false),
    }
}

/// Render a STATUS field value.
pub fn render_status_field(status: &ClStatus, ready_to_mail: bool) -> String {
    if ready_to_mail {
        format!("{}{}", status, READY_TO_MAIL_SUFFIX)
    } else {
        status.to_string()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
