// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status-line suffix payloads.
//!
//! A suffix is the ` - (…)` annotation on a status line. The payload is
//! discriminated: a `$`-prefixed suffix carries a live PID, a `@` suffix
//! carries a running-agent token, `!` marks a human-visible error, and so
//! on. Serialization is total; parsing recovers the kind from the prefix
//! character plus, for the bare (unprefixed) family, the payload shape.

use crate::entry::EntryId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Semantic kind of a status-line suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixKind {
    /// Human-visible failure attention marker (`!:`).
    Error,
    /// An AI agent owns this line; value is `<agent>-<pid>-<ts>` (`@:`).
    RunningAgent,
    /// Agent was terminated (`~@:`).
    KilledAgent,
    /// Value is the PID of a live hook subprocess (`$:`).
    RunningProcess,
    /// PID looked dead last tick but no completion marker yet (`?$:`).
    PendingDeadProcess,
    /// Confirmed dead (`~$:`).
    KilledProcess,
    /// Value is the natural-language summary from summarize-hook (`%:`).
    SummarizeComplete,
    /// Atomic handoff token between summarize-hook output and fix-hook start
    /// (bare, shape `claiming-<ts>`).
    ClaimingFix,
    /// Killed or rejected marker (`~:`).
    Killed,
    /// Value is the id of a proposal addressing this failure (bare, entry-id shape).
    EntryRef,
    /// Plain informational suffix (bare).
    Plain,
}

crate::simple_display! {
    SuffixKind {
        Error => "error",
        RunningAgent => "running_agent",
        KilledAgent => "killed_agent",
        RunningProcess => "running_process",
        PendingDeadProcess => "pending_dead_process",
        KilledProcess => "killed_process",
        SummarizeComplete => "summarize_complete",
        ClaimingFix => "claiming_fix",
        Killed => "killed",
        EntryRef => "entry_ref",
        Plain => "plain",
    }
}

impl SuffixKind {
    /// Kinds that may carry a trailing ` | <summary>` segment.
    ///
    /// The PID-carrying kinds embed ` | ` inside their own value
    /// (`12345 | PENDING_DEAD:<ts>`), so the summary split only applies
    /// to the kinds the fix-hook pipeline actually annotates.
    fn supports_summary(self) -> bool {
        matches!(
            self,
            SuffixKind::Error
                | SuffixKind::RunningAgent
                | SuffixKind::ClaimingFix
                | SuffixKind::Plain
                | SuffixKind::EntryRef
        )
    }
}

/// A parsed suffix: kind, payload value, and optional preserved summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suffix {
    pub kind: SuffixKind,
    pub value: String,
    pub summary: Option<String>,
}

impl Suffix {
    pub fn new(kind: SuffixKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into(), summary: None }
    }

    pub fn with_summary(kind: SuffixKind, value: impl Into<String>, summary: Option<String>) -> Self {
        Self { kind, value: value.into(), summary }
    }

    pub fn error(value: impl Into<String>) -> Self {
        Self::new(SuffixKind::Error, value)
    }

    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(SuffixKind::Plain, value)
    }

    /// Render the payload as it appears inside ` - (…)`.
    pub fn render(&self) -> String {
        let body = match self.kind {
            SuffixKind::Error => format!("!: {}", self.value),
            SuffixKind::RunningAgent => {
                if self.value.is_empty() {
                    "@".to_string()
                } else {
                    format!("@: {}", self.value)
                }
            }
            SuffixKind::KilledAgent => format!("~@: {}", self.value),
            SuffixKind::RunningProcess => format!("$: {}", self.value),
            SuffixKind::PendingDeadProcess => format!("?$: {}", self.value),
            SuffixKind::KilledProcess => format!("~$: {}", self.value),
            SuffixKind::SummarizeComplete => {
                if self.value.is_empty() {
                    "%".to_string()
                } else {
                    format!("%: {}", self.value)
                }
            }
            SuffixKind::Killed => format!("~: {}", self.value),
            SuffixKind::ClaimingFix | SuffixKind::EntryRef | SuffixKind::Plain => {
                self.value.clone()
            }
        };
        match &self.summary {
            Some(summary) if self.kind.supports_summary() => format!("{} | {}", body, summary),
            _ => body,
        }
    }

    /// Parse the payload of a ` - (…)` cell back into a suffix.
    pub fn parse(content: &str) -> Self {
        let (kind, rest) = if let Some(rest) = content.strip_prefix("~@: ") {
            (SuffixKind::KilledAgent, rest)
        } else if let Some(rest) = content.strip_prefix("~$: ") {
            (SuffixKind::KilledProcess, rest)
        } else if let Some(rest) = content.strip_prefix("?$: ") {
            (SuffixKind::PendingDeadProcess, rest)
        } else if let Some(rest) = content.strip_prefix("!: ") {
            (SuffixKind::Error, rest)
        } else if let Some(rest) = content.strip_prefix("@: ") {
            (SuffixKind::RunningAgent, rest)
        } else if content == "@" {
            (SuffixKind::RunningAgent, "")
        } else if let Some(rest) = content.strip_prefix("$: ") {
            (SuffixKind::RunningProcess, rest)
        } else if let Some(rest) = content.strip_prefix("%: ") {
            (SuffixKind::SummarizeComplete, rest)
        } else if content == "%" {
            (SuffixKind::SummarizeComplete, "")
        } else if let Some(rest) = content.strip_prefix("~: ") {
            (SuffixKind::Killed, rest)
        } else {
            (bare_kind(content), content)
        };

        if kind.supports_summary() {
            if let Some((value, summary)) = rest.split_once(" | ") {
                return Self::with_summary(kind, value, Some(summary.to_string()));
            }
        }
        Self::new(kind, rest)
    }
}

#[allow(clippy::unwrap_used)]
fn claiming_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^claiming-\d{6}_\d{6}$").unwrap())
}

/// Discriminate the bare (unprefixed) suffix family by payload shape.
fn bare_kind(content: &str) -> SuffixKind {
    let head = content.split(" | ").next().unwrap_or(content);
    if head.parse::<EntryId>().map(|id| id.is_proposal()).unwrap_or(false) {
        SuffixKind::EntryRef
    } else if claiming_re().is_match(head) {
        SuffixKind::ClaimingFix
    } else {
        SuffixKind::Plain
    }
}

#[allow(clippy::unwrap_used)]
fn agent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_]+)-(\d+)-(\d{6}_\d{6})$").unwrap())
}

/// Extract the PID from a running-agent token (`<agent>-<pid>-<ts>`).
pub fn extract_pid_from_agent_suffix(value: &str) -> Option<i32> {
    let caps = agent_re().captures(value)?;
    caps.get(2)?.as_str().parse().ok()
}

/// Extract the agent kind from a running-agent token (`crs`, `fix_hook`,
/// `summarize_hook`, `mentor_<name>`).
pub fn extract_agent_kind(value: &str) -> Option<String> {
    let caps = agent_re().captures(value)?;
    Some(caps.get(1)?.as_str().to_string())
}

/// Extract the timestamp from a running-agent token.
pub fn extract_stamp_from_agent_suffix(value: &str) -> Option<String> {
    let caps = agent_re().captures(value)?;
    Some(caps.get(3)?.as_str().to_string())
}

#[cfg(test)]
#[path = "suffix_tests.rs"]
mod tests;
