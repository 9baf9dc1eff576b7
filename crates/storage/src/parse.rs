// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for the line-oriented `.gp` grammar.
//!
//! The parser is tolerant: trailing whitespace is ignored, unknown lines
//! are logged and skipped, and a malformed CL never poisons its
//! neighbors. Two consecutive blank lines (or the next `NAME:`) end a
//! CL block.

use gai_core::changespec::{ChangeSpec, CommitEntry, TestTarget};
use gai_core::comment::CommentEntry;
use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus, HookStatusLine};
use gai_core::mentor::{MentorEntry, MentorProfileRef, MentorStatus, MentorStatusLine};
use gai_core::project::{ProjectSpec, WorkspaceClaim};
use gai_core::status::parse_status_field;
use gai_core::suffix::Suffix;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Prefix carried by every hook and mentor status line.
pub const STATUS_LINE_PREFIX: &str = "      | ";

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        #[allow(clippy::unwrap_used)]
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

cached_regex!(
    hook_status_re,
    r"^\((\d+[a-z]?)\) \[(\d{6}_\d{6})\] (RUNNING|PASSED|FAILED|DEAD)(?: \(([^)]+)\))?$"
);
cached_regex!(
    mentor_status_re,
    r"^\[(\d{6}_\d{6})\] ([^\s:]+):(\S+) - (STARTING|RUNNING|PASSED|FAILED|DEAD)(?: \(([^)]+)\))?$"
);
cached_regex!(history_entry_re, r"^\((\d+[a-z]?)\) (.*)$");
cached_regex!(profile_ref_re, r"^(.+)\[(\d+)/(\d+)\]$");
cached_regex!(comment_re, r"^\[([^\]]+)\] (.*)$");

/// Parse one file's content. `path` is recorded on every CL for
/// write-backs.
pub fn parse_project(path: &Path, content: &str) -> ProjectSpec {
    let lines: Vec<&str> = content.lines().collect();
    let mut project = ProjectSpec { path: path.to_path_buf(), ..Default::default() };

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim_end();
        if line == "RUNNING:" {
            i += 1;
            while i < lines.len() {
                match parse_claim_line(lines[i].trim_end()) {
                    Some(claim) => {
                        project.claims.push(claim);
                        i += 1;
                    }
                    None => break,
                }
            }
        } else if line.starts_with("NAME:") {
            let (cs, next) = parse_changespec(path, &lines, i);
            if let Some(cs) = cs {
                project.changespecs.push(cs);
            }
            i = next;
        } else {
            if !line.is_empty() {
                tracing::warn!(line = i + 1, content = line, "skipping unrecognized line");
            }
            i += 1;
        }
    }
    project
}

/// Parse one `RUNNING:` claim row:
/// `  #<num> <workflow> <pid> <cl_name>[ {<artifacts_ts>}]`
pub fn parse_claim_line(line: &str) -> Option<WorkspaceClaim> {
    let body = line.strip_prefix("  #")?;
    let mut tokens = body.split_whitespace();
    let workspace_num: u32 = tokens.next()?.parse().ok()?;
    let workflow = tokens.next()?.to_string();
    let pid: i32 = tokens.next()?.parse().ok()?;
    let cl_name = tokens.next()?.to_string();
    let artifacts_timestamp = tokens
        .next()
        .and_then(|t| t.strip_prefix('{'))
        .and_then(|t| t.strip_suffix('}'))
        .map(|t| t.to_string());
    Some(WorkspaceClaim { workspace_num, workflow, pid, cl_name, artifacts_timestamp })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Description,
    Kickstart,
    TestTargets,
    History,
    Hooks,
    Comments,
    Mentors,
}

fn parse_changespec(path: &Path, lines: &[&str], start: usize) -> (Option<ChangeSpec>, usize) {
    let mut cs = ChangeSpec {
        name: String::new(),
        description: String::new(),
        kickstart: None,
        cl: None,
        bug: None,
        parent: None,
        status: gai_core::ClStatus::Wip,
        ready_to_mail: false,
        test_targets: Vec::new(),
        commits: Vec::new(),
        hooks: Vec::new(),
        comments: Vec::new(),
        mentors: Vec::new(),
        file_path: path.to_path_buf(),
    };
    let mut section = Section::None;
    let mut description_lines: Vec<String> = Vec::new();
    let mut kickstart_lines: Vec<String> = Vec::new();
    let mut blank_run = 0usize;
    // Single blank lines inside DESCRIPTION/KICKSTART are paragraph
    // breaks; they are flushed when the next indented line arrives.
    let mut pending_blanks = 0usize;

    let mut i = start;
    while i < lines.len() {
        let line = lines[i].trim_end();

        if line.is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                i += 1;
                break;
            }
            pending_blanks += 1;
            i += 1;
            continue;
        }
        blank_run = 0;

        if line.starts_with("NAME:") && i != start {
            break; // next CL
        }

        if let Some(value) = line.strip_prefix("NAME:") {
            cs.name = value.trim().to_string();
            section = Section::None;
        } else if line == "DESCRIPTION:" {
            section = Section::Description;
        } else if line == "KICKSTART:" {
            section = Section::Kickstart;
        } else if let Some(value) = line.strip_prefix("CL:") {
            cs.cl = non_empty(value);
            section = Section::None;
        } else if let Some(value) = line.strip_prefix("BUG:") {
            cs.bug = non_empty(value);
            section = Section::None;
        } else if let Some(value) = line.strip_prefix("PARENT:") {
            cs.parent = non_empty(value);
            section = Section::None;
        } else if let Some(value) = line.strip_prefix("STATUS:") {
            let (status, ready) = parse_status_field(value.trim());
            cs.status = status;
            cs.ready_to_mail = ready;
            section = Section::None;
        } else if line == "TEST TARGETS:" {
            section = Section::TestTargets;
        } else if line == "HISTORY:" {
            section = Section::History;
        } else if line == "HOOKS:" {
            section = Section::Hooks;
        } else if line == "COMMENTS:" {
            section = Section::Comments;
        } else if line == "MENTORS:" {
            section = Section::Mentors;
        } else if let Some(body) = line.strip_prefix(STATUS_LINE_PREFIX) {
            match section {
                Section::Hooks => {
                    if let Some(sl) = parse_hook_status_line(body) {
                        if let Some(hook) = cs.hooks.last_mut() {
                            hook.status_lines.push(sl);
                        } else {
                            tracing::warn!(line = i + 1, "hook status line before any hook");
                        }
                    } else {
                        tracing::warn!(line = i + 1, content = body, "bad hook status line");
                    }
                }
                Section::Mentors => {
                    if let Some(sl) = parse_mentor_status_line(body) {
                        if let Some(entry) = cs.mentors.last_mut() {
                            entry.status_lines.push(sl);
                        } else {
                            tracing::warn!(line = i + 1, "mentor status line before any round");
                        }
                    } else {
                        tracing::warn!(line = i + 1, content = body, "bad mentor status line");
                    }
                }
                _ => tracing::warn!(line = i + 1, "status line outside HOOKS/MENTORS"),
            }
        } else if let Some(body) = line.strip_prefix("  ") {
            // Descriptions keep any deeper indentation verbatim; the
            // structured fields expect exactly two spaces.
            if matches!(section, Section::Description) {
                for _ in 0..pending_blanks {
                    description_lines.push(String::new());
                }
                pending_blanks = 0;
                description_lines.push(body.to_string());
                i += 1;
                continue;
            }
            if matches!(section, Section::Kickstart) {
                for _ in 0..pending_blanks {
                    kickstart_lines.push(String::new());
                }
                pending_blanks = 0;
                kickstart_lines.push(body.to_string());
                i += 1;
                continue;
            }
            pending_blanks = 0;
            if body.starts_with(' ') {
                tracing::warn!(line = i + 1, content = body, "over-indented line; skipped");
                i += 1;
                continue;
            }
            match section {
                Section::Description | Section::Kickstart => {}
                Section::TestTargets => cs.test_targets.push(parse_test_target(body)),
                Section::History => match parse_history_entry(body) {
                    Some(entry) => cs.commits.push(entry),
                    None => tracing::warn!(line = i + 1, content = body, "bad HISTORY entry"),
                },
                Section::Hooks => cs.hooks.push(HookEntry::new(body)),
                Section::Comments => match parse_comment_entry(body) {
                    Some(entry) => cs.comments.push(entry),
                    None => tracing::warn!(line = i + 1, content = body, "bad COMMENTS entry"),
                },
                Section::Mentors => match parse_mentor_round(body) {
                    Some(entry) => cs.mentors.push(entry),
                    None => tracing::warn!(line = i + 1, content = body, "bad MENTORS round"),
                },
                Section::None => {
                    tracing::warn!(line = i + 1, content = body, "indented line outside a field")
                }
            }
        } else {
            tracing::warn!(line = i + 1, content = line, "skipping unrecognized line");
        }
        pending_blanks = 0;
        i += 1;
    }

    cs.description = description_lines.join("\n");
    if !kickstart_lines.is_empty() {
        cs.kickstart = Some(kickstart_lines.join("\n"));
    }

    if cs.name.is_empty() {
        tracing::warn!(line = start + 1, "CL block without a NAME; skipped");
        return (None, i);
    }
    (Some(cs), i)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "None" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split a trailing ` - (<content>)` suffix cell off a line body.
pub fn split_suffix_cell(body: &str) -> (&str, Option<Suffix>) {
    if body.ends_with(')') {
        if let Some(pos) = body.rfind(" - (") {
            let content = &body[pos + 4..body.len() - 1];
            return (&body[..pos], Some(Suffix::parse(content)));
        }
    }
    (body, None)
}

fn parse_test_target(body: &str) -> TestTarget {
    match body.strip_suffix(" (FAILED)") {
        Some(target) => TestTarget { target: target.to_string(), failed: true },
        None => TestTarget { target: body.to_string(), failed: false },
    }
}

/// `(<id>) <note>[ [<diff_path>]][ - (<suffix>)]`
pub fn parse_history_entry(body: &str) -> Option<CommitEntry> {
    let caps = history_entry_re().captures(body)?;
    let id: EntryId = caps.get(1)?.as_str().parse().ok()?;
    let rest = caps.get(2)?.as_str();
    let (rest, suffix) = split_suffix_cell(rest);

    let (note, diff) = if rest.ends_with(']') {
        match rest.rfind(" [") {
            Some(pos) => {
                (rest[..pos].to_string(), Some(rest[pos + 2..rest.len() - 1].to_string()))
            }
            None => (rest.to_string(), None),
        }
    } else {
        (rest.to_string(), None)
    };

    Some(CommitEntry { id, note, diff, suffix })
}

/// `(<entry_id>) [<ts>] <STATUS>[ (<duration>)][ - (<suffix>)]`
pub fn parse_hook_status_line(body: &str) -> Option<HookStatusLine> {
    let (head, suffix) = split_suffix_cell(body);
    let caps = hook_status_re().captures(head)?;
    let entry: EntryId = caps.get(1)?.as_str().parse().ok()?;
    let timestamp = caps.get(2)?.as_str().to_string();
    let status: HookStatus = caps.get(3)?.as_str().parse().ok()?;
    let duration = caps.get(4).map(|m| m.as_str().to_string());
    Some(HookStatusLine { entry, timestamp, status, duration, suffix })
}

/// `[<reviewer>] <path>[ - (<suffix>)]`
pub fn parse_comment_entry(body: &str) -> Option<CommentEntry> {
    let (head, suffix) = split_suffix_cell(body);
    let caps = comment_re().captures(head)?;
    Some(CommentEntry {
        reviewer: caps.get(1)?.as_str().to_string(),
        file_path: caps.get(2)?.as_str().trim().to_string(),
        suffix,
    })
}

/// `(<entry_id>) <profile1>[x/y] <profile2>[x/y][ #WIP]`
pub fn parse_mentor_round(body: &str) -> Option<MentorEntry> {
    let caps = history_entry_re().captures(body)?;
    let entry: EntryId = caps.get(1)?.as_str().parse().ok()?;
    let mut rest = caps.get(2)?.as_str().trim();

    let is_wip = rest.ends_with("#WIP");
    if is_wip {
        rest = rest[..rest.len() - 4].trim_end();
    }

    let mut profiles = Vec::new();
    for token in rest.split_whitespace() {
        let caps = profile_ref_re().captures(token)?;
        profiles.push(MentorProfileRef {
            name: caps.get(1)?.as_str().to_string(),
            completed: caps.get(2)?.as_str().parse().ok()?,
            total: caps.get(3)?.as_str().parse().ok()?,
        });
    }

    Some(MentorEntry { entry, profiles, status_lines: Vec::new(), is_wip })
}

/// `[<ts>] <profile>:<mentor> - <STATUS>[ (<duration>)][ - (<suffix>)]`
pub fn parse_mentor_status_line(body: &str) -> Option<MentorStatusLine> {
    let (head, suffix) = split_suffix_cell(body);
    let caps = mentor_status_re().captures(head)?;
    let timestamp = caps.get(1)?.as_str().to_string();
    let profile_name = caps.get(2)?.as_str().to_string();
    let mentor_name = caps.get(3)?.as_str().to_string();
    let status: MentorStatus = caps.get(4)?.as_str().parse().ok()?;
    let duration = caps.get(5).map(|m| m.as_str().to_string());
    Some(MentorStatusLine { profile_name, mentor_name, status, timestamp, duration, suffix })
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
