// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializer for the `.gp` grammar. Exact inverse of `parse`.

use crate::parse::STATUS_LINE_PREFIX;
use gai_core::changespec::{ChangeSpec, CommitEntry, TestTarget};
use gai_core::comment::CommentEntry;
use gai_core::hook::{HookEntry, HookStatusLine};
use gai_core::mentor::{MentorEntry, MentorStatusLine};
use gai_core::project::{ProjectSpec, WorkspaceClaim};
use gai_core::status::render_status_field;
use gai_core::timestamps::display_stamp;

/// Render a whole project file. CLs are separated by two blank lines
/// (the end-of-CL marker the parser and partial updates rely on).
pub fn serialize_project(project: &ProjectSpec) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !project.claims.is_empty() {
        lines.push("RUNNING:".to_string());
        for claim in &project.claims {
            lines.push(claim_line(claim));
        }
        lines.push(String::new());
    }

    for (idx, cs) in project.changespecs.iter().enumerate() {
        if idx > 0 {
            lines.push(String::new());
            lines.push(String::new());
        }
        lines.extend(changespec_lines(cs));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// `  #<num> <workflow> <pid> <cl_name>[ {<artifacts_ts>}]`
pub fn claim_line(claim: &WorkspaceClaim) -> String {
    let mut line = format!(
        "  #{} {} {} {}",
        claim.workspace_num, claim.workflow, claim.pid, claim.cl_name
    );
    if let Some(ts) = &claim.artifacts_timestamp {
        line.push_str(&format!(" {{{ts}}}"));
    }
    line
}

/// All lines of one CL block, in canonical field order.
pub fn changespec_lines(cs: &ChangeSpec) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("NAME: {}", cs.name));

    if !cs.description.is_empty() {
        lines.push("DESCRIPTION:".to_string());
        lines.extend(indented_block(&cs.description));
    }
    if let Some(kickstart) = &cs.kickstart {
        lines.push("KICKSTART:".to_string());
        lines.extend(indented_block(kickstart));
    }
    if let Some(cl) = &cs.cl {
        lines.push(format!("CL: {cl}"));
    }
    if let Some(bug) = &cs.bug {
        lines.push(format!("BUG: {bug}"));
    }
    if let Some(parent) = &cs.parent {
        lines.push(format!("PARENT: {parent}"));
    }
    lines.push(format!("STATUS: {}", render_status_field(&cs.status, cs.ready_to_mail)));

    if !cs.test_targets.is_empty() {
        lines.push("TEST TARGETS:".to_string());
        for target in &cs.test_targets {
            lines.push(test_target_line(target));
        }
    }
    lines.extend(history_field_lines(&cs.commits));
    lines.extend(hooks_field_lines(&cs.hooks));
    lines.extend(comments_field_lines(&cs.comments));
    lines.extend(mentors_field_lines(&cs.mentors));
    lines
}

/// Indent free text by two spaces; blank lines stay blank (no trailing
/// whitespace on disk).
fn indented_block(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("  {l}") })
        .collect()
}

fn test_target_line(target: &TestTarget) -> String {
    if target.failed {
        format!("  {} (FAILED)", target.target)
    } else {
        format!("  {}", target.target)
    }
}

/// HISTORY field lines including the header; empty when there are no entries.
pub fn history_field_lines(commits: &[CommitEntry]) -> Vec<String> {
    if commits.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["HISTORY:".to_string()];
    for entry in commits {
        lines.push(history_entry_line(entry));
    }
    lines
}

pub fn history_entry_line(entry: &CommitEntry) -> String {
    let mut line = format!("  ({}) {}", entry.id, entry.note);
    if let Some(diff) = &entry.diff {
        line.push_str(&format!(" [{diff}]"));
    }
    if let Some(suffix) = &entry.suffix {
        line.push_str(&format!(" - ({})", suffix.render()));
    }
    line
}

/// HOOKS field lines including the header; empty when there are no hooks.
/// Status lines are written sorted by entry id.
pub fn hooks_field_lines(hooks: &[HookEntry]) -> Vec<String> {
    if hooks.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["HOOKS:".to_string()];
    for hook in hooks {
        lines.push(format!("  {}", hook.command));
        let mut sorted: Vec<&HookStatusLine> = hook.status_lines.iter().collect();
        sorted.sort_by(|a, b| a.entry.cmp(&b.entry));
        for sl in sorted {
            lines.push(hook_status_line(sl));
        }
    }
    lines
}

pub fn hook_status_line(sl: &HookStatusLine) -> String {
    let mut line = format!(
        "{}({}) {} {}",
        STATUS_LINE_PREFIX,
        sl.entry,
        display_stamp(&sl.timestamp),
        sl.status
    );
    if let Some(duration) = &sl.duration {
        line.push_str(&format!(" ({duration})"));
    }
    if let Some(suffix) = &sl.suffix {
        line.push_str(&format!(" - ({})", suffix.render()));
    }
    line
}

/// COMMENTS field lines including the header; empty when there are none.
pub fn comments_field_lines(comments: &[CommentEntry]) -> Vec<String> {
    if comments.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["COMMENTS:".to_string()];
    for comment in comments {
        lines.push(comment_line(comment));
    }
    lines
}

pub fn comment_line(comment: &CommentEntry) -> String {
    let mut line = format!("  [{}] {}", comment.reviewer, comment.file_path);
    if let Some(suffix) = &comment.suffix {
        line.push_str(&format!(" - ({})", suffix.render()));
    }
    line
}

/// MENTORS field lines including the header; empty when there are none.
pub fn mentors_field_lines(mentors: &[MentorEntry]) -> Vec<String> {
    if mentors.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["MENTORS:".to_string()];
    for entry in mentors {
        let mut header = format!("  ({})", entry.entry);
        for profile in &entry.profiles {
            header.push_str(&format!(
                " {}[{}/{}]",
                profile.name, profile.completed, profile.total
            ));
        }
        if entry.is_wip {
            header.push_str(" #WIP");
        }
        lines.push(header);
        for sl in &entry.status_lines {
            lines.push(mentor_status_line(sl));
        }
    }
    lines
}

pub fn mentor_status_line(sl: &MentorStatusLine) -> String {
    let mut line = format!(
        "{}{} {}:{} - {}",
        STATUS_LINE_PREFIX,
        display_stamp(&sl.timestamp),
        sl.profile_name,
        sl.mentor_name,
        sl.status
    );
    if let Some(duration) = &sl.duration {
        line.push_str(&format!(" ({duration})"));
    }
    if let Some(suffix) = &sl.suffix {
        line.push_str(&format!(" - ({})", suffix.render()));
    }
    line
}

#[cfg(test)]
#[path = "serialize_tests.rs"]
mod tests;
