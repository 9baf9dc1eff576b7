// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gai_core::hook::HookStatus;
use gai_core::mentor::MentorStatus;
use gai_core::status::ClStatus;
use gai_core::suffix::SuffixKind;
use std::path::PathBuf;

const FIXTURE: &str = "\
RUNNING:
  #101 axe(hooks)-3 12345 my_cl
  #200 loop(crs)-critique 4242 my_cl {250801_120000}

NAME: my_cl
DESCRIPTION:
  Add the frobnicator.

  Second paragraph with detail.
CL: http://cl/123456
BUG: b/9876
PARENT: base_cl
STATUS: Drafted - (!: READY TO MAIL)
TEST TARGETS:
  //foo:bar (FAILED)
  //foo:baz
HISTORY:
  (1) initial commit
  (2) fix lint [~/.gai/diffs/my_cl_2.diff]
  (2a) proposal from fix-hook [~/.gai/proposals/my_cl_2a.diff] - (~: BROKEN PROPOSAL)
HOOKS:
  !$bb_hg_presubmit
      | (1) [250801_110000] PASSED (2m3s)
      | (2) [250801_120000] RUNNING - ($: 12345)
  $bb_hg_lint
      | (2) [250801_120100] FAILED (10s) - (%: lint found unused import)
COMMENTS:
  [critique] ~/.gai/comments/my_cl.json - (@: crs-99-250801_120000)
MENTORS:
  (2) style[1/2] perf[0/1] #WIP
      | [250801_115000] style:alice - PASSED (3m0s)
      | [250801_120000] style:bob - RUNNING - (@: mentor_bob-77-250801_120000)


NAME: base_cl
DESCRIPTION:
  The base.
STATUS: Submitted
";

#[test]
fn parses_running_block() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    assert_eq!(project.claims.len(), 2);
    assert_eq!(project.claims[0].workspace_num, 101);
    assert_eq!(project.claims[0].workflow, "axe(hooks)-3");
    assert_eq!(project.claims[0].pid, 12345);
    assert_eq!(project.claims[0].cl_name, "my_cl");
    assert_eq!(project.claims[0].artifacts_timestamp, None);
    assert_eq!(project.claims[1].artifacts_timestamp.as_deref(), Some("250801_120000"));
}

#[test]
fn parses_scalar_fields() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    assert_eq!(project.changespecs.len(), 2);
    let cs = &project.changespecs[0];
    assert_eq!(cs.name, "my_cl");
    assert_eq!(cs.cl.as_deref(), Some("http://cl/123456"));
    assert_eq!(cs.bug.as_deref(), Some("b/9876"));
    assert_eq!(cs.parent.as_deref(), Some("base_cl"));
    assert_eq!(cs.status, ClStatus::Drafted);
    assert!(cs.ready_to_mail);
    assert_eq!(cs.file_path, PathBuf::from("/tmp/web.gp"));
}

#[test]
fn description_preserves_blank_interior_lines() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    let cs = &project.changespecs[0];
    // The single blank line between paragraphs does not end the CL
    assert!(cs.description.starts_with("Add the frobnicator."));
    assert!(cs.description.contains("Second paragraph"));
}

#[test]
fn parses_history_with_diff_and_suffix() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    let commits = &project.changespecs[0].commits;
    assert_eq!(commits.len(), 3);
    assert_eq!(commits[0].id.to_string(), "1");
    assert_eq!(commits[0].diff, None);
    assert_eq!(commits[1].diff.as_deref(), Some("~/.gai/diffs/my_cl_2.diff"));
    let proposal = &commits[2];
    assert!(proposal.is_proposal());
    assert!(proposal.is_broken_proposal());
    assert_eq!(proposal.suffix.as_ref().map(|s| s.kind), Some(SuffixKind::Killed));
}

#[test]
fn parses_hooks_and_status_lines() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    let hooks = &project.changespecs[0].hooks;
    assert_eq!(hooks.len(), 2);
    assert!(hooks[0].skip_fix_hook());
    assert!(hooks[0].skip_proposal_runs());
    assert_eq!(hooks[0].status_lines.len(), 2);

    let running = &hooks[0].status_lines[1];
    assert_eq!(running.status, HookStatus::Running);
    assert_eq!(running.process_pid(), Some(12345));

    let summarized = &hooks[1].status_lines[0];
    assert_eq!(summarized.status, HookStatus::Failed);
    assert_eq!(summarized.duration.as_deref(), Some("10s"));
    assert_eq!(summarized.suffix_kind(), Some(SuffixKind::SummarizeComplete));
    assert_eq!(summarized.suffix_value(), Some("lint found unused import"));
}

#[test]
fn parses_comments_and_mentors() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    let cs = &project.changespecs[0];

    assert_eq!(cs.comments.len(), 1);
    assert_eq!(cs.comments[0].reviewer, "critique");
    assert_eq!(cs.comments[0].suffix_kind(), Some(SuffixKind::RunningAgent));

    assert_eq!(cs.mentors.len(), 1);
    let round = &cs.mentors[0];
    assert_eq!(round.entry.to_string(), "2");
    assert!(round.is_wip);
    assert_eq!(round.profiles.len(), 2);
    assert_eq!(round.profiles[0].name, "style");
    assert_eq!(round.profiles[0].completed, 1);
    assert_eq!(round.profiles[0].total, 2);
    assert_eq!(round.status_lines.len(), 2);
    assert_eq!(round.status_lines[0].status, MentorStatus::Passed);
    assert_eq!(round.status_lines[1].mentor_name, "bob");
}

#[test]
fn two_blank_lines_end_a_cl() {
    let project = parse_project(&PathBuf::from("/tmp/web.gp"), FIXTURE);
    assert_eq!(project.changespecs[1].name, "base_cl");
    assert_eq!(project.changespecs[1].status, ClStatus::Submitted);
}

#[test]
fn tolerates_trailing_whitespace() {
    let content = "NAME: padded   \nSTATUS: WIP   \n";
    let project = parse_project(&PathBuf::from("/tmp/p.gp"), content);
    assert_eq!(project.changespecs[0].name, "padded");
    assert_eq!(project.changespecs[0].status, ClStatus::Wip);
}

#[test]
fn skips_nameless_block_without_poisoning_neighbors() {
    let content = "DESCRIPTION:\n  stray\n\n\nNAME: good_cl\nSTATUS: WIP\n";
    let project = parse_project(&PathBuf::from("/tmp/p.gp"), content);
    assert_eq!(project.changespecs.len(), 1);
    assert_eq!(project.changespecs[0].name, "good_cl");
}

#[test]
fn none_cl_value_parses_as_absent() {
    let content = "NAME: x\nCL: None\nSTATUS: Reverted\n";
    let project = parse_project(&PathBuf::from("/tmp/p.gp"), content);
    assert_eq!(project.changespecs[0].cl, None);
}

#[test]
fn claim_line_rejects_garbage() {
    assert!(parse_claim_line("  #abc wf 1 cl").is_none());
    assert!(parse_claim_line("random text").is_none());
    assert!(parse_claim_line("  #5 wf notapid cl").is_none());
}
