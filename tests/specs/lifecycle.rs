// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revert / archive / restore scenarios.

use super::prelude::Env;
use gai_core::{ClStatus, SuffixKind};

const FAMILY: &str = "\
NAME: cl_a
STATUS: Mailed
CL: http://cl/111
HISTORY:
  (1) base work


NAME: cl_b
PARENT: cl_a
STATUS: Mailed
CL: http://cl/222
HISTORY:
  (1) child work


NAME: cl_c
PARENT: cl_b
STATUS: Drafted
CL: http://cl/333
";

#[test]
fn revert_cascade_keeps_references_consistent() {
    let env = Env::new();
    env.write_project(FAMILY);

    // Reverting the middle of the chain refuses while cl_c is active.
    let b = env.read("cl_b");
    assert!(env.engine().revert_changespec(&b).is_err());

    // Leaf first, then the middle.
    let c = env.read("cl_c");
    env.engine().revert_changespec(&c).unwrap();
    let b = env.read("cl_b");
    env.engine().revert_changespec(&b).unwrap();

    let project = env.project().read().unwrap();
    let c = project.changespec("cl_c__1").unwrap();
    assert_eq!(c.parent.as_deref(), Some("cl_b__1"), "PARENT cascaded with the rename");
    let b = project.changespec("cl_b__1").unwrap();
    assert_eq!(b.status, ClStatus::Reverted);
    assert_eq!(b.cl, None);

    // Saved diffs named after the new names
    assert!(env.gai.reverted_dir().join("cl_c__1.diff").exists());
    assert!(env.gai.reverted_dir().join("cl_b__1.diff").exists());

    // No dangling leases
    assert!(env.project().claimed_workspaces().unwrap().is_empty());
}

#[test]
fn revert_then_restore_round_trips() {
    let env = Env::new();
    env.write_project(
        "NAME: my_cl\nSTATUS: Mailed\nCL: http://cl/444\nHISTORY:\n  (1) work\nHOOKS:\n  lint\n      | (1) [250801_110000] PASSED (1s)\n",
    );

    let cs = env.read("my_cl");
    let reverted = env.engine().revert_changespec(&cs).unwrap();
    assert_eq!(reverted, "my_cl__1");

    let cs = env.read("my_cl__1");
    let restored = env.engine().restore_changespec(&cs).unwrap();
    assert_eq!(restored, "my_cl");

    let cs = env.read("my_cl");
    assert_eq!(cs.status, ClStatus::Wip);
    // Hook rows for the last entry cleared so the loop re-runs them
    let lint = cs.hooks.iter().find(|h| h.command == "lint").unwrap();
    assert!(lint.status_lines.is_empty());
    // Required hooks seeded by the commit glue
    assert!(cs.hooks.iter().any(|h| h.command == "!$bb_hg_presubmit"));
    assert!(cs.hooks.iter().any(|h| h.command == "$bb_hg_lint"));
    // The stashed diff was re-applied
    assert!(env.vcs.calls_for("apply_patch")[0].arg.ends_with("my_cl__1.diff"));
}

#[test]
fn revert_kills_and_marks_running_workers() {
    let env = Env::new();
    env.write_project(
        "NAME: busy_cl\nSTATUS: Mailed\nCL: http://cl/555\nHOOKS:\n  lint\n      | (1) [250801_110000] RUNNING - ($: 4000000)\nCOMMENTS:\n  [critique] /tmp/c.json - (@: crs-4000001-250801_110000)\n",
    );

    let cs = env.read("busy_cl");
    env.engine().revert_changespec(&cs).unwrap();

    let cs = env.read("busy_cl__1");
    let hook_line = &cs.hooks[0].status_lines[0];
    assert_eq!(hook_line.status, gai_core::HookStatus::Dead);
    assert_eq!(hook_line.suffix_kind(), Some(SuffixKind::KilledProcess));
    assert_eq!(cs.comments[0].suffix_kind(), Some(SuffixKind::KilledAgent));
}

#[test]
fn second_revert_of_same_base_name_picks_next_suffix() {
    let env = Env::new();
    env.write_project(
        "NAME: my_cl__1\nSTATUS: Reverted\n\n\nNAME: my_cl\nSTATUS: Mailed\nCL: http://cl/666\n",
    );
    let cs = env.read("my_cl");
    let renamed = env.engine().revert_changespec(&cs).unwrap();
    assert_eq!(renamed, "my_cl__2");
}
