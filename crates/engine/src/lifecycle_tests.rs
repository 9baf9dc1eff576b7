// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::LoopConfig;
use gai_adapters::FakeVcs;
use gai_core::FakeClock;
use gai_storage::GaiDir;
use std::sync::Arc;

struct Fixture {
    _temp: tempfile::TempDir,
    engine: Engine<FakeClock>,
    vcs: FakeVcs,
    pf: ProjectFile,
}

fn fixture(doc: &str) -> Fixture {
    let temp = tempfile::tempdir().unwrap();
    let gai = GaiDir::at(temp.path());
    let gp = gai.project_file("web");
    std::fs::create_dir_all(gp.parent().unwrap()).unwrap();
    std::fs::write(&gp, doc).unwrap();
    for num in 100..103 {
        std::fs::create_dir_all(gai.workspace_dir("web", num)).unwrap();
    }
    let clock = FakeClock::new();
    clock.set_stamp("250801_120000");
    let vcs = FakeVcs::new();
    let engine = Engine::new(gai.clone(), clock, Arc::new(vcs.clone()), LoopConfig::default());
    let pf = engine.project_file(&gp);
    Fixture { _temp: temp, engine, vcs, pf }
}

const FAMILY_DOC: &str = "\
NAME: cl_a
STATUS: Mailed
CL: http://cl/111
HISTORY:
  (1) base work


NAME: cl_b
PARENT: cl_a
STATUS: Mailed
CL: http://cl/222


NAME: cl_c
PARENT: cl_b
STATUS: Drafted
CL: http://cl/333
";

#[test]
fn revert_refuses_while_children_are_active() {
    let f = fixture(FAMILY_DOC);
    let cs = f.pf.read_changespec("cl_b").unwrap();
    let err = f.engine.revert_changespec(&cs);
    assert!(matches!(err, Err(EngineError::Refused(_))));
    // Nothing pruned
    assert!(f.vcs.calls_for("prune").is_empty());
}

#[test]
fn revert_cascades_rename_and_references() {
    let f = fixture(FAMILY_DOC);

    // Revert the leaf first
    let cs = f.pf.read_changespec("cl_c").unwrap();
    let new_name = f.engine.revert_changespec(&cs).unwrap();
    assert_eq!(new_name, "cl_c__1");

    // Now cl_b has no active children and can follow
    let cs = f.pf.read_changespec("cl_b").unwrap();
    let new_name = f.engine.revert_changespec(&cs).unwrap();
    assert_eq!(new_name, "cl_b__1");

    let project = f.pf.read().unwrap();
    // No dangling PARENT references
    let c = project.changespec("cl_c__1").unwrap();
    assert_eq!(c.parent.as_deref(), Some("cl_b__1"));
    let b = project.changespec("cl_b__1").unwrap();
    assert_eq!(b.status, ClStatus::Reverted);
    assert_eq!(b.cl, None, "CL url cleared on revert");

    // Diffs saved under reverted/
    assert!(f.engine.gai.reverted_dir().join("cl_b__1.diff").exists());
    // Revisions pruned by original name
    let pruned: Vec<String> = f.vcs.calls_for("prune").iter().map(|c| c.arg.clone()).collect();
    assert_eq!(pruned, vec!["cl_c", "cl_b"]);

    // Lifecycle leases were released
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
}

#[test]
fn revert_requires_a_cl_url() {
    let doc = "NAME: wip_cl\nSTATUS: WIP\n";
    let f = fixture(doc);
    let cs = f.pf.read_changespec("wip_cl").unwrap();
    assert!(matches!(f.engine.revert_changespec(&cs), Err(EngineError::Refused(_))));
}

#[test]
fn revert_kills_running_workers_first() {
    let doc = "\
NAME: busy_cl
STATUS: Mailed
CL: http://cl/444
HOOKS:
  lint
      | (1) [250801_110000] RUNNING - ($: 4000000)
COMMENTS:
  [critique] /tmp/c.json - (@: crs-4000001-250801_110000)
";
    let f = fixture(doc);
    let cs = f.pf.read_changespec("busy_cl").unwrap();
    f.engine.revert_changespec(&cs).unwrap();

    let cs = f.pf.read_changespec("busy_cl__1").unwrap();
    let hook_line = &cs.hooks[0].status_lines[0];
    assert_eq!(hook_line.status, gai_core::HookStatus::Dead);
    assert_eq!(hook_line.suffix_kind(), Some(SuffixKind::KilledProcess));
    assert!(hook_line
        .suffix_value()
        .unwrap()
        .contains("Killed hook running on reverted CL."));
    assert_eq!(cs.comments[0].suffix_kind(), Some(SuffixKind::KilledAgent));
}

#[test]
fn archive_requires_terminal_children() {
    let f = fixture(FAMILY_DOC);
    let cs = f.pf.read_changespec("cl_b").unwrap();
    assert!(matches!(f.engine.archive_changespec(&cs), Err(EngineError::Refused(_))));

    // Revert the child, then archive works and preserves the CL url
    let child = f.pf.read_changespec("cl_c").unwrap();
    f.engine.revert_changespec(&child).unwrap();

    let cs = f.pf.read_changespec("cl_b").unwrap();
    let new_name = f.engine.archive_changespec(&cs).unwrap();
    assert_eq!(new_name, "cl_b__1");

    let archived = f.pf.read_changespec("cl_b__1").unwrap();
    assert_eq!(archived.status, ClStatus::Archived);
    assert_eq!(archived.cl.as_deref(), Some("http://cl/222"), "archive keeps the CL url");
    assert!(f.engine.gai.archived_dir().join("cl_b__1.diff").exists());
    assert_eq!(f.vcs.calls_for("archive").len(), 1);
    // Only the child's revert pruned anything
    let pruned: Vec<String> = f.vcs.calls_for("prune").iter().map(|c| c.arg.clone()).collect();
    assert_eq!(pruned, vec!["cl_c"]);
}

#[test]
fn restore_round_trips_a_reverted_cl() {
    let doc = "\
NAME: my_cl__1
PARENT: base_cl
STATUS: Reverted
HISTORY:
  (1) initial
  (2) second
HOOKS:
  lint
      | (1) [250801_100000] PASSED (1s)
      | (2) [250801_110000] PASSED (1s)


NAME: base_cl
STATUS: Submitted
";
    let f = fixture(doc);
    std::fs::create_dir_all(f.engine.gai.reverted_dir()).unwrap();
    std::fs::write(f.engine.gai.reverted_dir().join("my_cl__1.diff"), "diff body\n").unwrap();

    let cs = f.pf.read_changespec("my_cl__1").unwrap();
    let restored = f.engine.restore_changespec(&cs).unwrap();
    assert_eq!(restored, "my_cl");

    let cs = f.pf.read_changespec("my_cl").unwrap();
    assert_eq!(cs.status, ClStatus::Wip, "commit glue resets status");
    // Hook rows for the last entry were cleared for a re-run
    let lint = cs.hooks.iter().find(|h| h.command == "lint").unwrap();
    assert!(lint.status_line_for_entry(&"2".parse().unwrap()).is_none());
    assert!(lint.status_line_for_entry(&"1".parse().unwrap()).is_some());
    // Required hooks were seeded
    assert!(cs.hooks.iter().any(|h| h.command == "!$bb_hg_presubmit"));

    // Checked out the parent and applied the stashed diff
    assert_eq!(f.vcs.calls_for("checkout")[0].arg, "base_cl");
    assert!(f.vcs.calls_for("apply_patch")[0].arg.ends_with("my_cl__1.diff"));
}

#[test]
fn restore_refuses_active_cls() {
    let doc = "NAME: my_cl\nSTATUS: Drafted\n";
    let f = fixture(doc);
    let cs = f.pf.read_changespec("my_cl").unwrap();
    assert!(matches!(f.engine.restore_changespec(&cs), Err(EngineError::Refused(_))));
}

#[test]
fn restore_without_saved_diff_refuses() {
    let doc = "NAME: my_cl__1\nSTATUS: Reverted\n";
    let f = fixture(doc);
    let cs = f.pf.read_changespec("my_cl__1").unwrap();
    let err = f.engine.restore_changespec(&cs);
    assert!(matches!(err, Err(EngineError::Refused(_))));
}

#[test]
fn lifecycle_name_skips_existing_suffixes() {
    let a = gai_core::ChangeSpec::builder().name("cl__1").build();
    let b = gai_core::ChangeSpec::builder().name("cl").status(ClStatus::Mailed).build();
    let all = vec![a, b.clone()];
    assert_eq!(lifecycle_new_name(&b, &all), "cl__2");

    // WIP with an existing suffix keeps its name
    let wip = gai_core::ChangeSpec::builder().name("cl__1").status(ClStatus::Wip).build();
    assert_eq!(lifecycle_new_name(&wip, &all), "cl__1");
}
