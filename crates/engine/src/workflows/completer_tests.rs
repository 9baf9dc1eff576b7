// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::LoopConfig;
use gai_adapters::FakeVcs;
use gai_core::FakeClock;
use gai_core::WorkspaceClaim;
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
    gai.ensure_dir(gai.workflows_dir()).unwrap();
    for num in 200..203 {
        std::fs::create_dir_all(gai.workspace_dir("web", num)).unwrap();
    }
    let clock = FakeClock::new();
    clock.set_stamp("250801_121000");
    let vcs = FakeVcs::new();
    let engine =
        Engine::new(gai.clone(), clock, Arc::new(vcs.clone()), LoopConfig::default());
    let pf = engine.project_file(&gp);
    Fixture { _temp: temp, engine, vcs, pf }
}

const CRS_RUNNING: &str = "\
RUNNING:
  #200 loop(crs)-critique 4000000 my_cl

NAME: my_cl
STATUS: Mailed
HISTORY:
  (2) current [/tmp/my_cl_2.diff]
  (2a) responder proposal [/tmp/my_cl_2a.diff]
COMMENTS:
  [critique] ~/.gai/comments/my_cl.json - (@: crs-4000000-250801_120000)
";

#[test]
fn crs_success_auto_accepts_and_releases() {
    let f = fixture(CRS_RUNNING);
    std::fs::write(
        workflow_output_path(&f.engine.gai, "my_cl", "crs", "250801_120000"),
        "done\n===WORKFLOW_COMPLETE=== PROPOSAL: 2a EXIT_CODE: 0\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(
        updates.iter().any(|u| u.contains("COMPLETED, auto-accepted (2a)")),
        "{updates:?}"
    );

    // Diff applied + amended in the agent's workspace
    assert_eq!(f.vcs.calls_for("apply_diff").len(), 1);
    assert_eq!(f.vcs.calls_for("amend").len(), 1);

    // Workspace released, agent tag cleared
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
    let cs = f.pf.read_changespec("my_cl").unwrap();
    assert_eq!(cs.comments[0].suffix, None);

    // The proposal was renumbered to the next accepted entry
    assert!(cs.entry_by_id(&"3".parse().unwrap()).is_some());
    assert!(cs.entry_by_id(&"2a".parse().unwrap()).is_none());
}

#[test]
fn crs_failure_marks_unresolved() {
    let f = fixture(CRS_RUNNING);
    std::fs::write(
        workflow_output_path(&f.engine.gai, "my_cl", "crs", "250801_120000"),
        "===WORKFLOW_COMPLETE=== EXIT_CODE: 2\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(updates.iter().any(|u| u.contains("FAILED (exit 2)")), "{updates:?}");

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let suffix = cs.comments[0].suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::Error);
    assert_eq!(suffix.value, "Unresolved Critique Comments");
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
}

#[test]
fn incomplete_output_leaves_workflow_running() {
    let f = fixture(CRS_RUNNING);
    // No output file at all
    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(updates.is_empty());
    assert_eq!(f.pf.claimed_workspaces().unwrap().len(), 1);
}

const FIX_RUNNING: &str = "\
RUNNING:
  #200 loop(fix-hook)-250801_120000 4000000 my_cl

NAME: my_cl
STATUS: Drafted
HISTORY:
  (2) current [/tmp/my_cl_2.diff]
  (2a) agent fix [/tmp/my_cl_2a.diff]
HOOKS:
  test_a
      | (2) [250801_110000] FAILED (10s) - (@: fix_hook-4000000-250801_120000 | tests broke in foo)
";

#[test]
fn fix_hook_success_sets_entry_ref_and_accepts() {
    let f = fixture(FIX_RUNNING);
    std::fs::write(
        workflow_output_path(&f.engine.gai, "my_cl", "fix-hook", "250801_120000"),
        "===WORKFLOW_COMPLETE=== PROPOSAL: 2a EXIT_CODE: 0\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(
        updates.iter().any(|u| u.contains("COMPLETED, auto-accepted (2a)")),
        "{updates:?}"
    );

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let sl = cs.hooks[0].status_line_for_entry(&"2".parse().unwrap()).unwrap();
    let suffix = sl.suffix.clone().unwrap();
    // Proposal reference with the summary preserved
    assert_eq!(suffix.kind, SuffixKind::EntryRef);
    assert_eq!(suffix.value, "2a");
    assert_eq!(suffix.summary.as_deref(), Some("tests broke in foo"));
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
}

#[test]
fn fix_hook_failure_keeps_summary_and_flags_error() {
    let f = fixture(FIX_RUNNING);
    std::fs::write(
        workflow_output_path(&f.engine.gai, "my_cl", "fix-hook", "250801_120000"),
        "===WORKFLOW_COMPLETE=== EXIT_CODE: 1\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(updates.iter().any(|u| u.contains("FAILED (exit 1)")), "{updates:?}");

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let sl = cs.hooks[0].status_line_for_entry(&"2".parse().unwrap()).unwrap();
    let suffix = sl.suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::Error);
    assert_eq!(suffix.value, "fix-hook Failed");
    // The prior summary survives behind the output path
    let summary = suffix.summary.unwrap();
    assert!(summary.contains("tests broke in foo"));
    assert!(summary.contains("my_cl_fix-hook-250801_120000.txt"));
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
}

const SUMMARIZE_RUNNING: &str = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (2) current
HOOKS:
  test_a
      | (2) [250801_110000] FAILED (10s) - (@: summarize_hook-4000000-250801_120000)
";

#[test]
fn summarize_success_chains_fix_hook() {
    let f = fixture(SUMMARIZE_RUNNING);
    // Make the chained fix-hook launch viable
    let mut engine = f.engine.clone();
    engine.config.agents.fix_hook = "true".to_string();
    std::fs::write(
        workflow_output_path(&engine.gai, "my_cl", "summarize-hook", "250801_120000"),
        "tests broke: missing dep\n===WORKFLOW_COMPLETE=== EXIT_CODE: 0\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = engine.check_and_complete_workflows(&cs);
    assert!(updates.iter().any(|u| u.contains("summarize-hook workflow 'test_a' -> COMPLETED")), "{updates:?}");
    // The chain fired: fix-hook claimed the summary and launched
    assert!(updates.iter().any(|u| u.contains("fix-hook workflow -> RUNNING")), "{updates:?}");

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let sl = cs.hooks[0].status_line_for_entry(&"2".parse().unwrap()).unwrap();
    let suffix = sl.suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::RunningAgent);
    assert!(suffix.value.starts_with("fix_hook-"));
    assert_eq!(suffix.summary.as_deref(), Some("tests broke: missing dep"));
}

#[test]
fn summarize_failure_sets_fallback_error() {
    let f = fixture(SUMMARIZE_RUNNING);
    std::fs::write(
        workflow_output_path(&f.engine.gai, "my_cl", "summarize-hook", "250801_120000"),
        "===WORKFLOW_COMPLETE=== EXIT_CODE: 1\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(updates.iter().any(|u| u.contains("FAILED (exit 1)")), "{updates:?}");

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let suffix = cs.hooks[0].status_lines[0].suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::Error);
    assert_eq!(suffix.value, "Hook Command Failed");
}

#[test]
fn summarize_on_proposal_entry_does_not_chain() {
    let doc = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (2) current
  (2a) candidate [/tmp/d.diff]
HOOKS:
  test_a
      | (2a) [250801_110000] FAILED (10s) - (@: summarize_hook-4000000-250801_120000)
";
    let f = fixture(doc);
    std::fs::write(
        workflow_output_path(&f.engine.gai, "my_cl", "summarize-hook", "250801_120000"),
        "candidate still broken\n===WORKFLOW_COMPLETE=== EXIT_CODE: 0\n",
    )
    .unwrap();

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let updates = f.engine.check_and_complete_workflows(&cs);
    assert!(updates.iter().any(|u| u.contains("COMPLETED")), "{updates:?}");
    assert!(!updates.iter().any(|u| u.contains("fix-hook workflow")), "{updates:?}");

    let cs = f.pf.read_changespec("my_cl").unwrap();
    let sl = cs.hooks[0].status_line_for_entry(&"2a".parse().unwrap()).unwrap();
    assert_eq!(sl.suffix_kind(), Some(SuffixKind::SummarizeComplete));
    assert_eq!(sl.suffix_value(), Some("candidate still broken"));
}

#[test]
fn claim_rows_round_trip_through_the_fixture() {
    let f = fixture(CRS_RUNNING);
    let claims = f.pf.claimed_workspaces().unwrap();
    assert_eq!(
        claims[0],
        WorkspaceClaim {
            workspace_num: 200,
            workflow: "loop(crs)-critique".to_string(),
            pid: 4000000,
            cl_name: "my_cl".to_string(),
            artifacts_timestamp: None,
        }
    );
}
