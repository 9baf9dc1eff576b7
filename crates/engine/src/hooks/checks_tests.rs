// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::LoopConfig;
use crate::hooks::execution::hook_output_path;
use gai_adapters::FakeVcs;
use gai_core::{FakeClock, WorkspaceClaim};
use gai_storage::{GaiDir, ProjectFile};
use std::os::unix::process::CommandExt;
use std::sync::Arc;

struct Fixture {
    _temp: tempfile::TempDir,
    engine: Engine<FakeClock>,
    pf: ProjectFile,
}

fn fixture(doc: &str) -> Fixture {
    fixture_with(doc, LoopConfig::default())
}

fn fixture_with(doc: &str, config: LoopConfig) -> Fixture {
    let temp = tempfile::tempdir().unwrap();
    let gai = GaiDir::at(temp.path());
    let gp = gai.project_file("web");
    std::fs::create_dir_all(gp.parent().unwrap()).unwrap();
    std::fs::write(&gp, doc).unwrap();
    gai.ensure_dir(gai.hooks_dir()).unwrap();
    for num in 100..103 {
        std::fs::create_dir_all(gai.workspace_dir("web", num)).unwrap();
    }
    let clock = FakeClock::new();
    clock.set_stamp("250801_120000");
    let engine = Engine::new(gai.clone(), clock, Arc::new(FakeVcs::new()), config);
    let pf = engine.project_file(&gp);
    Fixture { _temp: temp, engine, pf }
}

fn read_cs(f: &Fixture) -> ChangeSpec {
    f.pf.read_changespec("my_cl").unwrap()
}

/// A real process in its own group that we can observe alive and later
/// signal without hitting the test process.
fn spawn_sleeper() -> std::process::Child {
    std::process::Command::new("sleep").arg("300").process_group(0).spawn().unwrap()
}

#[test]
fn happy_hook_completes_and_releases_workspace() {
    let doc = "\
RUNNING:
  #100 axe(hooks)-1 1 my_cl

NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  lint
      | (1) [250801_115800] RUNNING - ($: 4000000)
";
    let f = fixture(doc);
    std::fs::write(
        hook_output_path(&f.engine.gai, "my_cl", "250801_115800"),
        "ok\n===HOOK_COMPLETE=== END_TIMESTAMP: 250801_115903 EXIT_CODE: 0\n",
    )
    .unwrap();

    let cs = read_cs(&f);
    let (updates, started) = f.engine.check_hooks(&cs, 0);
    assert_eq!(started, 0);
    assert!(updates.iter().any(|u| u.contains("'lint' -> PASSED (1m3s)")), "{updates:?}");

    let cs = read_cs(&f);
    let sl = cs.hooks[0].status_line_for_entry(&"1".parse().unwrap()).unwrap();
    assert_eq!(sl.status, HookStatus::Passed);
    assert_eq!(sl.suffix, None);
    // Exactly one status line, workspace lease released
    assert_eq!(cs.hooks[0].status_lines.len(), 1);
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
}

#[test]
fn dead_pid_without_marker_enters_pending_dead() {
    let doc = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  slow_test
      | (1) [250801_115800] RUNNING - ($: 4000000)
";
    let f = fixture(doc);
    let cs = read_cs(&f);
    let (updates, _) = f.engine.check_hooks(&cs, 0);
    assert!(updates.iter().any(|u| u.contains("PENDING_DEAD")), "{updates:?}");

    let cs = read_cs(&f);
    let sl = &cs.hooks[0].status_lines[0];
    assert_eq!(sl.status, HookStatus::Running, "pending-dead stays RUNNING");
    assert_eq!(sl.suffix_kind(), Some(SuffixKind::PendingDeadProcess));
    assert!(sl.suffix_value().unwrap().contains("4000000 | PENDING_DEAD:250801_120000"));
}

#[test]
fn pending_dead_recovers_when_marker_appears() {
    let doc = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  slow_test
      | (1) [250801_115800] RUNNING - (?$: 4000000 | PENDING_DEAD:250801_120000)
";
    let f = fixture(doc);
    std::fs::write(
        hook_output_path(&f.engine.gai, "my_cl", "250801_115800"),
        "===HOOK_COMPLETE=== END_TIMESTAMP: 250801_115930 EXIT_CODE: 0\n",
    )
    .unwrap();

    let cs = read_cs(&f);
    let (updates, _) = f.engine.check_hooks(&cs, 0);
    assert!(
        updates.iter().any(|u| u.contains("recovered from pending dead")),
        "{updates:?}"
    );

    let cs = read_cs(&f);
    let sl = &cs.hooks[0].status_lines[0];
    assert_eq!(sl.status, HookStatus::Passed, "no DEAD state was visited");
}

#[test]
fn pending_dead_confirms_after_grace_window() {
    let doc = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  slow_test
      | (1) [250801_115800] RUNNING - (?$: 4000000 | PENDING_DEAD:250801_120000)
";
    let f = fixture(doc);
    // 59s in: still waiting
    f.engine.clock.set_stamp("250801_120059");
    let cs = read_cs(&f);
    let (updates, _) = f.engine.check_hooks(&cs, 0);
    assert!(updates.is_empty(), "{updates:?}");
    assert_eq!(read_cs(&f).hooks[0].status_lines[0].status, HookStatus::Running);

    // 61s in: confirmed dead
    f.engine.clock.set_stamp("250801_120101");
    let cs = read_cs(&f);
    let (updates, _) = f.engine.check_hooks(&cs, 0);
    assert!(updates.iter().any(|u| u.contains("DEAD (confirmed after 60s)")), "{updates:?}");

    let cs = read_cs(&f);
    let sl = &cs.hooks[0].status_lines[0];
    assert_eq!(sl.status, HookStatus::Dead);
    assert_eq!(sl.suffix_kind(), Some(SuffixKind::KilledProcess));
    let value = sl.suffix_value().unwrap();
    assert!(value.starts_with("4000000 | ["));
    assert!(value.contains("Process confirmed dead after 60s timeout."));
}

#[test]
fn zombie_hook_is_reaped() {
    let child = spawn_sleeper();
    let doc = format!(
        "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  slow_test
      | (1) [250801_115800] RUNNING - ($: {})
",
        child.id()
    );
    let f = fixture(&doc);
    // Move past the zombie timeout (2h default)
    f.engine.clock.set_stamp("250801_140000");

    let cs = read_cs(&f);
    let (updates, _) = f.engine.check_hooks(&cs, 0);
    assert!(updates.iter().any(|u| u.contains("zombie")), "{updates:?}");

    let cs = read_cs(&f);
    let sl = &cs.hooks[0].status_lines[0];
    assert_eq!(sl.status, HookStatus::Dead);
    assert_eq!(sl.suffix_kind(), Some(SuffixKind::KilledProcess));
    assert!(sl.suffix_value().unwrap().contains("Killed zombie hook"));
}

#[test]
fn runner_cap_defers_limited_hooks_but_not_unlimited() {
    let child = spawn_sleeper();
    let doc = format!(
        "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  running_one
      | (1) [250801_115959] RUNNING - ($: {})
  echo limited-work
  !echo unlimited-work
",
        child.id()
    );
    let mut config = LoopConfig::default();
    config.max_runners = 1;
    let f = fixture_with(&doc, config);

    let cs = read_cs(&f);
    let (updates, started) = f.engine.check_hooks(&cs, 0);
    // The running hook saturates the budget: only the unlimited hook starts.
    assert_eq!(started, 0, "unlimited hooks do not count toward the budget");
    assert!(updates.iter().any(|u| u.contains("'!echo unlimited-work' -> RUNNING")), "{updates:?}");
    assert!(!updates.iter().any(|u| u.contains("'echo limited-work' -> RUNNING")), "{updates:?}");

    let _ = crate::process::try_kill_process_group(child.id() as i32);
}

#[test]
fn terminal_status_observes_completion_but_starts_nothing() {
    let doc = "\
NAME: my_cl
STATUS: Submitted
HISTORY:
  (1) initial
HOOKS:
  lint
      | (1) [250801_115800] RUNNING - ($: 4000000)
  echo never_started
";
    let f = fixture(doc);
    std::fs::write(
        hook_output_path(&f.engine.gai, "my_cl", "250801_115800"),
        "===HOOK_COMPLETE=== END_TIMESTAMP: 250801_115900 EXIT_CODE: 1\n",
    )
    .unwrap();

    let cs = read_cs(&f);
    let (updates, started) = f.engine.check_hooks(&cs, 0);
    assert_eq!(started, 0);
    assert!(updates.iter().any(|u| u.contains("FAILED")), "{updates:?}");
    assert!(!updates.iter().any(|u| u.contains("never_started")), "{updates:?}");
}

#[test]
fn second_tick_is_a_noop_for_settled_hooks() {
    let doc = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  lint
      | (1) [250801_115800] PASSED (1m0s)
";
    let f = fixture(doc);
    let cs = read_cs(&f);
    let (updates, started) = f.engine.check_hooks(&cs, 0);
    assert!(updates.is_empty());
    assert_eq!(started, 0);
}

#[test]
fn claimed_workspace_for_older_entry_survives_newer_entry_start() {
    // Entry 1's hooks still running in ws100 while entry 2 becomes
    // current: entry 2 claims its own workspace, ws100 stays claimed.
    let child = spawn_sleeper();
    let doc = format!(
        "\
RUNNING:
  #100 axe(hooks)-1 1 my_cl

NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
  (2) second
HOOKS:
  slow_one
      | (1) [250801_115900] RUNNING - ($: {pid})
  echo fast_one
      | (1) [250801_115901] PASSED (1s)
",
        pid = child.id()
    );
    let f = fixture(&doc);
    let cs = read_cs(&f);
    let (_updates, _started) = f.engine.check_hooks(&cs, 0);

    let claims = f.pf.claimed_workspaces().unwrap();
    let workflows: Vec<&str> = claims.iter().map(|c| c.workflow.as_str()).collect();
    assert!(workflows.contains(&"axe(hooks)-1"), "{workflows:?}");
    assert!(workflows.contains(&"axe(hooks)-2"), "{workflows:?}");

    let _ = crate::process::try_kill_process_group(child.id() as i32);
}

#[test]
fn global_running_count_spans_project_files() {
    let doc = "\
NAME: my_cl
STATUS: Drafted
HISTORY:
  (1) initial
HOOKS:
  lint
      | (1) [250801_115800] RUNNING - ($: 12345)
";
    let f = fixture(doc);
    // Second project with one running agent comment
    let other = f.engine.gai.project_file("api");
    std::fs::create_dir_all(other.parent().unwrap()).unwrap();
    std::fs::write(
        &other,
        "NAME: api_cl\nSTATUS: Mailed\nCOMMENTS:\n  [critique] ~/.gai/c.json - (@: crs-9-250801_120000)\n",
    )
    .unwrap();

    assert_eq!(f.engine.global_running_count(), 2);
}

#[test]
fn orphaned_claim_is_swept_for_terminal_cl() {
    let doc = "\
RUNNING:
  #100 axe(hooks)-1 4000000 my_cl

NAME: my_cl
STATUS: Reverted
";
    let f = fixture(doc);
    let project = f.pf.read().unwrap();
    let released = f.engine.cleanup_orphaned_workspace_claims(&project);
    assert_eq!(released, 1);
    assert!(f.pf.claimed_workspaces().unwrap().is_empty());
}
