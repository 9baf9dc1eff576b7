// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook and agent pipeline scenarios.

use super::prelude::Env;
use gai_core::{HookStatus, SuffixKind};
use gai_engine::hooks::mutations::try_claim_hook_for_fix;

#[test]
fn happy_hook_runs_to_passed_across_ticks() {
    let env = Env::new();
    env.write_project(
        "NAME: my_cl\nSTATUS: Drafted\nHISTORY:\n  (1) initial\nHOOKS:\n  echo lint-ok\n",
    );

    // Tick 1: the hook is stale and gets launched against a leased
    // workspace.
    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    let line = cs.hooks[0].status_line_for_entry(&"1".parse().unwrap()).unwrap();
    assert_eq!(line.status, HookStatus::Running);
    assert_eq!(line.suffix_kind(), Some(SuffixKind::RunningProcess));
    assert_eq!(env.project().claimed_workspaces().unwrap().len(), 1);

    // The wrapper needs a moment to write its completion marker.
    let stamp = line.timestamp.clone();
    let output = gai_engine::hooks::hook_output_path(&env.gai, "my_cl", &stamp);
    env.wait_until(|| {
        std::fs::read_to_string(&output)
            .map(|c| c.contains("===HOOK_COMPLETE==="))
            .unwrap_or(false)
    });

    // Tick 2: the marker is observed, the line settles, the lease goes.
    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    assert_eq!(cs.hooks[0].status_lines.len(), 1, "exactly one status line");
    let line = &cs.hooks[0].status_lines[0];
    assert_eq!(line.status, HookStatus::Passed);
    assert!(env.project().claimed_workspaces().unwrap().is_empty(), "workspace released");
}

#[test]
fn pending_dead_never_flaps_back_to_plain_running() {
    let env = Env::new();
    env.write_project(
        "NAME: my_cl\nSTATUS: Drafted\nHISTORY:\n  (1) initial\nHOOKS:\n  slow_test\n      | (1) [250801_115800] RUNNING - ($: 4000000)\n",
    );

    // Tick: the PID is gone, no marker → pending-dead window opens.
    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    assert_eq!(cs.hooks[0].status_lines[0].suffix_kind(), Some(SuffixKind::PendingDeadProcess));

    // Grace elapses with no marker → confirmed DEAD, and the line
    // never returns to a live state afterwards.
    env.clock().set_stamp("250801_120200");
    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    assert_eq!(cs.hooks[0].status_lines[0].status, HookStatus::Dead);
    assert_eq!(cs.hooks[0].status_lines[0].suffix_kind(), Some(SuffixKind::KilledProcess));

    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    assert_eq!(cs.hooks[0].status_lines[0].status, HookStatus::Dead, "no flapping");
}

#[test]
fn ready_to_mail_toggles_exactly_with_its_gates() {
    let env = Env::new();
    let pf = env.write_project(
        "NAME: my_cl\nSTATUS: Drafted\nHISTORY:\n  (3) current\nHOOKS:\n  lint\n      | (3) [250801_115800] PASSED (5s)\n",
    );

    env.scheduler.run_hooks_cycle();
    assert!(env.read("my_cl").ready_to_mail, "all three gates hold");

    // Introduce a FAILED line; the next tick removes the suffix.
    let mut hooks = pf.read_hooks("my_cl").unwrap();
    hooks[0].status_lines[0].status = HookStatus::Failed;
    pf.update_hooks_field("my_cl", &hooks).unwrap();

    env.scheduler.run_hooks_cycle();
    assert!(!env.read("my_cl").ready_to_mail, "gate broken, suffix gone");
}

#[test]
fn fix_hook_claim_serializes_competing_schedulers() {
    let env = Env::new();
    let pf = env.write_project(
        "NAME: my_cl\nSTATUS: Drafted\nHISTORY:\n  (4) current\nHOOKS:\n  test_a\n      | (4) [250801_110000] FAILED (10s) - (%: two tests broke)\n",
    );

    // Two ticks race for the same failed line; the claim is atomic so
    // exactly one wins.
    let entry = "4".parse().unwrap();
    let first =
        try_claim_hook_for_fix(&pf, "my_cl", "test_a", &entry, "claiming-250801_120000").unwrap();
    let second =
        try_claim_hook_for_fix(&pf, "my_cl", "test_a", &entry, "claiming-250801_120001").unwrap();

    assert_eq!(first.as_deref(), Some("two tests broke"));
    assert_eq!(second, None, "the second claimant must lose");

    let cs = env.read("my_cl");
    let suffix = cs.hooks[0].status_lines[0].suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::ClaimingFix);
    assert_eq!(suffix.value, "claiming-250801_120000");
    assert_eq!(suffix.summary.as_deref(), Some("two tests broke"), "summary preserved");
}

#[test]
fn summarize_then_fix_handoff_lands_a_proposal_reference() {
    let mut config = gai_engine::LoopConfig::default();
    config.agents.fix_hook = "true".to_string();
    let env = Env::with_config(config);
    env.write_project(
        "NAME: my_cl\nSTATUS: Drafted\nHISTORY:\n  (4) current [/tmp/d4.diff]\n  (4a) agent fix [/tmp/d4a.diff]\nHOOKS:\n  test_a\n      | (4) [250801_110000] FAILED (10s) - (@: summarize_hook-4000000-250801_113000)\n",
    );

    // The summarize agent has finished and left its summary + marker.
    std::fs::write(
        gai_engine::workflows::workflow_output_path(
            &env.gai,
            "my_cl",
            "summarize-hook",
            "250801_113000",
        ),
        "tests broke in frobnicator_test\n===WORKFLOW_COMPLETE=== EXIT_CODE: 0\n",
    )
    .unwrap();

    // Tick: summary recorded, fix-hook chained immediately.
    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    let line = cs.hooks[0].status_line_for_entry(&"4".parse().unwrap()).unwrap();
    let suffix = line.suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::RunningAgent);
    assert!(suffix.value.starts_with("fix_hook-"));
    assert_eq!(suffix.summary.as_deref(), Some("tests broke in frobnicator_test"));

    // The fix-hook agent reports a proposal; the next tick records the
    // reference and auto-accepts.
    let token = suffix.value.clone();
    let stamp = gai_core::suffix::extract_stamp_from_agent_suffix(&token).unwrap();
    std::fs::write(
        gai_engine::workflows::workflow_output_path(&env.gai, "my_cl", "fix-hook", &stamp),
        "===WORKFLOW_COMPLETE=== PROPOSAL: 4a EXIT_CODE: 0\n",
    )
    .unwrap();

    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    let line = cs.hooks[0].status_line_for_entry(&"4".parse().unwrap()).unwrap();
    let suffix = line.suffix.clone().unwrap();
    assert_eq!(suffix.kind, SuffixKind::EntryRef);
    assert_eq!(suffix.value, "4a");
    assert_eq!(suffix.summary.as_deref(), Some("tests broke in frobnicator_test"));

    // Auto-accept renumbered the proposal onto the top of history.
    assert!(cs.entry_by_id(&"5".parse().unwrap()).is_some());
    assert_eq!(env.vcs.calls_for("amend").len(), 1);
}

#[test]
fn global_cap_counts_runners_across_project_files() {
    let mut config = gai_engine::LoopConfig::default();
    config.max_runners = 1;
    let env = Env::with_config(config);
    env.write_project(
        "NAME: my_cl\nSTATUS: Drafted\nHISTORY:\n  (1) initial\nHOOKS:\n  echo would-run\n",
    );
    // A second project already holds the only runner slot. The PID
    // must be live or the liveness pass would retire the line first.
    let other = env.gai.project_file("api");
    std::fs::create_dir_all(other.parent().unwrap()).unwrap();
    std::fs::write(
        &other,
        format!(
            "NAME: api_cl\nSTATUS: Drafted\nHISTORY:\n  (1) x\nHOOKS:\n  busy\n      | (1) [250801_115900] RUNNING - ($: {})\n",
            std::process::id()
        ),
    )
    .unwrap();

    env.scheduler.run_hooks_cycle();
    let cs = env.read("my_cl");
    assert!(
        cs.hooks[0].status_lines.is_empty(),
        "limited hook deferred while the global budget is consumed"
    );
}
