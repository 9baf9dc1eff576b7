// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence substrate specs: the project file as a coordination
//! medium.

use super::prelude::Env;
use gai_core::project::PoolKind;
use gai_core::{ClStatus, WorkspaceClaim};
use gai_storage::lock::{lock_path_for, ProjectLock};
use gai_storage::StorageError;
use std::time::Duration;

const RICH_DOC: &str = "\
RUNNING:
  #101 axe(hooks)-2 4000000 my_cl

NAME: my_cl
DESCRIPTION:
  Add the frobnicator.

  With a second paragraph.
CL: http://cl/123456
PARENT: base_cl
STATUS: Drafted
TEST TARGETS:
  //web:unit (FAILED)
HISTORY:
  (1) initial commit
  (2) address lint [~/.gai/diffs/my_cl_2.diff]
  (2a) candidate fix [~/.gai/diffs/my_cl_2a.diff] - (~: BROKEN PROPOSAL)
HOOKS:
  !$bb_hg_presubmit
      | (1) [250801_100000] PASSED (2m3s)
      | (2) [250801_110000] RUNNING - ($: 4000000)
COMMENTS:
  [critique] ~/.gai/comments/my_cl.json
MENTORS:
  (2) style[1/2]
      | [250801_110500] style:alice - PASSED (3m0s)


NAME: base_cl
DESCRIPTION:
  The base.
STATUS: Submitted
";

#[test]
fn rich_document_survives_a_write_cycle() {
    let env = Env::new();
    let pf = env.write_project(RICH_DOC);

    // A field-level write must leave every other region intact.
    pf.set_cl_field("my_cl", Some("http://cl/999999")).unwrap();

    let project = pf.read().unwrap();
    assert_eq!(project.claims.len(), 1);
    let cs = project.changespec("my_cl").unwrap();
    assert_eq!(cs.cl.as_deref(), Some("http://cl/999999"));
    assert!(cs.description.contains("second paragraph"));
    assert_eq!(cs.test_targets[0].target, "//web:unit");
    assert!(cs.test_targets[0].failed);
    assert_eq!(cs.commits.len(), 3);
    assert_eq!(cs.hooks[0].status_lines.len(), 2);
    assert_eq!(cs.comments.len(), 1);
    assert_eq!(cs.mentors[0].status_lines.len(), 1);
    assert_eq!(project.changespec("base_cl").unwrap().status, ClStatus::Submitted);
}

#[test]
fn every_mutation_lands_in_git_history() {
    if !std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
    {
        return;
    }
    let env = Env::new();
    let pf = env.write_project(RICH_DOC);
    gai_storage::git_mirror::ensure_repo(&env.gai).unwrap();
    for (key, value) in [("user.email", "gai@example.invalid"), ("user.name", "gai")] {
        std::process::Command::new("git")
            .args(["config", key, value])
            .current_dir(env.gai.root())
            .output()
            .unwrap();
    }

    pf.transition_status("my_cl", &ClStatus::Mailed, true).unwrap();

    let log = std::process::Command::new("git")
        .args(["log", "--oneline"])
        .current_dir(env.gai.root())
        .output()
        .unwrap();
    let log = String::from_utf8_lossy(&log.stdout).into_owned();
    assert!(log.contains("Update STATUS for my_cl to Mailed"), "{log}");
}

#[test]
fn writers_serialize_on_the_lock() {
    let env = Env::new();
    let pf = env.write_project(RICH_DOC);

    let held = ProjectLock::exclusive(pf.path()).unwrap();
    let result = ProjectLock::acquire(
        pf.path(),
        true,
        Duration::from_millis(200),
        Duration::from_millis(20),
    );
    assert!(matches!(result, Err(StorageError::LockTimeout { .. })));
    drop(held);

    // The lock file stays behind, 0644 beside the project file
    assert!(lock_path_for(pf.path()).exists());
}

#[test]
fn lease_registry_claims_are_exclusive_per_slot() {
    let env = Env::new();
    let pf = env.write_project("NAME: my_cl\nSTATUS: Drafted\n");

    assert_eq!(pf.first_available_workspace(PoolKind::Scheduler).unwrap(), 100);
    assert!(pf.claim_workspace(WorkspaceClaim::new(100, "axe(hooks)-1", 1, "my_cl")).unwrap());
    assert!(!pf.claim_workspace(WorkspaceClaim::new(100, "other", 2, "my_cl")).unwrap());
    assert_eq!(pf.first_available_workspace(PoolKind::Scheduler).unwrap(), 101);

    assert!(pf.release_workspace(100, "axe(hooks)-1", "my_cl").unwrap());
    assert_eq!(pf.first_available_workspace(PoolKind::Scheduler).unwrap(), 100);
}

#[test]
fn workspace_numbers_stay_unique_under_concurrent_claims() {
    let env = Env::new();
    let pf = env.write_project("NAME: my_cl\nSTATUS: Drafted\n");
    let path = pf.path().to_path_buf();
    let gai = env.gai.clone();

    let mut handles = Vec::new();
    for worker in 0..4 {
        let path = path.clone();
        let gai = gai.clone();
        handles.push(std::thread::spawn(move || {
            let pf = gai_storage::ProjectFile::with_gai(path, gai);
            let mut claimed = Vec::new();
            for round in 0..3 {
                let num = pf.first_available_workspace(PoolKind::Loop).unwrap();
                // The claim re-checks under the lock, so losing the
                // race is normal; retry on the next number.
                if pf
                    .claim_workspace(WorkspaceClaim::new(
                        num,
                        format!("w{worker}-{round}"),
                        worker,
                        "my_cl",
                    ))
                    .unwrap()
                {
                    claimed.push(num);
                }
            }
            claimed
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let claims = env.project().claimed_workspaces().unwrap();
    let mut nums: Vec<u32> = claims.iter().map(|c| c.workspace_num).collect();
    let total = nums.len();
    nums.sort_unstable();
    nums.dedup();
    assert_eq!(nums.len(), total, "a workspace number was double-leased");
}

#[test]
fn parse_errors_skip_one_cl_not_the_file() {
    let env = Env::new();
    let pf = env.write_project(
        "NAME: good_one\nSTATUS: Drafted\n\n\nDESCRIPTION:\n  block with no name\n\n\nNAME: good_two\nSTATUS: WIP\n",
    );
    let project = pf.read().unwrap();
    let names: Vec<&str> = project.changespecs.iter().map(|cs| cs.name.as_str()).collect();
    assert_eq!(names, vec!["good_one", "good_two"]);
}
