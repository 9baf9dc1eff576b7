// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parse::parse_project;
use gai_core::changespec::ChangeSpec;
use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus, HookStatusLine};
use gai_core::project::{ProjectSpec, WorkspaceClaim};
use gai_core::status::ClStatus;
use gai_core::suffix::{Suffix, SuffixKind};
use proptest::prelude::*;
use std::path::PathBuf;

fn round_trip(project: &ProjectSpec) -> ProjectSpec {
    let text = serialize_project(project);
    parse_project(&project.path, &text)
}

#[test]
fn minimal_changespec_round_trips() {
    let cs = ChangeSpec::builder()
        .name("my_cl")
        .description("One line.")
        .status(ClStatus::Wip)
        .file_path("/tmp/web.gp")
        .build();
    let project = ProjectSpec {
        path: PathBuf::from("/tmp/web.gp"),
        claims: Vec::new(),
        changespecs: vec![cs],
    };
    assert_eq!(round_trip(&project), project);
}

#[test]
fn claims_block_round_trips() {
    let mut claim = WorkspaceClaim::new(101, "axe(hooks)-3", 4242, "my_cl");
    claim.artifacts_timestamp = Some("250801_120000".to_string());
    let project = ProjectSpec {
        path: PathBuf::from("/tmp/web.gp"),
        claims: vec![claim, WorkspaceClaim::new(1, "tmux", 7, "other_cl")],
        changespecs: Vec::new(),
    };
    assert_eq!(round_trip(&project), project);
}

#[test]
fn hook_status_lines_are_sorted_by_entry_on_write() {
    let mut hook = HookEntry::new("lint");
    for (entry, ts) in [("2", "250801_120000"), ("1", "250801_110000"), ("1a", "250801_113000")] {
        hook.status_lines.push(HookStatusLine {
            entry: entry.parse().unwrap(),
            timestamp: ts.into(),
            status: HookStatus::Passed,
            duration: Some("1s".into()),
            suffix: None,
        });
    }
    let lines = hooks_field_lines(&[hook]);
    let order: Vec<&str> = lines
        .iter()
        .filter(|l| l.starts_with("      | "))
        .map(|l| {
            let start = l.find('(').unwrap() + 1;
            &l[start..l.find(')').unwrap()]
        })
        .collect();
    assert_eq!(order, vec!["1", "1a", "2"]);
}

#[test]
fn status_line_rendering_matches_grammar() {
    let sl = HookStatusLine {
        entry: "3".parse().unwrap(),
        timestamp: "250801_120000".into(),
        status: HookStatus::Running,
        duration: None,
        suffix: Some(Suffix::new(SuffixKind::RunningProcess, "12345")),
    };
    assert_eq!(hook_status_line(&sl), "      | (3) [250801_120000] RUNNING - ($: 12345)");

    let done = HookStatusLine {
        entry: "3".parse().unwrap(),
        timestamp: "250801_120000".into(),
        status: HookStatus::Passed,
        duration: Some("2m3s".into()),
        suffix: None,
    };
    assert_eq!(hook_status_line(&done), "      | (3) [250801_120000] PASSED (2m3s)");
}

#[test]
fn full_document_round_trips() {
    let mut hook = HookEntry::new("!$bb_hg_presubmit");
    hook.status_lines.push(HookStatusLine {
        entry: "2".parse().unwrap(),
        timestamp: "250801_120000".into(),
        status: HookStatus::Failed,
        duration: Some("42s".into()),
        suffix: Some(Suffix::with_summary(
            SuffixKind::Error,
            "fix-hook Failed",
            Some("summary text".into()),
        )),
    });
    let cs = ChangeSpec::builder()
        .name("full_cl")
        .description("Line one.\n\nLine three.")
        .kickstart("Seed prompt.")
        .cl("http://cl/999")
        .bug("b/1")
        .parent("base")
        .status(ClStatus::Drafted)
        .hooks(vec![hook])
        .file_path("/tmp/web.gp")
        .build();
    let base = ChangeSpec::builder()
        .name("base")
        .description("Base.")
        .status(ClStatus::Submitted)
        .file_path("/tmp/web.gp")
        .build();
    let project = ProjectSpec {
        path: PathBuf::from("/tmp/web.gp"),
        claims: vec![WorkspaceClaim::new(100, "axe(hooks)-2", 1, "full_cl")],
        changespecs: vec![cs, base],
    };
    assert_eq!(round_trip(&project), project);
}

fn arb_entry_id() -> impl Strategy<Value = EntryId> {
    (1u32..20, proptest::option::of(proptest::char::range('a', 'd')))
        .prop_map(|(number, letter)| EntryId { number, letter })
}

fn arb_suffix() -> impl Strategy<Value = Suffix> {
    prop_oneof![
        Just(Suffix::error("lint failed")),
        Just(Suffix::new(SuffixKind::RunningProcess, "4242")),
        Just(Suffix::new(SuffixKind::RunningAgent, "fix_hook-9-250801_120000")),
        Just(Suffix::new(SuffixKind::SummarizeComplete, "broken test")),
        Just(Suffix::plain("note")),
        Just(Suffix::with_summary(SuffixKind::EntryRef, "2a", Some("kept summary".into()))),
    ]
}

fn arb_hook() -> impl Strategy<Value = HookEntry> {
    (
        "[a-z_]{3,12}",
        proptest::collection::vec(
            (arb_entry_id(), proptest::option::of(arb_suffix())),
            0..4,
        ),
    )
        .prop_map(|(command, lines)| {
            let mut hook = HookEntry::new(command);
            let mut seen = std::collections::HashSet::new();
            for (idx, (entry, suffix)) in lines.into_iter().enumerate() {
                if !seen.insert(entry.clone()) {
                    continue; // one status line per entry id
                }
                hook.status_lines.push(HookStatusLine {
                    entry,
                    timestamp: format!("250801_1200{:02}", idx),
                    status: HookStatus::Passed,
                    duration: Some("1s".into()),
                    suffix,
                });
            }
            hook.status_lines.sort_by(|a, b| a.entry.cmp(&b.entry));
            hook
        })
}

proptest! {
    // parse(serialize(doc)) == doc for generated documents: the
    // serializer is a section of the parser.
    #[test]
    fn round_trip_law(
        name in "[a-z][a-z0-9_]{1,12}",
        description in "[A-Za-z ]{0,40}",
        hooks in proptest::collection::vec(arb_hook(), 0..3),
    ) {
        let mut unique = hooks;
        let mut seen = std::collections::HashSet::new();
        unique.retain(|h| seen.insert(h.command.clone()));
        let cs = ChangeSpec::builder()
            .name(name)
            .description(description.trim())
            .status(ClStatus::Drafted)
            .hooks(unique)
            .file_path("/tmp/prop.gp")
            .build();
        let project = ProjectSpec {
            path: PathBuf::from("/tmp/prop.gp"),
            claims: Vec::new(),
            changespecs: vec![cs],
        };
        prop_assert_eq!(round_trip(&project), project);
    }
}
