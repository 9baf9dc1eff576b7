// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lease registry: the `RUNNING:` block.
//!
//! A claim row leases one numbered checkout directory to a named
//! workflow for the life of its PID. Claim and release re-check the
//! on-disk state under the exclusive lock, so two schedulers racing for
//! the same slot cannot both win.

use crate::error::StorageError;
use crate::parse::parse_claim_line;
use crate::project_file::ProjectFile;
use crate::serialize::claim_line;
use gai_core::project::{PoolKind, WorkspaceClaim};

/// Region of the RUNNING block in raw lines: (header index, end
/// exclusive). None when the file has no block yet.
fn running_region(lines: &[String]) -> Option<(usize, usize)> {
    let start = lines.iter().position(|l| l.trim_end() == "RUNNING:")?;
    let mut end = start + 1;
    while end < lines.len() && parse_claim_line(lines[end].trim_end()).is_some() {
        end += 1;
    }
    Some((start, end))
}

fn claims_in(lines: &[String]) -> Vec<WorkspaceClaim> {
    match running_region(lines) {
        Some((start, end)) => lines[start + 1..end]
            .iter()
            .filter_map(|l| parse_claim_line(l.trim_end()))
            .collect(),
        None => Vec::new(),
    }
}

fn write_claims(lines: &mut Vec<String>, claims: &[WorkspaceClaim]) {
    let mut block: Vec<String> = Vec::new();
    if !claims.is_empty() {
        block.push("RUNNING:".to_string());
        block.extend(claims.iter().map(claim_line));
    }
    match running_region(lines) {
        Some((start, end)) => {
            lines.splice(start..end, block);
        }
        None if !block.is_empty() => {
            block.push(String::new());
            lines.splice(0..0, block);
        }
        None => {}
    }
}

impl ProjectFile {
    /// Read-only snapshot of the claims block.
    pub fn claimed_workspaces(&self) -> Result<Vec<WorkspaceClaim>, StorageError> {
        Ok(self.read()?.claims)
    }

    /// Lowest unused workspace number in the pool.
    pub fn first_available_workspace(&self, pool: PoolKind) -> Result<u32, StorageError> {
        self.read()?.first_available_workspace(pool).ok_or(StorageError::WorkspaceUnavailable)
    }

    /// Claim a workspace slot. Re-checks the slot is free under the
    /// lock; returns false if another writer got there first.
    pub fn claim_workspace(&self, claim: WorkspaceClaim) -> Result<bool, StorageError> {
        let message = format!(
            "Claim workspace #{} for {} ({})",
            claim.workspace_num, claim.workflow, claim.cl_name
        );
        self.mutate_lines(&message, move |lines| {
            let mut claims = claims_in(lines);
            if claims.iter().any(|c| c.workspace_num == claim.workspace_num) {
                return Ok(false);
            }
            claims.push(claim);
            write_claims(lines, &claims);
            Ok(true)
        })
    }

    /// Remove the matching claim row. Returns false when no row matched.
    pub fn release_workspace(
        &self,
        workspace_num: u32,
        workflow: &str,
        cl_name: &str,
    ) -> Result<bool, StorageError> {
        let message = format!("Release workspace #{workspace_num} for {workflow} ({cl_name})");
        self.mutate_lines(&message, |lines| {
            let mut claims = claims_in(lines);
            let before = claims.len();
            claims.retain(|c| {
                !(c.workspace_num == workspace_num
                    && c.workflow == workflow
                    && c.cl_name == cl_name)
            });
            let removed = claims.len() != before;
            write_claims(lines, &claims);
            Ok(removed)
        })
    }

    /// Rewrite claim rows after a CL rename.
    pub fn update_claims_cl_name(&self, old: &str, new: &str) -> Result<usize, StorageError> {
        let message = format!("Update RUNNING claims {old} -> {new}");
        self.mutate_lines(&message, |lines| {
            let mut claims = claims_in(lines);
            let mut updated = 0;
            for claim in claims.iter_mut() {
                if claim.cl_name == old {
                    claim.cl_name = new.to_string();
                    updated += 1;
                }
            }
            write_claims(lines, &claims);
            Ok(updated)
        })
    }
}

#[cfg(test)]
#[path = "running_tests.rs"]
mod tests;
