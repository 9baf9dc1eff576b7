// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoping queries for the scheduler.
//!
//! Evaluation is a pure function over `(ChangeSpec, all_changespecs)`.
//! The engine treats a query as opaque apart from one inspection:
//! whether it explicitly targets terminal (Reverted/Archived) CLs, which
//! disables the hide-reverted default in viewer layers.

use crate::changespec::ChangeSpec;
use crate::status::ClStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("empty query term")]
    EmptyTerm,
    #[error("unknown query field: {0}")]
    UnknownField(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Term {
    /// Bare word: substring match on the CL name.
    Name(String),
    Status(String),
    Parent(String),
    Project(String),
}

/// A parsed query: whitespace-separated terms, all of which must match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    terms: Vec<Term>,
}

impl Query {
    pub fn parse(input: &str) -> Result<Self, QueryParseError> {
        let mut terms = Vec::new();
        for raw in input.split_whitespace() {
            let term = match raw.split_once(':') {
                Some(("status", v)) => Term::Status(v.to_string()),
                Some(("parent", v)) => Term::Parent(v.to_string()),
                Some(("project", v)) => Term::Project(v.to_string()),
                Some(("name", v)) => Term::Name(v.to_string()),
                Some((field, _)) => return Err(QueryParseError::UnknownField(field.to_string())),
                None => Term::Name(raw.to_string()),
            };
            match &term {
                Term::Name(v) | Term::Status(v) | Term::Parent(v) | Term::Project(v)
                    if v.is_empty() =>
                {
                    return Err(QueryParseError::EmptyTerm)
                }
                _ => {}
            }
            terms.push(term);
        }
        Ok(Self { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether the query explicitly asks for terminal-status CLs.
    pub fn targets_terminal(&self) -> bool {
        self.terms.iter().any(|t| {
            matches!(t, Term::Status(v)
                if v.eq_ignore_ascii_case("reverted") || v.eq_ignore_ascii_case("archived"))
        })
    }

    /// Evaluate against one CL. `_all` is available for relational terms.
    pub fn matches(&self, cs: &ChangeSpec, _all: &[ChangeSpec]) -> bool {
        self.terms.iter().all(|term| match term {
            Term::Name(needle) => cs.name.contains(needle.as_str()),
            Term::Status(wanted) => {
                let status: ClStatus = wanted.parse().unwrap_or(ClStatus::Wip);
                cs.status == status || cs.status.to_string().eq_ignore_ascii_case(wanted)
            }
            Term::Parent(parent) => cs.parent.as_deref() == Some(parent.as_str()),
            Term::Project(project) => cs.project_basename() == *project,
        })
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
