// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit entry identifiers.
//!
//! Accepted amends carry integer ids (`1`, `2`, …); candidate amends
//! (proposals) carry a letter suffix on their base number (`2a`, `2b`).
//! Ordering is base number first, then letter, with the accepted entry
//! sorting before its proposals (`2` < `2a` < `3`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid commit entry id: {0:?}")]
pub struct EntryIdError(pub String);

/// Identifier of a HISTORY entry: an accepted commit (`3`) or a proposal (`3a`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId {
    pub number: u32,
    pub letter: Option<char>,
}

impl EntryId {
    pub fn accepted(number: u32) -> Self {
        Self { number, letter: None }
    }

    pub fn proposal(number: u32, letter: char) -> Self {
        Self { number, letter: Some(letter) }
    }

    /// Whether this id names a proposal (letter-suffixed) entry.
    pub fn is_proposal(&self) -> bool {
        self.letter.is_some()
    }

    /// The accepted entry a proposal hangs off (`3a` → `3`). Identity for
    /// accepted entries.
    pub fn base(&self) -> EntryId {
        Self { number: self.number, letter: None }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.letter {
            Some(letter) => write!(f, "{}{}", self.number, letter),
            None => write!(f, "{}", self.number),
        }
    }
}

impl FromStr for EntryId {
    type Err = EntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EntryIdError(s.to_string()));
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, rest) = s.split_at(split);
        let number: u32 = digits.parse().map_err(|_| EntryIdError(s.to_string()))?;
        let letter = match rest.len() {
            0 => None,
            1 => {
                let c = rest.chars().next().ok_or_else(|| EntryIdError(s.to_string()))?;
                if c.is_ascii_lowercase() {
                    Some(c)
                } else {
                    return Err(EntryIdError(s.to_string()));
                }
            }
            _ => return Err(EntryIdError(s.to_string())),
        };
        Ok(Self { number, letter })
    }
}

impl TryFrom<String> for EntryId {
    type Error = EntryIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> String {
        id.to_string()
    }
}

/// Whether an id string names a proposal entry without requiring a full parse.
pub fn is_proposal_entry(id: &str) -> bool {
    id.parse::<EntryId>().map(|e| e.is_proposal()).unwrap_or(false)
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
