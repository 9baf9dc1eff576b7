// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp and duration utilities.
//!
//! All on-disk stamps use the compact `YYmmdd_HHMMSS` local-time format.
//! The stamp doubles as the key tying a status line to its output file,
//! so two launches in the same second would collide — callers space
//! launches a second apart.

use crate::clock::Clock;
use chrono::NaiveDateTime;

/// chrono format string for the on-disk stamp (e.g. `251231_143022`).
pub const TIMESTAMP_FORMAT: &str = "%y%m%d_%H%M%S";

/// Format a duration in seconds as an `XhYmZs` string (e.g. "1h2m3s", "45s").
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Current timestamp in `YYmmdd_HHMMSS` format.
pub fn now_stamp(clock: &impl Clock) -> String {
    clock.now_local().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// Age in seconds of a `YYmmdd_HHMMSS` stamp, or None if it cannot be parsed.
pub fn age_seconds(clock: &impl Clock, stamp: &str) -> Option<f64> {
    let then = parse_stamp(stamp)?;
    let delta = clock.now_local() - then;
    Some(delta.num_milliseconds() as f64 / 1000.0)
}

/// Seconds between two stamps, or None if either cannot be parsed.
pub fn duration_between(start: &str, end: &str) -> Option<f64> {
    let start = parse_stamp(start)?;
    let end = parse_stamp(end)?;
    Some((end - start).num_milliseconds() as f64 / 1000.0)
}

/// Whether a suffix value is a bare `YYmmdd_HHMMSS` stamp.
pub fn is_timestamp(value: &str) -> bool {
    value.len() == 13 && value.as_bytes().get(6) == Some(&b'_') && parse_stamp(value).is_some()
}

/// Whether a suffix contains a stale stamp (older than the timeout).
///
/// A stale stamp indicates an agent started longer than the timeout ago
/// but never completed (crashed or was killed).
pub fn is_suffix_stale(clock: &impl Clock, suffix: &str, timeout_seconds: u64) -> bool {
    if !is_timestamp(suffix) {
        return false;
    }
    matches!(age_seconds(clock, suffix), Some(age) if age > timeout_seconds as f64)
}

/// Format a raw stamp for display in a status line (`[YYmmdd_HHMMSS]`).
pub fn display_stamp(stamp: &str) -> String {
    format!("[{}]", stamp)
}

#[cfg(test)]
#[path = "timestamps_tests.rs"]
mod tests;
