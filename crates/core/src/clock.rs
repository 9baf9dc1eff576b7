// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Hook and agent bookkeeping is driven off wall-clock `YYmmdd_HHMMSS`
//! stamps persisted in the project file, so the clock exposes a naive
//! local datetime in addition to a monotonic instant.

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    /// Current wall-clock time in the local timezone, without offset info.
    fn now_local(&self) -> NaiveDateTime;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_local(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    local: Arc<Mutex<NaiveDateTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        let epoch = NaiveDateTime::parse_from_str("250101_120000", "%y%m%d_%H%M%S")
            .unwrap_or_default();
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            local: Arc::new(Mutex::new(epoch)),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        let mut local = self.local.lock();
        *local += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Set the wall-clock time from a `YYmmdd_HHMMSS` stamp
    pub fn set_stamp(&self, stamp: &str) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stamp, "%y%m%d_%H%M%S") {
            *self.local.lock() = dt;
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn now_local(&self) -> NaiveDateTime {
        *self.local.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
