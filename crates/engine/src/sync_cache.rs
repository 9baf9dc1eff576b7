// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Freshness cache for submission checks.
//!
//! Maps CL name to the stamp of its last background status check, so
//! the full cycle does not hammer the review service every five
//! minutes. On the first cycle the scheduler bypasses this cache for
//! leaf CLs (no parent, or parent Submitted) to get fast discovery.

use gai_core::clock::Clock;
use gai_core::timestamps;
use gai_storage::GaiDir;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn cache_path(gai: &GaiDir) -> PathBuf {
    gai.root().join("sync_cache.json")
}

fn load(gai: &GaiDir) -> BTreeMap<String, String> {
    let Ok(content) = std::fs::read_to_string(cache_path(gai)) else {
        return BTreeMap::new();
    };
    serde_json::from_str(&content).unwrap_or_default()
}

fn store(gai: &GaiDir, cache: &BTreeMap<String, String>) {
    let Ok(content) = serde_json::to_string_pretty(cache) else {
        return;
    };
    if std::fs::create_dir_all(gai.root()).is_ok() {
        if let Err(err) = std::fs::write(cache_path(gai), content) {
            tracing::warn!(%err, "sync cache write failed");
        }
    }
}

/// Whether a CL's status check is due (never checked, or checked longer
/// than `ttl_seconds` ago).
pub fn should_check(gai: &GaiDir, clock: &impl Clock, name: &str, ttl_seconds: u64) -> bool {
    let cache = load(gai);
    let Some(stamp) = cache.get(name) else {
        return true;
    };
    match timestamps::age_seconds(clock, stamp) {
        Some(age) => age >= ttl_seconds as f64,
        None => true,
    }
}

/// Record a check as performed now.
pub fn update_last_checked(gai: &GaiDir, clock: &impl Clock, name: &str) {
    let mut cache = load(gai);
    cache.insert(name.to_string(), timestamps::now_stamp(clock));
    store(gai, &cache);
}

/// Drop a CL from the cache (after a status transition).
pub fn clear_entry(gai: &GaiDir, name: &str) {
    let mut cache = load(gai);
    if cache.remove(name).is_some() {
        store(gai, &cache);
    }
}
