// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook launching and completion detection.
//!
//! A hook runs inside a generated wrapper script that captures combined
//! output, retries on known-transient failures, emits the completion
//! marker, and `sync`s before exiting. The marker race that remains is
//! handled by the two-phase dead protocol in `checks`.

use crate::engine::Engine;
use crate::error::EngineError;
use gai_core::changespec::ChangeSpec;
use gai_core::clock::Clock;
use gai_core::entry::EntryId;
use gai_core::hook::{HookEntry, HookStatus, HookStatusLine};
use gai_core::suffix::{Suffix, SuffixKind};
use gai_core::timestamps;
use gai_storage::paths::{safe_filename, strip_lifecycle_suffix, GaiDir};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Line the wrapper emits when the hook command has finished.
pub const HOOK_COMPLETE_MARKER: &str = "===HOOK_COMPLETE=== END_TIMESTAMP: ";

/// Output file for one hook run: `<hooks>/<safe_cl_name>-<ts>.txt`.
/// Lifecycle rename suffixes are stripped so a reverted CL still finds
/// files written under its original name.
pub fn hook_output_path(gai: &GaiDir, cl_name: &str, stamp: &str) -> PathBuf {
    let safe = safe_filename(strip_lifecycle_suffix(cl_name));
    gai.hooks_dir().join(format!("{safe}-{stamp}.txt"))
}

fn wrapper_script(command: &str, retriable_patterns: &[String]) -> String {
    let patterns = retriable_patterns
        .iter()
        .map(|p| format!("    \"{p}\""))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"#!/bin/bash

# Retry configuration
MAX_RETRIES=3
RETRY_DELAY=60

# Patterns that trigger retry (grep -E format)
RETRIABLE_PATTERNS=(
{patterns}
)

echo "=== HOOK COMMAND ==="
echo "{command}"
echo "===================="
echo ""

build_pattern() {{
    local IFS='|'
    echo "${{RETRIABLE_PATTERNS[*]}}"
}}

is_retriable() {{
    local output_file="$1"
    local pattern
    pattern=$(build_pattern)
    grep -qE "$pattern" "$output_file" 2>/dev/null
}}

attempt=1
while [ $attempt -le $MAX_RETRIES ]; do
    tmp_output=$(mktemp)
    trap "rm -f '$tmp_output'" EXIT

    ( {command} ) > "$tmp_output" 2>&1
    exit_code=$?

    if [ $exit_code -ne 0 ] && [ $attempt -lt $MAX_RETRIES ] && is_retriable "$tmp_output"; then
        echo "=== RETRY ATTEMPT $attempt/$MAX_RETRIES ==="
        echo "Detected retriable error. Waiting ${{RETRY_DELAY}}s before retry..."
        cat "$tmp_output"
        echo ""
        echo "=== WAITING ${{RETRY_DELAY}}s ==="
        rm -f "$tmp_output"
        sleep $RETRY_DELAY
        attempt=$((attempt + 1))
    else
        if [ $attempt -gt 1 ]; then
            echo "=== FINAL ATTEMPT ($attempt/$MAX_RETRIES) ==="
        fi
        cat "$tmp_output"
        rm -f "$tmp_output"
        break
    fi
done

echo ""
end_timestamp=$(date +"%y%m%d_%H%M%S")
echo "===HOOK_COMPLETE=== END_TIMESTAMP: $end_timestamp EXIT_CODE: $exit_code"
# Flush to disk before exiting so the scheduler does not see a dead PID
# with no marker.
sync
exit $exit_code
"#
    )
}

impl<C: Clock> Engine<C> {
    /// Start a hook as a detached background process and return the
    /// RUNNING status line plus the output path.
    pub fn start_hook_background(
        &self,
        cs: &ChangeSpec,
        hook: &HookEntry,
        workspace_dir: &Path,
        entry: &EntryId,
    ) -> Result<(HookStatusLine, PathBuf), EngineError> {
        let stamp = timestamps::now_stamp(&self.clock);
        self.gai.ensure_dir(self.gai.hooks_dir())?;
        let output_path = hook_output_path(&self.gai, &cs.name, &stamp);

        let script = wrapper_script(hook.run_command(), &self.config.retriable_patterns);
        let mut wrapper = tempfile::Builder::new().suffix(".sh").tempfile()?;
        wrapper.write_all(script.as_bytes())?;
        // The detached child needs the script to outlive this call.
        let (_file, wrapper_path) = wrapper.keep().map_err(|e| e.error)?;
        std::fs::set_permissions(&wrapper_path, std::fs::Permissions::from_mode(0o755))?;

        let output_file = std::fs::File::create(&output_path)?;
        let stderr_file = output_file.try_clone()?;
        let child = Command::new(&wrapper_path)
            .current_dir(workspace_dir)
            .stdout(Stdio::from(output_file))
            .stderr(Stdio::from(stderr_file))
            .process_group(0)
            .spawn()
            .map_err(|err| EngineError::SpawnFailure(err.to_string()))?;

        let line = HookStatusLine::running(entry.clone(), stamp, child.id() as i32);
        tracing::info!(
            cl = %cs.name,
            hook = %hook.command,
            entry = %entry,
            pid = child.id(),
            "hook started"
        );
        Ok((line, output_path))
    }
}

/// Check whether a RUNNING hook attempt has completed.
///
/// Reads the output file for the completion marker (last occurrence
/// wins — retries can embed earlier markers in their captured output)
/// and builds the finished status line. Returns None while the marker
/// is absent. A zero-byte or unreadable file is "not yet complete".
pub fn check_hook_completion(
    gai: &GaiDir,
    clock: &impl Clock,
    cs: &ChangeSpec,
    hook: &HookEntry,
    line: &HookStatusLine,
) -> Option<HookStatusLine> {
    let output_path = hook_output_path(gai, &cs.name, &line.timestamp);
    let content = std::fs::read_to_string(&output_path).ok()?;

    let marker_pos = content.rfind(HOOK_COMPLETE_MARKER)?;
    let after = content[marker_pos + HOOK_COMPLETE_MARKER.len()..].trim();
    let mut tokens = after.split_whitespace();
    let end_stamp = tokens.next();
    let exit_code: i32 = match (tokens.next(), tokens.next()) {
        (Some("EXIT_CODE:"), Some(code)) => code.parse().unwrap_or(1),
        _ => 1,
    };

    let duration_seconds = end_stamp
        .and_then(|end| timestamps::duration_between(&line.timestamp, end))
        .or_else(|| timestamps::age_seconds(clock, &line.timestamp))
        .unwrap_or(0.0);
    let duration = timestamps::format_duration(duration_seconds);

    let status = if exit_code == 0 { HookStatus::Passed } else { HookStatus::Failed };

    // `!`-prefixed hooks skip the fix pipeline; failures get a short
    // human-readable error suffix straight away.
    let suffix = if status == HookStatus::Failed && hook.skip_fix_hook() {
        Some(Suffix::new(SuffixKind::Error, summarize_failure(&content)))
    } else {
        None
    };

    Some(HookStatusLine {
        entry: line.entry.clone(),
        timestamp: line.timestamp.clone(),
        status,
        duration: Some(duration),
        suffix,
    })
}

/// Short failure description from a hook's captured output: the last
/// non-boilerplate line before the completion marker, clipped.
fn summarize_failure(content: &str) -> String {
    const MAX_LEN: usize = 120;
    let body = content.split(HOOK_COMPLETE_MARKER).next().unwrap_or("");
    let line = body
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("===") && !l.starts_with('('));
    match line {
        Some(line) if line.chars().count() > MAX_LEN => {
            let clipped: String = line.chars().take(MAX_LEN).collect();
            format!("{clipped}…")
        }
        Some(line) => line.to_string(),
        None => "Hook Command Failed".to_string(),
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
