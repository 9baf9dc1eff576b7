// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness and cancellation.
//!
//! Hooks and agents are detached session leaders; the scheduler never
//! waits on them. Liveness is `kill(pid, 0)`; cancellation is SIGTERM
//! to the process group — never SIGKILL from the scheduler.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

/// Whether a PID is still alive. EPERM means the process exists but is
/// not ours to signal.
pub fn is_process_running(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Best-effort SIGTERM to a process group. Missing or inaccessible
/// processes are fine — the goal is "not running", not "we killed it".
pub fn try_kill_process_group(pid: i32) {
    match killpg(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) | Err(Errno::EPERM) => {}
        Err(err) => tracing::debug!(pid, %err, "killpg failed"),
    }
}
