/*
 * bubblejail-core
 *
 * Copyright (C) 2023-2024 Xavier Moffett <sapphirus@azorium.net>
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Shared process lifecycle helpers used by the runner, the D-Bus proxy
//! driver and the in-sandbox helper's teardown escalation: wait-with-timeout
//! and SIGTERM-then-SIGKILL escalation, grounded in the same two-stage
//! shutdown upstream performs for both the mount helper and `xdg-dbus-proxy`.

use std::{
    fs::read_dir,
    thread::sleep,
    time::{Duration, Instant},
};

use nix::{
    sys::{
        signal::{kill, Signal},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};

use crate::constants::TERMINATE_GRACE;

/// Polls `waitpid` for `pid` until it exits or `timeout` elapses, sleeping in
/// small increments between polls. Returns `None` on timeout.
pub fn wait_with_timeout(pid: Pid, timeout: Duration) -> Option<WaitStatus> {
    let deadline = Instant::now() + timeout;
    let step = Duration::from_millis(50);

    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => (),
            Ok(status) => return Some(status),
            Err(_) => return None,
        }

        if Instant::now() >= deadline {
            return None;
        }

        sleep(step);
    }
}

/// Sends `signal` to `pid`, ignoring the case where the process has already
/// exited (`ESRCH`).
pub fn signal_ignore_gone(pid: Pid, signal: Signal) {
    let _ = kill(pid, signal);
}

/// Two-stage shutdown: SIGTERM, wait up to `grace`, then SIGKILL and a final
/// blocking reap. Used for the mount helper, the D-Bus proxy, and any
/// post-shutdown-hook subprocess (slirp4netns/pasta) that must not outlive
/// the sandbox.
pub fn terminate_then_kill(pid: Pid, grace: Duration) {
    signal_ignore_gone(pid, Signal::SIGTERM);

    if wait_with_timeout(pid, grace).is_some() {
        return;
    }

    signal_ignore_gone(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}

/// Default-grace variant of [`terminate_then_kill`] using [`TERMINATE_GRACE`].
pub fn terminate(pid: Pid) {
    terminate_then_kill(pid, TERMINATE_GRACE)
}

/// Lists the direct children of the calling process by reading
/// `/proc/self/task/<tid>/children` for every thread, matching the helper's
/// reaping scope (a single-threaded process has exactly one task entry).
pub fn self_children() -> Vec<Pid> {
    let mut children = Vec::new();

    let tasks = match read_dir("/proc/self/task") {
        Ok(tasks) => tasks,
        Err(_) => return children,
    };

    for task in tasks.filter_map(Result::ok) {
        let path = task.path().join("children");
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };

        for raw in contents.split_whitespace() {
            if let Ok(pid) = raw.parse::<i32>() {
                children.push(Pid::from_raw(pid));
            }
        }
    }

    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{fork, ForkResult};

    #[test]
    fn self_children_is_empty_for_a_leaf_process() {
        assert!(self_children().is_empty());
    }

    #[test]
    fn wait_with_timeout_returns_none_for_a_still_running_process() {
        if let ForkResult::Parent { child } = unsafe { fork() }.unwrap() {
            assert_eq!(wait_with_timeout(child, Duration::from_millis(100)), None);
            terminate_then_kill(child, Duration::from_secs(1));
        } else {
            sleep(Duration::from_secs(5));
            std::process::exit(0);
        }
    }

    #[test]
    fn wait_with_timeout_observes_an_exited_child() {
        if let ForkResult::Parent { child } = unsafe { fork() }.unwrap() {
            let status = wait_with_timeout(child, Duration::from_secs(1));
            assert!(matches!(status, Some(WaitStatus::Exited(_, 0))));
        } else {
            std::process::exit(0);
        }
    }

    #[test]
    fn signal_ignore_gone_does_not_panic_on_an_already_reaped_pid() {
        if let ForkResult::Parent { child } = unsafe { fork() }.unwrap() {
            let _ = waitpid(child, None);
            signal_ignore_gone(child, Signal::SIGTERM);
        } else {
            std::process::exit(0);
        }
    }
}
