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

use std::{fs::write, time::Duration};

use nix::unistd::{fork, ForkResult, Pid};

use crate::{
    config::ServicesConfig,
    directive::Directive,
    err,
    error,
    namespace::UserNamespace,
    process::wait_with_timeout,
    service::Service,
    ErrorKind,
    Result,
};

pub struct NamespacesLimits;

impl Service for NamespacesLimits {
    fn name(&self) -> &'static str {
        "namespaces_limits"
    }

    fn pretty_name(&self) -> &'static str {
        "Limit namespaces"
    }

    fn description(&self) -> &'static str {
        "Limit number of namespaces available inside sandbox. Namespace limits are recursive. Setting limit 0 blocks creating new namespaces. Setting -1 unlocks the limit."
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        Vec::new()
    }

    fn post_init_hook(&self, pid: Pid, config: &ServicesConfig) -> Result<Option<Pid>> {
        let Some(settings) = config.namespaces_limits.as_ref() else {
            return Ok(None);
        };

        let limits = compute_limits(settings, config.network.is_some());
        run_setter_subprocess(pid, limits)?;
        Ok(None)
    }
}

/// `0` stays `0` (fully forbidden); any other non-negative limit is widened
/// by one to account for the namespace the sandbox's own init creates.
fn recursive(limit: i64) -> i64 {
    if limit == 0 { 0 } else { limit + 1 }
}

/// Builds the `/proc/sys/user/max_*_namespaces` settings for every limit the
/// settings struct opts into (`-1` leaves a kind untouched). `network_enabled`
/// widens the net namespace limit by one extra slot, since the `network`
/// service itself creates one besides whatever the sandboxed process creates.
fn compute_limits(settings: &crate::config::NamespacesLimitsSettings, network_enabled: bool) -> Vec<(&'static str, i64)> {
    let mut limits = Vec::new();

    if settings.user >= 0 {
        limits.push(("max_user_namespaces", recursive(settings.user)));
    }
    if settings.mount >= 0 {
        limits.push(("max_mnt_namespaces", recursive(settings.mount)));
    }
    if settings.pid >= 0 {
        limits.push(("max_pid_namespaces", recursive(settings.pid)));
    }
    if settings.ipc >= 0 {
        limits.push(("max_ipc_namespaces", recursive(settings.ipc)));
    }
    if settings.net >= 0 {
        let mut net_limit = settings.net;
        if !network_enabled {
            net_limit += 1;
        }
        limits.push(("max_net_namespaces", net_limit));
    }
    if settings.time >= 0 {
        limits.push(("max_time_namespaces", settings.time));
    }
    if settings.uts >= 0 {
        limits.push(("max_uts_namespaces", recursive(settings.uts)));
    }
    if settings.cgroup >= 0 {
        limits.push(("max_cgroup_namespaces", recursive(settings.cgroup)));
    }

    limits
}

/// Forks a short-lived child that enters the target PID's parent user
/// namespace and writes each `/proc/sys/user/<file>` limit, mirroring the
/// upstream `multiprocessing.Process` setter with a 3-second join timeout.
fn run_setter_subprocess(pid: Pid, limits: Vec<(&'static str, i64)>) -> Result<()> {
    match unsafe { fork() }.map_err(|e| error!(ErrorKind::Initialization(format!("fork failed: {e}"))))? {
        ForkResult::Child => {
            let exit_code = match set_namespaces_limits(pid, &limits) {
                Ok(()) => 0,
                Err(_) => 1,
            };
            std::process::exit(exit_code);
        }
        ForkResult::Parent { child } => {
            match wait_with_timeout(child, Duration::from_secs(3)) {
                Some(nix::sys::wait::WaitStatus::Exited(_, 0)) => Ok(()),
                Some(_) => err!(ErrorKind::Initialization("limit namespaces subprocess failed".into())),
                None => {
                    crate::process::signal_ignore_gone(child, nix::sys::signal::Signal::SIGKILL);
                    let _ = wait_with_timeout(child, Duration::from_secs(1));
                    err!(ErrorKind::Initialization("limit namespaces subprocess timed out".into()))
                }
            }
        }
    }
}

fn set_namespaces_limits(pid: Pid, limits: &[(&'static str, i64)]) -> Result<()> {
    let target_namespace = UserNamespace::from_pid(pid)?;
    let parent_ns = target_namespace.get_user_namespace()?;

    if parent_ns.ns_id()? != UserNamespace::current_ns_id()? {
        parent_ns.setns(nix::sched::CloneFlags::CLONE_NEWUSER)?;
    } else {
        eprintln!("namespaces_limits: already in parent user namespace");
    }

    target_namespace.setns()?;

    for (proc_file, limit) in limits {
        let path = format!("/proc/sys/user/{proc_file}");
        write(&path, limit.to_string()).map_err(|e| error!(ErrorKind::IOError(path, e.kind())))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespacesLimitsSettings;

    #[test]
    fn negative_one_leaves_a_kind_untouched() {
        let settings = NamespacesLimitsSettings { user: -1, ..Default::default() };
        let limits = compute_limits(&settings, true);
        assert!(limits.iter().all(|(kind, _)| *kind != "max_user_namespaces"));
    }

    #[test]
    fn zero_stays_zero_for_recursive_kinds() {
        let settings = NamespacesLimitsSettings { user: 0, mount: 0, ..Default::default() };
        let limits = compute_limits(&settings, true);
        assert_eq!(limits, vec![("max_user_namespaces", 0), ("max_mnt_namespaces", 0)]);
    }

    #[test]
    fn positive_recursive_limits_are_widened_by_one() {
        let settings = NamespacesLimitsSettings { pid: 2, uts: 5, ..Default::default() };
        let limits = compute_limits(&settings, true);
        assert_eq!(limits, vec![("max_pid_namespaces", 3), ("max_uts_namespaces", 6)]);
    }

    #[test]
    fn time_limit_is_not_widened() {
        let settings = NamespacesLimitsSettings { time: 2, ..Default::default() };
        assert_eq!(compute_limits(&settings, true), vec![("max_time_namespaces", 2)]);
    }

    #[test]
    fn net_limit_gains_an_extra_slot_when_the_network_service_is_disabled() {
        let settings = NamespacesLimitsSettings { net: 0, ..Default::default() };
        assert_eq!(compute_limits(&settings, false), vec![("max_net_namespaces", 1)]);
        assert_eq!(compute_limits(&settings, true), vec![("max_net_namespaces", 0)]);
    }
}
