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

use std::{
    fs::canonicalize,
    io::Read,
    os::fd::AsRawFd,
    process::Command,
    sync::mpsc,
    thread,
    time::Duration,
};

use command_fds::{CommandFdExt, FdMapping};
use nix::unistd::{getpid, Pid};

use crate::{
    config::ServicesConfig,
    directive::Directive,
    err,
    error,
    namespace::NetworkNamespace,
    process::terminate_then_kill,
    service::Service,
    utils::which,
    ErrorKind,
    Result,
};

pub struct Slirp4netns;

impl Service for Slirp4netns {
    fn name(&self) -> &'static str {
        "slirp4netns"
    }

    fn pretty_name(&self) -> &'static str {
        "Slirp4netns networking"
    }

    fn description(&self) -> &'static str {
        "Independent networking stack for sandbox. Requires slirp4netns executable."
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["network", "pasta_network"]
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.slirp4netns.as_ref() else {
            return d;
        };

        let mut dns_servers = settings.dns_servers.clone();
        dns_servers.push("10.0.2.3".into());

        // systemd-resolved and several DHCP clients replace /etc/resolv.conf
        // with a symlink; write the generated content to its real target.
        let resolv_conf_path = canonicalize("/etc/resolv.conf").unwrap_or_else(|_| "/etc/resolv.conf".into());

        let content = dns_servers.iter().map(|s| format!("nameserver {s}")).collect::<Vec<_>>().join("\n").into_bytes();

        d.push(Directive::FileTransfer {
            content,
            dest: resolv_conf_path.to_string_lossy().into_owned(),
        });

        d
    }

    fn post_init_hook(&self, pid: Pid, config: &ServicesConfig) -> Result<Option<Pid>> {
        let Some(settings) = config.slirp4netns.as_ref() else {
            return Ok(None);
        };

        let target_namespace = NetworkNamespace::from_pid(pid)?;
        let parent_ns = target_namespace.get_user_namespace()?;
        let self_pid = getpid();
        let parent_ns_path = parent_ns.path_via_self_fd(self_pid);

        let slirp_bin = which("slirp4netns").ok_or_else(|| error!(ErrorKind::Dependency("slirp4netns binary not found".into())))?;

        let (mut ready_reader, ready_writer) = os_pipe::pipe().map_err(|e| error!(ErrorKind::Initialization(format!("pipe failed: {e}"))))?;
        let ready_write_fd = ready_writer.as_raw_fd();

        let mut command = Command::new(&slirp_bin);
        command
            .arg(format!("--ready={ready_write_fd}"))
            .arg("--configure")
            .arg(format!("--userns-path={parent_ns_path}"));

        if !settings.outbound_addr.is_empty() {
            command.arg(format!("--outbound-addr={}", settings.outbound_addr));
        }

        if settings.disable_host_loopback {
            command.arg("--disable-host-loopback");
        }

        command.arg(pid.to_string()).arg("tap0");
        command
            .fd_mappings(vec![FdMapping { parent_fd: ready_write_fd, child_fd: ready_write_fd }])
            .map_err(|e| error!(ErrorKind::Initialization(format!("fd mapping failed: {e:?}"))))?;

        let mut child = command.spawn().map_err(|e| error!(ErrorKind::IOError(slirp_bin, e.kind())))?;
        drop(ready_writer);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 1];
            let _ = ready_reader.read(&mut buf);
            let _ = tx.send(());
        });

        match rx.recv_timeout(Duration::from_secs(3)) {
            Ok(()) => Ok(Some(Pid::from_raw(child.id() as i32))),
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                err!(ErrorKind::Initialization("slirp4netns initialization failed".into()))
            }
        }
    }

    fn post_shutdown_hook(&self, companion_pid: Option<Pid>, _config: &ServicesConfig) -> Result<()> {
        if let Some(pid) = companion_pid {
            terminate_then_kill(pid, Duration::from_secs(3));
        }
        Ok(())
    }
}
