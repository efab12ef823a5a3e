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

use std::{io::Read, os::fd::AsRawFd, process::Command, time::Duration};

use command_fds::{CommandFdExt, FdMapping};
use nix::unistd::{getpid, Pid};

use crate::{config::ServicesConfig, directive::Directive, error, namespace::NetworkNamespace, process::terminate_then_kill, service::Service, ErrorKind, Result};

pub struct PastaNetwork;

impl Service for PastaNetwork {
    fn name(&self) -> &'static str {
        "pasta_network"
    }

    fn pretty_name(&self) -> &'static str {
        "pasta networking"
    }

    fn description(&self) -> &'static str {
        "Independent networking stack for sandbox. Requires pasta executable."
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["network", "slirp4netns"]
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        Vec::new()
    }

    fn post_init_hook(&self, pid: Pid, config: &ServicesConfig) -> Result<Option<Pid>> {
        let Some(settings) = config.pasta_network.as_ref() else {
            return Ok(None);
        };

        let network_namespace = NetworkNamespace::from_pid(pid)?;
        let parent_ns = network_namespace.get_user_namespace()?;
        let self_pid = getpid();

        let (mut ready_reader, ready_writer) = os_pipe::pipe().map_err(|e| error!(ErrorKind::Initialization(format!("pipe failed: {e}"))))?;
        let ready_write_fd = ready_writer.as_raw_fd();

        let mut command = Command::new("pasta");
        command
            .arg("--config-net")
            .arg("--foreground")
            .arg("--userns")
            .arg(parent_ns.path_via_self_fd(self_pid))
            .arg("--pid")
            .arg(format!("/proc/{self_pid}/fd/{ready_write_fd}"))
            .args(&settings.extra_args)
            .arg(pid.to_string());

        command
            .fd_mappings(vec![FdMapping { parent_fd: ready_write_fd, child_fd: ready_write_fd }])
            .map_err(|e| error!(ErrorKind::Initialization(format!("fd mapping failed: {e:?}"))))?;

        let child = command.spawn().map_err(|e| error!(ErrorKind::IOError("pasta".into(), e.kind())))?;
        drop(ready_writer);

        // Unlike slirp4netns, upstream performs an unbounded read here —
        // pasta writes its pid to the fd once networking is configured.
        let mut buf = [0u8; 1];
        let _ = ready_reader.read(&mut buf);

        Ok(Some(Pid::from_raw(child.id() as i32)))
    }

    fn post_shutdown_hook(&self, companion_pid: Option<Pid>, _config: &ServicesConfig) -> Result<()> {
        if let Some(pid) = companion_pid {
            terminate_then_kill(pid, Duration::from_secs(3));
        }
        Ok(())
    }
}
