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

//! Drives `xdg-dbus-proxy`, filtering the host session and system buses down
//! to the rules each enabled service requested before exposing proxy sockets
//! to the sandbox.

use std::{
    fs::remove_file,
    io::Read,
    os::fd::AsRawFd,
    path::{Path, PathBuf},
    process::{Child, Command},
    sync::mpsc,
    thread,
    time::Duration,
};

use command_fds::{CommandFdExt, FdMapping};

use crate::{constants::DBUS_PROXY_EXECUTABLE, directive::Directive, err, error, process::terminate_then_kill, utils::which, ErrorKind, Result};

pub struct DbusProxy {
    session_socket_path: PathBuf,
    system_socket_path: PathBuf,
    log_dbus: bool,
    session_rules: Vec<String>,
    system_rules: Vec<String>,
    process: Option<Child>,
}

impl DbusProxy {
    pub fn new(session_socket_path: impl Into<PathBuf>, system_socket_path: impl Into<PathBuf>, log_dbus: bool) -> Self {
        Self {
            session_socket_path: session_socket_path.into(),
            system_socket_path: system_socket_path.into(),
            log_dbus,
            session_rules: Vec::new(),
            system_rules: Vec::new(),
            process: None,
        }
    }

    /// Folds one directive into the accumulated session/system rule sets.
    /// Non-D-Bus directives are ignored.
    pub fn add_directive(&mut self, directive: &Directive) {
        if let Some(rule) = directive.to_dbus_session_arg() {
            self.session_rules.push(rule);
        }
        if let Some(rule) = directive.to_dbus_system_arg() {
            self.system_rules.push(rule);
        }
    }

    fn generate_args(&self, ready_write_fd: i32) -> Result<Vec<String>> {
        let session_bus_address = crate::utils::env_var("DBUS_SESSION_BUS_ADDRESS")?;

        let mut args = vec![format!("--fd={ready_write_fd}")];

        args.push(session_bus_address);
        args.push(self.session_socket_path.to_string_lossy().into_owned());
        args.extend(self.session_rules.iter().cloned());
        args.push("--filter".into());
        if self.log_dbus {
            args.push("--log".into());
        }

        args.push("unix:path=/run/dbus/system_bus_socket".into());
        args.push(self.system_socket_path.to_string_lossy().into_owned());
        args.extend(self.system_rules.iter().cloned());
        args.push("--filter".into());
        if self.log_dbus {
            args.push("--log".into());
        }

        Ok(args)
    }

    /// Spawns `xdg-dbus-proxy` and blocks until it signals readiness on its
    /// `--fd`, with a 3-second timeout matching the proxy's own start-up
    /// grace period for the mount helper.
    pub fn start(&mut self) -> Result<()> {
        let proxy_bin = which(DBUS_PROXY_EXECUTABLE).ok_or_else(|| error!(ErrorKind::Dependency(format!("{DBUS_PROXY_EXECUTABLE} not found"))))?;

        let (mut ready_reader, ready_writer) = os_pipe::pipe().map_err(|e| error!(ErrorKind::Initialization(format!("pipe failed: {e}"))))?;
        let ready_write_fd = ready_writer.as_raw_fd();

        let args = self.generate_args(ready_write_fd)?;

        let mut command = Command::new(&proxy_bin);
        command.args(&args);
        command
            .fd_mappings(vec![FdMapping { parent_fd: ready_write_fd, child_fd: ready_write_fd }])
            .map_err(|e| error!(ErrorKind::Initialization(format!("fd mapping failed: {e:?}"))))?;

        let mut child = command.spawn().map_err(|e| error!(ErrorKind::IOError(proxy_bin, e.kind())))?;
        drop(ready_writer);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 1];
            let _ = ready_reader.read(&mut buf);
            let _ = tx.send(());
        });

        if rx.recv_timeout(Duration::from_secs(3)).is_err() {
            let _ = child.kill();
            let _ = child.wait();
            return err!(ErrorKind::Initialization("timed out waiting for xdg-dbus-proxy to become ready".into()));
        }

        self.process = Some(child);

        if let Some(status) = self.process.as_mut().and_then(|c| c.try_wait().ok().flatten()) {
            return err!(ErrorKind::Initialization(format!("xdg-dbus-proxy exited during startup with status {status}")));
        }

        Ok(())
    }

    /// Terminates the proxy (SIGTERM, then SIGKILL after a 3-second grace
    /// period) and unlinks both proxy sockets.
    pub fn shutdown(&mut self) {
        if let Some(child) = self.process.take() {
            let pid = nix::unistd::Pid::from_raw(child.id() as i32);
            terminate_then_kill(pid, Duration::from_secs(3));
        }

        unlink_if_exists(&self.session_socket_path);
        unlink_if_exists(&self.system_socket_path);
    }
}

fn unlink_if_exists(path: &Path) {
    if let Err(e) = remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            eprintln!("dbus_proxy: failed to unlink '{}': {e}", path.display());
        }
    }
}

impl Drop for DbusProxy {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_session_and_system_rules_separately() {
        let mut proxy = DbusProxy::new("/tmp/session.sock", "/tmp/system.sock", false);
        proxy.add_directive(&Directive::DbusSessionTalkTo { bus_name: "org.example.Session".into() });
        proxy.add_directive(&Directive::DbusSystemRawArg("--talk=org.example.System".into()));

        assert_eq!(proxy.session_rules, vec!["--talk=org.example.Session"]);
        assert_eq!(proxy.system_rules, vec!["--talk=org.example.System"]);
    }

    #[test]
    fn non_dbus_directive_is_ignored() {
        let mut proxy = DbusProxy::new("/tmp/session.sock", "/tmp/system.sock", false);
        proxy.add_directive(&Directive::ShareNetwork);
        assert!(proxy.session_rules.is_empty());
        assert!(proxy.system_rules.is_empty());
    }
}
