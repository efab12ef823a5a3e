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

//! The launch pipeline: turns an enabled [`ServiceContainer`] into a running
//! `bwrap` sandbox. One linear pass over every service's directives builds
//! the bwrap argv, the seccomp filter and the D-Bus proxy's rule sets; the
//! two placeholder directives are resolved to runner-owned paths along the
//! way. `bwrap` is started with its own argv hidden behind `--args <fd>`
//! (a temp file, not literal argv) so bind-mount sources never show up in
//! `ps`, matching the upstream launcher.

use std::{
    fs::{remove_file, DirBuilder},
    io::{Read, Seek, Write},
    os::{
        fd::AsRawFd,
        unix::{fs::DirBuilderExt, net::UnixListener},
    },
    path::PathBuf,
    process::{Child, Command, ExitStatus},
    sync::mpsc,
    thread,
    time::Duration,
};

use command_fds::{CommandFdExt, FdMapping};
use nix::unistd::Pid;

use crate::{
    config::{ServiceContainer, ServicesConfig},
    constants::{BWRAP_EXECUTABLE, HELPER_EXECUTABLE},
    dbus_proxy::DbusProxy,
    directive::Directive,
    error,
    instance::Instance,
    process::signal_ignore_gone,
    seccomp::build_bpf_program,
    service::Service,
    ErrorKind,
    Result,
};

pub struct Runner {
    instance_home: PathBuf,
    runtime_dir: PathBuf,
    helper_runtime_dir: PathBuf,
    helper_socket_path: PathBuf,
    dbus_session_socket_path: PathBuf,
    dbus_system_socket_path: PathBuf,
    shell_debug: bool,
    log_dbus: bool,
    extra_bwrap_args: Vec<String>,
    helper_executable: String,
    container: ServiceContainer,
}

impl Runner {
    pub fn new(instance: &Instance, container: ServiceContainer, shell_debug: bool, log_dbus: bool) -> Self {
        Self {
            instance_home: instance.path_home_directory(),
            runtime_dir: instance.runtime_dir().to_path_buf(),
            helper_runtime_dir: instance.path_runtime_helper_dir(),
            helper_socket_path: instance.path_runtime_helper_socket(),
            dbus_session_socket_path: instance.path_runtime_dbus_session_socket(),
            dbus_system_socket_path: instance.path_runtime_dbus_system_socket(),
            shell_debug,
            log_dbus,
            extra_bwrap_args: Vec::new(),
            helper_executable: HELPER_EXECUTABLE.into(),
            container,
        }
    }

    pub fn with_extra_bwrap_args(mut self, args: Vec<String>) -> Self {
        self.extra_bwrap_args = args;
        self
    }

    pub fn with_helper_executable(mut self, path: impl Into<String>) -> Self {
        self.helper_executable = path.into();
        self
    }

    fn config(&self) -> &ServicesConfig {
        self.container.config()
    }

    /// Builds the bwrap argv, seccomp filter and D-Bus proxy rule sets in one
    /// linear pass over every enabled service's directives (plus the
    /// always-present defaults service).
    fn generate_args(&self, dbus_proxy: &mut DbusProxy, fd_mappings: &mut Vec<FdMapping>, temp_files: &mut Vec<std::fs::File>) -> Result<(Vec<String>, Vec<String>)> {
        let mut bwrap_args = vec![
            "--unshare-all".to_string(),
            "--die-with-parent".to_string(),
            "--as-pid-1".to_string(),
        ];

        if !self.shell_debug {
            bwrap_args.push("--new-session".into());
        }

        bwrap_args.extend(["--proc".into(), "/proc".into()]);
        bwrap_args.extend(["--dev".into(), "/dev".into()]);
        bwrap_args.push("--clearenv".into());

        if self.shell_debug {
            if let Ok(term) = std::env::var("TERM") {
                bwrap_args.extend(["--setenv".into(), "TERM".into(), term]);
            }
            if let Ok(colorterm) = std::env::var("COLORTERM") {
                bwrap_args.extend(["--setenv".into(), "COLORTERM".into(), colorterm]);
            }
        }

        let mut seccomp_directives = Vec::new();
        let mut executable_args = Vec::new();
        let config = self.config();

        for service in self.container.iter_services() {
            for directive in service.iter_directives(config) {
                match directive {
                    Directive::WantsHomeBind { dest } => bwrap_args.extend(
                        Directive::Bind { source: self.instance_home.to_string_lossy().into_owned(), dest }.to_bwrap_args().unwrap(),
                    ),
                    Directive::WantsDbusSessionBind { dest } => bwrap_args.extend(
                        Directive::Bind { source: self.dbus_session_socket_path.to_string_lossy().into_owned(), dest }.to_bwrap_args().unwrap(),
                    ),
                    Directive::FileTransfer { content, dest } => {
                        let mut file = tempfile::tempfile().map_err(|e| error!(ErrorKind::IOError("bwrap file-transfer temp file".into(), e.kind())))?;
                        file.write_all(&content).map_err(|e| error!(ErrorKind::IOError("bwrap file-transfer temp file".into(), e.kind())))?;
                        file.rewind().map_err(|e| error!(ErrorKind::IOError("bwrap file-transfer temp file".into(), e.kind())))?;

                        let fd = file.as_raw_fd();
                        fd_mappings.push(FdMapping { parent_fd: fd, child_fd: fd });
                        bwrap_args.extend(["--ro-bind-data".into(), fd.to_string(), dest]);
                        temp_files.push(file);
                    }
                    Directive::SeccompSyscallErrno { .. } => seccomp_directives.push(directive),
                    Directive::LaunchArguments { launch_args, .. } => executable_args.extend(launch_args),
                    other => {
                        if let Some(args) = other.to_bwrap_args() {
                            bwrap_args.extend(args);
                        }
                        dbus_proxy.add_directive(&other);
                    }
                }
            }
        }

        if let Some(seccomp_file) = build_bpf_program(&seccomp_directives)? {
            let fd = seccomp_file.as_raw_fd();
            fd_mappings.push(FdMapping { parent_fd: fd, child_fd: fd });
            bwrap_args.extend(["--seccomp".into(), fd.to_string()]);
            temp_files.push(seccomp_file);
        }

        // Bound twice: bwrap's own /run is a tmpfs, so /var/run (a symlink to
        // it in most distros) and /run both need the proxy's system socket.
        bwrap_args.extend(
            Directive::Bind { source: self.dbus_system_socket_path.to_string_lossy().into_owned(), dest: "/var/run/dbus/system_bus_socket".into() }
                .to_bwrap_args()
                .unwrap(),
        );
        bwrap_args.extend(
            Directive::Bind { source: self.dbus_system_socket_path.to_string_lossy().into_owned(), dest: "/run/dbus/system_bus_socket".into() }
                .to_bwrap_args()
                .unwrap(),
        );

        bwrap_args.extend(self.extra_bwrap_args.iter().cloned());

        Ok((bwrap_args, executable_args))
    }

    /// Sets up runtime directories, starts the D-Bus proxy and `bwrap`, runs
    /// every service's `post_init_hook`, and signals the in-sandbox helper
    /// that it may proceed. `args_to_run` overrides any `LaunchArguments`
    /// directives when non-empty.
    pub fn launch(&self, args_to_run: Vec<String>) -> Result<SandboxHandle<'_>> {
        DirBuilder::new().mode(0o700).create(&self.runtime_dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                error!(ErrorKind::Initialization("instance is already running or did not clean up properly".into()))
            } else {
                error!(ErrorKind::IOError(self.runtime_dir.display().to_string(), e.kind()))
            }
        })?;

        DirBuilder::new()
            .mode(0o700)
            .create(&self.helper_runtime_dir)
            .map_err(|e| error!(ErrorKind::IOError(self.helper_runtime_dir.display().to_string(), e.kind())))?;

        let helper_listener =
            UnixListener::bind(&self.helper_socket_path).map_err(|e| error!(ErrorKind::IOError(self.helper_socket_path.display().to_string(), e.kind())))?;
        let helper_socket_fd = helper_listener.as_raw_fd();

        let mut dbus_proxy = DbusProxy::new(self.dbus_session_socket_path.clone(), self.dbus_system_socket_path.clone(), self.log_dbus);
        let mut fd_mappings = vec![FdMapping { parent_fd: helper_socket_fd, child_fd: helper_socket_fd }];
        let mut temp_files = Vec::new();

        let (mut bwrap_args, executable_args) = self.generate_args(&mut dbus_proxy, &mut fd_mappings, &mut temp_files)?;

        dbus_proxy.start()?;

        let (info_reader, info_writer) = os_pipe::pipe().map_err(|e| error!(ErrorKind::Initialization(format!("info pipe failed: {e}"))))?;
        let info_write_fd = info_writer.as_raw_fd();
        fd_mappings.push(FdMapping { parent_fd: info_write_fd, child_fd: info_write_fd });
        bwrap_args.extend(["--info-fd".into(), info_write_fd.to_string()]);

        let (ready_reader, ready_writer) = os_pipe::pipe().map_err(|e| error!(ErrorKind::Initialization(format!("ready pipe failed: {e}"))))?;
        let ready_read_fd = ready_reader.as_raw_fd();
        fd_mappings.push(FdMapping { parent_fd: ready_read_fd, child_fd: ready_read_fd });

        let mut args_blob = bwrap_args.join("\0").into_bytes();
        args_blob.push(0);
        let mut args_file = tempfile::tempfile().map_err(|e| error!(ErrorKind::IOError("bwrap args temp file".into(), e.kind())))?;
        args_file.write_all(&args_blob).map_err(|e| error!(ErrorKind::IOError("bwrap args temp file".into(), e.kind())))?;
        args_file.rewind().map_err(|e| error!(ErrorKind::IOError("bwrap args temp file".into(), e.kind())))?;
        let args_fd = args_file.as_raw_fd();
        fd_mappings.push(FdMapping { parent_fd: args_fd, child_fd: args_fd });

        let mut helper_args = vec![self.helper_executable.clone(), "--helper-socket".into(), helper_socket_fd.to_string(), "--ready-fd".into(), ready_read_fd.to_string()];
        if self.shell_debug {
            helper_args.push("--shell".into());
        }
        helper_args.push("--".into());

        let run_args = if args_to_run.is_empty() { executable_args } else { args_to_run };

        let mut command = Command::new(BWRAP_EXECUTABLE);
        command.arg("--args").arg(args_fd.to_string()).arg("--").args(&helper_args).args(&run_args);
        command
            .fd_mappings(fd_mappings)
            .map_err(|e| error!(ErrorKind::Initialization(format!("fd mapping failed: {e:?}"))))?;

        let mut bwrap_child = command.spawn().map_err(|e| error!(ErrorKind::IOError(BWRAP_EXECUTABLE.into(), e.kind())))?;
        let bwrap_pid = Pid::from_raw(bwrap_child.id() as i32);

        drop(info_writer);
        drop(helper_listener);
        temp_files.clear();

        let sandboxed_pid = match read_sandboxed_pid(info_reader) {
            Ok(pid) => pid,
            Err(e) => {
                let _ = bwrap_child.kill();
                let _ = bwrap_child.wait();
                dbus_proxy.shutdown();
                return Err(e);
            }
        };

        let config = self.container.config();
        let mut companion_pids = Vec::with_capacity(self.container.iter_services().count());
        for service in self.container.iter_services() {
            match service.post_init_hook(sandboxed_pid, config) {
                Ok(companion) => companion_pids.push(companion),
                Err(e) => {
                    eprintln!("runner: post_init_hook for '{}' failed: {e}", service.name());
                    companion_pids.push(None);
                }
            }
        }

        let mut ready_writer = ready_writer;
        let _ = ready_writer.write_all(b"bubblejail-ready");
        drop(ready_writer);
        drop(ready_reader);

        Ok(SandboxHandle {
            container: &self.container,
            bwrap_child,
            bwrap_pid,
            sandboxed_pid: Some(sandboxed_pid),
            dbus_proxy,
            companion_pids,
            runtime_dir: self.runtime_dir.clone(),
            helper_runtime_dir: self.helper_runtime_dir.clone(),
            helper_socket_path: self.helper_socket_path.clone(),
            shut_down: false,
        })
    }
}

/// Reads `bwrap --info-fd`'s JSON payload to completion and extracts
/// `child-pid`, with a 3-second timeout matching the upstream launcher.
fn read_sandboxed_pid(mut reader: os_pipe::PipeReader) -> Result<Pid> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = reader.read_to_string(&mut buf);
        let _ = tx.send(buf);
    });

    let raw = rx.recv_timeout(Duration::from_secs(3)).map_err(|_| error!(ErrorKind::Initialization("timed out waiting for bwrap info-fd".into())))?;

    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|_| error!(ErrorKind::Initialization("unable to parse bwrap info-fd payload".into())))?;

    value["child-pid"]
        .as_i64()
        .map(|pid| Pid::from_raw(pid as i32))
        .ok_or_else(|| error!(ErrorKind::Initialization("bwrap info-fd payload missing child-pid".into())))
}

/// A running sandbox. Dropping it (or calling [`SandboxHandle::shutdown`]
/// explicitly) runs every service's `post_shutdown_hook`, tears down the
/// D-Bus proxy, and removes the instance's runtime directories.
pub struct SandboxHandle<'a> {
    container: &'a ServiceContainer,
    bwrap_child: Child,
    bwrap_pid: Pid,
    sandboxed_pid: Option<Pid>,
    dbus_proxy: DbusProxy,
    companion_pids: Vec<Option<Pid>>,
    runtime_dir: PathBuf,
    helper_runtime_dir: PathBuf,
    helper_socket_path: PathBuf,
    shut_down: bool,
}

impl<'a> SandboxHandle<'a> {
    /// The pid of the first process running inside the sandbox's pid
    /// namespace, as seen from the host.
    pub fn sandboxed_pid(&self) -> Option<Pid> {
        self.sandboxed_pid
    }

    /// Sends `SIGTERM` to the sandboxed process (or to `bwrap` itself, if the
    /// sandboxed pid was never acquired). No further wait is necessary: `bwrap`
    /// terminates once the sandboxed process does, tearing down the rest.
    pub fn terminate(&self) {
        let pid_to_kill = self.sandboxed_pid.unwrap_or(self.bwrap_pid);
        signal_ignore_gone(pid_to_kill, nix::sys::signal::Signal::SIGTERM);
    }

    /// Blocks until `bwrap` exits.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        self.bwrap_child.wait().map_err(|e| error!(ErrorKind::IOError(BWRAP_EXECUTABLE.into(), e.kind())))
    }

    /// Runs every service's `post_shutdown_hook`, terminates the D-Bus proxy,
    /// and removes the instance's runtime directories. Idempotent: safe to
    /// call more than once (subsequent calls are no-ops).
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let config = self.container.config();
        for (service, companion) in self.container.iter_services().zip(self.companion_pids.iter().copied()) {
            if let Err(e) = service.post_shutdown_hook(companion, config) {
                eprintln!("runner: post_shutdown_hook for '{}' failed: {e}", service.name());
            }
        }

        self.dbus_proxy.shutdown();

        let _ = remove_file(&self.helper_socket_path);
        let _ = std::fs::remove_dir(&self.helper_runtime_dir);
        let _ = std::fs::remove_dir(&self.runtime_dir);
    }
}

impl<'a> Drop for SandboxHandle<'a> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServiceContainer, ServicesConfig};

    fn test_instance() -> (tempfile::TempDir, Instance) {
        let dir = tempfile::tempdir().expect("tempdir");
        let instance = Instance::open(dir.path()).expect("open instance");
        (dir, instance)
    }

    #[test]
    fn generate_args_includes_baseline_bwrap_flags() {
        let (_dir, instance) = test_instance();
        let container = ServiceContainer::new(ServicesConfig::default()).expect("container");
        let runner = Runner::new(&instance, container, false, false);

        let mut dbus_proxy = DbusProxy::new("/tmp/bj-session.sock", "/tmp/bj-system.sock", false);
        let mut fd_mappings = Vec::new();
        let mut temp_files = Vec::new();

        let (bwrap_args, _executable_args) = runner.generate_args(&mut dbus_proxy, &mut fd_mappings, &mut temp_files).expect("generate_args");

        assert!(bwrap_args.contains(&"--unshare-all".to_string()));
        assert!(bwrap_args.contains(&"--as-pid-1".to_string()));
        assert!(bwrap_args.contains(&"--new-session".to_string()));
        assert!(bwrap_args.contains(&"/var/run/dbus/system_bus_socket".to_string()));
        assert!(bwrap_args.contains(&"/run/dbus/system_bus_socket".to_string()));
    }

    #[test]
    fn shell_debug_disables_new_session() {
        let (_dir, instance) = test_instance();
        let container = ServiceContainer::new(ServicesConfig::default()).expect("container");
        let runner = Runner::new(&instance, container, true, false);

        let mut dbus_proxy = DbusProxy::new("/tmp/bj-session.sock", "/tmp/bj-system.sock", false);
        let mut fd_mappings = Vec::new();
        let mut temp_files = Vec::new();

        let (bwrap_args, _executable_args) = runner.generate_args(&mut dbus_proxy, &mut fd_mappings, &mut temp_files).expect("generate_args");

        assert!(!bwrap_args.contains(&"--new-session".to_string()));
    }

    #[test]
    fn wants_home_bind_placeholder_resolves_to_instance_home() {
        let (_dir, instance) = test_instance();
        let container = ServiceContainer::new(ServicesConfig::default()).expect("container");
        let runner = Runner::new(&instance, container, false, false);

        let mut dbus_proxy = DbusProxy::new("/tmp/bj-session.sock", "/tmp/bj-system.sock", false);
        let mut fd_mappings = Vec::new();
        let mut temp_files = Vec::new();

        let (bwrap_args, _executable_args) = runner.generate_args(&mut dbus_proxy, &mut fd_mappings, &mut temp_files).expect("generate_args");

        let home = runner.instance_home.to_string_lossy().into_owned();
        assert!(bwrap_args.iter().any(|a| a == &home));
    }

    #[test]
    fn extra_bwrap_args_are_appended() {
        let (_dir, instance) = test_instance();
        let container = ServiceContainer::new(ServicesConfig::default()).expect("container");
        let runner = Runner::new(&instance, container, false, false).with_extra_bwrap_args(vec!["--cap-add".into(), "CAP_SYS_PTRACE".into()]);

        let mut dbus_proxy = DbusProxy::new("/tmp/bj-session.sock", "/tmp/bj-system.sock", false);
        let mut fd_mappings = Vec::new();
        let mut temp_files = Vec::new();

        let (bwrap_args, _executable_args) = runner.generate_args(&mut dbus_proxy, &mut fd_mappings, &mut temp_files).expect("generate_args");

        assert!(bwrap_args.ends_with(&["--cap-add".to_string(), "CAP_SYS_PTRACE".to_string()]));
    }
}
