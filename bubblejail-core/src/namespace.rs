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

//! Thin wrappers around `/proc/<pid>/ns/<kind>` namespace file descriptors,
//! re-expressing the `lxns` Python bindings used by `slirp4netns`,
//! `pasta_network` and `namespaces_limits` to enter another process's
//! namespaces.

use std::{
    fs::File,
    os::fd::{AsRawFd, RawFd},
};

use nix::{
    sched::{setns, CloneFlags},
    unistd::Pid,
};

use crate::{error, ErrorKind, Result};

/// `ioctl(NS_GET_USERNS)`: given a namespace fd, returns a new fd for the
/// user namespace that owns it.
nix::ioctl_none!(ns_get_userns, 0xb7, 0x01);

/// A namespace file descriptor opened from `/proc/<pid>/ns/<kind>`.
pub struct Namespace {
    file: File,
}

impl Namespace {
    fn open(pid: Pid, kind: &str) -> Result<Self> {
        let path = format!("/proc/{pid}/ns/{kind}");
        let file = File::open(&path).map_err(|e| error!(ErrorKind::IOError(path, e.kind())))?;
        Ok(Self { file })
    }

    /// Enters this namespace in the calling process, per `setns(2)`.
    pub fn setns(&self, flags: CloneFlags) -> Result<()> {
        setns(&self.file, flags).map_err(|e| error!(ErrorKind::Initialization(format!("setns failed: {e}"))))
    }

    /// Resolves the user namespace that owns this namespace.
    pub fn user_namespace(&self) -> Result<Namespace> {
        use std::os::fd::FromRawFd;

        let new_fd = unsafe { ns_get_userns(self.file.as_raw_fd()) }
            .map_err(|e| error!(ErrorKind::Initialization(format!("NS_GET_USERNS failed: {e}"))))?;

        // SAFETY: NS_GET_USERNS returns a newly allocated, owned fd on success.
        let file = unsafe { File::from_raw_fd(new_fd) };
        Ok(Namespace { file })
    }

    pub fn path_via_self_fd(&self, self_pid: Pid) -> String {
        format!("/proc/{self_pid}/fd/{}", self.file.as_raw_fd())
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Identity of this namespace, as the device/inode pair backing its
    /// `/proc/.../ns/<kind>` file — two namespace fds refer to the same
    /// namespace iff this pair matches.
    pub fn ns_id(&self) -> Result<(u64, u64)> {
        use std::os::unix::fs::MetadataExt;
        let meta = self.file.metadata().map_err(|e| error!(ErrorKind::IOError("namespace fd".into(), e.kind())))?;
        Ok((meta.dev(), meta.ino()))
    }
}

pub struct NetworkNamespace(Namespace);

impl NetworkNamespace {
    pub fn from_pid(pid: Pid) -> Result<Self> {
        Namespace::open(pid, "net").map(Self)
    }

    pub fn get_user_namespace(&self) -> Result<Namespace> {
        self.0.user_namespace()
    }
}

pub struct UserNamespace(Namespace);

impl UserNamespace {
    pub fn from_pid(pid: Pid) -> Result<Self> {
        Namespace::open(pid, "user").map(Self)
    }

    pub fn get_user_namespace(&self) -> Result<Namespace> {
        self.0.user_namespace()
    }

    pub fn setns(&self) -> Result<()> {
        self.0.setns(CloneFlags::CLONE_NEWUSER)
    }

    /// Identity of the user namespace the calling process currently runs
    /// in, as the device/inode pair backing `/proc/self/ns/user`.
    pub fn current_ns_id() -> Result<(u64, u64)> {
        use std::os::unix::fs::MetadataExt;
        let meta = std::fs::metadata("/proc/self/ns/user").map_err(|e| error!(ErrorKind::IOError("/proc/self/ns/user".into(), e.kind())))?;
        Ok((meta.dev(), meta.ino()))
    }
}

impl std::ops::Deref for NetworkNamespace {
    type Target = Namespace;
    fn deref(&self) -> &Namespace {
        &self.0
    }
}

impl std::ops::Deref for UserNamespace {
    type Target = Namespace;
    fn deref(&self) -> &Namespace {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::getpid;

    #[test]
    fn opening_our_own_user_namespace_matches_current_ns_id() {
        let ns = UserNamespace::from_pid(getpid()).unwrap();
        assert_eq!(ns.ns_id().unwrap(), UserNamespace::current_ns_id().unwrap());
    }

    #[test]
    fn net_namespace_path_via_self_fd_is_well_formed() {
        let self_pid = getpid();
        let ns = NetworkNamespace::from_pid(self_pid).unwrap();
        let path = ns.path_via_self_fd(self_pid);
        assert_eq!(path, format!("/proc/{self_pid}/fd/{}", ns.as_raw_fd()));
    }

    #[test]
    fn opening_a_nonexistent_pid_fails_with_io_error() {
        let err = NetworkNamespace::from_pid(Pid::from_raw(i32::MAX)).unwrap_err();
        assert!(matches!(err.downcast::<ErrorKind>(), Ok(ErrorKind::IOError(..))));
    }
}
