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

//! Strongly-typed variants of every directive a service can emit. A service's
//! `iter_directives()` returns a `Vec<Directive>` eagerly; the runner performs
//! one linear pass substituting the two placeholder variants
//! (`WantsHomeBind`/`WantsDbusSessionBind`) with runner-owned paths before
//! consuming the rest, replacing the generator-with-`.send()`-resumption
//! pattern of the original implementation (see design note in the project's
//! SPEC_FULL for the full rationale).

use std::env::var;

/// A single bwrap command-line argument group, a D-Bus proxy rule, a
/// seccomp rule, a file to materialize before launch, or a placeholder
/// a service cannot resolve itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ShareNetwork,
    DirCreate { dest: String, permissions: Option<u32> },
    Symlink { source: String, dest: String },
    EnvironVar { name: String, value: Option<String> },
    ReadOnlyBind { source: String, dest: String },
    ReadOnlyBindTry { source: String, dest: String },
    Bind { source: String, dest: String },
    BindTry { source: String, dest: String },
    DevBind { source: String, dest: String },
    DevBindTry { source: String, dest: String },
    ChangeDir { dest: String },
    RawArgs(Vec<String>),

    /// Materialized to a temp file and bind-mounted by the runner; not a
    /// bwrap argument on its own.
    FileTransfer { content: Vec<u8>, dest: String },

    DbusSessionTalkTo { bus_name: String },
    DbusSessionOwn { bus_name: String },
    DbusSessionSee { bus_name: String },
    DbusSessionCall { bus_name: String, interface_name: String, object_path: String },
    DbusSessionBroadcast { bus_name: String, interface_name: String, object_path: String },
    DbusSessionRawArg(String),
    DbusSystemRawArg(String),

    SeccompSyscallErrno { syscall_name: String, errno: i32, skip_on_not_exists: bool },

    LaunchArguments { launch_args: Vec<String>, priority: i32 },

    /// Placeholder: the service knows the sandbox-side destination (the
    /// real `$HOME`) but not the runner-chosen outside source directory. The
    /// runner replaces this with `Bind { source: <instance home>, dest }`.
    WantsHomeBind { dest: String },
    /// Placeholder: the service knows the sandbox-side destination (the
    /// in-sandbox session bus path) but not the proxy's downstream socket.
    /// The runner replaces this with `Bind { source: <proxy socket>, dest }`.
    WantsDbusSessionBind { dest: String },
}

impl Directive {
    pub fn read_only_bind(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::ReadOnlyBind { dest: source.clone(), source }
    }

    pub fn bind(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::Bind { dest: source.clone(), source }
    }

    pub fn dev_bind(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::DevBind { dest: source.clone(), source }
    }

    /// Expands this directive to its bwrap argv fragment. Returns `None` for
    /// variants that are not bwrap arguments (`FileTransfer`, every D-Bus and
    /// seccomp variant, `LaunchArguments`, and unresolved placeholders).
    pub fn to_bwrap_args(&self) -> Option<Vec<String>> {
        let args = match self {
            Self::ShareNetwork => vec!["--share-net".into()],
            Self::DirCreate { dest, permissions } => {
                let mut v = Vec::new();
                if let Some(perms) = permissions {
                    v.push("--perms".into());
                    v.push(format!("{perms:04o}"));
                }
                v.push("--dir".into());
                v.push(dest.clone());
                v
            }
            Self::Symlink { source, dest } => vec!["--symlink".into(), source.clone(), dest.clone()],
            Self::EnvironVar { name, value } => {
                let value = value.clone().or_else(|| var(name).ok()).unwrap_or_default();
                vec!["--setenv".into(), name.clone(), value]
            }
            Self::ReadOnlyBind { source, dest } => vec!["--ro-bind".into(), source.clone(), dest.clone()],
            Self::ReadOnlyBindTry { source, dest } => vec!["--ro-bind-try".into(), source.clone(), dest.clone()],
            Self::Bind { source, dest } => vec!["--bind".into(), source.clone(), dest.clone()],
            Self::BindTry { source, dest } => vec!["--bind-try".into(), source.clone(), dest.clone()],
            Self::DevBind { source, dest } => vec!["--dev-bind".into(), source.clone(), dest.clone()],
            Self::DevBindTry { source, dest } => vec!["--dev-bind-try".into(), source.clone(), dest.clone()],
            Self::ChangeDir { dest } => vec!["--chdir".into(), dest.clone()],
            Self::RawArgs(args) => args.clone(),
            _ => return None,
        };

        Some(args)
    }

    /// Expands a session D-Bus proxy rule to its single-token proxy argv
    /// fragment (`--talk=com.example=*@/*`), matching `DbusCommon.to_args()`.
    pub fn to_dbus_session_arg(&self) -> Option<String> {
        match self {
            Self::DbusSessionTalkTo { bus_name } => Some(format!("--talk={bus_name}")),
            Self::DbusSessionOwn { bus_name } => Some(format!("--own={bus_name}")),
            Self::DbusSessionSee { bus_name } => Some(format!("--see={bus_name}")),
            Self::DbusSessionCall {
                bus_name,
                interface_name,
                object_path,
            } => Some(format!("--call={bus_name}={interface_name}@{object_path}")),
            Self::DbusSessionBroadcast {
                bus_name,
                interface_name,
                object_path,
            } => Some(format!("--broadcast={bus_name}={interface_name}@{object_path}")),
            Self::DbusSessionRawArg(raw) => Some(raw.clone()),
            _ => None,
        }
    }

    pub fn to_dbus_system_arg(&self) -> Option<String> {
        match self {
            Self::DbusSystemRawArg(raw) => Some(raw.clone()),
            _ => None,
        }
    }

    pub fn dbus_session_call(bus_name: impl Into<String>) -> Self {
        Self::DbusSessionCall {
            bus_name: bus_name.into(),
            interface_name: "*".into(),
            object_path: "/*".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_constructors_use_the_same_source_and_dest() {
        assert_eq!(
            Directive::bind("/dev/dri"),
            Directive::Bind { source: "/dev/dri".into(), dest: "/dev/dri".into() }
        );
        assert_eq!(
            Directive::read_only_bind("/etc/resolv.conf"),
            Directive::ReadOnlyBind { source: "/etc/resolv.conf".into(), dest: "/etc/resolv.conf".into() }
        );
    }

    #[test]
    fn dir_create_without_perms_omits_the_perms_flag() {
        let args = Directive::DirCreate { dest: "/run/user/1000".into(), permissions: None }.to_bwrap_args().unwrap();
        assert_eq!(args, vec!["--dir", "/run/user/1000"]);
    }

    #[test]
    fn dir_create_with_perms_emits_octal_mode() {
        let args = Directive::DirCreate { dest: "/tmp/x".into(), permissions: Some(0o700) }.to_bwrap_args().unwrap();
        assert_eq!(args, vec!["--perms", "0700", "--dir", "/tmp/x"]);
    }

    #[test]
    fn environ_var_with_explicit_value_does_not_read_the_environment() {
        let args = Directive::EnvironVar { name: "FOO".into(), value: Some("bar".into()) }.to_bwrap_args().unwrap();
        assert_eq!(args, vec!["--setenv", "FOO", "bar"]);
    }

    #[test]
    fn non_bwrap_variants_return_none() {
        assert_eq!(Directive::DbusSessionTalkTo { bus_name: "org.foo".into() }.to_bwrap_args(), None);
        assert_eq!(Directive::WantsHomeBind { dest: "/home/user".into() }.to_bwrap_args(), None);
        assert_eq!(
            Directive::SeccompSyscallErrno { syscall_name: "clone".into(), errno: 1, skip_on_not_exists: false }.to_bwrap_args(),
            None
        );
    }

    #[test]
    fn dbus_session_arg_formats_match_the_proxy_cli_shape() {
        assert_eq!(Directive::DbusSessionTalkTo { bus_name: "org.foo".into() }.to_dbus_session_arg(), Some("--talk=org.foo".into()));
        assert_eq!(Directive::DbusSessionOwn { bus_name: "org.foo".into() }.to_dbus_session_arg(), Some("--own=org.foo".into()));
        assert_eq!(
            Directive::dbus_session_call("org.foo").to_dbus_session_arg(),
            Some("--call=org.foo=*@/*".into())
        );
        assert_eq!(Directive::Bind { source: "/a".into(), dest: "/b".into() }.to_dbus_session_arg(), None);
    }

    #[test]
    fn dbus_system_arg_only_matches_its_own_variant() {
        assert_eq!(Directive::DbusSystemRawArg("--talk=org.bar".into()).to_dbus_system_arg(), Some("--talk=org.bar".into()));
        assert_eq!(Directive::DbusSessionRawArg("--talk=org.bar".into()).to_dbus_system_arg(), None);
    }
}
