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

use std::{env::var, fs::read_dir, os::unix::fs::FileTypeExt};

use crate::{
    config::ServicesConfig,
    constants::{DISABLE_SECCOMP_DEFAULTS, UID},
    directive::Directive,
    service::Service,
};

/// Syscalls blocked unconditionally unless `BUBBLEJAIL_DISABLE_SECCOMP_DEFAULTS`
/// is set. `chroot` is deliberately absent — Firefox and Chromium fail without it.
const BLOCKED_SYSCALLS: &[&str] = &[
    "bdflush",
    "io_pgetevents",
    "kexec_file_load",
    "kexec_load",
    "migrate_pages",
    "move_pages",
    "nfsservctl",
    "nice",
    "oldfstat",
    "oldlstat",
    "oldolduname",
    "oldstat",
    "olduname",
    "pciconfig_iobase",
    "pciconfig_read",
    "pciconfig_write",
    "sgetmask",
    "ssetmask",
    "swapcontext",
    "swapoff",
    "swapon",
    "sysfs",
    "uselib",
    "userfaultfd",
    "ustat",
    "vm86",
    "vm86old",
    "vmsplice",
    "bpf",
    "fanotify_init",
    "lookup_dcookie",
    "perf_event_open",
    "quotactl",
    "setdomainname",
    "sethostname",
    "delete_module",
    "init_module",
    "finit_module",
    "query_module",
    "acct",
    "iopl",
    "ioperm",
    "settimeofday",
    "stime",
    "clock_settime",
    "clock_settime64",
    "vhangup",
];

/// Mandatory directives present in every launch regardless of enabled
/// services: base filesystem, `/sys` device tree, the placeholder home and
/// session-bus binds, and the default seccomp blocklist.
#[derive(Debug, Clone, Copy)]
pub struct BubblejailDefaults;

pub static BUBBLEJAIL_DEFAULTS: BubblejailDefaults = BubblejailDefaults;

impl Service for BubblejailDefaults {
    fn name(&self) -> &'static str {
        "default"
    }

    fn pretty_name(&self) -> &'static str {
        "Default settings"
    }

    fn description(&self) -> &'static str {
        "Settings that must be present in any instance"
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let xdg_runtime_dir = format!("/run/user/{}", *UID);

        d.push(Directive::read_only_bind("/usr"));
        d.push(Directive::read_only_bind("/opt"));

        if let Ok(entries) = read_dir("/") {
            for entry in entries.filter_map(Result::ok) {
                let name = entry.file_name();
                let name = name.to_string_lossy();

                if !(name.starts_with("lib") || name == "bin" || name == "sbin") {
                    continue;
                }

                let path = entry.path();
                match std::fs::read_link(&path) {
                    Ok(target) => d.push(Directive::Symlink {
                        source: target.to_string_lossy().into_owned(),
                        dest: path.to_string_lossy().into_owned(),
                    }),
                    Err(_) => d.push(Directive::read_only_bind(path.to_string_lossy().into_owned())),
                }
            }
        }

        d.push(Directive::read_only_bind("/etc"));
        d.push(Directive::DirCreate { dest: "/tmp".into(), permissions: None });
        d.push(Directive::DirCreate { dest: "/var".into(), permissions: None });
        d.push(Directive::DirCreate { dest: "/sys".into(), permissions: Some(0o700) });

        for child in ["/sys/block", "/sys/bus", "/sys/class", "/sys/dev", "/sys/devices"] {
            d.push(Directive::DirCreate {
                dest: child.into(),
                permissions: Some(0o755),
            });
        }

        d.push(Directive::read_only_bind("/sys/devices/system/cpu"));
        d.push(Directive::DirCreate {
            dest: xdg_runtime_dir.clone(),
            permissions: Some(0o700),
        });

        let real_home = var("HOME").unwrap_or_default();

        // Placeholder: the runner resolves this to `Bind { source: <instance
        // home directory>, dest: real_home }` before continuing this vector.
        d.push(Directive::WantsHomeBind { dest: real_home.clone() });
        d.push(Directive::EnvironVar {
            name: "HOME".into(),
            value: Some(real_home.clone()),
        });
        // Compatibility symlink for pre-0.6.0 layouts.
        if real_home != "/home/user" {
            d.push(Directive::Symlink {
                source: real_home.clone(),
                dest: "/home/user".into(),
            });
        }
        d.push(Directive::ChangeDir { dest: real_home });

        let user = var("USER").unwrap_or_default();
        d.push(Directive::EnvironVar { name: "USER".into(), value: Some(user.clone()) });
        d.push(Directive::EnvironVar { name: "USERNAME".into(), value: Some(user) });
        d.push(Directive::EnvironVar {
            name: "PATH".into(),
            value: Some(filtered_path()),
        });
        d.push(Directive::EnvironVar {
            name: "XDG_RUNTIME_DIR".into(),
            value: Some(xdg_runtime_dir.clone()),
        });
        d.push(Directive::EnvironVar { name: "LANG".into(), value: None });

        if !*DISABLE_SECCOMP_DEFAULTS {
            for syscall in BLOCKED_SYSCALLS {
                d.push(Directive::SeccompSyscallErrno {
                    syscall_name: (*syscall).into(),
                    errno: 1,
                    skip_on_not_exists: true,
                });
            }
        }

        let dbus_session_inside_path = format!("{xdg_runtime_dir}/bus");
        d.push(Directive::EnvironVar {
            name: "DBUS_SESSION_BUS_ADDRESS".into(),
            value: Some(format!("unix:path={dbus_session_inside_path}")),
        });
        // Placeholder: the runner resolves this to `Bind { source: <proxy
        // downstream socket>, dest: dbus_session_inside_path }`.
        d.push(Directive::WantsDbusSessionBind { dest: dbus_session_inside_path });

        d
    }
}

fn filtered_path() -> String {
    var("PATH")
        .unwrap_or_default()
        .split(':')
        .filter(|p| p.starts_with("/usr/") || *p == "/bin" || *p == "/sbin")
        .collect::<Vec<_>>()
        .join(":")
}

/// Shared by `direct_rendering` and `joystick` for `/dev` device discovery.
pub(crate) fn is_char_device(path: &std::path::Path) -> bool {
    std::fs::metadata(path).map(|m| m.file_type().is_char_device()).unwrap_or(false)
}
