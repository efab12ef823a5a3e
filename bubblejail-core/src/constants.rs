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

use std::{env::var, time::Duration};

use lazy_static::lazy_static;
use nix::unistd::{getegid, geteuid};


/// Grace period given to a process between SIGTERM and SIGKILL during teardown escalation.
pub static TERMINATE_GRACE: Duration = Duration::from_secs(3);
/// Poll interval used by the in-sandbox helper's idle-exit watcher.
pub static IDLE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Number of SIGTERM retries the helper gives a child before escalating to SIGKILL.
pub const TERMINATE_RETRY_CYCLES: u32 = 20;

pub const BWRAP_EXECUTABLE: &str = "bwrap";
pub const DBUS_PROXY_EXECUTABLE: &str = "xdg-dbus-proxy";
pub const SLIRP4NETNS_EXECUTABLE: &str = "slirp4netns";
pub const PASTA_EXECUTABLE: &str = "pasta";
pub const HELPER_EXECUTABLE: &str = "/usr/lib/bubblejail/bubblejail-helper";

const BUBBLEJAIL_CONFIG_DIR: &str = "/.config/bubblejail";
const BUBBLEJAIL_DATA_DIR: &str = "/.local/share/bubblejail";

#[macro_export]
macro_rules! format_str {
    ( $( $x:expr ),+ ) => {
        format!($( $x, )+).leak()
    };
}

lazy_static! {
    pub static ref UID: u32 = geteuid().as_raw();
    pub static ref GID: u32 = getegid().as_raw();
    pub static ref HOME: &'static str = env("HOME");
    pub static ref TERM: &'static str = env_opt("TERM");
    pub static ref COLORTERM: &'static str = env_opt("COLORTERM");
    pub static ref DISPLAY: &'static str = env_opt("DISPLAY");
    pub static ref XAUTHORITY: &'static str = env_opt("XAUTHORITY");
    pub static ref WAYLAND_DISPLAY: &'static str = env_opt("WAYLAND_DISPLAY");
    pub static ref DBUS_SESSION_BUS_ADDRESS: &'static str = env_opt("DBUS_SESSION_BUS_ADDRESS");
    pub static ref XDG_RUNTIME_DIR: &'static str = env_default_dir("XDG_RUNTIME_DIR", &format!("/run/user/{}", *UID));
    pub static ref XDG_CONFIG_HOME: &'static str = env_default_dir("XDG_CONFIG_HOME", BUBBLEJAIL_CONFIG_DIR);
    pub static ref XDG_DATA_HOME: &'static str = env_default_dir("XDG_DATA_HOME", BUBBLEJAIL_DATA_DIR);
    pub static ref BUBBLEJAIL_CONFDIRS: &'static str = env_opt("BUBBLEJAIL_CONFDIRS");
    pub static ref BUBBLEJAIL_DATADIRS: &'static str = env_opt("BUBBLEJAIL_DATADIRS");
    pub static ref DISABLE_SECCOMP_DEFAULTS: bool = var("BUBBLEJAIL_DISABLE_SECCOMP_DEFAULTS").is_ok_and(|v| v == "1");
    pub static ref LOG_VERBOSITY: i8 = var("BUBBLEJAIL_LOG").ok().and_then(|v| v.parse().ok()).unwrap_or(2);
    pub static ref DATA_HOME: &'static str = format_str!("{}/bubblejail", *XDG_DATA_HOME);
    pub static ref INSTANCES_DIR: &'static str = format_str!("{}/instances", *DATA_HOME);
    pub static ref PROFILES_DIR: &'static str = format_str!("{}/profiles", *DATA_HOME);
    pub static ref LOG_LOCATION: &'static str = format_str!("{}/bubblejail.log", *DATA_HOME);
}

fn env(env: &'static str) -> &'static str {
    var(env).unwrap_or_else(|_| panic!("${env} is unset")).leak()
}

fn env_opt(env: &str) -> &'static str {
    var(env).map_or_else(|_| "", |var| var.leak())
}

fn env_default_dir(env: &str, default: &str) -> &'static str {
    var(env).map_or_else(|_| format_str!("{}{}", *HOME, default), |var| var.leak())
}
