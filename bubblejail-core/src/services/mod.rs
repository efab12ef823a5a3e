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

//! One module per catalog entry, each grounded on the matching class in the
//! original implementation's `services.py`.

pub mod common;
pub mod debug;
pub mod defaults;
pub mod direct_rendering;
pub mod fcitx;
pub mod gamemode;
pub mod gnome_toolkit;
pub mod home_share;
pub mod ibus;
pub mod joystick;
pub mod mpris;
pub mod namespaces_limits;
pub mod network;
pub mod notify;
pub mod openjdk;
pub mod pasta_network;
pub mod pipewire;
pub mod pulse_audio;
pub mod root_share;
pub mod slirp4netns;
pub mod systray;
pub mod v4l;
pub mod wayland;
pub mod x11;
pub mod xdg_desktop_portal;

/// Env vars whose values are forwarded as-is into the sandbox when the
/// windowing-system services detect them, shared by `x11` and `wayland`.
pub(crate) const XDG_DESKTOP_VARS: &[&str] =
    &["XDG_CURRENT_DESKTOP", "DESKTOP_SESSION", "XDG_SESSION_TYPE", "XDG_SESSION_DESKTOP"];

/// Binds `~/.config/kdeglobals` read-only into the sandbox if present, shared
/// by every windowing-system service (`generate_toolkits()` upstream).
pub(crate) fn generate_toolkit_directives() -> Vec<crate::directive::Directive> {
    let mut directives = Vec::new();
    let path = format!("{}/kdeglobals", *crate::constants::XDG_CONFIG_HOME);

    if std::path::Path::new(&path).exists() {
        directives.push(crate::directive::Directive::read_only_bind(path));
    }

    directives
}
