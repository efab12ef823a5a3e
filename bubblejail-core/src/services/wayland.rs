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

use std::env::var;

use crate::{
    config::ServicesConfig,
    constants::XDG_RUNTIME_DIR,
    directive::Directive,
    service::Service,
    services::{generate_toolkit_directives, XDG_DESKTOP_VARS},
    ErrorKind,
};

pub struct Wayland;

impl Service for Wayland {
    fn name(&self) -> &'static str {
        "wayland"
    }

    fn pretty_name(&self) -> &'static str {
        "Wayland windowing system"
    }

    fn description(&self) -> &'static str {
        "Gives access to Wayland socket.\nThis is the windowing system that replaces X11."
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();

        for name in XDG_DESKTOP_VARS {
            if var(name).is_ok() {
                d.push(Directive::EnvironVar { name: (*name).into(), value: None });
            }
        }

        d.push(Directive::EnvironVar {
            name: "GDK_BACKEND".into(),
            value: Some("wayland".into()),
        });
        d.push(Directive::EnvironVar {
            name: "MOZ_DBUS_REMOTE".into(),
            value: Some("1".into()),
        });
        d.push(Directive::EnvironVar {
            name: "MOZ_ENABLE_WAYLAND".into(),
            value: Some("1".into()),
        });

        // `ServiceContainer::new` already rejected this config if
        // `WAYLAND_DISPLAY` was unset, via `require_wayland_display`.
        if let Ok(wayland_display) = var("WAYLAND_DISPLAY") {
            let source = format!("{}/{wayland_display}", *XDG_RUNTIME_DIR);
            let dest = format!("{}/wayland-0", *XDG_RUNTIME_DIR);
            d.push(Directive::ReadOnlyBind { source, dest });
            d.push(Directive::EnvironVar {
                name: "WAYLAND_DISPLAY".into(),
                value: Some("wayland-0".into()),
            });
        }

        d.extend(generate_toolkit_directives());
        d
    }
}

/// Fails initialization when `WAYLAND_DISPLAY` is unset, mirroring upstream's
/// `raise` inside `iter_bwrap_options` — this service cannot produce a usable
/// sandbox without a compositor socket to bind.
pub fn require_wayland_display() -> crate::Result<String> {
    var("WAYLAND_DISPLAY").map_err(|_| crate::error!(ErrorKind::Dependency("WAYLAND_DISPLAY is unset".into())))
}
