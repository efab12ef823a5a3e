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

use crate::{config::ServicesConfig, directive::Directive, service::{Service, ServiceFlags}};

const BUS_NAME: &str = "org.freedesktop.portal.Desktop";
const OBJECT_PATH: &str = "/org/freedesktop/portal/desktop";

pub struct XdgDesktopPortal;

impl Service for XdgDesktopPortal {
    fn name(&self) -> &'static str {
        "xdg_desktop_portal"
    }

    fn pretty_name(&self) -> &'static str {
        "XDG Desktop Portal"
    }

    fn description(&self) -> &'static str {
        "D-Bus API that allows access for sandboxed application to resources outside of it."
    }

    fn flags(&self) -> ServiceFlags {
        ServiceFlags::EXPERIMENTAL
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.xdg_desktop_portal.as_ref() else {
            return d;
        };

        d.push(Directive::DbusSessionSee { bus_name: BUS_NAME.into() });
        // Required to read the "version" property of each portal interface.
        d.push(call("org.freedesktop.DBus.Properties.*"));
        // Interfaces multiple portals use to wait for user interaction.
        d.push(call("org.freedesktop.portal.Request.*"));
        d.push(call("org.freedesktop.portal.Session.*"));

        // GTK_USE_PORTAL=1 seems to still have effect on Firefox, unlike GDK_DEBUG=portals.
        d.push(Directive::EnvironVar {
            name: "GTK_USE_PORTAL".into(),
            value: Some("1".into()),
        });

        if settings.add_flatpak_info {
            d.push(Directive::FileTransfer { content: Vec::new(), dest: "/.flatpak-info".into() });
        }

        if settings.file_chooser {
            d.push(call("org.freedesktop.portal.FileChooser.*"));
        }

        if settings.global_shortcuts {
            d.push(call("org.freedesktop.portal.GlobalShortcuts.*"));
        }

        if settings.inhibit {
            d.push(call("org.freedesktop.portal.Inhibit.*"));
        }

        if settings.notification {
            d.push(call("org.freedesktop.portal.Notification.*"));
        }

        if settings.open_uri {
            d.push(call("org.freedesktop.portal.OpenURI.*"));
        }

        if settings.settings {
            d.push(call("org.freedesktop.portal.Settings.*"));
        }

        if settings.trash {
            d.push(call("org.freedesktop.portal.Trash.*"));
        }

        d
    }
}

fn call(interface_name: &str) -> Directive {
    Directive::DbusSessionCall {
        bus_name: BUS_NAME.into(),
        interface_name: interface_name.into(),
        object_path: OBJECT_PATH.into(),
    }
}
