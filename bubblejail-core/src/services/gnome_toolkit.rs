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

pub struct GnomeToolkit;

impl Service for GnomeToolkit {
    fn name(&self) -> &'static str {
        "gnome_toolkit"
    }

    fn pretty_name(&self) -> &'static str {
        "GNOME toolkit"
    }

    fn description(&self) -> &'static str {
        "Access to GNOME APIs"
    }

    fn flags(&self) -> ServiceFlags {
        ServiceFlags::EXPERIMENTAL
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.gnome_toolkit.as_ref() else {
            return d;
        };

        if settings.gnome_portal {
            d.push(Directive::EnvironVar {
                name: "GTK_USE_PORTAL".into(),
                value: Some("1".into()),
            });
            d.push(Directive::DbusSessionTalkTo { bus_name: "org.freedesktop.portal.*".into() });
        }

        if settings.dconf_dbus {
            d.push(Directive::DbusSessionTalkTo { bus_name: "ca.desrt.dconf".into() });
        }

        if settings.gnome_vfs_dbus {
            d.push(Directive::DbusSessionTalkTo { bus_name: "org.gtk.vfs.*".into() });
        }

        d
    }
}
