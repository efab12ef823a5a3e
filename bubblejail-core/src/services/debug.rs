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

pub struct Debug;

impl Service for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn pretty_name(&self) -> &'static str {
        "Debug options"
    }

    fn description(&self) -> &'static str {
        "Various debug options such as adding arguments to the bwrap or xdg-dbus-proxy."
    }

    fn flags(&self) -> ServiceFlags {
        ServiceFlags::NO_GUI
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.debug.as_ref() else {
            return d;
        };

        if !settings.raw_bwrap_args.is_empty() {
            d.push(Directive::RawArgs(settings.raw_bwrap_args.clone()));
        }

        for raw in &settings.raw_dbus_session_args {
            d.push(Directive::DbusSessionRawArg(raw.clone()));
        }

        for raw in &settings.raw_dbus_system_args {
            d.push(Directive::DbusSystemRawArg(raw.clone()));
        }

        d
    }
}
