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

use crate::{config::ServicesConfig, directive::Directive, service::Service};

/// Catch-all settings that do not fit another service: the default launch
/// argv, a D-Bus name to own, and the disk-sync filter used by games that
/// flush too eagerly (EA's Origin client upstream).
pub struct CommonSettings;

impl Service for CommonSettings {
    fn name(&self) -> &'static str {
        "common"
    }

    fn pretty_name(&self) -> &'static str {
        "Common Settings"
    }

    fn description(&self) -> &'static str {
        "Settings that don't fit in any particular category"
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.common.as_ref() else {
            return d;
        };

        let launch_args = settings.executable_name.clone().into_vec();
        if !launch_args.is_empty() {
            d.push(Directive::LaunchArguments { launch_args, priority: 0 });
        }

        if settings.filter_disk_sync {
            d.push(Directive::SeccompSyscallErrno {
                syscall_name: "sync".into(),
                errno: 0,
                skip_on_not_exists: false,
            });
            d.push(Directive::SeccompSyscallErrno {
                syscall_name: "fsync".into(),
                errno: 0,
                skip_on_not_exists: false,
            });
        }

        if !settings.dbus_name.is_empty() {
            d.push(Directive::DbusSessionOwn { bus_name: settings.dbus_name.clone() });
        }

        d
    }
}
