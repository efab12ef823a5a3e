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

pub struct GameMode;

impl Service for GameMode {
    fn name(&self) -> &'static str {
        "gamemode"
    }

    fn pretty_name(&self) -> &'static str {
        "GameMode"
    }

    fn description(&self) -> &'static str {
        "Provides D-Bus access to the Feral's GameMode daemon D-Bus API. Use `gamemoderun` command to run a specific game with optimizations. For example, add `gamemoderun %command%` to Steam game launch options."
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        vec![Directive::DbusSessionCall {
            bus_name: "com.feralinteractive.GameMode".into(),
            interface_name: "*".into(),
            object_path: "/com/feralinteractive/GameMode".into(),
        }]
    }
}
