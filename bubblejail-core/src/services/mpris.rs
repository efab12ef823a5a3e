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

pub struct Mpris;

impl Service for Mpris {
    fn name(&self) -> &'static str {
        "mpris"
    }

    fn pretty_name(&self) -> &'static str {
        "MPRIS"
    }

    fn description(&self) -> &'static str {
        "Media Player Remote Interfacing Specification"
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.mpris.as_ref() else {
            return d;
        };

        d.push(Directive::DbusSessionOwn {
            bus_name: format!("org.mpris.MediaPlayer2.{}", settings.player_name),
        });

        d
    }
}
