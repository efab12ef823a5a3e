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

use crate::{config::ServicesConfig, directive::Directive, service::Service};

pub struct HomeShare;

impl Service for HomeShare {
    fn name(&self) -> &'static str {
        "home_share"
    }

    fn pretty_name(&self) -> &'static str {
        "Home share"
    }

    fn description(&self) -> &'static str {
        "Allows access to directories inside home."
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.home_share.as_ref() else {
            return d;
        };

        let home = var("HOME").unwrap_or_default();

        for relative in &settings.home_paths {
            let path = format!("{home}/{relative}");
            d.push(Directive::Bind { source: path.clone(), dest: path });
        }

        d
    }
}
