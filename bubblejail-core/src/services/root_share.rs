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

pub struct RootShare;

impl Service for RootShare {
    fn name(&self) -> &'static str {
        "root_share"
    }

    fn pretty_name(&self) -> &'static str {
        "Root share"
    }

    fn description(&self) -> &'static str {
        "Allows access to directories from root (/) outside of home directory."
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let Some(settings) = config.root_share.as_ref() else {
            return d;
        };

        for path in &settings.paths {
            d.push(Directive::Bind { source: path.clone(), dest: path.clone() });
        }

        for path in &settings.read_only_paths {
            d.push(Directive::ReadOnlyBind { source: path.clone(), dest: path.clone() });
        }

        d
    }
}
