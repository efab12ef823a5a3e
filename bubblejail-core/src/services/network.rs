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

use std::fs::canonicalize;

use crate::{config::ServicesConfig, directive::Directive, service::Service};

pub struct Network;

impl Service for Network {
    fn name(&self) -> &'static str {
        "network"
    }

    fn pretty_name(&self) -> &'static str {
        "Network access"
    }

    fn description(&self) -> &'static str {
        "Gives unrestricted network access."
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["slirp4netns", "pasta_network"]
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let mut d = vec![Directive::ShareNetwork];

        if let Ok(resolved) = canonicalize("/etc/resolv.conf") {
            let resolved = resolved.to_string_lossy().into_owned();
            if resolved != "/etc/resolv.conf" {
                d.push(Directive::ReadOnlyBind {
                    source: resolved,
                    dest: "/etc/resolv.conf".into(),
                });
            }
        }

        d
    }
}
