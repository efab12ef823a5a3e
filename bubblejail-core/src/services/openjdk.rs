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

/// No-op, kept only so existing profiles referencing `openjdk` still parse.
/// OpenJDK has not needed special sandboxing treatment since the XShm removal.
pub struct OpenJdk;

impl Service for OpenJdk {
    fn name(&self) -> &'static str {
        "openjdk"
    }

    fn pretty_name(&self) -> &'static str {
        "OpenJDK"
    }

    fn description(&self) -> &'static str {
        "Needed for OpenJDK applications such as Minecraft to work properly. (Deprecated since\nno longer needed)"
    }

    fn flags(&self) -> ServiceFlags {
        ServiceFlags::DEPRECATED
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        Vec::new()
    }
}
