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

pub struct IBus;

impl Service for IBus {
    fn name(&self) -> &'static str {
        "ibus"
    }

    fn pretty_name(&self) -> &'static str {
        "IBus input method"
    }

    fn description(&self) -> &'static str {
        "Gives access to IBus input method.\nThis is generally the default input method for multilingual input."
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["fcitx"]
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        vec![
            Directive::EnvironVar { name: "IBUS_USE_PORTAL".into(), value: Some("1".into()) },
            Directive::EnvironVar { name: "GTK_IM_MODULE".into(), value: Some("ibus".into()) },
            Directive::EnvironVar { name: "QT_IM_MODULE".into(), value: Some("ibus".into()) },
            Directive::EnvironVar { name: "XMODIFIERS".into(), value: Some("@im=ibus".into()) },
            Directive::EnvironVar { name: "GLFW_IM_MODULE".into(), value: Some("ibus".into()) },
            Directive::DbusSessionTalkTo { bus_name: "org.freedesktop.portal.IBus.*".into() },
        ]
    }
}
