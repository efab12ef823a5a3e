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

pub struct Fcitx;

impl Service for Fcitx {
    fn name(&self) -> &'static str {
        "fcitx"
    }

    fn pretty_name(&self) -> &'static str {
        "Fcitx/Fcitx5 input method"
    }

    fn description(&self) -> &'static str {
        "Gives access to Fcitx/Fcitx5 input method.\nThis is another popular input method framework."
    }

    fn conflicts(&self) -> &'static [&'static str] {
        &["ibus"]
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        vec![
            Directive::EnvironVar { name: "GTK_IM_MODULE".into(), value: Some("fcitx".into()) },
            Directive::EnvironVar { name: "QT_IM_MODULE".into(), value: Some("fcitx".into()) },
            Directive::EnvironVar { name: "XMODIFIERS".into(), value: Some("@im=fcitx".into()) },
            Directive::EnvironVar { name: "SDL_IM_MODULE".into(), value: Some("fcitx".into()) },
            // Matches upstream exactly: fcitx's GLFW binding still targets ibus.
            Directive::EnvironVar { name: "GLFW_IM_MODULE".into(), value: Some("ibus".into()) },
            Directive::DbusSessionTalkTo { bus_name: "org.freedesktop.portal.Fcitx.*".into() },
            Directive::DbusSessionTalkTo { bus_name: "org.freedesktop.portal.IBus.*".into() },
        ]
    }
}
