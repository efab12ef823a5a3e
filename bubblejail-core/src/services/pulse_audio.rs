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

use crate::{config::ServicesConfig, constants::XDG_RUNTIME_DIR, directive::Directive, service::Service};

pub struct PulseAudio;

impl Service for PulseAudio {
    fn name(&self) -> &'static str {
        "pulse_audio"
    }

    fn pretty_name(&self) -> &'static str {
        "Pulse Audio"
    }

    fn description(&self) -> &'static str {
        "Gives access to Pulse Audio socket, this is the default sound system on most distros."
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let socket = format!("{}/pulse/native", *XDG_RUNTIME_DIR);

        vec![Directive::Bind {
            source: socket.clone(),
            dest: socket,
        }]
    }
}
