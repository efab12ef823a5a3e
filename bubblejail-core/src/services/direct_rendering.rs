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

use std::{collections::HashSet, fs::read_dir, path::Path};

use crate::{config::ServicesConfig, directive::Directive, service::Service, services::defaults::is_char_device};

pub struct DirectRendering;

impl Service for DirectRendering {
    fn name(&self) -> &'static str {
        "direct_rendering"
    }

    fn pretty_name(&self) -> &'static str {
        "Direct Rendering"
    }

    fn description(&self) -> &'static str {
        "Provides access to GPU"
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();

        // Names of cardX/renderX char devices present in /dev/dri.
        let mut device_names = HashSet::new();
        if let Ok(entries) = read_dir("/dev/dri") {
            for entry in entries.filter_map(Result::ok) {
                if is_char_device(&entry.path()) {
                    if let Some(stem) = entry.path().file_stem() {
                        device_names.insert(stem.to_string_lossy().into_owned());
                    }
                }
            }
        }

        // Resolve every symlink in /sys/dev/char and bind whichever ones
        // point at a discovered dri device, two parents up (the PCI device
        // directory housing `drm/dri`).
        if let Ok(entries) = read_dir("/sys/dev/char") {
            for entry in entries.filter_map(Result::ok) {
                let link = entry.path();
                let Ok(resolved) = link.canonicalize() else { continue };
                let Some(name) = resolved.file_name() else { continue };

                if !device_names.contains(&name.to_string_lossy().into_owned()) {
                    continue;
                }

                d.push(Directive::Symlink {
                    source: resolved.to_string_lossy().into_owned(),
                    dest: link.to_string_lossy().into_owned(),
                });

                if let Some(grandparent) = resolved.parent().and_then(Path::parent) {
                    d.push(Directive::dev_bind(grandparent.to_string_lossy().into_owned()));
                }
            }
        }

        d.push(Directive::dev_bind("/dev/dri"));

        if let Ok(entries) = read_dir("/dev") {
            for entry in entries.filter_map(Result::ok) {
                let name = entry.file_name();
                if name.to_string_lossy().starts_with("nvidia") {
                    d.push(Directive::dev_bind(entry.path().to_string_lossy().into_owned()));
                }
            }
        }

        if let Ok(entries) = read_dir("/sys/module") {
            for entry in entries.filter_map(Result::ok) {
                let name = entry.file_name();
                if name.to_string_lossy().starts_with("nvidia") {
                    let path = entry.path().to_string_lossy().into_owned();
                    d.push(Directive::ReadOnlyBindTry { source: path.clone(), dest: path });
                }
            }
        }

        d
    }
}
