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

use std::{
    collections::HashSet,
    fs::{read_dir, read_link},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use crate::{config::ServicesConfig, directive::Directive, service::Service, services::defaults::is_char_device};

pub struct Joystick;

impl Service for Joystick {
    fn name(&self) -> &'static str {
        "joystick"
    }

    fn pretty_name(&self) -> &'static str {
        "Joysticks and gamepads"
    }

    fn description(&self) -> &'static str {
        "Windowing systems (x11 and wayland) do not support gamepads.\nEvery game has to read from device files directly.\nThis service provides access to them."
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();
        let dev_input_path = Path::new("/dev/input");
        let sys_class_input_path = Path::new("/sys/class/input");

        // jsX devices readable by "other" are gamepads; eventX siblings are
        // discovered via their shared /sys/class/input parent directory.
        let mut js_names = HashSet::new();
        if let Ok(entries) = read_dir(dev_input_path) {
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                if !is_char_device(&path) {
                    continue;
                }
                let Ok(meta) = entry.metadata() else { continue };
                if meta.permissions().mode() & 0o004 == 0 {
                    continue;
                }
                if let Some(name) = path.file_name() {
                    js_names.insert(name.to_string_lossy().into_owned());
                }
            }
        }

        let mut look_for_names: HashSet<String> = js_names.clone();

        for js_name in &js_names {
            let sys_class_input_js = sys_class_input_path.join(js_name);
            let Ok(js_resolved) = sys_class_input_js.canonicalize() else { continue };
            let Some(js_input_path) = js_resolved.parent() else { continue };

            if let Ok(entries) = read_dir(js_input_path) {
                for entry in entries.filter_map(Result::ok) {
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    if name.starts_with("event") {
                        look_for_names.insert(name.into_owned());
                    }
                }
            }
        }

        for dev_name in &look_for_names {
            d.push(Directive::dev_bind(dev_input_path.join(dev_name).to_string_lossy().into_owned()));

            let sys_class_path = sys_class_input_path.join(dev_name);
            if let Ok(target) = read_link(&sys_class_path) {
                d.push(Directive::Symlink {
                    source: target.to_string_lossy().into_owned(),
                    dest: sys_class_path.to_string_lossy().into_owned(),
                });
            }

            if let Ok(pci_path) = sys_class_path.canonicalize() {
                if let Some(grandparent) = ancestor(&pci_path, 2) {
                    d.push(Directive::dev_bind(grandparent.to_string_lossy().into_owned()));
                }
            }
        }

        d
    }
}

fn ancestor(path: &Path, levels: usize) -> Option<PathBuf> {
    let mut current = path;
    for _ in 0..levels {
        current = current.parent()?;
    }
    Some(current.to_path_buf())
}
