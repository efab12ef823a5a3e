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

use std::{fs::read_link, path::Path};

use crate::{config::ServicesConfig, directive::Directive, service::Service};

pub struct VideoForLinux;

impl Service for VideoForLinux {
    fn name(&self) -> &'static str {
        "v4l"
    }

    fn pretty_name(&self) -> &'static str {
        "Video4Linux"
    }

    fn description(&self) -> &'static str {
        "Video capture. (webcams and etc.)"
    }

    fn iter_directives(&self, _config: &ServicesConfig) -> Vec<Directive> {
        let mut d = vec![
            Directive::DevBindTry {
                source: "/dev/v4l".into(),
                dest: "/dev/v4l".into(),
            },
            Directive::DevBindTry {
                source: "/sys/class/video4linux".into(),
                dest: "/sys/class/video4linux".into(),
            },
            Directive::DevBindTry {
                source: "/sys/bus/media/".into(),
                dest: "/sys/bus/media/".into(),
            },
        ];

        if let Ok(entries) = std::fs::read_dir("/sys/class/video4linux") {
            for entry in entries.filter_map(Result::ok) {
                let Ok(pcie_path) = entry.path().canonicalize() else { continue };

                if let Ok(char_entries) = std::fs::read_dir("/sys/dev/char") {
                    for char_entry in char_entries.filter_map(Result::ok) {
                        let char_path = char_entry.path();
                        if char_path.canonicalize().as_deref() == Ok(pcie_path.as_path()) {
                            if let Ok(target) = read_link(&char_path) {
                                d.push(Directive::Symlink {
                                    source: target.to_string_lossy().into_owned(),
                                    dest: char_path.to_string_lossy().into_owned(),
                                });
                            }
                        }
                    }
                }

                if let Some(grandparent) = pcie_path.parent().and_then(Path::parent) {
                    d.push(Directive::dev_bind(grandparent.to_string_lossy().into_owned()));
                }
            }
        }

        if let Ok(entries) = std::fs::read_dir("/dev") {
            for entry in entries.filter_map(Result::ok) {
                let name = entry.file_name();
                let name = name.to_string_lossy();

                let suffix = if let Some(s) = name.strip_prefix("video") {
                    s
                } else if let Some(s) = name.strip_prefix("media") {
                    s
                } else {
                    continue;
                };

                if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }

                d.push(Directive::dev_bind(entry.path().to_string_lossy().into_owned()));
            }
        }

        d
    }
}
