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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{config::StringOrList, ErrorKind, Result};

/// A reusable template an instance is created from: a default service set
/// plus desktop-entry discovery hints. Profile files are library data; this
/// crate does not itself discover profile directories (out of scope — see
/// the project's expanded specification).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Profile {
    pub description: String,
    pub import_tips: String,
    pub dot_desktop_path: StringOrList,
    pub is_gtk_application: bool,
    pub services: super::ServicesConfig,
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::error!(ErrorKind::IOError(path.display().to_string(), e.kind())))?;

        toml::from_str(&contents).map_err(|e| crate::error!(ErrorKind::Configuration(e.to_string())))
    }

    /// The first existing path among `dot_desktop_path`'s candidates, if any.
    pub fn find_desktop_entry(&self) -> Option<PathBuf> {
        self.dot_desktop_path.clone().into_vec().into_iter().map(PathBuf::from).find(|p| p.exists())
    }
}
