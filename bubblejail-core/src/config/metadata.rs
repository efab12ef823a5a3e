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

use std::{fs::read_to_string, path::Path};

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, Result};

/// `metadata_v1.toml`: instance provenance recorded at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Metadata {
    pub creation_profile_name: Option<String>,
    pub desktop_entry_name: Option<String>,
}

impl Metadata {
    /// Loads `path`, returning the default (all-`None`) metadata if it does
    /// not yet exist — matching the Python implementation's `_get_metadata_dict`
    /// `FileNotFoundError` fallback.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(crate::error!(ErrorKind::IOError(path.display().to_string(), err.kind()))),
        };

        toml::from_str(&contents).map_err(|e| crate::error!(ErrorKind::Configuration(e.to_string())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| crate::error!(ErrorKind::Configuration(e.to_string())))?;

        std::fs::write(path, contents).map_err(|e| crate::error!(ErrorKind::IOError(path.display().to_string(), e.kind())))
    }
}
