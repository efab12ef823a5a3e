/*
 * bubblejail-helper
 *
 * Copyright (C) 2023-2024 Xavier Moffett <sapphirus@azorium.net>
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify
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

use std::fmt::{Display, Formatter, Result as FmtResult};

use bubblejail_core::{impl_error, ErrorTrait};

#[derive(Debug)]
pub enum HelperError {
    MissingHelperSocket,
    ReadyTokenMismatch(String),
    Usage(String),
}

impl Display for HelperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::MissingHelperSocket => write!(f, "--helper-socket is required"),
            Self::ReadyTokenMismatch(got) => write!(f, "could not read 'bubblejail-ready' from ready fd, got '{got}'"),
            Self::Usage(message) => write!(f, "{message}"),
        }
    }
}

impl_error!(HelperError);
