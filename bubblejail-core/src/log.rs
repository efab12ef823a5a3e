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
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{create_dir_all, File, OpenOptions},
    io::Write,
    path::Path,
};

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

use crate::constants::{DATA_HOME, LOG_LOCATION, LOG_VERBOSITY};

const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour][offset_minute]");
const UTC_OFFSET: &[FormatItem<'static>] = format_description!("[offset_hour]");

#[derive(PartialEq, Clone, Copy)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn to_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    fn verbosity(self) -> i8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
        }
    }
}

impl Display for Level {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        write!(fmter, "{}", self.to_str())
    }
}

/// Timestamped, level-filtered file logger. Failure to initialize the log
/// file degrades to stderr-only logging rather than aborting the launch;
/// logging never participates in control flow.
pub struct Logger {
    verbosity: i8,
    file: Option<File>,
    module: &'static str,
    offset: UtcOffset,
}

impl Logger {
    pub fn new(module_name: &'static str) -> Self {
        let ofs = OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .format(UTC_OFFSET)
            .unwrap();
        let ofs = UtcOffset::parse(ofs.as_str(), UTC_OFFSET).unwrap();

        Self {
            verbosity: *LOG_VERBOSITY,
            file: None,
            module: module_name,
            offset: ofs,
        }
    }

    /// Opens the log file, creating `DATA_HOME` if required. A failure here is
    /// non-fatal: subsequent `log` calls simply skip the file write.
    pub fn init(mut self) -> Self {
        if let Err(err) = create_dir_all(*DATA_HOME) {
            eprintln!("warning: could not create log directory: {err}");
            return self;
        }

        match OpenOptions::new().create(true).append(true).open(Path::new(*LOG_LOCATION)) {
            Ok(file) => self.file = Some(file),
            Err(err) => eprintln!("warning: could not open log file '{}': {err}", *LOG_LOCATION),
        }

        self
    }

    pub fn set_verbosity(&mut self, verbosity: i8) {
        self.verbosity = verbosity;
    }

    pub fn log(&mut self, level: Level, msg: &str) {
        if level.verbosity() > self.verbosity {
            return;
        }

        if let Ok(local) = OffsetDateTime::now_local() {
            self.offset = UtcOffset::parse(local.format(UTC_OFFSET).unwrap().as_str(), UTC_OFFSET).unwrap();
        }

        let time: OffsetDateTime = OffsetDateTime::now_utc().to_offset(self.offset);
        let line = format!("[{}] [{}] [{}] {}\n", time.format(DATE_FORMAT).unwrap(), self.module, level, msg);

        if let Some(file) = self.file.as_mut() {
            if let Err(err) = file.write_all(line.as_bytes()) {
                eprintln!("warning: failed to write to log file: {err}");
            }
        }

        if let Level::Debug | Level::Error = level {
            eprint!("[{}] [{}] {}", self.module, level, msg);
            if !msg.ends_with('\n') {
                eprintln!();
            }
        }
    }
}
