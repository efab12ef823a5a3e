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

use std::fmt::{Display, Formatter, Result as FmtResult};

pub mod config;
pub mod constants;
pub mod dbus_proxy;
pub mod directive;
pub mod error;
pub mod instance;
pub mod log;
pub mod namespace;
pub mod process;
pub mod rpc;
pub mod runner;
pub mod seccomp;
pub mod service;
pub mod services;
pub mod utils;

pub use error::*;

/// Closed set of failure categories, covering the five categories of the error
/// taxonomy (configuration, dependency, initialization, run, RPC) plus the
/// environment/IO wrapping variants shared by every module in this crate.
#[derive(Debug)]
pub enum ErrorKind {
    /// Malformed TOML, unknown service key, service conflict, missing required setting.
    Configuration(String),
    /// A required external binary or library was not found.
    Dependency(String),
    /// Readiness pipe timeout, proxy exit during startup, namespace entry failure, seccomp load failure.
    Initialization(String),
    /// The mount helper exited non-zero.
    Run(i32),
    /// Unreadable RPC request, unknown method, response timeout.
    Rpc(String),
    EnvVarUnset(&'static str),
    IOError(String, std::io::ErrorKind),
    Json(String),
    Message(String),
}

impl Display for ErrorKind {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Configuration(msg) => write!(fmter, "configuration error: {msg}"),
            Self::Dependency(dep) => write!(fmter, "dependency not found: {dep}"),
            Self::Initialization(msg) => write!(fmter, "initialization failed: {msg}"),
            Self::Run(code) => write!(fmter, "mount helper exited with status {code}"),
            Self::Rpc(msg) => write!(fmter, "rpc error: {msg}"),
            Self::EnvVarUnset(var) => write!(fmter, "${var} is unset"),
            Self::IOError(ctx, error) => write!(fmter, "'{ctx}': {error}"),
            Self::Json(msg) => write!(fmter, "malformed json: {msg}"),
            Self::Message(msg) => write!(fmter, "{msg}"),
        }
    }
}

impl ErrorTrait for ErrorKind {
    fn code(&self) -> i32 {
        match self {
            Self::Configuration(..) => 3,
            Self::Dependency(..) => 4,
            Self::Initialization(..) => 5,
            Self::Run(code) => *code,
            Self::Rpc(..) => 6,
            Self::IOError(..) => 2,
            _ => 1,
        }
    }
}
