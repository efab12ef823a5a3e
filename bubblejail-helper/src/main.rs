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

use std::{
    env,
    fs::File,
    io::Read,
    os::{
        fd::FromRawFd,
        unix::net::UnixListener,
    },
    process::exit,
};

use bubblejail_core::{err, error, ErrorKind, Result};

use crate::error::HelperError;

mod error;
mod supervisor;

struct HelperArgs {
    helper_socket_fd: i32,
    ready_fd: Option<i32>,
    shell: bool,
    args_to_run: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<HelperArgs> {
    let mut helper_socket_fd = None;
    let mut ready_fd = None;
    let mut shell = false;
    let mut args_to_run = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--helper-socket" => {
                let value = args.next().ok_or_else(|| error!(HelperError::Usage("--helper-socket requires a value".into())))?;
                helper_socket_fd =
                    Some(value.parse().map_err(|_| error!(HelperError::Usage(format!("invalid --helper-socket value '{value}'"))))?);
            }
            "--ready-fd" => {
                let value = args.next().ok_or_else(|| error!(HelperError::Usage("--ready-fd requires a value".into())))?;
                ready_fd = Some(value.parse().map_err(|_| error!(HelperError::Usage(format!("invalid --ready-fd value '{value}'"))))?);
            }
            "--shell" => shell = true,
            "--" => {
                args_to_run.extend(args);
                break;
            }
            other => args_to_run.push(other.to_string()),
        }
    }

    let helper_socket_fd = helper_socket_fd.ok_or_else(|| error!(HelperError::MissingHelperSocket))?;

    Ok(HelperArgs { helper_socket_fd, ready_fd, shell, args_to_run })
}

/// Blocks on `ready_fd` until the runner writes the literal token that means
/// the sandboxed PID is known and every service's `post_init_hook` has run.
fn await_ready_token(ready_fd: i32) -> Result<()> {
    let mut file = unsafe { File::from_raw_fd(ready_fd) };
    let mut token = String::new();
    file.read_to_string(&mut token).map_err(|e| error!(ErrorKind::IOError("ready fd".into(), e.kind())))?;

    if token != "bubblejail-ready" {
        return err!(HelperError::ReadyTokenMismatch(token));
    }

    Ok(())
}

fn run() -> Result<()> {
    let parsed = parse_args(env::args().skip(1))?;

    if let Some(ready_fd) = parsed.ready_fd {
        await_ready_token(ready_fd)?;
    }

    let startup_args = if parsed.shell { vec!["/bin/sh".to_string()] } else { parsed.args_to_run };

    let listener = unsafe { UnixListener::from_raw_fd(parsed.helper_socket_fd) };

    supervisor::Supervisor::new(listener, startup_args).run()
}

fn main() {
    if let Err(e) = run() {
        eprintln!("bubblejail-helper: {e}");
        exit(e.kind().code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> impl Iterator<Item = String> {
        v.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_helper_socket_and_ready_fd() {
        let parsed = parse_args(args(&["--helper-socket", "3", "--ready-fd", "4"])).unwrap();
        assert_eq!(parsed.helper_socket_fd, 3);
        assert_eq!(parsed.ready_fd, Some(4));
        assert!(!parsed.shell);
        assert!(parsed.args_to_run.is_empty());
    }

    #[test]
    fn shell_flag_is_recognized() {
        let parsed = parse_args(args(&["--helper-socket", "3", "--shell"])).unwrap();
        assert!(parsed.shell);
    }

    #[test]
    fn trailing_args_after_double_dash_become_startup_argv() {
        let parsed = parse_args(args(&["--helper-socket", "3", "--", "firefox", "--private-window"])).unwrap();
        assert_eq!(parsed.args_to_run, vec!["firefox".to_string(), "--private-window".to_string()]);
    }

    #[test]
    fn missing_helper_socket_is_an_error() {
        assert!(parse_args(args(&["--shell"])).is_err());
    }

    #[test]
    fn malformed_fd_value_is_an_error() {
        assert!(parse_args(args(&["--helper-socket", "not-a-number"])).is_err());
    }
}
