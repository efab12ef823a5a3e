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

//! The sandbox's PID 1: reaps every child (this process owns the whole
//! sandbox's process tree), answers `ping`/`run` over the helper socket, and
//! exits once nothing is left running or the runner sends `SIGTERM`.

use std::{
    collections::HashSet,
    io::{BufReader, Read},
    os::unix::net::{UnixListener, UnixStream},
    process::{Command, Stdio},
    thread,
    time::Duration,
};

use bubblejail_core::{
    constants::{IDLE_POLL_INTERVAL, TERMINATE_RETRY_CYCLES},
    error,
    process::{self, signal_ignore_gone},
    rpc::{read_json_line, write_json_line, RpcMethod, RpcRequest, RpcResponse},
    ErrorKind, Result,
};
use nix::{
    sys::{
        signal::Signal,
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};
use signal_hook::{
    consts::{SIGCHLD, SIGTERM},
    iterator::Signals,
};

pub struct Supervisor {
    listener: UnixListener,
    startup_args: Vec<String>,
}

impl Supervisor {
    pub fn new(listener: UnixListener, startup_args: Vec<String>) -> Self {
        Self { listener, startup_args }
    }

    /// Starts the signal thread, the idle-exit watcher, the sandboxed
    /// startup command, and finally accepts RPC connections forever. Only
    /// returns on a fatal socket error; normal shutdown happens via
    /// `process::exit` from the signal or idle-watcher threads.
    pub fn run(self) -> Result<()> {
        thread::spawn(move || {
            let mut signals = Signals::new(&[SIGCHLD, SIGTERM]).expect("failed to register signal handlers");
            for signal in signals.forever() {
                match signal {
                    SIGCHLD => reap_children(),
                    SIGTERM => terminate_children(),
                    _ => unreachable!("only SIGCHLD/SIGTERM were registered"),
                }
            }
        });

        thread::spawn(|| loop {
            thread::sleep(*IDLE_POLL_INTERVAL);
            if process::self_children().is_empty() {
                eprintln!("bubblejail-helper: no children found, terminating");
                terminate_children();
            }
        });

        if !self.startup_args.is_empty() {
            match Command::new(&self.startup_args[0]).args(&self.startup_args[1..]).spawn() {
                Ok(mut child) => {
                    thread::spawn(move || {
                        let _ = child.wait();
                    });
                }
                Err(e) => eprintln!("bubblejail-helper: failed to start '{}': {e}", self.startup_args[0]),
            }
        }

        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    thread::spawn(move || handle_client(stream));
                }
                Err(e) => eprintln!("bubblejail-helper: accept failed: {e}"),
            }
        }
    }
}

fn handle_client(stream: UnixStream) {
    eprintln!("bubblejail-helper: client connected");

    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("bubblejail-helper: failed to clone client stream: {e}");
            return;
        }
    };
    let mut reader = BufReader::new(stream);

    loop {
        let request: RpcRequest = match read_json_line(&mut reader) {
            Ok(Some(request)) => request,
            Ok(None) => {
                eprintln!("bubblejail-helper: client disconnected");
                return;
            }
            Err(e) => {
                eprintln!("bubblejail-helper: malformed request: {e}");
                return;
            }
        };

        let response = match request.method {
            RpcMethod::Ping => RpcResponse::pong(request.id),
            RpcMethod::Run { args_to_run, wait_response } => match run_command(args_to_run, wait_response) {
                Ok(Some(output)) => RpcResponse::run_result(request.id, output),
                Ok(None) => continue,
                Err(e) => {
                    eprintln!("bubblejail-helper: run failed: {e}");
                    continue;
                }
            },
        };

        if let Err(e) = write_json_line(&mut writer, &response) {
            eprintln!("bubblejail-helper: failed to write response: {e}");
            return;
        }
    }
}

/// Runs `args_to_run`. If `wait_response`, blocks for its combined output and
/// returns it; otherwise starts it detached and returns `None` immediately —
/// reaped later by the SIGCHLD handler or the idle-exit watcher.
fn run_command(args_to_run: Vec<String>, wait_response: bool) -> Result<Option<String>> {
    let Some((program, rest)) = args_to_run.split_first() else {
        return Ok(None);
    };

    if !wait_response {
        Command::new(program)
            .args(rest)
            .spawn()
            .map_err(|e| error!(ErrorKind::IOError(program.clone(), e.kind())))?;
        return Ok(None);
    }

    let (mut reader, writer) = os_pipe::pipe().map_err(|e| error!(ErrorKind::IOError("pipe".into(), e.kind())))?;
    let writer_clone = writer.try_clone().map_err(|e| error!(ErrorKind::IOError("pipe".into(), e.kind())))?;

    let mut child = Command::new(program)
        .args(rest)
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_clone))
        .spawn()
        .map_err(|e| error!(ErrorKind::IOError(program.clone(), e.kind())))?;

    let mut combined = String::new();
    reader.read_to_string(&mut combined).map_err(|e| error!(ErrorKind::IOError(program.clone(), e.kind())))?;
    let _ = child.wait();

    Ok(Some(combined))
}

fn reap_children() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => eprintln!("bubblejail-helper: reaped {status:?}"),
            Err(_) => break,
        }
    }
}

/// Sends `SIGTERM` to every child, escalating to `SIGKILL` after
/// [`TERMINATE_RETRY_CYCLES`] rounds, reaping as it goes. Exits the process
/// once no children remain.
fn terminate_children() -> ! {
    let mut signaled = HashSet::new();
    let mut round = 0u32;

    signal_round(&mut signaled, &mut round);

    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => {
                thread::sleep(Duration::from_millis(500));
                signal_round(&mut signaled, &mut round);
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }

    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_with_empty_argv_is_a_no_op() {
        assert_eq!(run_command(Vec::new(), false).unwrap(), None);
        assert_eq!(run_command(Vec::new(), true).unwrap(), None);
    }

    #[test]
    fn run_command_without_wait_response_returns_none_immediately() {
        assert_eq!(run_command(vec!["true".to_string()], false).unwrap(), None);
    }

    #[test]
    fn run_command_with_wait_response_captures_stdout() {
        let output = run_command(vec!["echo".to_string(), "hello".to_string()], true).unwrap();
        assert_eq!(output, Some("hello\n".to_string()));
    }

    #[test]
    fn run_command_merges_stderr_into_the_captured_output() {
        let script = "echo out; echo err >&2";
        let output = run_command(vec!["sh".to_string(), "-c".to_string(), script.to_string()], true).unwrap().unwrap();
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }
}

fn signal_round(signaled: &mut HashSet<i32>, round: &mut u32) {
    *round += 1;

    for pid in process::self_children() {
        if *round > TERMINATE_RETRY_CYCLES {
            signal_ignore_gone(pid, Signal::SIGKILL);
            continue;
        }

        if signaled.insert(pid.as_raw()) {
            signal_ignore_gone(pid, Signal::SIGTERM);
        }
    }
}
