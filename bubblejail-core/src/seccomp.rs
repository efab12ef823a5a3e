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

//! Accumulates `Directive::SeccompSyscallErrno` rules from enabled services
//! into a single libseccomp filter and exports it as a BPF program, ready to
//! be passed to `bwrap --seccomp <fd>`.

use std::{fs::File, io::Seek, os::fd::AsRawFd};

use libseccomp::{ScmpAction, ScmpArch, ScmpFilterContext, ScmpSyscall};

use crate::{directive::Directive, err, error, ErrorKind, Result};

pub struct SeccompBuilder {
    filter: ScmpFilterContext,
}

impl SeccompBuilder {
    pub fn new() -> Result<Self> {
        let mut filter = ScmpFilterContext::new_filter(ScmpAction::Allow)
            .map_err(|e| error!(ErrorKind::Initialization(format!("seccomp filter init failed: {e}"))))?;

        if cfg!(target_arch = "x86_64") {
            filter
                .add_arch(ScmpArch::X86)
                .map_err(|e| error!(ErrorKind::Initialization(format!("seccomp arch add failed: {e}"))))?;
        }

        Ok(Self { filter })
    }

    /// Accumulates one directive. A missing syscall on this kernel/arch is
    /// silently skipped when the directive says so, matching upstream's
    /// `skip_on_not_exists` handling of `LibseccompSyscallResolutionError`.
    pub fn add_directive(&mut self, directive: &Directive) -> Result<()> {
        let Directive::SeccompSyscallErrno { syscall_name, errno, skip_on_not_exists } = directive else {
            return Ok(());
        };

        let syscall = match ScmpSyscall::from_name(syscall_name) {
            Ok(syscall) => syscall,
            Err(_) if *skip_on_not_exists => return Ok(()),
            Err(e) => return err!(ErrorKind::Initialization(format!("unknown syscall '{syscall_name}': {e}"))),
        };

        self.filter
            .add_rule(ScmpAction::Errno(*errno), syscall)
            .map_err(|e| error!(ErrorKind::Initialization(format!("seccomp rule add for '{syscall_name}' failed: {e}"))))?;

        Ok(())
    }

    /// Exports the accumulated filter as a BPF program to an anonymous
    /// temporary file and returns it, seeked back to the start so the caller
    /// can hand its fd straight to `bwrap --seccomp`.
    pub fn export_to_temp_file(mut self) -> Result<File> {
        let mut file = tempfile::tempfile().map_err(|e| error!(ErrorKind::IOError("seccomp temp file".into(), e.kind())))?;

        self.filter
            .export_bpf(&mut file)
            .map_err(|e| error!(ErrorKind::Initialization(format!("seccomp bpf export failed: {e}"))))?;

        file.rewind().map_err(|e| error!(ErrorKind::IOError("seccomp temp file".into(), e.kind())))?;

        Ok(file)
    }
}

/// Builds a filter from every `SeccompSyscallErrno` directive in `directives`
/// and exports it, or returns `Ok(None)` if there were none (no `--seccomp`
/// argument is then passed to `bwrap`).
pub fn build_bpf_program(directives: &[Directive]) -> Result<Option<File>> {
    let seccomp_directives: Vec<&Directive> = directives.iter().filter(|d| matches!(d, Directive::SeccompSyscallErrno { .. })).collect();

    if seccomp_directives.is_empty() {
        return Ok(None);
    }

    let mut builder = SeccompBuilder::new()?;
    for directive in seccomp_directives {
        builder.add_directive(directive)?;
    }

    let file = builder.export_to_temp_file()?;
    Ok(Some(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_unknown_syscall_when_allowed() {
        let mut builder = SeccompBuilder::new().expect("filter init");
        let directive = Directive::SeccompSyscallErrno {
            syscall_name: "definitely_not_a_real_syscall".into(),
            errno: 1,
            skip_on_not_exists: true,
        };
        assert!(builder.add_directive(&directive).is_ok());
    }

    #[test]
    fn rejects_unknown_syscall_when_not_skipped() {
        let mut builder = SeccompBuilder::new().expect("filter init");
        let directive = Directive::SeccompSyscallErrno {
            syscall_name: "definitely_not_a_real_syscall".into(),
            errno: 1,
            skip_on_not_exists: false,
        };
        assert!(builder.add_directive(&directive).is_err());
    }

    #[test]
    fn non_seccomp_directive_is_a_noop() {
        let mut builder = SeccompBuilder::new().expect("filter init");
        let directive = Directive::EnvironVar { name: "FOO".into(), value: Some("bar".into()) };
        assert!(builder.add_directive(&directive).is_ok());
    }

    #[test]
    fn empty_directives_yield_no_program() {
        let directives: Vec<Directive> = Vec::new();
        let program = build_bpf_program(&directives).expect("build");
        assert!(program.is_none());
    }

    #[test]
    fn accepts_known_syscall() {
        let mut builder = SeccompBuilder::new().expect("filter init");
        let directive = Directive::SeccompSyscallErrno { syscall_name: "ptrace".into(), errno: nix::libc::ENOSYS, skip_on_not_exists: false };
        assert!(builder.add_directive(&directive).is_ok());
    }
}
