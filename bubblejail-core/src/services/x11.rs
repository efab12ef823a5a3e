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

use std::env::var;

use crate::{config::ServicesConfig, directive::Directive, service::Service, services::{generate_toolkit_directives, XDG_DESKTOP_VARS}};

pub struct X11;

impl Service for X11 {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn pretty_name(&self) -> &'static str {
        "X11 windowing system"
    }

    fn description(&self) -> &'static str {
        "Gives access to X11 socket.\nThis is generally the default Linux windowing system."
    }

    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive> {
        let mut d = Vec::new();

        for name in XDG_DESKTOP_VARS {
            let Ok(value) = var(name) else { continue };

            if *name == "XDG_SESSION_TYPE" && value == "wayland" && config.wayland.is_none() {
                d.push(Directive::EnvironVar {
                    name: (*name).into(),
                    value: Some("x11".into()),
                });
                continue;
            }

            d.push(Directive::EnvironVar { name: (*name).into(), value: None });
        }

        d.push(Directive::EnvironVar { name: "DISPLAY".into(), value: None });

        if let Ok(display) = var("DISPLAY") {
            if let Some(socket) = x11_socket_path(&display) {
                d.push(Directive::read_only_bind(socket));
            }
        }

        if let Ok(xauthority) = var("XAUTHORITY") {
            d.push(Directive::ReadOnlyBind {
                source: xauthority,
                dest: "/tmp/.Xauthority".into(),
            });
            d.push(Directive::EnvironVar {
                name: "XAUTHORITY".into(),
                value: Some("/tmp/.Xauthority".into()),
            });
        }

        d.extend(generate_toolkit_directives());
        d
    }
}

/// Parses a `DISPLAY` value of the form `[unix/]hostname:displaynumber[.screennumber]`
/// into the corresponding abstract socket path, per X(7). Returns `None` for
/// a non-`unix` protocol prefix or a non-empty hostname (a remote display has
/// no local socket to bind).
pub fn x11_socket_path(display_var: &str) -> Option<String> {
    let after_protocol = match display_var.split('/').collect::<Vec<_>>().as_slice() {
        [protocol, remainder] => {
            if *protocol != "unix" {
                return None;
            }
            *remainder
        }
        [remainder] => remainder,
        _ => return None,
    };

    let after_hostname = match after_protocol.split(':').collect::<Vec<_>>().as_slice() {
        [hostname, remainder] => {
            if !hostname.is_empty() {
                return None;
            }
            *remainder
        }
        _ => return None,
    };

    let displaynumber = match after_hostname.split('.').collect::<Vec<_>>().as_slice() {
        [displaynumber, _] | [displaynumber] => *displaynumber,
        _ => return None,
    };

    Some(format!("/tmp/.X11-unix/X{displaynumber}"))
}

#[cfg(test)]
mod tests {
    use super::x11_socket_path;

    #[test]
    fn plain_display() {
        assert_eq!(x11_socket_path(":0"), Some("/tmp/.X11-unix/X0".into()));
    }

    #[test]
    fn display_with_screen_number() {
        assert_eq!(x11_socket_path(":1.0"), Some("/tmp/.X11-unix/X1".into()));
    }

    #[test]
    fn unix_protocol_prefix() {
        assert_eq!(x11_socket_path("unix:0"), None);
        assert_eq!(x11_socket_path("unix/:0"), Some("/tmp/.X11-unix/X0".into()));
    }

    #[test]
    fn non_unix_protocol_rejected() {
        assert_eq!(x11_socket_path("tcp/somehost:0"), None);
    }

    #[test]
    fn remote_hostname_rejected() {
        assert_eq!(x11_socket_path("somehost:0"), None);
    }
}
