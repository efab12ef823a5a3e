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

//! The service catalog: a closed registry of strategies, each emitting
//! directives and optionally a pair of post-init/post-shutdown hooks. Unlike
//! the teacher's `Permission`/`Filesystem`/`Dbus` trait objects, `Service`
//! implementors hold no state of their own worth serializing — only the
//! `ServicesConfig` settings struct that parameterizes them is persisted —
//! so this catalog carries no `typetag`/`dyn-clone` machinery.

use bitflags::bitflags;
use nix::unistd::Pid;

use crate::{config::ServicesConfig, directive::Directive, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServiceFlags: u8 {
        const DEPRECATED = 0b001;
        const EXPERIMENTAL = 0b010;
        const NO_GUI = 0b100;
    }
}

/// A named capability bundle. Implementors are pure behavior: constructed
/// fresh from `ServicesConfig` each launch, never round-tripped through
/// serialization themselves.
pub trait Service {
    fn name(&self) -> &'static str;
    fn pretty_name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Names of other services this one is mutually exclusive with.
    fn conflicts(&self) -> &'static [&'static str] {
        &[]
    }

    fn flags(&self) -> ServiceFlags {
        ServiceFlags::empty()
    }

    /// Emits this service's directives in order. May include the two
    /// placeholder variants the runner resolves in a single linear pass.
    fn iter_directives(&self, config: &ServicesConfig) -> Vec<Directive>;

    /// Runs once the sandboxed PID is known, before the ready token is
    /// written. A service that spawns a companion subprocess (slirp4netns,
    /// pasta) returns its pid so the runner can hand it back unchanged to
    /// [`Service::post_shutdown_hook`] — services hold no mutable state of
    /// their own, so this handle is the only channel between the two calls.
    fn post_init_hook(&self, _pid: Pid, _config: &ServicesConfig) -> Result<Option<Pid>> {
        Ok(None)
    }

    /// Runs after the mount helper has been reaped, with whatever
    /// [`Service::post_init_hook`] returned. Failures are caught and logged
    /// by the runner, never propagated.
    fn post_shutdown_hook(&self, _companion_pid: Option<Pid>, _config: &ServicesConfig) -> Result<()> {
        Ok(())
    }
}

/// Returns the full, ordered service catalog. Order matches the upstream
/// `SERVICES_CLASSES` tuple so directive accumulation (and therefore
/// generated bwrap argv) is deterministic and stable across releases.
pub fn catalog() -> Vec<Box<dyn Service>> {
    use crate::services::*;

    vec![
        Box::new(common::CommonSettings),
        Box::new(x11::X11),
        Box::new(wayland::Wayland),
        Box::new(network::Network),
        Box::new(pulse_audio::PulseAudio),
        Box::new(home_share::HomeShare),
        Box::new(direct_rendering::DirectRendering),
        Box::new(systray::Systray),
        Box::new(joystick::Joystick),
        Box::new(root_share::RootShare),
        Box::new(openjdk::OpenJdk),
        Box::new(notify::Notifications),
        Box::new(gnome_toolkit::GnomeToolkit),
        Box::new(pipewire::Pipewire),
        Box::new(v4l::VideoForLinux),
        Box::new(ibus::IBus),
        Box::new(fcitx::Fcitx),
        Box::new(slirp4netns::Slirp4netns),
        Box::new(namespaces_limits::NamespacesLimits),
        Box::new(debug::Debug),
        Box::new(gamemode::GameMode),
        Box::new(pasta_network::PastaNetwork),
        Box::new(mpris::Mpris),
        Box::new(xdg_desktop_portal::XdgDesktopPortal),
    ]
}

/// Looks up a single catalog entry by name.
pub fn by_name(name: &str) -> Option<Box<dyn Service>> {
    catalog().into_iter().find(|s| s.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        let names: Vec<&str> = catalog().iter().map(|s| s.name()).collect();
        let unique: std::collections::HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len(), "duplicate service name in catalog: {names:?}");
    }

    #[test]
    fn by_name_finds_every_catalog_entry() {
        for service in catalog() {
            assert!(by_name(service.name()).is_some(), "by_name couldn't find '{}'", service.name());
        }
    }

    #[test]
    fn by_name_returns_none_for_unknown_service() {
        assert!(by_name("not-a-real-service").is_none());
    }

    #[test]
    fn declared_conflicts_name_real_services_and_are_symmetric() {
        let catalog = catalog();
        let by_name: std::collections::HashMap<&str, &[&str]> =
            catalog.iter().map(|s| (s.name(), s.conflicts())).collect();

        for (name, conflicts) in &by_name {
            for conflict in *conflicts {
                let other = by_name.get(conflict).unwrap_or_else(|| panic!("'{name}' conflicts with unknown service '{conflict}'"));
                assert!(other.contains(name), "'{name}' declares a conflict with '{conflict}', but not vice versa");
            }
        }
    }
}
