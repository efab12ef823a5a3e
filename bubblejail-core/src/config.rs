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

//! The configuration layer: `services.toml`'s typed shape (`ServicesConfig`),
//! the service container that validates and instantiates the enabled
//! services, and the on-disk `Profile`/`Metadata` records.

use std::{collections::HashSet, fs::read_to_string, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    err,
    service::{self, Service},
    Error,
    ErrorKind,
    Result,
};

pub use metadata::Metadata;
pub use profile::Profile;

pub mod metadata;
pub mod profile;

/// A string, or a list of strings accepted in its place on disk (the common
/// `executable_name`/`dot_desktop_path` shape across several settings types).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(untagged)]
pub enum StringOrList {
    #[default]
    Empty,
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty) || matches!(self, Self::Many(v) if v.is_empty())
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// A flag-only service's settings: the empty table on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EmptySettings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct CommonSettings {
    #[serde(skip_serializing_if = "StringOrList::is_empty")]
    pub executable_name: StringOrList,
    #[serde(skip_serializing_if = "is_false")]
    pub share_local_time: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub filter_disk_sync: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dbus_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct HomeShareSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub home_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct DirectRenderingSettings {
    #[serde(skip_serializing_if = "is_false")]
    pub enable_aco: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct RootShareSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub read_only_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct GnomeToolkitSettings {
    #[serde(skip_serializing_if = "is_false")]
    pub gnome_portal: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub dconf_dbus: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub gnome_vfs_dbus: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Slirp4netnsSettings {
    pub dns_servers: Vec<String>,
    pub outbound_addr: String,
    pub disable_host_loopback: bool,
}

impl Default for Slirp4netnsSettings {
    fn default() -> Self {
        Self {
            dns_servers: Vec::new(),
            outbound_addr: String::new(),
            disable_host_loopback: true,
        }
    }
}

/// Per-namespace-kind limit. `0` forbids creating namespaces of that kind
/// recursively from the sandboxed PID; `-1` leaves the kernel default
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct NamespacesLimitsSettings {
    pub user: i64,
    pub mount: i64,
    pub pid: i64,
    pub ipc: i64,
    pub net: i64,
    pub time: i64,
    pub uts: i64,
    pub cgroup: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct DebugSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_bwrap_args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_dbus_session_args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_dbus_system_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct PastaNetworkSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MprisSettings {
    pub player_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct XdgDesktopPortalSettings {
    pub add_flatpak_info: bool,
    pub file_chooser: bool,
    pub global_shortcuts: bool,
    pub inhibit: bool,
    pub notification: bool,
    pub open_uri: bool,
    pub settings: bool,
    pub trash: bool,
}

impl Default for XdgDesktopPortalSettings {
    fn default() -> Self {
        Self {
            add_flatpak_info: false,
            file_chooser: true,
            global_shortcuts: true,
            inhibit: true,
            notification: true,
            open_uri: true,
            settings: true,
            trash: true,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// The parsed shape of `services.toml`: one optional settings value per
/// catalog entry. A field left `None` means the service is disabled; `Some`
/// of a unit settings type means the service is enabled with its defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ServicesConfig {
    pub common: Option<CommonSettings>,
    pub x11: Option<EmptySettings>,
    pub wayland: Option<EmptySettings>,
    pub network: Option<EmptySettings>,
    pub pulse_audio: Option<EmptySettings>,
    pub home_share: Option<HomeShareSettings>,
    pub direct_rendering: Option<DirectRenderingSettings>,
    pub systray: Option<EmptySettings>,
    pub joystick: Option<EmptySettings>,
    pub root_share: Option<RootShareSettings>,
    pub openjdk: Option<EmptySettings>,
    pub notify: Option<EmptySettings>,
    pub gnome_toolkit: Option<GnomeToolkitSettings>,
    pub pipewire: Option<EmptySettings>,
    pub v4l: Option<EmptySettings>,
    pub ibus: Option<EmptySettings>,
    pub fcitx: Option<EmptySettings>,
    pub slirp4netns: Option<Slirp4netnsSettings>,
    pub namespaces_limits: Option<NamespacesLimitsSettings>,
    pub debug: Option<DebugSettings>,
    pub gamemode: Option<EmptySettings>,
    pub pasta_network: Option<PastaNetworkSettings>,
    pub mpris: Option<MprisSettings>,
    pub xdg_desktop_portal: Option<XdgDesktopPortalSettings>,
}

impl ServicesConfig {
    /// Names of every service field that is `Some` in declaration order,
    /// matching the catalog's iteration order.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        macro_rules! push_if_some {
            ($field:ident, $name:literal) => {
                if self.$field.is_some() {
                    names.push($name);
                }
            };
        }

        push_if_some!(common, "common");
        push_if_some!(x11, "x11");
        push_if_some!(wayland, "wayland");
        push_if_some!(network, "network");
        push_if_some!(pulse_audio, "pulse_audio");
        push_if_some!(home_share, "home_share");
        push_if_some!(direct_rendering, "direct_rendering");
        push_if_some!(systray, "systray");
        push_if_some!(joystick, "joystick");
        push_if_some!(root_share, "root_share");
        push_if_some!(openjdk, "openjdk");
        push_if_some!(notify, "notify");
        push_if_some!(gnome_toolkit, "gnome_toolkit");
        push_if_some!(pipewire, "pipewire");
        push_if_some!(v4l, "v4l");
        push_if_some!(ibus, "ibus");
        push_if_some!(fcitx, "fcitx");
        push_if_some!(slirp4netns, "slirp4netns");
        push_if_some!(namespaces_limits, "namespaces_limits");
        push_if_some!(debug, "debug");
        push_if_some!(gamemode, "gamemode");
        push_if_some!(pasta_network, "pasta_network");
        push_if_some!(mpris, "mpris");
        push_if_some!(xdg_desktop_portal, "xdg_desktop_portal");
        names
    }
}

/// Validates a [`ServicesConfig`] for pairwise conflicts and instantiates the
/// enabled services plus the always-present defaults service, in catalog
/// order.
pub struct ServiceContainer {
    config: ServicesConfig,
    enabled: Vec<Box<dyn Service>>,
}

impl ServiceContainer {
    pub fn new(config: ServicesConfig) -> Result<Self> {
        let enabled_names: HashSet<&'static str> = config.enabled_names().into_iter().collect();
        let catalog = service::catalog();
        let mut enabled = Vec::new();
        let mut declared: HashSet<&'static str> = HashSet::new();

        for svc in catalog {
            if !enabled_names.contains(svc.name()) {
                continue;
            }

            declared.insert(svc.name());

            for conflict in svc.conflicts() {
                if declared.contains(conflict) {
                    return err!(ErrorKind::Configuration(format!(
                        "service conflict between '{}' and '{}'",
                        svc.name(),
                        conflict
                    )));
                }
            }

            if svc.name() == "wayland" {
                crate::services::wayland::require_wayland_display()?;
            }

            enabled.push(svc);
        }

        Ok(Self { config, enabled })
    }

    pub fn config(&self) -> &ServicesConfig {
        &self.config
    }

    /// Yields the always-present defaults service followed by every enabled
    /// service, in catalog order — matching `iter_services(iter_default=True)`.
    pub fn iter_services(&self) -> impl Iterator<Item = &dyn Service> {
        std::iter::once(&crate::services::defaults::BUBBLEJAIL_DEFAULTS as &dyn Service).chain(self.enabled.iter().map(|b| b.as_ref()))
    }
}

/// Parses `services.toml` from `path`. Unknown top-level keys and unknown
/// keys within a service's settings table are rejected via `deny_unknown_fields`.
pub fn load_services(path: &Path) -> Result<ServicesConfig> {
    let contents = read_to_string(path).map_err(|e| crate::error!(ErrorKind::IOError(path.display().to_string(), e.kind())))?;

    toml::from_str(&contents).map_err(|e| crate::error!(ErrorKind::Configuration(e.to_string())))
}

/// Serializes `config` to TOML. Fields equal to their type's `Default` are
/// omitted by the `skip_serializing_if` annotations above, making load/save
/// round-trip stable.
pub fn save_services(config: &ServicesConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| crate::error!(ErrorKind::Configuration(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_names_follows_catalog_order() {
        let config = ServicesConfig {
            xdg_desktop_portal: Some(XdgDesktopPortalSettings::default()),
            x11: Some(EmptySettings),
            home_share: Some(HomeShareSettings::default()),
            ..Default::default()
        };

        assert_eq!(config.enabled_names(), vec!["x11", "home_share", "xdg_desktop_portal"]);
    }

    #[test]
    fn container_accepts_non_conflicting_services() {
        std::env::set_var("WAYLAND_DISPLAY", "wayland-0");
        let config = ServicesConfig { x11: Some(EmptySettings), wayland: Some(EmptySettings), ..Default::default() };

        let container = ServiceContainer::new(config).unwrap();
        let names: Vec<&str> = container.iter_services().map(|s| s.name()).collect();
        assert_eq!(names[0], "default");
        assert!(names.contains(&"x11"));
        assert!(names.contains(&"wayland"));
    }

    #[test]
    fn container_rejects_conflicting_services() {
        let config = ServicesConfig { network: Some(EmptySettings), slirp4netns: Some(Slirp4netnsSettings::default()), ..Default::default() };

        let err = ServiceContainer::new(config).unwrap_err();
        assert!(matches!(err.downcast::<ErrorKind>(), Ok(ErrorKind::Configuration(_))));
    }

    #[test]
    fn iter_services_always_includes_defaults_even_when_empty() {
        let container = ServiceContainer::new(ServicesConfig::default()).unwrap();
        assert_eq!(container.iter_services().count(), 1);
    }

    #[test]
    fn empty_config_round_trips_to_empty_toml() {
        let toml = save_services(&ServicesConfig::default()).unwrap();
        let parsed: ServicesConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, ServicesConfig::default());
    }

    #[test]
    fn round_trip_preserves_non_default_settings() {
        let config = ServicesConfig {
            home_share: Some(HomeShareSettings { home_paths: vec!["Documents".into()] }),
            slirp4netns: Some(Slirp4netnsSettings { disable_host_loopback: false, ..Default::default() }),
            ..Default::default()
        };

        let toml = save_services(&config).unwrap();
        let parsed: ServicesConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let result: std::result::Result<ServicesConfig, _> = toml::from_str("unknown_service = {}");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_field_within_settings_table_is_rejected() {
        let result: std::result::Result<ServicesConfig, _> = toml::from_str("[home_share]\nnot_a_real_field = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn string_or_list_accepts_either_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            v: StringOrList,
        }

        let one: Wrapper = toml::from_str("v = \"firefox\"").unwrap();
        assert_eq!(one.v.into_vec(), vec!["firefox".to_string()]);

        let many: Wrapper = toml::from_str("v = [\"a\", \"b\"]").unwrap();
        assert_eq!(many.v.into_vec(), vec!["a".to_string(), "b".to_string()]);
    }
}
