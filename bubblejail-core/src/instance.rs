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

//! An on-disk sandbox instance: its persistent home under `$XDG_DATA_HOME`
//! and its runtime socket/proxy paths under `$XDG_RUNTIME_DIR`.

use std::{
    io::{BufReader, Write},
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    config::{load_services, save_services, Metadata, ServiceContainer, ServicesConfig},
    err, error,
    rpc::{read_json_line, write_json_line, RpcMethod, RpcRequest, RpcResponse, RpcResult},
    ErrorKind, Result,
};

const FILE_NAME_SERVICES: &str = "services.toml";
const FILE_NAME_METADATA: &str = "metadata_v1.toml";

pub struct Instance {
    name: String,
    instance_directory: PathBuf,
    runtime_dir: PathBuf,
}

impl Instance {
    /// Opens an existing instance directory. Fails if `instance_directory`
    /// does not exist — matching upstream's "run create before run" guard.
    pub fn open(instance_directory: impl Into<PathBuf>) -> Result<Self> {
        let instance_directory = instance_directory.into();

        if !instance_directory.exists() {
            return err!(ErrorKind::Configuration(format!("instance directory '{}' does not exist", instance_directory.display())));
        }

        let name = instance_directory
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| error!(ErrorKind::Configuration("instance directory has no name".into())))?;

        let runtime_dir = PathBuf::from(*crate::constants::XDG_RUNTIME_DIR).join("bubblejail").join(&name);

        Ok(Self { name, instance_directory, runtime_dir })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance_directory(&self) -> &Path {
        &self.instance_directory
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    pub fn path_config_file(&self) -> PathBuf {
        self.instance_directory.join(FILE_NAME_SERVICES)
    }

    pub fn path_metadata_file(&self) -> PathBuf {
        self.instance_directory.join(FILE_NAME_METADATA)
    }

    pub fn path_home_directory(&self) -> PathBuf {
        self.instance_directory.join("home")
    }

    pub fn path_runtime_helper_dir(&self) -> PathBuf {
        self.runtime_dir.join("helper")
    }

    pub fn path_runtime_helper_socket(&self) -> PathBuf {
        self.path_runtime_helper_dir().join("helper.socket")
    }

    pub fn path_runtime_dbus_session_socket(&self) -> PathBuf {
        self.runtime_dir.join("dbus_session_proxy")
    }

    pub fn path_runtime_dbus_system_socket(&self) -> PathBuf {
        self.runtime_dir.join("dbus_system_proxy")
    }

    pub fn read_services(&self) -> Result<ServiceContainer> {
        let config = load_services(&self.path_config_file())?;
        ServiceContainer::new(config)
    }

    pub fn save_services(&self, config: &ServicesConfig) -> Result<()> {
        let contents = save_services(config)?;
        std::fs::write(self.path_config_file(), contents).map_err(|e| error!(ErrorKind::IOError(self.path_config_file().display().to_string(), e.kind())))
    }

    pub fn load_metadata(&self) -> Result<Metadata> {
        Metadata::load(&self.path_metadata_file())
    }

    pub fn save_metadata(&self, metadata: &Metadata) -> Result<()> {
        metadata.save(&self.path_metadata_file())
    }

    /// Whether the instance is considered running: its helper socket path
    /// exists and is a socket, regardless of whether anything is currently
    /// listening on it.
    pub fn is_running(&self) -> bool {
        use std::os::unix::fs::FileTypeExt;

        std::fs::symlink_metadata(self.path_runtime_helper_socket())
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false)
    }

    /// Sends a `run` RPC to the running instance's helper. If `wait_response`
    /// is set, blocks (up to 3 seconds) for the command's stdout and returns
    /// it; otherwise fires the request and returns immediately.
    pub fn send_run_rpc(&self, args_to_run: Vec<String>, wait_response: bool) -> Result<Option<String>> {
        let socket_path = self.path_runtime_helper_socket();
        let mut stream = UnixStream::connect(&socket_path).map_err(|e| error!(ErrorKind::IOError(socket_path.display().to_string(), e.kind())))?;

        let request = RpcRequest::run("run", args_to_run, wait_response);
        write_json_line(&mut stream, &request)?;

        if !wait_response {
            return Ok(None);
        }

        stream
            .set_read_timeout(Some(Duration::from_secs(3)))
            .map_err(|e| error!(ErrorKind::IOError(socket_path.display().to_string(), e.kind())))?;

        let mut reader = BufReader::new(stream);
        let response: RpcResponse = read_json_line(&mut reader)?.ok_or_else(|| error!(ErrorKind::Rpc("helper closed connection without a response".into())))?;

        match response.result {
            RpcResult::Run { output } => Ok(Some(output)),
            RpcResult::Ping(_) => err!(ErrorKind::Rpc("expected a run response, got a ping response".into())),
        }
    }

    /// Sends a `ping` RPC and returns whether the helper answered "pong"
    /// within the 3-second timeout.
    pub fn ping(&self) -> Result<bool> {
        let socket_path = self.path_runtime_helper_socket();
        let mut stream = UnixStream::connect(&socket_path).map_err(|e| error!(ErrorKind::IOError(socket_path.display().to_string(), e.kind())))?;
        stream
            .set_read_timeout(Some(Duration::from_secs(3)))
            .map_err(|e| error!(ErrorKind::IOError(socket_path.display().to_string(), e.kind())))?;

        write_json_line(&mut stream, &RpcRequest { id: Some("ping".into()), method: RpcMethod::Ping })?;
        stream.flush().map_err(|e| error!(ErrorKind::IOError(socket_path.display().to_string(), e.kind())))?;

        let mut reader = BufReader::new(stream);
        let response: Option<RpcResponse> = read_json_line(&mut reader)?;

        Ok(matches!(response.map(|r| r.result), Some(RpcResult::Ping(values)) if values.iter().any(|v| v == "pong")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_fails_for_a_nonexistent_directory() {
        let err = Instance::open("/does/not/exist/bubblejail-test-instance").unwrap_err();
        assert!(matches!(err.downcast::<ErrorKind>(), Ok(ErrorKind::Configuration(_))));
    }

    #[test]
    fn open_derives_the_name_from_the_final_path_component() {
        let dir = tempfile::tempdir().unwrap();
        let instance_dir = dir.path().join("my-firefox");
        std::fs::create_dir(&instance_dir).unwrap();

        let instance = Instance::open(&instance_dir).unwrap();
        assert_eq!(instance.name(), "my-firefox");
        assert_eq!(instance.instance_directory(), instance_dir);
    }

    #[test]
    fn path_accessors_are_rooted_under_the_instance_directory() {
        let dir = tempfile::tempdir().unwrap();
        let instance_dir = dir.path().join("app");
        std::fs::create_dir(&instance_dir).unwrap();
        let instance = Instance::open(&instance_dir).unwrap();

        assert_eq!(instance.path_config_file(), instance_dir.join("services.toml"));
        assert_eq!(instance.path_metadata_file(), instance_dir.join("metadata_v1.toml"));
        assert_eq!(instance.path_home_directory(), instance_dir.join("home"));
        assert_eq!(instance.path_runtime_helper_socket(), instance.path_runtime_helper_dir().join("helper.socket"));
    }

    #[test]
    fn is_running_is_false_when_no_helper_socket_exists() {
        let dir = tempfile::tempdir().unwrap();
        let instance_dir = dir.path().join("app");
        std::fs::create_dir(&instance_dir).unwrap();
        let instance = Instance::open(&instance_dir).unwrap();

        assert!(!instance.is_running());
    }

    #[test]
    fn is_running_is_true_for_a_stale_socket_file_with_no_listener() {
        let dir = tempfile::tempdir().unwrap();
        let instance_dir = dir.path().join("app");
        std::fs::create_dir(&instance_dir).unwrap();
        let instance = Instance::open(&instance_dir).unwrap();

        std::fs::create_dir_all(instance.path_runtime_helper_dir()).unwrap();
        let listener = std::os::unix::net::UnixListener::bind(instance.path_runtime_helper_socket()).unwrap();
        drop(listener);

        assert!(instance.is_running());
    }

    #[test]
    fn save_and_read_services_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let instance_dir = dir.path().join("app");
        std::fs::create_dir(&instance_dir).unwrap();
        let instance = Instance::open(&instance_dir).unwrap();

        let config = ServicesConfig { x11: Some(crate::config::EmptySettings), ..Default::default() };
        instance.save_services(&config).unwrap();

        let container = instance.read_services().unwrap();
        assert_eq!(container.config(), &config);
    }
}
