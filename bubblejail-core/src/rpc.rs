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

//! Line-delimited JSON-RPC shared between `Instance::send_run_rpc` and the
//! in-sandbox helper's unix-socket server: one `ping`/`run` request per line
//! in, one response per line out.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{error, ErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: Option<String>,
    #[serde(flatten)]
    pub method: RpcMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum RpcMethod {
    Ping,
    Run { args_to_run: Vec<String>, wait_response: bool },
}

impl RpcRequest {
    pub fn ping(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), method: RpcMethod::Ping }
    }

    pub fn run(id: impl Into<String>, args_to_run: Vec<String>, wait_response: bool) -> Self {
        Self { id: Some(id.into()), method: RpcMethod::Run { args_to_run, wait_response } }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Option<String>,
    pub result: RpcResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcResult {
    Ping(Vec<String>),
    Run {
        #[serde(rename = "return")]
        output: String,
    },
}

impl RpcResponse {
    pub fn pong(id: Option<String>) -> Self {
        Self { id, result: RpcResult::Ping(vec!["pong".into()]) }
    }

    pub fn run_result(id: Option<String>, output: String) -> Self {
        Self { id, result: RpcResult::Run { output } }
    }
}

/// Writes `value` as one JSON line (newline-terminated), matching the
/// `reader.readline()` framing both sides of the socket rely on.
pub fn write_json_line<T: Serialize, W: Write>(writer: &mut W, value: &T) -> Result<()> {
    let mut line = serde_json::to_string(value).map_err(|e| error!(ErrorKind::Json(e.to_string())))?;
    line.push('\n');
    writer.write_all(line.as_bytes()).map_err(|e| error!(ErrorKind::IOError("rpc socket".into(), e.kind())))
}

/// Reads a single JSON line and decodes it as `T`. Returns `Ok(None)` on a
/// clean EOF (the peer closed its write half), matching the helper's
/// "empty readline means hang up" client loop.
pub fn read_json_line<T: for<'de> Deserialize<'de>, R: BufRead>(reader: &mut R) -> Result<Option<T>> {
    let mut line = String::new();
    let read = reader.read_line(&mut line).map_err(|e| error!(ErrorKind::IOError("rpc socket".into(), e.kind())))?;

    if read == 0 {
        return Ok(None);
    }

    serde_json::from_str(line.trim_end()).map(Some).map_err(|e| error!(ErrorKind::Json(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_request_round_trips() {
        let request = RpcRequest::ping("1");
        let mut buf = Vec::new();
        write_json_line(&mut buf, &request).unwrap();

        let mut reader = buf.as_slice();
        let decoded: RpcRequest = read_json_line(&mut reader).unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn run_request_round_trips() {
        let request = RpcRequest::run("2", vec!["echo".into(), "hi".into()], true);
        let mut buf = Vec::new();
        write_json_line(&mut buf, &request).unwrap();

        let mut reader = buf.as_slice();
        let decoded: RpcRequest = read_json_line(&mut reader).unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn pong_response_round_trips() {
        let response = RpcResponse::pong(Some("1".into()));
        let mut buf = Vec::new();
        write_json_line(&mut buf, &response).unwrap();

        let mut reader = buf.as_slice();
        let decoded: RpcResponse = read_json_line(&mut reader).unwrap().unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn empty_stream_yields_none() {
        let mut reader: &[u8] = &[];
        let decoded: Option<RpcRequest> = read_json_line(&mut reader).unwrap();
        assert!(decoded.is_none());
    }
}
