//! Caller-side access to published device nodes

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use zerocopy::{FromBytes, IntoBytes};

use razer_mux::{MuxError, NODE_PREFIX, REPORT_LENGTH};

use crate::protocol::{self, Message, ProtocolError};
use crate::wire::{self, RequestHeader, ResponseHeader};

/// Settle time between sending a command frame and fetching its
/// response, matching what the stock tools allow the firmware.
const RESPONSE_DELAY: Duration = Duration::from_millis(5);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Mux(#[from] MuxError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("malformed response from multiplexer")]
    MalformedResponse,
}

/// A connection to one published node.
pub struct NodeClient {
    stream: UnixStream,
}

impl NodeClient {
    /// Connect to a published node by path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        Ok(Self {
            stream: UnixStream::connect(path)?,
        })
    }

    /// Read exactly one report from the device.
    pub fn read_report(&mut self) -> Result<[u8; REPORT_LENGTH], ClientError> {
        self.stream.write_all(RequestHeader::read().as_bytes())?;

        let resp = self.response()?;
        if resp.status != wire::status::OK {
            return Err(wire::error_of(resp.status).into());
        }
        if resp.len.get() as usize != REPORT_LENGTH {
            return Err(ClientError::MalformedResponse);
        }

        let mut report = [0u8; REPORT_LENGTH];
        self.stream.read_exact(&mut report)?;
        Ok(report)
    }

    /// Write exactly one report to the device; returns bytes written.
    pub fn write_report(&mut self, report: &[u8; REPORT_LENGTH]) -> Result<usize, ClientError> {
        self.stream.write_all(RequestHeader::write().as_bytes())?;
        self.stream.write_all(report)?;

        let resp = self.response()?;
        if resp.status != wire::status::OK {
            return Err(wire::error_of(resp.status).into());
        }
        Ok(resp.len.get() as usize)
    }

    fn response(&mut self) -> Result<ResponseHeader, ClientError> {
        let mut buf = [0u8; wire::RESPONSE_HEADER_LEN];
        self.stream.read_exact(&mut buf)?;
        ResponseHeader::read_from_bytes(&buf[..]).map_err(|_| ClientError::MalformedResponse)
    }
}

/// Send a command frame to a node and return the validated response.
pub fn query(client: &mut NodeClient, request: &Message) -> Result<Message, ClientError> {
    client.write_report(request.bytes())?;
    std::thread::sleep(RESPONSE_DELAY);
    let response = Message::from_bytes(client.read_report()?);
    request.validate_response(&response)?;
    Ok(response)
}

/// Battery level of the device behind a node, as a percentage.
pub fn battery_level(path: impl AsRef<Path>) -> Result<u8, ClientError> {
    let mut client = NodeClient::open(path)?;
    let response = query(&mut client, &protocol::battery_request())?;
    Ok(protocol::parse_battery(&response))
}

/// Serial number of the device behind a node.
pub fn serial_number(path: impl AsRef<Path>) -> Result<String, ClientError> {
    let mut client = NodeClient::open(path)?;
    let response = query(&mut client, &protocol::serial_request())?;
    Ok(protocol::parse_serial(&response))
}

/// List published nodes under a runtime directory, ascending by name.
pub fn list_nodes(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let mut nodes = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(NODE_PREFIX) {
            nodes.push(path);
        }
    }
    nodes.sort();
    Ok(nodes)
}
