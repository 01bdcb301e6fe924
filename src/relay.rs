//! Downstream command relay.
//!
//! Forwards one operator command per call over a fresh TCP connection to the
//! device-facing bridge and returns its reply verbatim. At-most-once: no
//! retry, no queue; the caller blocks until the exchange succeeds or fails.
//!
//! The bridge protocol has no response framing (no length prefix, no
//! terminator), so the reply is whatever a single read yields, capped at
//! `max_response_bytes` and bounded by `response_timeout`.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// The closed set of commands a device accepts, keyed by the keyword the
/// bridge expects on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    RequestIccid,
    StartEmergency,
    StopEmergency,
}

impl CommandKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RequestICCID" => Some(Self::RequestIccid),
            "StartEmg" => Some(Self::StartEmergency),
            "StopEmg" => Some(Self::StopEmergency),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::RequestIccid => "RequestICCID",
            Self::StartEmergency => "StartEmg",
            Self::StopEmergency => "StopEmg",
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Recv(String),
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("downstream closed the connection without a response")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// host:port of the downstream command bridge.
    pub addr: String,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub max_response_bytes: usize,
}

/// Outcome of a successful relay exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    /// The exact line sent downstream.
    pub command_sent: String,
    /// The downstream reply, verbatim.
    pub response: String,
}

pub fn format_command(device_id: &str, kind: CommandKind) -> String {
    format!("AT^ST410CMD;{device_id};02;{}", kind.keyword())
}

/// Send one command and await one bounded reply.
///
/// The connection is freshly opened per call and closed on every exit path
/// (the stream drops with this function's scope).
pub async fn send_command(
    cfg: &RelayConfig,
    device_id: &str,
    kind: CommandKind,
) -> Result<RelayReply, RelayError> {
    let command = format_command(device_id, kind);
    debug!(addr = %cfg.addr, %command, "relaying command");

    let mut stream = timeout(cfg.connect_timeout, TcpStream::connect(&cfg.addr))
        .await
        .map_err(|_| RelayError::Timeout("connect"))?
        .map_err(|e| RelayError::Connect(e.to_string()))?;

    stream
        .write_all(command.as_bytes())
        .await
        .map_err(|e| RelayError::Send(e.to_string()))?;

    let mut buf = vec![0u8; cfg.max_response_bytes];
    let n = timeout(cfg.response_timeout, stream.read(&mut buf))
        .await
        .map_err(|_| RelayError::Timeout("response"))?
        .map_err(|e| RelayError::Recv(e.to_string()))?;
    if n == 0 {
        return Err(RelayError::EmptyResponse);
    }

    let response = String::from_utf8_lossy(&buf[..n]).into_owned();
    info!(device_id, response_bytes = n, "command relayed");
    Ok(RelayReply {
        command_sent: command,
        response,
    })
}
