//! Client side of the control socket, used by the CLI commands.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use super::protocol::{Request, Response};
use super::server::socket_path;
use crate::common::constants::IPC_CLIENT_TIMEOUT_SECS;

pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    /// Connect to the running daemon.
    pub fn connect() -> Result<Self> {
        let path = socket_path();
        Self::connect_to(&path).with_context(|| {
            format!(
                "Failed to connect to baywake IPC socket at {:?}. Is baywake running?",
                path
            )
        })
    }

    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)?;
        let timeout = Some(Duration::from_secs(IPC_CLIENT_TIMEOUT_SECS));
        stream
            .set_read_timeout(timeout)
            .context("Failed to set read timeout on IPC socket")?;
        stream
            .set_write_timeout(timeout)
            .context("Failed to set write timeout on IPC socket")?;
        Ok(Self { stream })
    }

    /// Send one request and return the response's `data`.
    ///
    /// An `ok: false` response becomes an error carrying the daemon's message.
    pub fn request(mut self, request: &Request) -> Result<Value> {
        let mut line = serde_json::to_string(request).context("Failed to encode request")?;
        line.push('\n');
        self.stream
            .write_all(line.as_bytes())
            .context("Failed to send IPC request")?;
        self.stream.flush()?;

        let mut reader = BufReader::new(&self.stream);
        let mut reply = String::new();
        reader
            .read_line(&mut reply)
            .context("Failed to read IPC response")?;

        if reply.trim().is_empty() {
            anyhow::bail!("Connection closed by baywake before it answered");
        }

        let response: Response = serde_json::from_str(reply.trim())
            .with_context(|| format!("Failed to parse IPC response: {}", reply.trim()))?;

        if response.ok {
            Ok(response.data.unwrap_or(Value::Null))
        } else {
            anyhow::bail!(
                "{}",
                response
                    .error
                    .unwrap_or_else(|| "request failed".to_string())
            )
        }
    }
}
