//! Unix socket server for the daemon's control surface.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::protocol::{self, Response};
use crate::common::constants::{
    CONFIG_DIR_NAME, IPC_CLIENT_TIMEOUT_SECS, IPC_POLL_INTERVAL_MS, SOCKET_FILE_NAME,
};
use crate::common::utils;
use crate::core::snapshot::SharedState;

/// Socket server answering one request per connection.
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl IpcServer {
    /// Bind the socket, replacing a leftover one from a previous run.
    pub fn bind(socket_path: PathBuf) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        // Lets the loop notice `running` going false
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking mode")?;

        Ok(Self {
            socket_path,
            listener,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve until `running` is cleared, then remove the socket file.
    pub fn run(self, shared: Arc<SharedState>, running: Arc<AtomicBool>, debug_enabled: bool) {
        if debug_enabled {
            log_debug!("IPC server listening on {:?}", self.socket_path);
        }

        while running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = serve_connection(stream, &shared)
                        && debug_enabled
                    {
                        log_debug!("IPC client error: {e:#}");
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(IPC_POLL_INTERVAL_MS));
                }
                Err(e) => {
                    if debug_enabled {
                        log_debug!("Error accepting IPC connection: {e}");
                    }
                    thread::sleep(Duration::from_millis(IPC_POLL_INTERVAL_MS));
                }
            }
        }

        if debug_enabled {
            log_debug!("IPC server shutting down");
        }
        self.cleanup();
    }

    fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

fn serve_connection(stream: UnixStream, shared: &SharedState) -> Result<()> {
    stream
        .set_nonblocking(false)
        .context("Failed to set client stream to blocking mode")?;
    let timeout = Some(Duration::from_secs(IPC_CLIENT_TIMEOUT_SECS));
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;

    let mut reader = BufReader::new(stream.try_clone().context("Failed to clone stream")?);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read IPC request")?;

    let response = if line.trim().is_empty() {
        Response::failure("empty request")
    } else {
        protocol::handle_line(shared, &line)
    };

    let mut payload = serde_json::to_string(&response).context("Failed to encode response")?;
    payload.push('\n');

    let mut writer = stream;
    writer
        .write_all(payload.as_bytes())
        .context("Failed to write IPC response")?;
    writer.flush()?;
    Ok(())
}

/// Control socket location: `$XDG_RUNTIME_DIR/baywake/baywake.sock`, or
/// `/tmp/baywake-<uid>/baywake.sock` without a runtime directory.
pub fn socket_path() -> PathBuf {
    match std::env::var("XDG_RUNTIME_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir)
            .join(CONFIG_DIR_NAME)
            .join(SOCKET_FILE_NAME),
        _ => utils::runtime_dir().join(SOCKET_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::client::IpcClient;
    use crate::ipc::protocol::Request;
    use crate::bays::{BayDirectory, BayMapping, MappingEntry};
    use chrono::{TimeZone, Utc};

    fn start(dir: &Path) -> (Arc<SharedState>, Arc<AtomicBool>, thread::JoinHandle<()>, PathBuf) {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let shared = Arc::new(SharedState::new(
            BayDirectory::new(Vec::new(), now),
            BayMapping::default(),
            dir.join("bays.json"),
            now,
        ));
        let running = Arc::new(AtomicBool::new(true));
        let socket = dir.join("run").join("baywake.sock");
        let server = IpcServer::bind(socket.clone()).unwrap();

        let handle = {
            let shared = Arc::clone(&shared);
            let running = Arc::clone(&running);
            thread::spawn(move || server.run(shared, running, false))
        };
        (shared, running, handle, socket)
    }

    #[test]
    fn test_requests_round_trip_and_socket_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (shared, running, handle, socket) = start(dir.path());

        let health = IpcClient::connect_to(&socket)
            .unwrap()
            .request(&Request::Health)
            .unwrap();
        assert_eq!(health["status"], "ok");

        let saved = IpcClient::connect_to(&socket)
            .unwrap()
            .request(&Request::SetBays {
                bays: vec![MappingEntry {
                    reference: "BAY-1".to_string(),
                    mac: "00-11-22-33-44-55".to_string(),
                    ip: Some("10.0.0.5".to_string()),
                }],
            })
            .unwrap();
        assert_eq!(saved[0]["mac"], "00:11:22:33:44:55");
        assert_eq!(shared.mapping().len(), 1);

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
        assert!(!socket.exists());
    }

    #[test]
    fn test_error_response_becomes_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_shared, running, handle, socket) = start(dir.path());

        let result = IpcClient::connect_to(&socket)
            .unwrap()
            .request(&Request::SetBays {
                bays: vec![MappingEntry {
                    reference: String::new(),
                    mac: "00:11:22:33:44:55".to_string(),
                    ip: None,
                }],
            });
        assert!(result.is_err());

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }

    #[test]
    fn test_bind_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("baywake.sock");
        std::fs::write(&socket, "stale").unwrap();

        let server = IpcServer::bind(socket.clone()).unwrap();
        assert_eq!(server.socket_path(), socket.as_path());
        server.cleanup();
        assert!(!socket.exists());
    }
}
