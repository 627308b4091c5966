//! PJLink class 1 client for projector power control.
//!
//! Each call is one connection and one exchange:
//!
//! ```text
//! Connect ──► AwaitBanner ──"PJLINK 0"──► (write command\r) ──► AwaitReply ──► done
//!                 │                                                 │
//!                 └── other banner: Protocol                        ├── ...=OK     → Ok(reply)
//!                                                                   ├── ...=ERRn   → Device
//!                                                                   └── non-empty  → Ok(reply)
//! ```
//!
//! Any silence longer than the timeout is a `Timeout`; any socket failure or a
//! premature close is a `Connection` error. Inbound bytes are buffered and split
//! on CR/LF, so a reply spread over several reads or two frames in one read are
//! both handled. Empty frames are skipped in either phase.

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::common::constants::{
    DEFAULT_PJLINK_PORT, DEFAULT_PJLINK_TIMEOUT_MS, PJLINK_MAX_FRAME_LEN, PJLINK_POWER_OFF,
    PJLINK_POWER_ON, PJLINK_READ_BUFFER_SIZE, PJLINK_UNAUTHENTICATED_BANNER,
};
use crate::error::{Error, Result};

/// Connection options for a PJLink exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PjLinkOptions {
    pub port: u16,
    pub timeout: Duration,
}

impl Default for PjLinkOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PJLINK_PORT,
            timeout: Duration::from_millis(DEFAULT_PJLINK_TIMEOUT_MS),
        }
    }
}

/// How a reply frame resolved the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyClass {
    /// `...=OK`
    Acknowledged,
    /// `...=ERR<digits>`, carrying `ERR<digits>`
    DeviceError(String),
    /// Any other non-empty line (status pushes, vendor extensions)
    Other,
}

/// Classify a complete, trimmed, non-empty reply frame.
pub fn classify_reply(frame: &str) -> ReplyClass {
    let upper = frame.to_ascii_uppercase();

    if upper.ends_with("=OK") {
        return ReplyClass::Acknowledged;
    }

    if let Some(pos) = upper.rfind("=ERR") {
        let digits = &upper[pos + 4..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return ReplyClass::DeviceError(format!("ERR{digits}"));
        }
    }

    ReplyClass::Other
}

/// Human-readable meaning of the class 1 error codes.
pub fn describe_error_code(code: &str) -> &'static str {
    match code {
        "ERR1" => "undefined command",
        "ERR2" => "parameter out of range",
        "ERR3" => "unavailable at this time",
        "ERR4" => "projector or display failure",
        _ => "unrecognized error",
    }
}

/// Accumulates inbound bytes and yields CR/LF terminated frames.
#[derive(Debug, Default)]
struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete frame, trimmed. Empty lines come back as `Some("")`.
    fn next_frame(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\r' || b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line[..end]).trim().to_string())
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether unterminated non-whitespace bytes are waiting.
    fn has_partial(&self) -> bool {
        self.pending.iter().any(|b| !b.is_ascii_whitespace())
    }
}

enum Phase {
    AwaitBanner,
    AwaitReply,
}

/// PJLink client.
#[derive(Debug, Clone, Copy, Default)]
pub struct PjLinkClient {
    options: PjLinkOptions,
}

impl PjLinkClient {
    pub fn new(options: PjLinkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PjLinkOptions {
        &self.options
    }

    pub fn power_on(&self, ip: IpAddr) -> Result<String> {
        self.send(ip, PJLINK_POWER_ON)
    }

    pub fn power_off(&self, ip: IpAddr) -> Result<String> {
        self.send(ip, PJLINK_POWER_OFF)
    }

    /// Connect, wait for the banner, send `command`, return the raw reply.
    pub fn send(&self, ip: IpAddr, command: &str) -> Result<String> {
        let peer = SocketAddr::new(ip, self.options.port);
        let timeout = self.options.timeout;

        let mut stream = TcpStream::connect_timeout(&peer, timeout).map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                Error::Timeout(format!("connecting to {peer} took longer than {timeout:?}"))
            } else {
                Error::Connection(format!("cannot connect to {peer}: {e}"))
            }
        })?;

        let result = stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| stream.set_write_timeout(Some(timeout)))
            .map_err(|e| Error::Connection(format!("{peer}: {e}")))
            .and_then(|()| exchange(&mut stream, command, peer, timeout));

        // Single close point for every outcome
        let _ = stream.shutdown(Shutdown::Both);
        result
    }
}

fn exchange<S: Read + Write>(
    stream: &mut S,
    command: &str,
    peer: SocketAddr,
    timeout: Duration,
) -> Result<String> {
    let mut frames = FrameBuffer::default();
    let mut phase = Phase::AwaitBanner;
    let mut buf = [0u8; PJLINK_READ_BUFFER_SIZE];
    let mut closed = false;

    loop {
        while let Some(frame) = frames.next_frame() {
            if frame.is_empty() {
                continue;
            }

            match phase {
                Phase::AwaitBanner => {
                    if !frame.starts_with(PJLINK_UNAUTHENTICATED_BANNER) {
                        return Err(Error::Protocol(format!(
                            "unexpected banner from {peer}: \"{frame}\" (auth likely enabled)"
                        )));
                    }
                    stream
                        .write_all(format!("{command}\r").as_bytes())
                        .and_then(|()| stream.flush())
                        .map_err(|e| Error::from_io(&format!("writing to {peer}"), e))?;
                    phase = Phase::AwaitReply;
                }
                Phase::AwaitReply => {
                    return match classify_reply(&frame) {
                        ReplyClass::Acknowledged | ReplyClass::Other => Ok(frame),
                        ReplyClass::DeviceError(code) => Err(Error::Device {
                            message: format!(
                                "{peer} replied \"{frame}\": {}",
                                describe_error_code(&code)
                            ),
                            code,
                        }),
                    };
                }
            }
        }

        if frames.len() > PJLINK_MAX_FRAME_LEN {
            return Err(Error::Protocol(format!(
                "{peer} sent more than {PJLINK_MAX_FRAME_LEN} bytes without a line terminator"
            )));
        }

        match stream.read(&mut buf) {
            // A last frame may arrive without its terminator before the close
            Ok(0) if !closed && frames.has_partial() => {
                closed = true;
                frames.push(b"\r");
            }
            Ok(0) => {
                return Err(Error::Connection(format!(
                    "{peer} closed the connection before replying"
                )));
            }
            Ok(n) => frames.push(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(Error::Timeout(format!(
                    "no data from {peer} within {timeout:?}"
                )));
            }
            Err(e) => return Err(Error::Connection(format!("reading from {peer}: {e}"))),
        }
    }
}
