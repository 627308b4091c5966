//! Error taxonomy for device control, address resolution and the bay directory.
//!
//! Application orchestration (config, daemon startup, CLI commands) uses
//! `anyhow`; everything below it returns [`Result`].

use thiserror::Error;

/// Error type for bay power operations
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure: device or booking API unreachable, socket reset
    #[error("connection error: {0}")]
    Connection(String),

    /// Unexpected handshake or reply shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Well-formed error reply from a device
    #[error("device error: {message} (code {code})")]
    Device { code: String, message: String },

    /// No response within budget
    #[error("timed out: {0}")]
    Timeout(String),

    /// Hardware address missing from the neighbor table, or the table query failed
    #[error("address resolution failed: {0}")]
    Resolution(String),

    /// Refresh produced an invalid or partial directory
    #[error("directory error: {0}")]
    Directory(String),

    /// Malformed hardware or network address
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type for bay power operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a later cycle can reasonably be expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Timeout(_) | Error::Resolution(_)
        )
    }

    /// Short label used in status output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Connection(_) => "connection",
            Error::Protocol(_) => "protocol",
            Error::Device { .. } => "device",
            Error::Timeout(_) => "timeout",
            Error::Resolution(_) => "resolution",
            Error::Directory(_) => "directory",
            Error::InvalidAddress(_) => "invalid_address",
        }
    }

    /// Map an I/O error from a socket operation, keeping timeouts distinct.
    pub(crate) fn from_io(context: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                Error::Timeout(format!("{context}: {err}"))
            }
            _ => Error::Connection(format!("{context}: {err}")),
        }
    }
}
