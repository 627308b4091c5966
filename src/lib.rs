//! # Baywake Library
//!
//! Internal library for the baywake binary: keeps golf simulator bay hardware
//! powered in step with a remote booking schedule.
//!
//! This library exists to enable testing of the reconciliation internals and to
//! keep CLI dispatch (main.rs) separate from application logic.
//!
//! ## Architecture
//!
//! - **Entry Point**: `Baywake` struct starts the daemon with resource management
//! - **Core Logic**: `core` holds the activation math, the reconciliation cycle
//!   and the directory refresh worker
//! - **Bays**: `bays` module for hardware addresses, the mapping table and the
//!   bay directory
//! - **Booking Source**: `booking` module with the HTTP booking API client
//! - **Devices**: `device` module for Wake-on-LAN, PJLink and neighbor-table lookups
//! - **Configuration**: `config` module for TOML settings, `.env` and environment overrides
//! - **Commands**: `commands` module for CLI subcommands (status, check, wake, ...)
//! - **Infrastructure**: signal handling, instance locking, the IPC socket and logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod bays;
pub mod booking;
pub mod commands;
pub mod common;
pub mod config;
pub mod device;
pub mod error;
pub mod io;
pub mod ipc;
pub mod time_source;

pub mod core;
mod baywake;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

pub use baywake::Baywake;
pub use error::{Error, Result};
