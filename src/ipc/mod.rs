//! Local control surface: a Unix socket speaking line-delimited JSON.
//!
//! The daemon serves it from a background thread; CLI commands such as
//! `status`, `bays` and `set-bays` are its clients.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use protocol::{Request, Response};
pub use server::{IpcServer, socket_path};
