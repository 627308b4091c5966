//! Set-bays command - replace the running daemon's bay mapping.
//!
//! The daemon validates the entries, writes the mapping file and refreshes its
//! directory. An invalid file is rejected as a whole and nothing changes.

use anyhow::{Context, Result};
use std::path::Path;

use crate::bays::MappingEntry;
use crate::ipc::{IpcClient, Request};

pub fn handle_set_bays_command(file: &str) -> Result<()> {
    log_version!();

    let path = Path::new(file);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let bays: Vec<MappingEntry> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a mapping file", path.display()))?;

    let client = match IpcClient::connect() {
        Ok(client) => client,
        Err(_) => {
            log_error_exit!("baywake isn't running");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    };

    match client.request(&Request::SetBays { bays }) {
        Ok(saved) => {
            let count = saved.as_array().map(Vec::len).unwrap_or(0);
            log_block_start!("Bay mapping replaced ({count} bays)");
            log_indented!("The daemon is refreshing its bay directory");
            log_end!();
            Ok(())
        }
        Err(e) => {
            log_error_exit!("Mapping rejected: {e}");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    }
}

pub fn display_help() {
    log_version!();
    log_block_start!("set-bays - Replace the bay mapping");
    log_block_start!("Usage: baywake set-bays <file>");
    log_block_start!("Arguments:");
    log_indented!("<file>  JSON array of {{\"ref\", \"mac\", \"ip\"?}} objects");
    log_block_start!("Examples:");
    log_indented!("# bays.json");
    log_indented!("[{{\"ref\": \"BAY-1\", \"mac\": \"00:11:22:33:44:55\", \"ip\": \"10.0.0.21\"}}]");
    log_pipe!();
    log_indented!("baywake set-bays bays.json");
    log_end!();
}
