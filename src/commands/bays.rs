//! Bays command - display the running daemon's bay directory via IPC.

use anyhow::{Context, Result};

use crate::bays::Bay;
use crate::ipc::{IpcClient, Request};

pub fn handle_bays_command(json: bool) -> Result<()> {
    let data = match IpcClient::connect() {
        Ok(client) => client.request(&Request::Bays)?,
        Err(_) => {
            log_error_standalone!("baywake isn't running");
            println!("  Start it with 'baywake' or check the socket permissions");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let bays: Vec<Bay> = serde_json::from_value(data).context("Daemon sent a malformed bay list")?;
    if bays.is_empty() {
        println!("The bay directory is empty");
        return Ok(());
    }

    let ref_width = bays.iter().map(|bay| bay.reference.len()).max().unwrap_or(0).max(3);
    let id_width = bays.iter().map(|bay| bay.id.len()).max().unwrap_or(0).max(2);

    println!("{:<ref_width$}  {:<id_width$}  {:<17}  IP", "REF", "ID", "MAC");
    for bay in &bays {
        let ip = bay
            .network_address
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<ref_width$}  {:<id_width$}  {:<17}  {ip}",
            bay.reference,
            bay.id,
            bay.hardware_address.to_string()
        );
    }
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("bays - Show the bay directory");
    log_block_start!("Usage: baywake bays [--json]");
    log_block_start!("Description:");
    log_indented!("Lists the bays the running daemon reconciles: every bay the");
    log_indented!("booking API reports that also has an entry in the mapping file.");
    log_end!();
}
