//! Wake command - send one Wake-on-LAN packet.

use anyhow::{Context, Result};

use crate::bays::HardwareAddress;
use crate::device::WakeOnLan;

pub fn handle_wake_command(mac: &str, debug_enabled: bool) -> Result<()> {
    log_version!();

    let mac: HardwareAddress = mac.parse().context("Invalid hardware address")?;
    let config = super::load_device_config(debug_enabled);
    let wol = WakeOnLan::new(config.wol_broadcast(), config.wol_port());

    if debug_enabled {
        log_pipe!();
        log_debug!("Sending magic packet to {}", wol.target());
    }

    wol.wake(&mac)?;
    log_block_start!("Wake packet sent to {mac}");
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("wake - Send one Wake-on-LAN packet");
    log_block_start!("Usage: baywake wake <mac>");
    log_block_start!("Description:");
    log_indented!("Broadcasts a magic packet for the given hardware address using");
    log_indented!("wol_broadcast and wol_port from baywake.toml.");
    log_block_start!("Examples:");
    log_indented!("baywake wake 00:11:22:33:44:55");
    log_end!();
}
