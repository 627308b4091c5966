//! PJLink command - one exchange with a projector.

use anyhow::{Context, Result};
use std::net::IpAddr;

use crate::common::constants::{PJLINK_POWER_OFF, PJLINK_POWER_ON};
use crate::device::PjLinkClient;

/// Map the `on`/`off` shorthands to their commands; anything else is sent raw.
pub fn resolve_command(command: &str) -> &str {
    match command.to_ascii_lowercase().as_str() {
        "on" => PJLINK_POWER_ON,
        "off" => PJLINK_POWER_OFF,
        _ => command,
    }
}

pub fn handle_pjlink_command(ip: &str, command: &str, debug_enabled: bool) -> Result<()> {
    log_version!();

    let ip: IpAddr = ip
        .parse()
        .with_context(|| format!("'{ip}' is not an IP address"))?;
    let config = super::load_device_config(debug_enabled);
    let client = PjLinkClient::new(config.pjlink_options());
    let command = resolve_command(command);

    if debug_enabled {
        log_pipe!();
        log_debug!(
            "Sending '{}' to {}:{}",
            command,
            ip,
            client.options().port
        );
    }

    match client.send(ip, command) {
        Ok(reply) => {
            log_block_start!("{ip} replied: {reply}");
            log_end!();
            Ok(())
        }
        Err(e) => {
            log_error_exit!("PJLink exchange with {ip} failed: {e}");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    }
}

pub fn display_help() {
    log_version!();
    log_block_start!("pjlink - Send one PJLink command");
    log_block_start!("Usage: baywake pjlink <ip> <on|off|RAW>");
    log_block_start!("Arguments:");
    log_indented!("<ip>      Projector address");
    log_indented!("on, off   Power on (%1POWR 1) or off (%1POWR 0)");
    log_indented!("RAW       Any other class 1 command, sent as given");
    log_block_start!("Examples:");
    log_indented!("baywake pjlink 10.0.0.21 on");
    log_indented!("baywake pjlink 10.0.0.21 \"%1POWR ?\"");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_command_shorthands() {
        assert_eq!(resolve_command("on"), "%1POWR 1");
        assert_eq!(resolve_command("OFF"), "%1POWR 0");
        assert_eq!(resolve_command("%1INPT ?"), "%1INPT ?");
    }
}
