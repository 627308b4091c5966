//! Implementation of the reload command.
//!
//! Signals the running daemon to re-read its bay mapping file. The daemon
//! keeps the previous mapping if the file turns out to be invalid.

use anyhow::Result;

use crate::io::instance;

/// Handle the reload command by sending SIGUSR2 to the running daemon.
pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let pid = match instance::get_running_instance_pid() {
        Ok(pid) => pid,
        Err(_) => {
            log_error_exit!("baywake isn't running");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    };

    match instance::send_reload_signal(pid) {
        Ok(()) => {
            if debug_enabled {
                log_pipe!();
                log_debug!("SIGUSR2 sent to process {}", pid);
            }
            log_block_start!("Sent reload signal to baywake (PID: {pid})");
            log_indented!("The bay mapping will be re-read and the directory refreshed");
            log_end!();
            Ok(())
        }
        Err(e) => {
            log_error_exit!("Failed to signal baywake: {e}");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    }
}

/// Display detailed help for the reload command (help subcommand)
pub fn display_help() {
    log_version!();
    log_block_start!("reload - Reload the bay mapping");
    log_block_start!("Usage: baywake reload");
    log_block_start!("Description:");
    log_indented!("Asks the running daemon to re-read its mapping file and refresh");
    log_indented!("the bay directory. Edits to the file are normally picked up");
    log_indented!("automatically; use this when file watching is unavailable.");
    log_block_start!("Examples:");
    log_indented!("baywake reload");
    log_pipe!();
    log_indented!("# With debug output");
    log_indented!("baywake --debug reload");
    log_end!();
}
