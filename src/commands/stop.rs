//! Implementation of the stop command.
//!
//! This command cleanly terminates a running baywake instance by sending
//! SIGTERM and waiting for the process to exit.

use anyhow::Result;
use std::time::Duration;

use crate::common::constants::EXIT_FAILURE;
use crate::io::instance;

const STOP_TIMEOUT_MS: u64 = 5000;
const STOP_POLL_MS: u64 = 100;

/// Handle the stop command to terminate a running baywake instance.
pub fn handle_stop_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let pid = match instance::get_running_instance_pid() {
        Ok(pid) => pid,
        Err(_) => {
            log_error_exit!("baywake isn't running");
            std::process::exit(EXIT_FAILURE);
        }
    };

    log_block_start!("Stopping baywake instance (PID: {})...", pid);

    if let Err(e) = instance::terminate_instance(pid) {
        log_error_exit!("Failed to terminate instance: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    if debug_enabled {
        log_pipe!();
        log_debug!("SIGTERM sent to process {}", pid);
    }

    // An in-flight cycle finishes its actuation pass before the daemon exits
    for _ in 0..STOP_TIMEOUT_MS / STOP_POLL_MS {
        if !instance::is_instance_running(pid) {
            log_pipe!();
            log_info!("Process terminated successfully");
            log_end!();
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(STOP_POLL_MS));
    }

    log_pipe!();
    log_warning!("Process did not terminate within the expected time");
    log_indented!("The termination signal was sent, but the process may still be shutting down");
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("stop - Cleanly terminate running baywake");
    log_block_start!("Usage: baywake stop");
    log_block_start!("Description:");
    log_indented!("Sends a termination signal to the running daemon, which finishes");
    log_indented!("the current cycle, removes its socket and releases its lock.");
    log_indented!("Waits up to 5 seconds to confirm the process actually terminates.");
    log_block_start!("Examples:");
    log_indented!("baywake stop");
    log_end!();
}
