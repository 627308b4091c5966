//! Help command implementation for baywake.
//!
//! Dispatches to command-specific help, or shows the command overview.

use anyhow::Result;

/// Run the help command (dispatcher)
///
/// # Arguments
/// * `command` - Optional command name to get help for (None = general help)
pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => display_general_help(),
        Some("bays") => super::bays::display_help(),
        Some("check") => super::check::display_help(),
        Some("help") => display_help_help(),
        Some("pjlink") => super::pjlink::display_help(),
        Some("reload") => super::reload::display_help(),
        Some("run") => display_run_help(),
        Some("set-bays") => super::set_bays::display_help(),
        Some("status") => super::status::display_help(),
        Some("stop") => super::stop::display_help(),
        Some("wake") => super::wake::display_help(),
        Some(unknown) => {
            log_warning_standalone!("Unknown command: {}", unknown);
            display_general_help();
        }
    }
    Ok(())
}

/// Display general help focused on commands (for the help command)
fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("run                      Run the daemon (default)");
    log_indented!("status [--json]          Show committed bay states");
    log_indented!("bays [--json]            Show the bay directory");
    log_indented!("set-bays <file>          Replace the bay mapping");
    log_indented!("check [--at <time>]      Compute bay states without actuating");
    log_indented!("wake <mac>               Send one Wake-on-LAN packet");
    log_indented!("pjlink <ip> <cmd>        Send one PJLink command");
    log_indented!("reload                   Reload the bay mapping");
    log_indented!("stop                     Stop the running daemon");
    log_indented!("help [COMMAND]           Show detailed help for a command");
    log_pipe!();
    log_info!("Use 'baywake help <command>' to see detailed help for a specific command.");
    log_indented!("Use 'baywake --help' to see all options and general usage.");
    log_end!();
}

fn display_run_help() {
    log_version!();
    log_block_start!("run - Run the reconciliation daemon");
    log_block_start!("Usage: baywake [OPTIONS] [run]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>  Read baywake.toml and bays.json from <dir>");
    log_indented!("-d, --debug         Log per-bay decisions and device replies");
    log_indented!("    --log <file>    Write output to <file> instead of stdout");
    log_block_start!("Description:");
    log_indented!("Keeps projector and PC power in step with the booking schedule.");
    log_indented!("Bays wake before a booking starts and sleep after it ends, using");
    log_indented!("the pre_booking_minutes and post_booking_minutes margins.");
    log_end!();
}

/// Display help for the help command itself
fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: baywake help [COMMAND]");
    log_block_start!("Arguments:");
    log_indented!("COMMAND  Optional command to get help for");
    log_indented!("         If omitted, shows general help");
    log_block_start!("Examples:");
    log_indented!("baywake help");
    log_indented!("baywake help check");
    log_end!();
}
