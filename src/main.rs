//! Main application entry point.
//!
//! Parses the command line and dispatches to the daemon or to a one-shot
//! command. Everything else lives in the library:
//!
//! - `args`: command-line parsing and help/version display
//! - `baywake`: daemon startup and resource management
//! - `commands`: one-shot CLI commands
//! - `logger`: centralized output formatting

use anyhow::Result;

use baywake::args::{self, CliAction, ParsedArgs};
use baywake::commands;
use baywake::config;
use baywake::logger::Log;
use baywake::{Baywake, log_block_start, log_end, log_error_exit};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(2);
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        } => {
            // Keep the guard alive until the daemon returns so the log is flushed
            let _log_guard = match log_file {
                Some(path) => {
                    let guard = Log::start_file_logging(path.clone())?;
                    log_block_start!("Logging to {}", path);
                    Some(guard)
                }
                None => None,
            };
            set_config_dir(config_dir);
            Baywake::new(debug_enabled).run()
        }
        CliAction::Status { json } => commands::status::handle_status_command(json),
        CliAction::Bays { json } => commands::bays::handle_bays_command(json),
        CliAction::SetBays { file } => commands::set_bays::handle_set_bays_command(&file),
        CliAction::Check {
            debug_enabled,
            config_dir,
            at,
        } => {
            set_config_dir(config_dir);
            commands::check::handle_check_command(at.as_deref(), debug_enabled)
        }
        CliAction::Wake {
            debug_enabled,
            config_dir,
            mac,
        } => {
            set_config_dir(config_dir);
            commands::wake::handle_wake_command(&mac, debug_enabled)
        }
        CliAction::PjLink {
            debug_enabled,
            config_dir,
            ip,
            command,
        } => {
            set_config_dir(config_dir);
            commands::pjlink::handle_pjlink_command(&ip, &command, debug_enabled)
        }
        CliAction::Reload { debug_enabled } => {
            commands::reload::handle_reload_command(debug_enabled)
        }
        CliAction::Stop { debug_enabled } => commands::stop::handle_stop_command(debug_enabled),
        CliAction::Help { command } => commands::help::run_help_command(command.as_deref()),
    }
}

/// Install a custom configuration directory or exit explaining why it is unusable.
fn set_config_dir(config_dir: Option<String>) {
    if let Err(e) = config::set_config_dir(config_dir) {
        log_error_exit!("{e}");
        log_end!();
        std::process::exit(baywake::common::constants::EXIT_FAILURE);
    }
}
