//! Command-line argument parsing and processing.
//!
//! Arguments are parsed by hand into a [`CliAction`] that `main` dispatches on.
//! Global flags may appear anywhere on the line; the first non-flag argument
//! names the subcommand and the remaining ones are its operands.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Print committed bay states from the running daemon
    Status { json: bool },
    /// Print the running daemon's bay directory
    Bays { json: bool },
    /// Replace the running daemon's bay mapping with a JSON file
    SetBays { file: String },
    /// Compute bay states once without actuating anything
    Check {
        debug_enabled: bool,
        config_dir: Option<String>,
        at: Option<String>,
    },
    /// Send one Wake-on-LAN packet
    Wake {
        debug_enabled: bool,
        config_dir: Option<String>,
        mac: String,
    },
    /// Perform one PJLink exchange
    PjLink {
        debug_enabled: bool,
        config_dir: Option<String>,
        ip: String,
        command: String,
    },
    /// Ask the running daemon to reload its bay mapping
    Reload { debug_enabled: bool },
    /// Terminate the running daemon
    Stop { debug_enabled: bool },
    /// Detailed help, optionally for one command
    Help { command: Option<String> },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped. `--version` wins over
    /// `--help`, and both win over any error in the rest of the line.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut json = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut at: Option<String> = None;
        let mut missing_value: Option<String> = None;
        let mut unknown_arg_found = false;
        let mut positionals: Vec<String> = Vec::new();

        let mut idx = 0;
        while idx < args_vec.len() {
            let arg = args_vec[idx].as_str();
            match arg {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--json" => json = true,
                "--config" | "-c" | "--log" | "--at" => {
                    match args_vec.get(idx + 1) {
                        Some(value) => {
                            let value = Some(value.clone());
                            match arg {
                                "--log" => log_file = value,
                                "--at" => at = value,
                                _ => config_dir = value,
                            }
                        }
                        None => missing_value = Some(arg.to_string()),
                    }
                    // Skip the flag's value
                    idx += 1;
                }
                "--" => {
                    positionals.extend(args_vec.iter().skip(idx + 1).cloned());
                    break;
                }
                // PJLink raw commands start with '%', so only '-' marks a flag
                _ if arg.starts_with('-') && arg.len() > 1 => {
                    log_warning_standalone!("Unknown argument: {}", arg);
                    unknown_arg_found = true;
                }
                _ => positionals.push(arg.to_string()),
            }
            idx += 1;
        }

        if display_version {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if display_help {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }
        if let Some(flag) = missing_value {
            log_warning_standalone!("Missing value for {}", flag);
            return Self::error();
        }
        if unknown_arg_found {
            return Self::error();
        }

        let command = positionals.first().map(String::as_str).unwrap_or("run");
        let operands = positionals.get(1..).unwrap_or_default();

        // Flags that only make sense for one command
        if json && !matches!(command, "status" | "bays") {
            log_warning_standalone!("--json is only valid with 'status' and 'bays'");
            return Self::error();
        }
        if at.is_some() && command != "check" {
            log_warning_standalone!("--at is only valid with 'check'");
            return Self::error();
        }
        if log_file.is_some() && command != "run" {
            log_warning_standalone!("--log is only valid when running the daemon");
            return Self::error();
        }

        let action = match (command, operands) {
            ("run", []) => CliAction::Run {
                debug_enabled,
                config_dir,
                log_file,
            },
            ("status", []) => CliAction::Status { json },
            ("bays", []) => CliAction::Bays { json },
            ("set-bays", [file]) => CliAction::SetBays { file: file.clone() },
            ("check", []) => CliAction::Check {
                debug_enabled,
                config_dir,
                at,
            },
            ("wake", [mac]) => CliAction::Wake {
                debug_enabled,
                config_dir,
                mac: mac.clone(),
            },
            ("pjlink", [ip, pjlink_command]) => CliAction::PjLink {
                debug_enabled,
                config_dir,
                ip: ip.clone(),
                command: pjlink_command.clone(),
            },
            ("reload", []) => CliAction::Reload { debug_enabled },
            ("stop", []) => CliAction::Stop { debug_enabled },
            ("help", []) => CliAction::Help { command: None },
            ("help", [topic]) => CliAction::Help {
                command: Some(topic.clone()),
            },
            (known, _) if is_command(known) => {
                log_warning_standalone!("Wrong number of arguments for '{}'", known);
                log_indented!("Usage: {}", command_usage(known));
                return Self::error();
            }
            (unknown, _) => {
                log_warning_standalone!("Unknown command: {}", unknown);
                return Self::error();
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }

    fn error() -> ParsedArgs {
        ParsedArgs {
            action: CliAction::ShowHelpDueToError,
        }
    }
}

const COMMANDS: &[&str] = &[
    "run", "status", "bays", "set-bays", "check", "wake", "pjlink", "reload", "stop", "help",
];

fn is_command(name: &str) -> bool {
    COMMANDS.contains(&name)
}

/// One-line usage for a command.
pub fn command_usage(command: &str) -> &'static str {
    match command {
        "run" => "baywake [OPTIONS] [run] [--log <file>]",
        "status" => "baywake status [--json]",
        "bays" => "baywake bays [--json]",
        "set-bays" => "baywake set-bays <file>",
        "check" => "baywake check [--at <RFC3339>]",
        "wake" => "baywake wake <mac>",
        "pjlink" => "baywake pjlink <ip> <on|off|RAW>",
        "reload" => "baywake reload",
        "stop" => "baywake stop",
        "help" => "baywake help [COMMAND]",
        _ => "baywake [OPTIONS] [COMMAND]",
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("baywake [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>       Use custom configuration directory");
    log_indented!("-d, --debug              Enable detailed debug output");
    log_indented!("-h, --help               Print help information");
    log_indented!("    --log <file>         Write daemon output to a file instead of stdout");
    log_indented!("-V, --version            Print version information");
    log_block_start!("Commands:");
    log_indented!("run                      Run the daemon (default)");
    log_indented!("status [--json]          Show committed bay states");
    log_indented!("bays [--json]            Show the bay directory");
    log_indented!("set-bays <file>          Replace the bay mapping from a JSON file");
    log_indented!("check [--at <time>]      Compute bay states without actuating");
    log_indented!("wake <mac>               Send one Wake-on-LAN packet");
    log_indented!("pjlink <ip> <cmd>        Send one PJLink command (on, off or raw)");
    log_indented!("reload                   Reload the bay mapping of the running daemon");
    log_indented!("stop                     Stop the running daemon");
    log_indented!("help [COMMAND]           Show detailed help for a command");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let args = vec!["baywake"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: false,
                config_dir: None,
                log_file: None,
            }
        );
    }

    #[test]
    fn test_parse_debug_flag() {
        let parsed = ParsedArgs::parse(vec!["baywake", "--debug"]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: true,
                config_dir: None,
                log_file: None,
            }
        );

        let parsed = ParsedArgs::parse(vec!["baywake", "-d", "run"]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: true,
                config_dir: None,
                log_file: None,
            }
        );
    }

    #[test]
    fn test_parse_config_and_log() {
        let parsed = ParsedArgs::parse(vec![
            "baywake",
            "--config",
            "/etc/baywake",
            "--log",
            "/var/log/baywake.log",
        ]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: false,
                config_dir: Some("/etc/baywake".to_string()),
                log_file: Some("/var/log/baywake.log".to_string()),
            }
        );
    }

    #[test]
    fn test_config_value_is_not_a_command() {
        let parsed = ParsedArgs::parse(vec!["baywake", "-c", "status", "check"]);
        assert_eq!(
            parsed.action,
            CliAction::Check {
                debug_enabled: false,
                config_dir: Some("status".to_string()),
                at: None,
            }
        );
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "--help"]).action,
            CliAction::ShowHelp
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "-h"]).action,
            CliAction::ShowHelp
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "-V"]).action,
            CliAction::ShowVersion
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "--version"]).action,
            CliAction::ShowVersion
        );
    }

    #[test]
    fn test_version_takes_precedence() {
        let parsed = ParsedArgs::parse(vec!["baywake", "--version", "--help", "--debug"]);
        assert_eq!(parsed.action, CliAction::ShowVersion);
    }

    #[test]
    fn test_help_wins_over_errors() {
        let parsed = ParsedArgs::parse(vec!["baywake", "--bogus", "--help"]);
        assert_eq!(parsed.action, CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_unknown_flag() {
        let parsed = ParsedArgs::parse(vec!["baywake", "--unknown"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_unknown_command() {
        let parsed = ParsedArgs::parse(vec!["baywake", "launch"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_missing_flag_value() {
        let parsed = ParsedArgs::parse(vec!["baywake", "check", "--at"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_status_and_bays() {
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "status"]).action,
            CliAction::Status { json: false }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "status", "--json"]).action,
            CliAction::Status { json: true }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "--json", "bays"]).action,
            CliAction::Bays { json: true }
        );
    }

    #[test]
    fn test_json_rejected_elsewhere() {
        let parsed = ParsedArgs::parse(vec!["baywake", "reload", "--json"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_set_bays_requires_file() {
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "set-bays", "bays.json"]).action,
            CliAction::SetBays {
                file: "bays.json".to_string()
            }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "set-bays"]).action,
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_check_with_at() {
        let parsed = ParsedArgs::parse(vec!["baywake", "check", "--at", "2026-10-19T09:00:00Z"]);
        assert_eq!(
            parsed.action,
            CliAction::Check {
                debug_enabled: false,
                config_dir: None,
                at: Some("2026-10-19T09:00:00Z".to_string()),
            }
        );

        let parsed = ParsedArgs::parse(vec!["baywake", "status", "--at", "now"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_wake() {
        let parsed = ParsedArgs::parse(vec!["baywake", "-d", "wake", "00:11:22:33:44:55"]);
        assert_eq!(
            parsed.action,
            CliAction::Wake {
                debug_enabled: true,
                config_dir: None,
                mac: "00:11:22:33:44:55".to_string(),
            }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "wake"]).action,
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_pjlink_raw_command() {
        let parsed = ParsedArgs::parse(vec!["baywake", "pjlink", "10.0.0.5", "%1INPT ?"]);
        assert_eq!(
            parsed.action,
            CliAction::PjLink {
                debug_enabled: false,
                config_dir: None,
                ip: "10.0.0.5".to_string(),
                command: "%1INPT ?".to_string(),
            }
        );
    }

    #[test]
    fn test_pjlink_missing_command() {
        let parsed = ParsedArgs::parse(vec!["baywake", "pjlink", "10.0.0.5"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_reload_and_stop_take_no_operands() {
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "reload"]).action,
            CliAction::Reload {
                debug_enabled: false
            }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "stop", "--debug"]).action,
            CliAction::Stop {
                debug_enabled: true
            }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "stop", "now"]).action,
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_help_command() {
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "help"]).action,
            CliAction::Help { command: None }
        );
        assert_eq!(
            ParsedArgs::parse(vec!["baywake", "help", "pjlink"]).action,
            CliAction::Help {
                command: Some("pjlink".to_string())
            }
        );
    }

    #[test]
    fn test_log_only_for_run() {
        let parsed = ParsedArgs::parse(vec!["baywake", "status", "--log", "out.log"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }
}
