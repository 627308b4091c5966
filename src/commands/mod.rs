//! Command-line command handlers for baywake.
//!
//! Each one-shot command is implemented in its own submodule. `status`, `bays`
//! and `set-bays` talk to the running daemon over its control socket; `reload`
//! and `stop` signal it through the PID in its lock file; `check`, `wake` and
//! `pjlink` work without a daemon.

pub mod bays;
pub mod check;
pub mod help;
pub mod pjlink;
pub mod reload;
pub mod set_bays;
pub mod status;
pub mod stop;
pub mod wake;

use crate::config::{self, Config};

/// Configuration for commands that only need device settings.
///
/// `wake` and `pjlink` never reach the booking API, so a configuration that
/// fails validation (for example, no API key yet) falls back to defaults.
pub(crate) fn load_device_config(debug_enabled: bool) -> Config {
    match config::load() {
        Ok(config) => config,
        Err(e) => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Using default device settings: {e:#}");
            }
            Config::default()
        }
    }
}
