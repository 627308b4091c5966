//! Application coordinator that manages the complete lifecycle of the daemon.
//!
//! This module handles resource acquisition, initialization, and orchestration
//! of the core application logic. It manages:
//! - Configuration and bay mapping loading
//! - Lock file management for single-instance enforcement
//! - Signal handler setup
//! - The initial bay directory refresh
//! - The mapping file watcher
//!
//! The `Baywake` struct uses a builder pattern:
//! - Normal startup: `Baywake::new(debug_enabled).run()`
//! - Without the instance lock: `Baywake::new(debug_enabled).without_lock().run()`

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{
    bays::{BayMapping, directory},
    booking::{BookingSource, HttpBookingSource},
    common::{constants::EXIT_FAILURE, utils::private_path},
    config::{self, Config},
    core::{Core, CoreParams, snapshot::SharedState},
    device::{ArpCommand, BayActuator, NeighborTable, NetworkActuator, PjLinkClient, WakeOnLan},
    io::{instance, signals::setup_signal_handler},
    logger::Log,
};

/// Builder for configuring and running the baywake daemon.
///
/// ```no_run
/// use baywake::Baywake;
///
/// # fn main() -> anyhow::Result<()> {
/// Baywake::new(false).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Baywake {
    debug_enabled: bool,
    create_lock: bool,
}

impl Baywake {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
        }
    }

    /// Skip single-instance enforcement
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    /// Run the daemon until a shutdown signal.
    pub fn run(self) -> Result<()> {
        let config = match config::load() {
            Ok(config) => config,
            Err(e) => {
                log_error_exit!("Configuration failed");
                eprintln!("{:?}", e);
                std::process::exit(EXIT_FAILURE);
            }
        };

        Log::set_timezone(config.venue_timezone());
        Log::set_timestamps(true);

        log_version!();
        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled - showing per-bay decisions and device replies");
        }

        let mapping_path = config.mapping_path()?;
        let mapping = match BayMapping::load(&mapping_path) {
            Ok(mapping) => mapping,
            Err(e) => {
                log_error_exit!("Cannot load bay mapping: {e}");
                std::process::exit(EXIT_FAILURE);
            }
        };

        // Take the lock before anything starts talking to the network
        let lock = if self.create_lock {
            Some(instance::ensure_single_instance()?)
        } else {
            None
        };

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        config.log_config();
        log_indented!(
            "Mapped bays: {} (from {})",
            mapping.len(),
            private_path(&mapping_path)
        );

        let source: Arc<dyn BookingSource> = Arc::new(
            HttpBookingSource::new(config.api_root(), config.api_key(), config.http_timeout())
                .context("Failed to create booking API client")?,
        );
        let actuator: Arc<dyn BayActuator> = Arc::new(build_actuator(&config));
        let neighbors: Arc<dyn NeighborTable> = Arc::new(ArpCommand);

        // Nothing to reconcile against without a first directory
        let now = crate::time_source::now();
        let initial = directory::refresh(
            source.as_ref(),
            &mapping,
            neighbors.as_ref(),
            config.resolve_addresses(),
            now,
        );
        let (bay_directory, report) = match initial {
            Ok(result) => result,
            Err(e) => {
                log_error_exit!("Initial bay directory refresh failed: {e}");
                if let Some(lock) = lock {
                    lock.release();
                }
                std::process::exit(EXIT_FAILURE);
            }
        };

        log_block_start!("Bay directory ready: {} bays", bay_directory.len());
        if !report.unmapped.is_empty() {
            log_indented!(
                "Ignoring {} bays without a mapping entry: {}",
                report.unmapped.len(),
                report.unmapped.join(", ")
            );
        }

        if let Err(e) = config::start_mapping_watcher(
            &mapping_path,
            signal_state.signal_sender.clone(),
            self.debug_enabled,
        ) {
            log_pipe!();
            log_warning!("Mapping file watching unavailable: {e}");
            log_indented!("Use 'baywake reload' after editing the mapping");
        }

        let shared = Arc::new(SharedState::new(bay_directory, mapping, mapping_path, now));

        if lock.is_some() {
            log_block_start!("Lock acquired, starting reconciliation...");
        } else {
            log_block_start!("Starting reconciliation...");
        }

        let core = Core::new(CoreParams {
            config,
            signal_state,
            debug_enabled: self.debug_enabled,
            lock,
            source,
            actuator,
            neighbors,
            shared,
        });

        core.execute()
    }
}

/// The production actuator for a configuration.
fn build_actuator(config: &Config) -> NetworkActuator {
    NetworkActuator::new(
        WakeOnLan::new(config.wol_broadcast(), config.wol_port()),
        PjLinkClient::new(config.pjlink_options()),
        config.power_on_after_wake(),
    )
}
