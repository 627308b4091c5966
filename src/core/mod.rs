//! Core daemon logic.
//!
//! [`Core`] owns the running daemon: it spawns the directory refresh worker
//! and the IPC server, then drives the reconciliation loop on the main thread
//! until a shutdown signal arrives.
//!
//! - `activation`: pure activation-window math
//! - `diff`: committed vs computed state comparison
//! - `reconcile`: one fetch/compute/actuate/commit cycle
//! - `refresh`: background bay directory refresh
//! - `snapshot`: shared snapshots read by IPC and written by the loops

pub mod activation;
pub mod diff;
pub mod reconcile;
pub mod refresh;
pub mod snapshot;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::{
    booking::BookingSource,
    common::utils,
    config::{self, Config},
    core::{
        reconcile::{CycleOutcome, ReconcileSettings, run_cycle},
        refresh::RefreshWorker,
        snapshot::{RefreshRequest, SharedState},
    },
    device::{BayActuator, NeighborTable},
    io::{
        lock::LockFile,
        signals::{SignalMessage, SignalState},
    },
    ipc::{IpcServer, socket_path},
};

/// Everything a [`Core`] needs, bundled to keep `new` readable.
pub(crate) struct CoreParams {
    pub config: Config,
    pub signal_state: SignalState,
    pub debug_enabled: bool,
    pub lock: Option<LockFile>,
    pub source: Arc<dyn BookingSource>,
    pub actuator: Arc<dyn BayActuator>,
    pub neighbors: Arc<dyn NeighborTable>,
    pub shared: Arc<SharedState>,
}

pub(crate) struct Core {
    config: Config,
    signal_state: SignalState,
    debug_enabled: bool,
    lock: Option<LockFile>,
    source: Arc<dyn BookingSource>,
    actuator: Arc<dyn BayActuator>,
    neighbors: Arc<dyn NeighborTable>,
    shared: Arc<SharedState>,
    settings: ReconcileSettings,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        let settings = params.config.reconcile_settings(params.debug_enabled);
        Self {
            config: params.config,
            signal_state: params.signal_state,
            debug_enabled: params.debug_enabled,
            lock: params.lock,
            source: params.source,
            actuator: params.actuator,
            neighbors: params.neighbors,
            shared: params.shared,
            settings,
        }
    }

    /// Run the daemon until shutdown.
    pub fn execute(mut self) -> Result<()> {
        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!("Base directory: {}", utils::private_path(&custom_dir));
        }

        let refresh_handle = self.spawn_refresh_worker()?;
        let ipc_handle = self.spawn_ipc_server();

        self.main_loop();

        // Stop the helpers before releasing the lock
        self.signal_state.running.store(false, Ordering::SeqCst);
        self.shared.request_refresh(RefreshRequest::Shutdown);
        if refresh_handle.join().is_err() {
            log_warning!("Directory refresh thread panicked");
        }
        if let Some(handle) = ipc_handle
            && handle.join().is_err()
        {
            log_warning!("IPC thread panicked");
        }

        if let Some(lock) = self.lock.take() {
            lock.release();
        }

        log_block_start!("Shut down cleanly");
        log_end!();
        Ok(())
    }

    fn spawn_refresh_worker(&self) -> Result<JoinHandle<()>> {
        let (sender, receiver) = std::sync::mpsc::channel();
        self.shared.attach_refresh_worker(sender);

        let worker = RefreshWorker {
            source: Arc::clone(&self.source),
            neighbors: Arc::clone(&self.neighbors),
            shared: Arc::clone(&self.shared),
            resolve_addresses: self.config.resolve_addresses(),
            interval: self.config.bay_fetch_interval(),
            debug_enabled: self.debug_enabled,
        };

        thread::Builder::new()
            .name("directory-refresh".to_string())
            .spawn(move || worker.run(receiver))
            .context("Failed to spawn directory refresh thread")
    }

    /// The daemon keeps running without IPC if the socket cannot be bound.
    fn spawn_ipc_server(&self) -> Option<JoinHandle<()>> {
        let server = match IpcServer::bind(socket_path()) {
            Ok(server) => server,
            Err(e) => {
                log_pipe!();
                log_warning!("IPC disabled: {e:#}");
                return None;
            }
        };

        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.signal_state.running);
        let debug_enabled = self.debug_enabled;

        match thread::Builder::new()
            .name("ipc".to_string())
            .spawn(move || server.run(shared, running, debug_enabled))
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                log_pipe!();
                log_warning!("IPC disabled: failed to spawn thread: {e}");
                None
            }
        }
    }

    /// Fixed-rate reconciliation. The first cycle runs immediately.
    ///
    /// A cycle that overruns its interval starts the next one right away
    /// instead of queueing the missed ticks.
    fn main_loop(&self) {
        let interval = self.config.booking_fetch_interval();
        let mut next_due = Instant::now();

        while self.signal_state.is_running() {
            let outcome = run_cycle(
                self.source.as_ref(),
                self.actuator.as_ref(),
                &self.shared,
                &self.settings,
                crate::time_source::now(),
            );
            if self.debug_enabled
                && let CycleOutcome::Committed(ref summary) = outcome
            {
                log_debug!(
                    "Cycle committed: {} bookings, {} transitions, {} failures",
                    summary.bookings,
                    summary.transitions,
                    summary.failures.len()
                );
            }

            next_due += interval;
            let now = Instant::now();
            if next_due < now {
                next_due = now;
            }

            if !self.wait_until(next_due) {
                break;
            }
        }
    }

    /// Wait for the next tick while serving signal messages.
    ///
    /// Returns false when the daemon should stop.
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining == Duration::ZERO {
                return self.signal_state.is_running();
            }

            match self.signal_state.signal_receiver.recv_timeout(remaining) {
                Ok(SignalMessage::Shutdown) => return false,
                Ok(SignalMessage::Reload) => {
                    self.shared.request_refresh(RefreshRequest::ReloadMapping);
                }
                Err(RecvTimeoutError::Timeout) => return self.signal_state.is_running(),
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}
