//! Background bay directory refresh.
//!
//! The worker refreshes on its own timer and on request (`set_bays`, SIGUSR2,
//! mapping file edits). A failed refresh logs and keeps the directory that is
//! already in use.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::bays::BayMapping;
use crate::bays::directory::refresh;
use crate::booking::BookingSource;
use crate::common::utils::private_path;
use crate::core::snapshot::{RefreshRequest, SharedState};
use crate::device::NeighborTable;

pub struct RefreshWorker {
    pub source: Arc<dyn BookingSource>,
    pub neighbors: Arc<dyn NeighborTable>,
    pub shared: Arc<SharedState>,
    pub resolve_addresses: bool,
    pub interval: Duration,
    pub debug_enabled: bool,
}

impl RefreshWorker {
    /// Serve requests until [`RefreshRequest::Shutdown`] or the channel closes.
    pub fn run(self, requests: Receiver<RefreshRequest>) {
        loop {
            match requests.recv_timeout(self.interval) {
                Ok(RefreshRequest::Refresh) | Err(RecvTimeoutError::Timeout) => {
                    self.refresh_directory();
                }
                Ok(RefreshRequest::ReloadMapping) => {
                    if self.reload_mapping() {
                        self.refresh_directory();
                    }
                }
                Ok(RefreshRequest::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Rebuild the directory from the current mapping.
    ///
    /// Returns whether the new directory was installed.
    pub fn refresh_directory(&self) -> bool {
        let mapping = self.shared.mapping();
        let result = refresh(
            self.source.as_ref(),
            &mapping,
            self.neighbors.as_ref(),
            self.resolve_addresses,
            crate::time_source::now(),
        );

        match result {
            Ok((directory, report)) => {
                log_pipe!();
                log_decorated!("Bay directory refreshed: {} bays", directory.len());
                if self.debug_enabled {
                    for bay in directory.bays() {
                        log_indented!(
                            "{} → {} ({})",
                            bay.reference,
                            bay.hardware_address,
                            bay.network_address
                                .map(|ip| ip.to_string())
                                .unwrap_or_else(|| "no ip".to_string())
                        );
                    }
                    if !report.unmapped.is_empty() {
                        log_indented!("Not in the mapping: {}", report.unmapped.join(", "));
                    }
                }
                self.shared.swap_directory(directory);
                true
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to refresh bay directory: {e}");
                log_indented!(
                    "Keeping existing data ({} bays)",
                    self.shared.directory().len()
                );
                self.shared.record_refresh_error(e.to_string());
                false
            }
        }
    }

    /// Re-read the mapping file. Returns whether the mapping changed.
    pub fn reload_mapping(&self) -> bool {
        let path = self.shared.mapping_path();
        match BayMapping::load(path) {
            Ok(mapping) if mapping == *self.shared.mapping() => {
                if self.debug_enabled {
                    log_pipe!();
                    log_debug!("Bay mapping unchanged, skipping refresh");
                }
                false
            }
            Ok(mapping) => {
                log_pipe!();
                log_info!(
                    "Reloaded bay mapping from {} ({} bays)",
                    private_path(path),
                    mapping.len()
                );
                self.shared.swap_mapping(mapping);
                true
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to reload bay mapping: {e}");
                log_indented!("Keeping the previous mapping");
                false
            }
        }
    }
}
