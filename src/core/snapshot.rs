//! Shared snapshots of the bay directory, mapping table and committed bay states.
//!
//! Each snapshot is an `Arc` swapped whole under a short write lock. Readers
//! clone the `Arc` and never see a half-updated value. The reconciliation loop
//! is the only writer of the bay states; the refresh worker is the only writer
//! of the directory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::bays::{Bay, BayDirectory, BayMapping, BayState, MappingEntry};
use crate::error::Result;

/// Requests handled by the directory refresh worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Refresh now with the current mapping
    Refresh,
    /// Re-read the mapping file, then refresh
    ReloadMapping,
    Shutdown,
}

/// A bay whose actuation failed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActuationFailure {
    pub reference: String,
    pub action: String,
    pub kind: String,
    pub message: String,
}

/// Summary of the last committed reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub completed_at: DateTime<Utc>,
    pub bookings: usize,
    pub transitions: usize,
    pub failures: Vec<ActuationFailure>,
}

/// Health report for status tooling.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub bays: usize,
    pub mapped_bays: usize,
    pub directory_refreshed_at: DateTime<Utc>,
    pub last_refresh_error: Option<String>,
    pub last_cycle: Option<CycleSummary>,
    pub last_cycle_error: Option<String>,
}

/// Process-wide snapshot holder.
pub struct SharedState {
    directory: RwLock<Arc<BayDirectory>>,
    mapping: RwLock<Arc<BayMapping>>,
    states: RwLock<Arc<BayState>>,
    last_cycle: RwLock<Option<Arc<CycleSummary>>>,
    last_cycle_error: RwLock<Option<String>>,
    last_refresh_error: RwLock<Option<String>>,
    mapping_path: PathBuf,
    refresh_requests: Mutex<Option<Sender<RefreshRequest>>>,
    started_at: DateTime<Utc>,
}

// Poisoning only means another thread panicked mid-swap of an Arc; the value is still whole
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl SharedState {
    pub fn new(
        directory: BayDirectory,
        mapping: BayMapping,
        mapping_path: PathBuf,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            directory: RwLock::new(Arc::new(directory)),
            mapping: RwLock::new(Arc::new(mapping)),
            states: RwLock::new(Arc::new(BayState::new())),
            last_cycle: RwLock::new(None),
            last_cycle_error: RwLock::new(None),
            last_refresh_error: RwLock::new(None),
            mapping_path,
            refresh_requests: Mutex::new(None),
            started_at,
        }
    }

    /// Connect the refresh worker so `set_bays` can trigger an immediate refresh.
    pub fn attach_refresh_worker(&self, sender: Sender<RefreshRequest>) {
        *self
            .refresh_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(sender);
    }

    /// Ask the refresh worker to do something. Returns false if no worker is attached.
    pub fn request_refresh(&self, request: RefreshRequest) -> bool {
        let guard = self
            .refresh_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .is_some_and(|sender| sender.send(request).is_ok())
    }

    pub fn directory(&self) -> Arc<BayDirectory> {
        Arc::clone(&read(&self.directory))
    }

    pub fn swap_directory(&self, directory: BayDirectory) {
        *write(&self.directory) = Arc::new(directory);
        *write(&self.last_refresh_error) = None;
    }

    pub fn record_refresh_error(&self, message: String) {
        *write(&self.last_refresh_error) = Some(message);
    }

    pub fn mapping(&self) -> Arc<BayMapping> {
        Arc::clone(&read(&self.mapping))
    }

    pub fn swap_mapping(&self, mapping: BayMapping) {
        *write(&self.mapping) = Arc::new(mapping);
    }

    pub fn mapping_path(&self) -> &Path {
        &self.mapping_path
    }

    /// Last committed bay states.
    pub fn get_bay_states(&self) -> Arc<BayState> {
        Arc::clone(&read(&self.states))
    }

    /// Bays in the current directory.
    pub fn get_bays(&self) -> Vec<Bay> {
        self.directory().bays().to_vec()
    }

    /// Validate, persist and install a new mapping table, then ask for a refresh.
    ///
    /// The directory keeps its current contents until the refresh completes.
    pub fn set_bays(&self, entries: &[MappingEntry]) -> Result<Vec<MappingEntry>> {
        let mapping = BayMapping::from_entries(entries)?;
        mapping.save(&self.mapping_path)?;
        let saved = mapping.to_entries();
        self.swap_mapping(mapping);
        self.request_refresh(RefreshRequest::Refresh);
        Ok(saved)
    }

    /// Commit a cycle's computed states.
    pub fn commit(&self, states: BayState, summary: CycleSummary) {
        *write(&self.states) = Arc::new(states);
        *write(&self.last_cycle) = Some(Arc::new(summary));
        *write(&self.last_cycle_error) = None;
    }

    /// Record a skipped cycle. Committed states stay as they were.
    pub fn record_cycle_error(&self, message: String) {
        *write(&self.last_cycle_error) = Some(message);
    }

    pub fn last_cycle(&self) -> Option<Arc<CycleSummary>> {
        read(&self.last_cycle).clone()
    }

    pub fn health(&self) -> Health {
        let directory = self.directory();
        let degraded =
            read(&self.last_refresh_error).is_some() || read(&self.last_cycle_error).is_some();

        Health {
            status: if degraded { "degraded" } else { "ok" },
            version: env!("CARGO_PKG_VERSION"),
            started_at: self.started_at,
            bays: directory.len(),
            mapped_bays: self.mapping().len(),
            directory_refreshed_at: directory.refreshed_at(),
            last_refresh_error: read(&self.last_refresh_error).clone(),
            last_cycle: self.last_cycle().map(|summary| (*summary).clone()),
            last_cycle_error: read(&self.last_cycle_error).clone(),
        }
    }
}
