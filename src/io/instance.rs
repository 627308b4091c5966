//! High-level instance management for baywake processes.
//!
//! Builds on the lock primitives in `io::lock`: finding the running daemon,
//! signalling it, and refusing to start a second one.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::common::utils;
use crate::io::lock::{self, LockFile};

/// Information about a running baywake daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub pid: u32,
    /// Custom config directory if set
    pub config_dir: Option<PathBuf>,
}

impl InstanceInfo {
    /// The current process.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            config_dir: crate::config::get_custom_config_dir(),
        }
    }

    /// Parse instance info from lock file contents.
    ///
    /// Line 1 is the PID, line 2 the config directory (empty for the default).
    pub fn from_lock_contents(contents: &str) -> Result<Self> {
        let lines: Vec<&str> = contents.trim_end_matches('\n').lines().collect();

        if lines.is_empty() || lines[0].trim().is_empty() {
            anyhow::bail!("Lock file is empty");
        }
        if lines.len() > 2 {
            anyhow::bail!("Invalid lock file format (expected 1-2 lines)");
        }

        let pid = lines[0]
            .trim()
            .parse::<u32>()
            .context("Invalid PID format in lock file")?;

        let config_dir = lines
            .get(1)
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(PathBuf::from);

        Ok(Self { pid, config_dir })
    }

    pub fn to_lock_contents(&self) -> String {
        match &self.config_dir {
            Some(dir) => format!("{}\n{}\n", self.pid, dir.display()),
            None => format!("{}\n\n", self.pid),
        }
    }
}

/// Get the running daemon, if any.
///
/// Restores the daemon's custom config directory for this process so commands
/// like `reload` and `set-bays` act on the same files.
pub fn get_running_instance() -> Result<Option<InstanceInfo>> {
    read_instance(&lock::get_main_lock_path())
}

fn read_instance(lock_path: &Path) -> Result<Option<InstanceInfo>> {
    let contents = match std::fs::read_to_string(lock_path) {
        Ok(contents) => contents,
        Err(_) => return Ok(None),
    };

    let info = InstanceInfo::from_lock_contents(&contents)?;

    if let Some(ref dir) = info.config_dir {
        // Already set when the user passed --config; theirs wins
        let _ = crate::config::set_config_dir(Some(dir.display().to_string()));
    }

    if is_instance_running(info.pid) {
        Ok(Some(info))
    } else {
        Ok(None)
    }
}

/// Get just the PID of the running daemon.
pub fn get_running_instance_pid() -> Result<u32> {
    get_running_instance()?
        .map(|info| info.pid)
        .ok_or_else(|| anyhow::anyhow!("No baywake instance running"))
}

pub fn is_instance_running(pid: u32) -> bool {
    utils::is_process_running(pid)
}

/// Ask a daemon to shut down gracefully (SIGTERM).
pub fn terminate_instance(pid: u32) -> Result<()> {
    send_signal(pid, nix::sys::signal::Signal::SIGTERM)
        .map_err(|e| anyhow::anyhow!("Failed to send SIGTERM to process: {}", e))
}

/// Ask a daemon to reload its bay mapping (SIGUSR2).
pub fn send_reload_signal(pid: u32) -> Result<()> {
    send_signal(pid, nix::sys::signal::Signal::SIGUSR2)
        .map_err(|e| anyhow::anyhow!("Failed to send reload signal: {}", e))
}

fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> nix::Result<()> {
    use nix::unistd::Pid;
    let pid = i32::try_from(pid).map_err(|_| nix::errno::Errno::ESRCH)?;
    nix::sys::signal::kill(Pid::from_raw(pid), signal)
}

/// Take the daemon lock or exit explaining who holds it.
///
/// Stale and malformed lock files are removed and the lock is retried once.
pub fn ensure_single_instance() -> Result<LockFile> {
    let lock_path = lock::get_main_lock_path();

    if let Some(lock) = acquire_and_record(&lock_path)? {
        return Ok(lock);
    }

    handle_instance_conflict(&lock_path)?;

    acquire_and_record(&lock_path)?
        .ok_or_else(|| anyhow::anyhow!("Failed to acquire lock after conflict resolution"))
}

fn acquire_and_record(lock_path: &Path) -> Result<Option<LockFile>> {
    match LockFile::try_acquire(lock_path)? {
        Some(mut lock) => {
            lock.write(&InstanceInfo::current().to_lock_contents())?;
            Ok(Some(lock))
        }
        None => Ok(None),
    }
}

/// Resolve a held lock.
///
/// Returns `Ok(())` when the lock turned out to be stale. Exits the process
/// when a live daemon holds it.
pub fn handle_instance_conflict(lock_path: &Path) -> Result<()> {
    let contents = match std::fs::read_to_string(lock_path) {
        Ok(contents) => contents,
        Err(_) => return Ok(()),
    };

    let info = match InstanceInfo::from_lock_contents(&contents) {
        Ok(info) => info,
        Err(_) => {
            log_warning!("Lock file format invalid, removing");
            let _ = std::fs::remove_file(lock_path);
            return Ok(());
        }
    };

    if !is_instance_running(info.pid) {
        log_warning!(
            "Removing stale lock file (process {} no longer running)",
            info.pid
        );
        let _ = std::fs::remove_file(lock_path);
        return Ok(());
    }

    log_pipe!();
    log_error!("baywake is already running (PID: {})", info.pid);
    log_block_start!("Did you mean to:");
    log_indented!("• Check the daemon: baywake status");
    log_indented!("• Reload the bay mapping: baywake reload");
    log_indented!("• Stop it: baywake stop");
    log_block_start!("Cannot start - another baywake instance is running");
    log_end!();
    std::process::exit(crate::common::constants::EXIT_FAILURE)
}
