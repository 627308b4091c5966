//! Unix signal handling for the daemon.
//!
//! Signals are turned into [`SignalMessage`]s on a channel the main loop
//! already waits on, so a shutdown or reload request interrupts the wait
//! between reconciliation cycles instead of being noticed a minute later.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender},
    thread,
};

/// Messages delivered to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Re-read the bay mapping and refresh the directory (SIGUSR2, file watcher)
    Reload,
    /// Stop after the current cycle (SIGTERM, SIGINT)
    Shutdown,
}

/// Signal handling state shared between threads
pub struct SignalState {
    /// Cleared once a shutdown has been requested
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Kept so the file watcher can feed the same channel
    pub signal_sender: Sender<SignalMessage>,
}

impl SignalState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Register the handlers and spawn the thread that forwards them.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = std::sync::mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = Arc::clone(&running);
    let sender = signal_sender.clone();

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                match sig {
                    SIGUSR2 => {
                        if sender.send(SignalMessage::Reload).is_err() {
                            break;
                        }
                        log_pipe!();
                        log_info!("Received reload signal");
                    }
                    SIGHUP => {
                        // No terminal left to report to
                        running_clone.store(false, Ordering::SeqCst);
                        std::process::exit(0);
                    }
                    _ => {
                        log_pipe!();
                        if sig == SIGINT && debug_enabled {
                            log_info!("Received SIGINT (Ctrl+C), shutting down...");
                        } else if sig == SIGINT {
                            log_info!("Received interrupt signal, shutting down...");
                        } else {
                            log_info!("Received termination request, shutting down...");
                        }

                        running_clone.store(false, Ordering::SeqCst);
                        if sender.send(SignalMessage::Shutdown).is_err() {
                            // Main loop is already gone
                            break;
                        }
                    }
                }
            }
        })
        .context("failed to spawn signal thread")?;

    Ok(SignalState {
        running,
        signal_receiver,
        signal_sender,
    })
}
