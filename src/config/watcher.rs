//! Bay mapping file watcher.
//!
//! Edits to the mapping file turn into [`SignalMessage::Reload`] on the main
//! loop's channel, the same message SIGUSR2 produces.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::Path;
use std::sync::mpsc::{RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Quiet period after the last change before a reload is sent.
/// Editors and atomic saves produce several events per write.
const DEBOUNCE_MS: u64 = 500;

/// Start watching the mapping file.
///
/// The parent directory is watched non-recursively so replacements by rename
/// (editors, our own atomic save) are seen.
pub fn start_mapping_watcher(
    mapping_path: &Path,
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
) -> Result<()> {
    let watched = mapping_path.to_path_buf();
    let Some(parent) = watched.parent().map(Path::to_path_buf) else {
        anyhow::bail!(
            "Cannot watch {}: no parent directory",
            private_path(&watched)
        );
    };

    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res
                && matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                )
            {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(&parent, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;

    if debug_enabled {
        log_pipe!();
        log_debug!("Watching bay mapping: {}", private_path(&watched));
    }

    thread::Builder::new()
        .name("mapping-watcher".to_string())
        .spawn(move || {
            // Dropping the watcher stops event delivery
            let _watcher = watcher;

            while let Ok(event) = rx.recv() {
                if !affects_mapping(&event, &watched) {
                    continue;
                }

                // Wait for the writes to settle
                loop {
                    match rx.recv_timeout(Duration::from_millis(DEBOUNCE_MS)) {
                        Ok(_) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }

                if debug_enabled {
                    log_pipe!();
                    log_debug!("Bay mapping file changed");
                }

                if signal_sender.send(SignalMessage::Reload).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn mapping watcher thread")?;

    Ok(())
}

fn affects_mapping(event: &Event, watched: &Path) -> bool {
    event.paths.iter().any(|path| is_mapping_path(path, watched))
}

/// The mapping file itself, or an editor's backup/swap copy of it.
fn is_mapping_path(path: &Path, watched: &Path) -> bool {
    if path == watched {
        return true;
    }
    match (path.file_name(), watched.file_name()) {
        (Some(name), Some(watched_name)) => {
            path.parent() == watched.parent()
                && name
                    .to_string_lossy()
                    .starts_with(watched_name.to_string_lossy().as_ref())
        }
        _ => false,
    }
}
