//! Small shared helpers: path privacy for logs, runtime directory lookup and
//! human-readable durations.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Replace the user's home directory prefix with `~` so logs don't leak usernames.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }
    path.display().to_string()
}

/// Per-user runtime directory for the lock file and IPC socket.
///
/// Prefers `XDG_RUNTIME_DIR`; falls back to `/tmp/baywake-<uid>` so two users on
/// the same host never share a socket.
pub fn runtime_dir() -> PathBuf {
    match std::env::var("XDG_RUNTIME_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(format!("/tmp/baywake-{}", nix::unistd::getuid())),
    }
}

/// Check if a process with the given PID is still alive.
pub fn is_process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Format a duration as `1h 5m`, `12m 3s` or `40s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(40)), "40s");
        assert_eq!(format_duration(Duration::from_secs(723)), "12m 3s");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1h 5m");
    }

    #[test]
    fn test_private_path_outside_home() {
        assert_eq!(private_path(Path::new("/etc/baywake")), "/etc/baywake");
    }
}
