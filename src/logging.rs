//! File logging. The terminal belongs to the TUI, so nothing is written
//! to stdout or stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `repcount=debug`
pub const LOG_ENV: &str = "REPCOUNT_LOG";
const DEFAULT_FILTER: &str = "repcount=info";

/// Default log file: the platform state dir where there is one (Linux),
/// the local data dir otherwise.
pub fn default_log_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "repcount")?;
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Some(dir.join("repcount.log"))
}

/// Install the global subscriber writing to `path` (or the default state
/// dir). Returns the file in use, or `None` when logging is off because
/// the file could not be opened.
pub fn init(path: Option<&Path>) -> Option<PathBuf> {
    let path = path.map(Path::to_path_buf).or_else(default_log_path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .ok()?;

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_file_is_named_for_the_app() {
        if let Some(path) = default_log_path() {
            assert_eq!(path.file_name().unwrap(), "repcount.log");
            assert!(path.to_string_lossy().contains("repcount"));
        }
    }
}
