use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Logs go to a file: stdout carries the launcher protocol and the terminal
/// UI owns the screen.
pub fn init(log_file: Option<&Path>) -> Result<PathBuf, io::Error> {
    let path = log_file
        .map(Path::to_path_buf)
        .or_else(default_log_path)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Cache directory not found"))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| io::Error::other(err.to_string()))?;

    Ok(path)
}

fn default_log_path() -> Option<PathBuf> {
    let mut path = dirs::cache_dir()?;
    path.push("togglaunch");
    path.push("togglaunch.log");
    Some(path)
}
