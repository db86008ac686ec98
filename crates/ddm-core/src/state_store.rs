//! Load/save of the session descriptor to its sidecar file.
//!
//! Write is write-then-rename so a crash mid-write never leaves a truncated
//! or partially-overwritten sidecar behind (the teacher's `config.rs` writes
//! its TOML file directly; this uses the stronger pattern spec'd for the
//! session sidecar since losing it means losing resumability).

use crate::session::Session;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load a `Session` previously saved at `path`.
pub fn load(path: &Path) -> Result<Session> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading session sidecar {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing session sidecar {}", path.display()))
}

/// Pretty-print and write `session` to `path`, replacing any existing file.
///
/// Writes to `<path>.tmp` in the same directory then renames over `path` so
/// a reader never observes a partial write.
pub fn save(session: &Session, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(session).context("serializing session")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, body)
        .with_context(|| format!("writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))?;
    Ok(())
}

/// Remove the sidecar file; missing file is not an error.
pub fn delete(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
