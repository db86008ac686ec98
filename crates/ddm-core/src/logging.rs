//! Logging init: stderr always; additionally a file under the XDG state dir
//! when `--debug` is set, mirroring the teacher's `init_logging`/
//! `init_logging_stderr` fallback pair but composed as two layers on one
//! subscriber instead of two mutually exclusive subscribers, since the
//! debug case needs both writers at once.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ddm=debug"))
}

fn debug_log_path() -> anyhow::Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ddm")?;
    Ok(xdg_dirs.get_state_home().join("ddm").join("ddm.log"))
}

fn open_debug_log_file() -> anyhow::Result<fs::File> {
    let path = debug_log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initializes logging for the run: stderr always, plus a file under
/// `~/.local/state/ddm/ddm.log` when `debug` is set. If the log file can't
/// be opened (e.g. an unwritable state dir), falls back to stderr-only
/// rather than failing the whole CLI over a logging directory permission
/// error.
pub fn init(debug: bool) {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_ansi(false);
    let registry = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer);

    if !debug {
        registry.init();
        return;
    }

    match open_debug_log_file() {
        Ok(file) => {
            let file_layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            registry.with(file_layer).init();
            if let Ok(path) = debug_log_path() {
                tracing::info!("debug logging also writing to {}", path.display());
            }
        }
        Err(e) => {
            registry.init();
            tracing::warn!("could not open debug log file, logging to stderr only: {e}");
        }
    }
}
