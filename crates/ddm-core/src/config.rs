//! Config & Headers: persisted defaults plus the frozen, resolved settings
//! for a single run.

use crate::session::HeaderMap;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration loaded from `~/.config/ddm/config.toml`. Supplies
/// defaults for any CLI flag the user didn't pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdmConfig {
    /// Default desired part count (`-p/--parts`).
    pub default_parts: usize,
    /// Default max retries per part (`-r/--max-retry`).
    pub default_max_retry: u32,
    /// Default base per-attempt timeout, seconds (`-t/--timeout`).
    pub default_timeout_secs: u64,
    /// Default canned User-Agent profile (`-a/--user-agent`).
    pub default_user_agent: String,
}

impl Default for DdmConfig {
    fn default() -> Self {
        Self {
            default_parts: 2,
            default_max_retry: 10,
            default_timeout_secs: 15,
            default_user_agent: "chrome".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ddm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// HTTP basic auth credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The frozen, immutable view of resolved settings for one run: CLI flags
/// layered over `DdmConfig` defaults. Built once by the CLI layer and passed
/// by reference into the orchestrator.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub parts: usize,
    pub max_retry: u32,
    pub base_timeout: Duration,
    /// Canned profile name (`chrome`/`firefox`/`safari`), not the resolved
    /// string — resolve via `crate::user_agent::canned` where the literal
    /// header value is needed.
    pub user_agent: String,
    pub headers: HeaderMap,
    pub credentials: Option<Credentials>,
    pub quiet: bool,
    pub debug: bool,
    pub no_check_cert: bool,
}
