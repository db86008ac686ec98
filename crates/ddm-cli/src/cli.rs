//! CLI surface for the DDM download manager: a single flat command, matching
//! the flag table this tool commits to (no subcommands).

use anyhow::{bail, Context, Result};
use clap::Parser;
use ddm_core::config::Credentials;
use ddm_core::session::HeaderMap;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "ddm", version, about = "Segmented HTTP download manager", long_about = None)]
pub struct Cli {
    /// URL to download; with --best-mirror, one or more files holding
    /// candidate URLs (falls back to stdin if none given).
    pub targets: Vec<String>,

    /// Desired part count; 0 disables part planning. Defaults to the
    /// persisted config's `default_parts` when omitted.
    #[arg(short = 'p', long = "parts")]
    pub parts: Option<usize>,

    /// Max retries per part. Defaults to the persisted config's
    /// `default_max_retry` when omitted.
    #[arg(short = 'r', long = "max-retry")]
    pub max_retry: Option<u32>,

    /// Base per-attempt timeout, seconds. Defaults to the persisted config's
    /// `default_timeout_secs` when omitted.
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// Override output filename.
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Resume from a session sidecar.
    #[arg(short = 'c', long = "continue", value_name = "state.json")]
    pub continue_sidecar: Option<PathBuf>,

    /// Canned User-Agent profile. Defaults to the persisted config's
    /// `default_user_agent` when omitted.
    #[arg(short = 'a', long = "user-agent")]
    pub user_agent: Option<String>,

    /// Read candidate URLs from positional files or stdin and race them.
    #[arg(short = 'b', long = "best-mirror")]
    pub best_mirror: bool,

    /// Suppress progress UI.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// HTTP basic auth user (prompts for password if not given).
    #[arg(short = 'u', long = "username")]
    pub username: Option<String>,

    /// HTTP basic auth password.
    #[arg(long = "password")]
    pub password: Option<String>,

    /// Repeatable arbitrary header, "key:value".
    #[arg(short = 'H', long = "header", value_name = "key:value")]
    pub header: Vec<String>,

    /// Disable TLS verification.
    #[arg(long = "no-check-cert")]
    pub no_check_cert: bool,

    /// Verbose diagnostic log to stderr.
    #[arg(long = "debug")]
    pub debug: bool,

    /// Emit a shell completion script to stdout and exit.
    #[arg(long = "generate-completions", value_name = "shell", hide = true)]
    pub generate_completions: Option<clap_complete::Shell>,

    /// Emit a man page to stdout and exit.
    #[arg(long = "generate-man", hide = true)]
    pub generate_man: bool,
}

impl Cli {
    /// Parses every `-H key:value` flag into a `HeaderMap`, plus
    /// `Authorization` if username/password were given.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for raw in &self.header {
            let (name, value) = raw
                .split_once(':')
                .with_context(|| format!("malformed header, expected key:value: {raw}"))?;
            headers.set(name.trim(), value.trim());
        }
        Ok(headers)
    }

    /// Resolves basic-auth credentials, prompting on stdin for the password
    /// if a username was given without one.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        let Some(username) = &self.username else {
            return Ok(None);
        };
        let password = match &self.password {
            Some(p) => p.clone(),
            None => prompt_password(username)?,
        };
        Ok(Some(Credentials {
            username: username.clone(),
            password,
        }))
    }

    pub fn base_timeout(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(default_secs))
    }

    /// Reads the raw mirror-candidate text: concatenates every positional
    /// file given, or reads stdin if none were given.
    pub fn mirror_candidates_text(&self) -> Result<String> {
        if self.targets.is_empty() {
            let mut buf = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut buf)
                .context("reading candidate URLs from stdin")?;
            return Ok(buf);
        }
        let mut combined = String::new();
        for path in &self.targets {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading candidate file {path}"))?;
            combined.push_str(&text);
            combined.push('\n');
        }
        Ok(combined)
    }

    /// Validates the positional-argument shape for a plain (non-mirror,
    /// non-resume) run: exactly one URL.
    pub fn single_url(&self) -> Result<String> {
        match self.targets.as_slice() {
            [url] => Ok(url.clone()),
            [] => bail!("a URL is required unless --continue or --best-mirror is given"),
            _ => bail!("only one URL may be given"),
        }
    }
}

fn prompt_password(username: &str) -> Result<String> {
    eprint!("password for {username}: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
