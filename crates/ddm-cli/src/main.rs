mod cli;

use clap::{CommandFactory, Parser};
use cli::Cli;
use ddm_core::cancel::{self, CancelToken};
use ddm_core::config::{self, RunConfig};
use ddm_core::cookie_jar::CookieJar;
use ddm_core::error::DdmError;
use ddm_core::logging;
use ddm_core::orchestrator::{self, RunRequest, StartMode};
use std::io::{self, BufRead, Write};

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.generate_completions {
        clap_complete::generate(shell, &mut Cli::command(), "ddm", &mut io::stdout());
        return;
    }
    if cli.generate_man {
        let man = clap_mangen::Man::new(Cli::command());
        let _ = man.render(&mut io::stdout());
        return;
    }

    logging::init(cli.debug);

    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("ddm: {err:#}");
            err.exit_code()
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), DdmError> {
    let defaults = config::load_or_init().map_err(DdmError::Unexpected)?;
    tracing::debug!("loaded config: {:?}", defaults);

    let header_map = cli.header_map().map_err(DdmError::Unexpected)?;
    let credentials = cli.credentials().map_err(DdmError::Unexpected)?;
    let user_agent = cli
        .user_agent
        .clone()
        .unwrap_or_else(|| defaults.default_user_agent.clone());

    let mut run_config = RunConfig {
        parts: cli.parts.unwrap_or(defaults.default_parts),
        max_retry: cli.max_retry.unwrap_or(defaults.default_max_retry),
        base_timeout: cli.base_timeout(defaults.default_timeout_secs),
        user_agent: user_agent.clone(),
        headers: header_map,
        credentials,
        quiet: cli.quiet,
        debug: cli.debug,
        no_check_cert: cli.no_check_cert,
    };

    let cancel = CancelToken::new();
    cancel::install_signal_handler(cancel.clone())
        .map_err(|e| DdmError::Unexpected(anyhow::anyhow!(e)))?;
    let cookie_jar = CookieJar::new();
    let work_dir = std::env::current_dir().map_err(|e| DdmError::Unexpected(e.into()))?;

    let start = if let Some(sidecar) = &cli.continue_sidecar {
        StartMode::Continue(sidecar.clone())
    } else if cli.best_mirror {
        let text = cli.mirror_candidates_text().map_err(DdmError::Unexpected)?;
        StartMode::BestMirror(text)
    } else {
        StartMode::Url(cli.single_url().map_err(|e| DdmError::Usage(e.to_string()))?)
    };

    let request = RunRequest {
        start,
        output_name: cli.output.clone(),
        user_agent_profile: user_agent,
        confirm_overwrite: Box::new(confirm_overwrite),
    };

    orchestrator::run(request, &mut run_config, &work_dir, &cookie_jar, &cancel)
}

fn confirm_overwrite() -> bool {
    eprint!("output file already exists, overwrite? [y/N] ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
