//! Orchestrator: wires Resolver → Planner → Worker fan-out → Assembler, and
//! handles the resume-vs-fresh startup decision.

use crate::assembler;
use crate::cancel::CancelToken;
use crate::config::RunConfig;
use crate::cookie_jar::CookieJar;
use crate::error::{DdmError, ExpectedKind};
use crate::mirror;
use crate::part_worker::{self, WorkerContext};
use crate::resolver;
use crate::segmenter;
use crate::session::Session;
use crate::state_store;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::thread;

/// How the run was started, per spec.md §4.7's startup decision table.
pub enum StartMode {
    /// `--continue <sidecar>`.
    Continue(PathBuf),
    /// `--best-mirror`, with the raw candidate-list text already read from
    /// the given files or stdin.
    BestMirror(String),
    /// A plain positional URL.
    Url(String),
}

pub struct RunRequest {
    pub start: StartMode,
    pub output_name: Option<String>,
    /// Profile name (`chrome`/`firefox`/`safari`) injected if HeaderMap lacks
    /// a User-Agent.
    pub user_agent_profile: String,
    /// Callback invoked before an interactive overwrite decision; returns
    /// true to proceed (delete part files), false to abort. Kept as an
    /// injected closure so this component stays testable without a real
    /// terminal — the prompt text itself is a CLI concern.
    pub confirm_overwrite: Box<dyn Fn() -> bool>,
}

/// Runs one full download: resolves or loads a Session, fans out workers for
/// every not-done Part, and assembles on success.
///
/// `work_dir` is where the part files, output file, and sidecar live.
pub fn run(
    request: RunRequest,
    run_config: &mut RunConfig,
    work_dir: &Path,
    cookie_jar: &CookieJar,
    cancel: &CancelToken,
) -> Result<(), DdmError> {
    // The user-typed entry URL, preserved across redirects so a sidecar saved
    // on a non-success path replays the same entry point (spec.md §4.7)
    // rather than whatever `resolver::resolve` followed it to.
    let entry_url;
    let (mut session, resumed) = match request.start {
        StartMode::Continue(sidecar_path) => {
            let loaded = state_store::load(&sidecar_path).map_err(DdmError::Unexpected)?;
            run_config.headers = loaded.header_map.clone();
            resolver::ensure_user_agent(&mut run_config.headers, &request.user_agent_profile);

            let user_url = loaded.location.clone();
            entry_url = user_url.clone();
            let fresh = resolver::resolve(
                &user_url,
                run_config,
                Some(loaded.suggested_file_name.as_str()),
                cookie_jar,
                cancel,
            )?;

            if fresh.content_md5 != loaded.content_md5 || fresh.content_length != loaded.content_length {
                return Err(DdmError::Expected(ExpectedKind::ResumeMismatch {
                    reason: "server content changed since the session was saved".to_string(),
                }));
            }

            let mut resumed_session = fresh;
            resumed_session.parts = loaded.parts;
            (resumed_session, true)
        }
        StartMode::BestMirror(candidates_text) => {
            resolver::ensure_user_agent(&mut run_config.headers, &request.user_agent_profile);
            let candidates = mirror::parse_candidates(&candidates_text);
            let winner = mirror::select(&candidates, run_config, cookie_jar, cancel)?;
            entry_url = winner.clone();
            let session = resolver::resolve(
                &winner,
                run_config,
                request.output_name.as_deref(),
                cookie_jar,
                cancel,
            )?;
            (session, false)
        }
        StartMode::Url(url) => {
            resolver::ensure_user_agent(&mut run_config.headers, &request.user_agent_profile);
            entry_url = url.clone();
            let session = resolver::resolve(
                &url,
                run_config,
                request.output_name.as_deref(),
                cookie_jar,
                cancel,
            )?;
            (session, false)
        }
    };

    if !resumed {
        let output_path = work_dir.join(&session.suggested_file_name);
        if output_path.exists() {
            if !(request.confirm_overwrite)() {
                return Err(DdmError::Expected(ExpectedKind::Canceled));
            }
            for i in 0..session.parts.len().max(run_config.parts).max(1) {
                let _ = std::fs::remove_file(work_dir.join(format!("{}.part{i}", session.suggested_file_name)));
            }
        }
        session.parts = segmenter::plan_parts(
            session.content_length,
            &session.accept_ranges,
            run_config.parts,
            &session.suggested_file_name,
        );
    }

    let attempt_counter = AtomicU64::new(0);
    let run_outcome = fan_out_workers(&mut session, run_config, work_dir, cookie_jar, cancel, &attempt_counter);

    match run_outcome {
        Ok(()) if session.transfer_complete() => {
            assembler::assemble(&session, work_dir).map_err(DdmError::Unexpected)?;
            Ok(())
        }
        Ok(()) => {
            session.location = entry_url;
            persist(&session, work_dir)?;
            Err(DdmError::Expected(ExpectedKind::Other(
                "transfer incomplete".to_string(),
            )))
        }
        Err(stop) => {
            session.location = entry_url;
            persist(&session, work_dir)?;
            Err(stop)
        }
    }
}

fn persist(session: &Session, work_dir: &Path) -> Result<(), DdmError> {
    let sidecar_path = work_dir.join(session.sidecar_path());
    state_store::save(session, &sidecar_path).map_err(DdmError::Unexpected)
}

fn fan_out_workers(
    session: &mut Session,
    run_config: &RunConfig,
    work_dir: &Path,
    cookie_jar: &CookieJar,
    cancel: &CancelToken,
    attempt_counter: &AtomicU64,
) -> Result<(), DdmError> {
    let url = session.location.clone();
    let header_map = session.header_map.clone();
    let credentials = run_config.credentials.as_ref();

    let outcome = thread::scope(|scope| -> Option<DdmError> {
        let mut handles = Vec::new();
        for (index, part) in session.parts.iter_mut().enumerate() {
            if part.is_done() {
                continue;
            }
            let ctx = WorkerContext {
                url: &url,
                part_index: index,
                header_map: &header_map,
                credentials,
                cookie_jar,
                cancel,
                base_timeout: run_config.base_timeout,
                max_retry: run_config.max_retry,
                no_check_cert: run_config.no_check_cert,
                dir: work_dir,
                attempt_counter,
            };
            handles.push(scope.spawn(move || part_worker::run_part(part, &ctx)));
        }

        let mut first_error = None;
        for handle in handles {
            if let Err(stop) = handle.join().expect("worker thread panicked") {
                if first_error.is_none() {
                    first_error = Some(stop_to_error(stop));
                }
            }
        }
        first_error
    });

    match outcome {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn stop_to_error(stop: crate::retry::RetryStop) -> DdmError {
    use crate::retry::RetryStop;
    match stop {
        RetryStop::Canceled => DdmError::Expected(ExpectedKind::Canceled),
        RetryStop::GaveUp { attempts } => DdmError::Expected(ExpectedKind::GaveUp { attempts }),
        RetryStop::Fatal(e) => DdmError::Unexpected(anyhow::anyhow!(e)),
    }
}
