//! The top-level error taxonomy: Usage / Expected / Unexpected, matching the
//! three-way exit code split in spec.md §6-§7.

use thiserror::Error;

/// The reasons a run can end in the "expected" bucket (exit code 1): things
/// that are a normal, anticipated outcome of running the tool, not a bug.
#[derive(Debug, Error)]
pub enum ExpectedKind {
    #[error("canceled")]
    Canceled,
    #[error("maximum redirects followed")]
    MaxRedirects,
    #[error("unexpected status {0}")]
    UnexpectedStatus(u32),
    #[error("gave up after {attempts} attempts")]
    GaveUp { attempts: u32 },
    #[error("resume aborted: {reason}")]
    ResumeMismatch { reason: String },
    #[error("{0}")]
    Other(String),
}

/// Top-level error, mapped to an exit code by `ddm-cli`'s `main`.
#[derive(Debug, Error)]
pub enum DdmError {
    /// CLI misuse; exit 2.
    #[error("{0}")]
    Usage(String),
    /// Anticipated failure mode; exit 1.
    #[error(transparent)]
    Expected(#[from] ExpectedKind),
    /// Anything else; exit 3.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl DdmError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DdmError::Usage(_) => 2,
            DdmError::Expected(_) => 1,
            DdmError::Unexpected(_) => 3,
        }
    }
}
