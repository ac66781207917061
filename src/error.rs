use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing a structure or running one of the analyses.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A requested chain is missing, the back end is unknown, or a name is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An external tool could not be started, exited non-zero, or left no output.
    #[error("{tool} failed (exit status {status:?}): {message}")]
    ToolInvocation {
        tool: String,
        status: Option<i32>,
        message: String,
    },

    /// A transient resource-contention failure that survived every retry.
    /// The job should be rescheduled rather than abandoned.
    #[error("{tool} ran out of resources: {message}")]
    Resource { tool: String, message: String },

    /// Tool output is present but breaks the expected column layout.
    #[error("Failed to parse {file} (line {line}): {reason}")]
    Parse {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// A file a tool needs as input was never written.
    #[error("Expected input file does not exist: {0}")]
    MissingInput(PathBuf),

    /// The coordinate file could not be read or written.
    #[error("Failed to process structure {path}: {message}")]
    Structure { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

impl AnalysisError {
    pub(crate) fn parse(file: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        AnalysisError::Parse {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Whether the failure is transient and the job may be retried later.
    pub fn is_reschedulable(&self) -> bool {
        matches!(self, AnalysisError::Resource { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
