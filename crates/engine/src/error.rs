use std::io;

use thiserror::Error;

use crate::runner::RunPhase;

/// Failures that end a run.
///
/// A missing script is not an error: the compiler reports it as `None` and the
/// runner skips the task.
#[derive(Debug, Error)]
pub enum RunError {
    /// A key required to log in (or to grant procedure rights) is absent from
    /// the settings. Raised before any file is touched or process spawned.
    #[error("missing setting '{key}' for database role '{role}'")]
    CredentialMissing { role: String, key: String },

    /// The database client returned a non-zero exit code.
    #[error("database client exited with code {exit_code} while executing {script_ref}")]
    ExternalToolFailure { exit_code: i32, script_ref: String },

    /// The database client did not finish within the configured limit and was killed.
    #[error("database client timed out after {seconds}s while executing {script_ref}")]
    Timeout { script_ref: String, seconds: u64 },

    /// The database client could not be started at all.
    #[error("failed to launch database client '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        RunError::Io {
            context: context.into(),
            source,
        }
    }

    /// Terminal runner state this error leaves the run in.
    pub fn terminal_phase(&self) -> RunPhase {
        match self {
            RunError::ExternalToolFailure { .. } | RunError::Timeout { .. } => RunPhase::Aborted,
            _ => RunPhase::Failed,
        }
    }

    /// Script reference that triggered the failure, when the failure belongs to a task.
    pub fn script_ref(&self) -> Option<&str> {
        match self {
            RunError::ExternalToolFailure { script_ref, .. } | RunError::Timeout { script_ref, .. } => Some(script_ref),
            _ => None,
        }
    }
}
