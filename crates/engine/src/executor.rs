//! Database client invocation.
//!
//! `ScriptExecutor` abstracts how a compiled script is executed. The default
//! `ClientExecutor` spawns `sqlplus`/`sqlcmd` and blocks the run until the
//! child exits; tests substitute scripted executors.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use dbrun_types::DatabaseBackend;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::error::RunError;
use crate::runner::RunLogs;

/// Exit code reported when the client was terminated by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

const REDACTED: &str = "[REDACTED]";

/// Fully resolved client command line for one task.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Task reference as written in the task list.
    pub script_ref: String,
    pub script_path: PathBuf,
    /// `args` with the password argument masked.
    display_args: Vec<String>,
}

impl ClientInvocation {
    /// Build the command line `backend`'s client expects.
    ///
    /// - Oracle: `sqlplus -S -L <account>/<password> @<script>`
    /// - SQL Server: `sqlcmd -b -S <server> -U <account> -P <password> -i <script>`
    pub fn build(
        backend: DatabaseBackend,
        program: impl Into<String>,
        credentials: &Credentials,
        script_path: &Path,
        script_ref: impl Into<String>,
    ) -> Self {
        let script = script_path.display().to_string();
        let (args, display_args) = match backend {
            DatabaseBackend::Oracle => {
                let logon = |password: &str| format!("{}/{password}", credentials.account);
                let script = format!("@{script}");
                (
                    vec!["-S".to_string(), "-L".to_string(), logon(credentials.password()), script.clone()],
                    vec!["-S".to_string(), "-L".to_string(), logon(REDACTED), script],
                )
            }
            DatabaseBackend::SqlServer => {
                let with_password = |password: &str| {
                    vec![
                        "-b".to_string(),
                        "-S".to_string(),
                        credentials.server.clone().unwrap_or_default(),
                        "-U".to_string(),
                        credentials.account.clone(),
                        "-P".to_string(),
                        password.to_string(),
                        "-i".to_string(),
                        script.clone(),
                    ]
                };
                (with_password(credentials.password()), with_password(REDACTED))
            }
        };
        Self {
            program: program.into(),
            args,
            script_ref: script_ref.into(),
            script_path: script_path.to_path_buf(),
            display_args,
        }
    }

    /// Command line with the password masked, for console and trace output.
    pub fn redacted_command_line(&self) -> String {
        format!("{} {}", self.program, self.display_args.join(" "))
    }
}

impl std::fmt::Debug for ClientInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientInvocation")
            .field("command_line", &self.redacted_command_line())
            .field("script_ref", &self.script_ref)
            .field("script_path", &self.script_path)
            .finish()
    }
}

/// How a client invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Exited(i32),
    /// Killed after exceeding the configured limit.
    TimedOut(Duration),
}

/// Execute one compiled script.
///
/// Implementations must route the client's stdout and stderr into `logs` and
/// must not return before the client has finished.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute(&self, invocation: &ClientInvocation, logs: &RunLogs) -> Result<ExecutionStatus, RunError>;
}

/// Spawns the real database client.
#[derive(Debug, Clone, Default)]
pub struct ClientExecutor {
    timeout: Option<Duration>,
}

impl ClientExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ScriptExecutor for ClientExecutor {
    async fn execute(&self, invocation: &ClientInvocation, logs: &RunLogs) -> Result<ExecutionStatus, RunError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(logs.output_stdio()?)
            .stderr(logs.error_stdio()?)
            .kill_on_drop(true);

        debug!(command = %invocation.redacted_command_line(), "spawning database client");
        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    warn!(script = %invocation.script_ref, seconds = limit.as_secs(), "database client timed out; killing");
                    if let Err(error) = child.kill().await {
                        warn!(error = %error, "failed to kill timed out database client");
                    }
                    return Ok(ExecutionStatus::TimedOut(limit));
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|error| RunError::io(format!("failed waiting for {}", invocation.program), error))?;
        Ok(ExecutionStatus::Exited(status.code().unwrap_or(SIGNAL_EXIT_CODE)))
    }
}
