//! The script runner: one sequential pass over an ordered task list.
//!
//! Phases: `Init` → `CredentialsResolved` → `LogsOpen` → `Running` per task →
//! `Done`, or `Aborted` on the first failing task. Credentials are resolved
//! before the temp directory is swept or any log file is opened, so a missing
//! key leaves the filesystem untouched. Tasks whose script is missing are
//! skipped; a non-zero client exit stops the run and no later task is compiled.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use dbrun_types::{DatabaseBackend, ScriptDialect, ScriptTask};
use dbrun_util::{clean_directory, default_settings_path, load_settings};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::compiler::ScriptCompiler;
use crate::credentials::{Credentials, resolve_credentials};
use crate::error::RunError;
use crate::executor::{ClientInvocation, ExecutionStatus, ScriptExecutor};

mod logs;

pub use logs::RunLogs;

/// Directory names under the base directory.
pub const SCRIPT_DIR_NAME: &str = "SQL";
pub const TEMP_DIR_NAME: &str = "Temp";
pub const LOG_DIR_NAME: &str = "Logs";

/// Where a run reads and writes, and which client it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub backend: DatabaseBackend,
    pub client_program: String,
    pub settings_path: PathBuf,
    pub script_root: PathBuf,
    pub temp_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl RunnerConfig {
    /// Conventional layout rooted at `base_dir`: `SQL/`, `Temp/`, `Logs/` and
    /// the settings file (see [`default_settings_path`]).
    pub fn from_base_dir(base_dir: impl Into<PathBuf>, backend: DatabaseBackend) -> Self {
        let base_dir = base_dir.into();
        Self {
            backend,
            client_program: backend.default_client_program().to_string(),
            settings_path: default_settings_path(&base_dir),
            script_root: base_dir.join(SCRIPT_DIR_NAME),
            temp_dir: base_dir.join(TEMP_DIR_NAME),
            log_dir: base_dir.join(LOG_DIR_NAME),
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Settings role providing `<role>Account` and `<role>Password`.
    pub role: String,
    /// Prefix of the log files and temp scripts.
    pub log_name: String,
    /// Settings role granted execute on installed procedures.
    pub grantee: Option<String>,
    pub tasks: Vec<ScriptTask>,
}

/// Runner state; terminal states are `Done`, `Aborted` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    CredentialsResolved,
    LogsOpen,
    Running { task_index: usize },
    Done,
    Aborted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded,
    /// The script reference did not exist; nothing was executed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub script: String,
    pub dialect: ScriptDialect,
    pub outcome: TaskOutcome,
    pub temp_script: Option<PathBuf>,
}

/// Summary of a run that reached `Done`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub log_name: String,
    pub output_log: PathBuf,
    pub error_log: PathBuf,
    pub tasks: Vec<TaskReport>,
    pub elapsed_seconds: f64,
}

/// A task as it would run, produced by [`ScriptRunner::compile_only`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTask {
    pub script: String,
    pub dialect: ScriptDialect,
    pub temp_script: Option<PathBuf>,
    /// Client command line with the password masked; `None` for skipped tasks.
    pub command_line: Option<String>,
}

/// Reports the elapsed time on every exit path.
struct RunTimer {
    log_name: String,
    started: Instant,
}

impl RunTimer {
    fn start(log_name: &str) -> Self {
        Self {
            log_name: log_name.to_string(),
            started: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        info!(log_name = %self.log_name, elapsed_secs = self.elapsed().as_secs_f64(), "Total time");
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    debug!(from = ?phase, to = ?next, "run phase transition");
    *phase = next;
}

/// Drives the compiler and executor over a task list.
pub struct ScriptRunner<E> {
    config: RunnerConfig,
    executor: E,
}

impl<E: ScriptExecutor> ScriptRunner<E> {
    pub fn new(config: RunnerConfig, executor: E) -> Self {
        Self { config, executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Execute every task in order, stopping at the first client failure.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, RunError> {
        let timer = RunTimer::start(&request.log_name);
        let mut phase = RunPhase::Init;
        let result = self.run_tasks(request, &mut phase, &timer).await;
        match &result {
            Ok(_) => advance(&mut phase, RunPhase::Done),
            Err(error) => advance(&mut phase, error.terminal_phase()),
        }
        result
    }

    /// Compile every task without executing anything.
    ///
    /// Credentials are still resolved so the reported command lines are the
    /// ones a real run would use. Log files are not touched.
    pub fn compile_only(&self, request: &RunRequest) -> Result<Vec<PlannedTask>, RunError> {
        let credentials = self.resolve(request)?;
        let mut compiler = self.prepare_compiler(request, &credentials)?;

        let mut planned = Vec::with_capacity(request.tasks.len());
        for task in &request.tasks {
            let compiled = compiler.compile(task)?;
            let command_line = compiled.as_ref().map(|compiled| {
                self.invocation(&credentials, &compiled.path, &task.script)
                    .redacted_command_line()
            });
            planned.push(PlannedTask {
                script: task.script.clone(),
                dialect: task.dialect,
                temp_script: compiled.map(|compiled| compiled.path),
                command_line,
            });
        }
        Ok(planned)
    }

    async fn run_tasks(&self, request: &RunRequest, phase: &mut RunPhase, timer: &RunTimer) -> Result<RunReport, RunError> {
        let credentials = self.resolve(request)?;
        advance(phase, RunPhase::CredentialsResolved);

        let mut compiler = self.prepare_compiler(request, &credentials)?;
        let logs = RunLogs::open(&self.config.log_dir, &request.log_name)?;
        logs.write_run_header(&request.role, &self.config.backend.to_string())?;
        advance(phase, RunPhase::LogsOpen);

        let mut reports = Vec::with_capacity(request.tasks.len());
        for (task_index, task) in request.tasks.iter().enumerate() {
            advance(phase, RunPhase::Running { task_index });

            let Some(compiled) = compiler.compile(task)? else {
                reports.push(TaskReport {
                    script: task.script.clone(),
                    dialect: task.dialect,
                    outcome: TaskOutcome::Skipped,
                    temp_script: None,
                });
                continue;
            };

            info!(script = %task.script, temp_script = %compiled.path.display(), "Processing");
            logs.write_task_header(&task.script)?;
            let invocation = self.invocation(&credentials, &compiled.path, &task.script);
            debug!(command = %invocation.redacted_command_line(), "Command line");

            match self.executor.execute(&invocation, &logs).await? {
                ExecutionStatus::Exited(0) => reports.push(TaskReport {
                    script: task.script.clone(),
                    dialect: task.dialect,
                    outcome: TaskOutcome::Succeeded,
                    temp_script: Some(compiled.path),
                }),
                ExecutionStatus::Exited(exit_code) => {
                    logs.write_abort_notice(&format!("{} Error: {exit_code}", self.config.backend.error_label()))?;
                    error!(script = %task.script, exit_code, "SQL error; aborting remaining tasks");
                    return Err(RunError::ExternalToolFailure {
                        exit_code,
                        script_ref: task.script.clone(),
                    });
                }
                ExecutionStatus::TimedOut(limit) => {
                    logs.write_abort_notice(&format!("{} Timeout after {}s", self.config.backend.error_label(), limit.as_secs()))?;
                    error!(script = %task.script, seconds = limit.as_secs(), "database client timed out; aborting remaining tasks");
                    return Err(RunError::Timeout {
                        script_ref: task.script.clone(),
                        seconds: limit.as_secs(),
                    });
                }
            }
        }

        Ok(RunReport {
            log_name: request.log_name.clone(),
            output_log: logs.output_path().to_path_buf(),
            error_log: logs.error_path().to_path_buf(),
            tasks: reports,
            elapsed_seconds: timer.elapsed().as_secs_f64(),
        })
    }

    fn resolve(&self, request: &RunRequest) -> Result<Credentials, RunError> {
        let settings = load_settings(&self.config.settings_path);
        let credentials = resolve_credentials(&settings, &request.role, request.grantee.as_deref(), self.config.backend)?;
        info!(role = %request.role, account = %credentials.account, "Login");
        Ok(credentials)
    }

    fn prepare_compiler(&self, request: &RunRequest, credentials: &Credentials) -> Result<ScriptCompiler, RunError> {
        clean_directory(&self.config.temp_dir)
            .map_err(|error| RunError::io(format!("failed to clean temp directory {}", self.config.temp_dir.display()), error))?;
        Ok(ScriptCompiler::new(
            self.config.backend,
            &self.config.script_root,
            &self.config.temp_dir,
            &request.log_name,
            credentials.grantee_account.clone(),
        ))
    }

    fn invocation(&self, credentials: &Credentials, script_path: &std::path::Path, script_ref: &str) -> ClientInvocation {
        ClientInvocation::build(
            self.config.backend,
            &self.config.client_program,
            credentials,
            script_path,
            script_ref,
        )
    }
}
