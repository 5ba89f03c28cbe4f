//! # dbrun engine
//!
//! Compiles database script tasks into temporary client scripts and runs them
//! through `sqlplus` or `sqlcmd`, one task at a time.
//!
//! ## Usage
//!
//! ```no_run
//! use dbrun_engine::{ClientExecutor, RunRequest, RunnerConfig, ScriptRunner};
//! use dbrun_types::{DatabaseBackend, ScriptDialect, ScriptTask};
//!
//! # async fn rebuild() -> Result<(), dbrun_engine::RunError> {
//! let config = RunnerConfig::from_base_dir("DB", DatabaseBackend::Oracle);
//! let runner = ScriptRunner::new(config, ClientExecutor::default());
//! let report = runner
//!     .run(&RunRequest {
//!         role: "Admin".into(),
//!         log_name: "rebuild".into(),
//!         grantee: Some("App".into()),
//!         tasks: vec![
//!             ScriptTask::new("Tables", ScriptDialect::Plain),
//!             ScriptTask::new("Procedures", ScriptDialect::Procedure),
//!         ],
//!     })
//!     .await?;
//! println!("ran {} tasks", report.tasks.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`credentials`**: `<role>Account`/`<role>Password` lookup in the settings
//! - **`compiler`**: reference expansion and per-client dialect rendering
//! - **`executor`**: the `ScriptExecutor` seam and the process-spawning client executor
//! - **`runner`**: the sequential run with its log files and abort semantics

pub mod compiler;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod runner;

pub use compiler::{CompiledScript, ScriptCompiler, expand_reference, render_script};
pub use credentials::{Credentials, resolve_credentials};
pub use error::RunError;
pub use executor::{ClientExecutor, ClientInvocation, ExecutionStatus, SIGNAL_EXIT_CODE, ScriptExecutor};
pub use runner::{PlannedTask, RunLogs, RunPhase, RunReport, RunRequest, RunnerConfig, ScriptRunner, TaskOutcome, TaskReport};
