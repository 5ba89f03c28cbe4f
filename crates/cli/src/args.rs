//! Command-line surface and its resolution into runner inputs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dbrun_engine::{RunRequest, RunnerConfig};
use dbrun_types::{DatabaseBackend, ScriptTask, TaskManifest, load_manifest_from_path};
use dbrun_util::{default_settings_path, expand_tilde, resolve_under};

#[derive(Debug, Parser)]
#[command(name = "dbrun", version, about = "Run ordered SQL script tasks through SQL*Plus or sqlcmd")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compile and execute a task list.
    Run(RunArgs),
    /// Print the loaded settings with secrets masked.
    Settings(SettingsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PathArgs {
    /// Directory holding `SQL/`, `Temp/`, `Logs/` and `DBSettings.txt`.
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,
    /// Settings file (overrides DBRUN_SETTINGS_PATH).
    #[arg(long)]
    pub settings: Option<PathBuf>,
    #[arg(long)]
    pub script_root: Option<PathBuf>,
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Settings role used to log in (`<ROLE>Account` / `<ROLE>Password`).
    #[arg(long)]
    pub role: Option<String>,
    /// Prefix for the log files and temp scripts.
    #[arg(long)]
    pub log_name: Option<String>,
    /// Script task, `[DIALECT:]PATH` relative to the script root. Repeatable; runs in order.
    #[arg(long = "task", value_name = "[DIALECT:]PATH")]
    pub tasks: Vec<ScriptTask>,
    /// YAML manifest supplying defaults and a leading task list.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
    /// Settings role granted EXECUTE on installed procedures.
    #[arg(long)]
    pub grantee: Option<String>,
    #[arg(long)]
    pub backend: Option<DatabaseBackend>,
    /// Client executable; defaults to `sqlplus` or `sqlcmd`.
    #[arg(long)]
    pub client: Option<String>,
    #[command(flatten)]
    pub paths: PathArgs,
    /// Kill the client and abort when one task runs longer than this.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Compile temp scripts and print the command lines without running them.
    #[arg(long)]
    pub dry_run: bool,
    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Exit without waiting for Enter.
    #[arg(long)]
    pub non_interactive: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    #[command(flatten)]
    pub paths: PathArgs,
    #[arg(long)]
    pub json: bool,
}

impl PathArgs {
    pub fn settings_path(&self) -> PathBuf {
        match &self.settings {
            Some(path) => expand_tilde(&path.to_string_lossy()),
            None => default_settings_path(&self.base_dir),
        }
    }
}

/// Everything a run needs, merged from the manifest and the flags.
#[derive(Debug)]
pub struct ResolvedRun {
    pub config: RunnerConfig,
    pub request: RunRequest,
    pub timeout: Option<Duration>,
}

impl RunArgs {
    /// Merge flags over the manifest. Flags win for scalar values; flag tasks
    /// run after manifest tasks.
    pub fn resolve(&self) -> Result<ResolvedRun> {
        let manifest = match &self.manifest {
            Some(path) => load_manifest_from_path(path)?,
            None => TaskManifest::default(),
        };
        self.resolve_with(manifest)
    }

    fn resolve_with(&self, manifest: TaskManifest) -> Result<ResolvedRun> {
        let role = self
            .role
            .clone()
            .or(manifest.role)
            .context("a database role is required (--role or manifest `role`)")?;
        let log_name = self
            .log_name
            .clone()
            .or(manifest.log_name)
            .context("a log name is required (--log-name or manifest `log_name`)")?;
        let grantee = self.grantee.clone().or(manifest.grantee);
        let backend = self.backend.or(manifest.backend).unwrap_or_default();

        let mut tasks = manifest.tasks;
        tasks.extend(self.tasks.iter().cloned());
        if tasks.is_empty() {
            bail!("no script tasks given (--task or manifest `tasks`)");
        }

        let base_dir = &self.paths.base_dir;
        let mut config = RunnerConfig::from_base_dir(base_dir, backend);
        config.settings_path = self.paths.settings_path();
        if let Some(script_root) = &self.paths.script_root {
            config.script_root = resolve_under(base_dir, script_root);
        }
        if let Some(temp_dir) = &self.paths.temp_dir {
            config.temp_dir = resolve_under(base_dir, temp_dir);
        }
        if let Some(log_dir) = &self.paths.log_dir {
            config.log_dir = resolve_under(base_dir, log_dir);
        }
        if let Some(client) = &self.client {
            config.client_program = client.clone();
        }

        Ok(ResolvedRun {
            config,
            request: RunRequest {
                role,
                log_name,
                grantee,
                tasks,
            },
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbrun_types::{ScriptDialect, parse_manifest};
    use std::path::Path;

    fn parse_run(args: &[&str]) -> RunArgs {
        let mut argv = vec!["dbrun", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).expect("arguments parse").command {
            Commands::Run(run) => run,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_build_request_in_order() {
        let args = parse_run(&[
            "--role",
            "Admin",
            "--log-name",
            "rebuild",
            "--task",
            "Tables",
            "--task",
            "PROC:Procedures",
            "--grantee",
            "App",
            "--base-dir",
            "/work/DB",
            "--settings",
            "/etc/dbrun/DBSettings.txt",
            "--non-interactive",
        ]);
        let resolved = args.resolve().unwrap();

        assert_eq!(resolved.request.role, "Admin");
        assert_eq!(resolved.request.grantee.as_deref(), Some("App"));
        assert_eq!(
            resolved.request.tasks,
            vec![
                ScriptTask::new("Tables", ScriptDialect::Plain),
                ScriptTask::new("Procedures", ScriptDialect::Procedure),
            ]
        );
        assert_eq!(resolved.config.script_root, Path::new("/work/DB/SQL"));
        assert_eq!(resolved.config.settings_path, Path::new("/etc/dbrun/DBSettings.txt"));
        assert_eq!(resolved.config.client_program, "sqlplus");
        assert!(args.non_interactive);
        assert_eq!(resolved.timeout, None);
    }

    #[test]
    fn flags_override_manifest_and_append_tasks() {
        let manifest = parse_manifest(
            "role: Admin\nlog_name: nightly\nbackend: sql-server\ntasks:\n  - script: Tables\n",
            "inline",
        )
        .unwrap();
        let args = parse_run(&[
            "--log-name",
            "adhoc",
            "--task",
            "PL:Init.sql",
            "--log-dir",
            "/var/log/dbrun",
            "--timeout-secs",
            "600",
            "--settings",
            "DBSettings.txt",
        ]);
        let resolved = args.resolve_with(manifest).unwrap();

        assert_eq!(resolved.request.role, "Admin");
        assert_eq!(resolved.request.log_name, "adhoc");
        assert_eq!(resolved.config.backend, DatabaseBackend::SqlServer);
        assert_eq!(resolved.config.client_program, "sqlcmd");
        assert_eq!(resolved.config.log_dir, Path::new("/var/log/dbrun"));
        assert_eq!(resolved.timeout, Some(Duration::from_secs(600)));
        assert_eq!(
            resolved.request.tasks,
            vec![
                ScriptTask::new("Tables", ScriptDialect::Plain),
                ScriptTask::new("Init.sql", ScriptDialect::PlBlock),
            ]
        );
    }

    #[test]
    fn manifest_file_is_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("nightly.yaml");
        std::fs::write(
            &manifest_path,
            "role: Admin\nlog_name: nightly\ngrantee: App\ntasks:\n  - script: Procedures\n    dialect: procedure\n",
        )
        .unwrap();

        let manifest_arg = manifest_path.to_string_lossy().into_owned();
        let resolved = parse_run(&["--manifest", &manifest_arg, "--settings", "s.txt"])
            .resolve()
            .unwrap();
        assert_eq!(resolved.request.log_name, "nightly");
        assert_eq!(resolved.request.grantee.as_deref(), Some("App"));
        assert_eq!(resolved.request.tasks, vec![ScriptTask::new("Procedures", ScriptDialect::Procedure)]);
    }

    #[test]
    fn missing_role_or_tasks_is_an_error() {
        let error = parse_run(&["--log-name", "x", "--task", "A.sql", "--settings", "s.txt"])
            .resolve()
            .unwrap_err();
        assert!(error.to_string().contains("role"));

        let error = parse_run(&["--role", "Admin", "--log-name", "x", "--settings", "s.txt"])
            .resolve()
            .unwrap_err();
        assert!(error.to_string().contains("no script tasks"));
    }

    #[test]
    fn invalid_dialect_prefix_is_treated_as_path() {
        let args = parse_run(&["--task", "Views:Current.sql"]);
        assert_eq!(args.tasks, vec![ScriptTask::new("Views:Current.sql", ScriptDialect::Plain)]);
    }

    #[test]
    fn unknown_backend_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["dbrun", "run", "--backend", "postgres"]);
        assert!(result.is_err());
    }
}
