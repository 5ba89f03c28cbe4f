use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dbrun_engine::{ClientExecutor, RunError, ScriptRunner};
use dbrun_util::{is_secret_key, load_settings};
use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod args;

use args::{Cli, Commands, RunArgs, SettingsArgs};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let (outcome, wait_for_enter) = match &cli.command {
        Commands::Run(run_args) => (run_command(run_args).await, !run_args.non_interactive),
        Commands::Settings(settings_args) => (settings_command(settings_args), false),
    };

    let exit_code = match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_failure(&error);
            ExitCode::FAILURE
        }
    };

    if wait_for_enter {
        wait_for_operator().await;
    }
    exit_code
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .try_init();
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::new(directives.unwrap_or("info"))
}

async fn run_command(run_args: &RunArgs) -> Result<()> {
    let resolved = run_args.resolve()?;
    let runner = ScriptRunner::new(resolved.config, ClientExecutor::new(resolved.timeout));

    if run_args.dry_run {
        let planned = runner.compile_only(&resolved.request)?;
        if run_args.json {
            println!("{}", serde_json::to_string_pretty(&planned)?);
        } else {
            for task in &planned {
                match (&task.temp_script, &task.command_line) {
                    (Some(temp_script), Some(command_line)) => {
                        println!("{} [{}] -> {}", task.script, task.dialect, temp_script.display());
                        println!("    {command_line}");
                    }
                    _ => println!("{} [{}] -> not found, would be skipped", task.script, task.dialect),
                }
            }
        }
        return Ok(());
    }

    let report = runner.run(&resolved.request).await?;
    if run_args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Script output went to: {}", report.output_log.display());
        println!("Script errors went to: {}", report.error_log.display());
        println!("Success!");
    }
    Ok(())
}

fn settings_command(settings_args: &SettingsArgs) -> Result<()> {
    let settings = load_settings(&settings_args.paths.settings_path());
    let masked: IndexMap<&str, &str> = settings
        .iter()
        .map(|(key, value)| (key, if is_secret_key(key) { "[REDACTED]" } else { value }))
        .collect();

    if settings_args.json {
        println!("{}", serde_json::to_string_pretty(&masked)?);
    } else {
        for (key, value) in masked {
            println!("{key}={value}");
        }
    }
    Ok(())
}

fn report_failure(error: &anyhow::Error) {
    match error.downcast_ref::<RunError>() {
        Some(RunError::ExternalToolFailure { exit_code, script_ref }) => {
            error!(exit_code, script = %script_ref, "database client failed");
            println!("SQL Error ( {exit_code} ) while executing file: {script_ref}");
        }
        Some(run_error) => error!(phase = ?run_error.terminal_phase(), "{run_error}"),
        None => error!("{error:#}"),
    }
    println!("There were errors");
}

async fn wait_for_operator() {
    println!("Press Enter to exit");
    let mut line = String::new();
    let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
}
