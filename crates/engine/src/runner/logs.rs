//! The two per-run log files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Local;
use dbrun_util::ensure_directory;
use tracing::info;

use crate::error::RunError;

const SEPARATOR: &str = "***************************************************************";

/// Output and error logs for one run.
///
/// Both files are truncated when opened and stay open for the whole run; the
/// database client writes into duplicated handles so runner notices and client
/// output interleave in order. Dropping the value closes both files.
#[derive(Debug)]
pub struct RunLogs {
    output: File,
    error: File,
    output_path: PathBuf,
    error_path: PathBuf,
}

impl RunLogs {
    /// Open `<log_dir>/<log_name>_output.txt` and `<log_dir>/<log_name>_error.txt`,
    /// creating the directory when needed.
    pub fn open(log_dir: &Path, log_name: &str) -> Result<Self, RunError> {
        ensure_directory(log_dir).map_err(|error| RunError::io(format!("failed to create log directory {}", log_dir.display()), error))?;

        let output_path = log_dir.join(format!("{log_name}_output.txt"));
        let error_path = log_dir.join(format!("{log_name}_error.txt"));
        let output = truncate(&output_path)?;
        let error = truncate(&error_path)?;

        info!(path = %output_path.display(), "Script output going to");
        info!(path = %error_path.display(), "Script errors going to");

        Ok(Self {
            output,
            error,
            output_path,
            error_path,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    pub fn append_output(&self, text: &str) -> Result<(), RunError> {
        write_all(&self.output, &self.output_path, text)
    }

    pub fn append_error(&self, text: &str) -> Result<(), RunError> {
        write_all(&self.error, &self.error_path, text)
    }

    /// Handle suitable for a child's stdout.
    pub fn output_stdio(&self) -> Result<Stdio, RunError> {
        duplicate(&self.output, &self.output_path)
    }

    /// Handle suitable for a child's stderr.
    pub fn error_stdio(&self) -> Result<Stdio, RunError> {
        duplicate(&self.error, &self.error_path)
    }

    pub(crate) fn write_run_header(&self, role: &str, backend: &str) -> Result<(), RunError> {
        self.append_output(&format!(
            "Run started {} (role: {role}, backend: {backend})\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }

    pub(crate) fn write_task_header(&self, script_ref: &str) -> Result<(), RunError> {
        self.append_output(&format!("\n{SEPARATOR}\nProcessing file: {script_ref}\n\n"))
    }

    pub(crate) fn write_abort_notice(&self, failure: &str) -> Result<(), RunError> {
        self.append_output(&format!("{failure}\n*****ABORTING script execution*****\n"))
    }
}

fn truncate(path: &Path) -> Result<File, RunError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|error| RunError::io(format!("failed to open log file {}", path.display()), error))
}

fn write_all(mut file: &File, path: &Path, text: &str) -> Result<(), RunError> {
    file.write_all(text.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|error| RunError::io(format!("failed to write log file {}", path.display()), error))
}

fn duplicate(file: &File, path: &Path) -> Result<Stdio, RunError> {
    file.try_clone()
        .map(Stdio::from)
        .map_err(|error| RunError::io(format!("failed to duplicate log handle {}", path.display()), error))
}
