//! Shared domain types for the dbrun workspace.
//!
//! The runner, compiler, and command line all speak in terms of the values
//! defined here: which dialect a script is rendered in, which database client
//! executes it, and the ordered task list that drives one run.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod manifest;

pub use manifest::{ManifestError, TaskManifest, load_manifest_from_path, parse_manifest};

/// Error produced when a dialect tag or task string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskParseError {
    /// The dialect tag is not one of the recognised spellings.
    #[error("unknown script dialect '{0}' (expected PLAIN, PL or PROC)")]
    UnknownDialect(String),
    /// The database backend name is not recognised.
    #[error("unknown database backend '{0}' (expected oracle or sql-server)")]
    UnknownBackend(String),
    /// The script reference portion of a task was empty.
    #[error("script task '{0}' has an empty script reference")]
    EmptyReference(String),
}

/// How a referenced script is wrapped in the generated temp script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptDialect {
    /// Plain SQL statements; each file is included and the client quits.
    #[default]
    Plain,
    /// A PL block that needs an explicit execution terminator before quitting.
    PlBlock,
    /// Stored-procedure installers followed by post-install validation.
    Procedure,
}

impl ScriptDialect {
    /// Canonical short tag, matching the tags accepted by [`FromStr`].
    pub fn tag(self) -> &'static str {
        match self {
            ScriptDialect::Plain => "PLAIN",
            ScriptDialect::PlBlock => "PL",
            ScriptDialect::Procedure => "PROC",
        }
    }
}

impl fmt::Display for ScriptDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ScriptDialect {
    type Err = TaskParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SQL" | "PLAIN" => Ok(ScriptDialect::Plain),
            "PL" | "PLSQL" | "PL-BLOCK" | "PL_BLOCK" => Ok(ScriptDialect::PlBlock),
            "PROC" | "PROCEDURE" => Ok(ScriptDialect::Procedure),
            _ => Err(TaskParseError::UnknownDialect(value.to_string())),
        }
    }
}

/// One entry of an ordered task list: a script reference relative to the
/// script root and the dialect it is rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTask {
    /// File or directory path, relative to the script root.
    pub script: String,
    /// Rendering dialect for every file the reference expands to.
    #[serde(default)]
    pub dialect: ScriptDialect,
}

impl ScriptTask {
    pub fn new(script: impl Into<String>, dialect: ScriptDialect) -> Self {
        Self {
            script: script.into(),
            dialect,
        }
    }
}

impl fmt::Display for ScriptTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dialect, self.script)
    }
}

/// Parses `[DIALECT:]path`.
///
/// When the text before the first `:` is not a dialect tag the whole input is
/// taken as the path. References are relative to the script root.
impl FromStr for ScriptTask {
    type Err = TaskParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (dialect, script) = match trimmed.split_once(':') {
            Some((prefix, rest)) => match prefix.parse::<ScriptDialect>() {
                Ok(dialect) => (dialect, rest.trim()),
                Err(_) => (ScriptDialect::Plain, trimmed),
            },
            None => (ScriptDialect::Plain, trimmed),
        };
        if script.is_empty() {
            return Err(TaskParseError::EmptyReference(value.to_string()));
        }
        Ok(ScriptTask::new(script, dialect))
    }
}

/// Database product whose command-line client executes the generated scripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseBackend {
    /// Oracle via `sqlplus`.
    #[default]
    Oracle,
    /// Microsoft SQL Server via `sqlcmd`.
    SqlServer,
}

impl DatabaseBackend {
    /// Executable looked up on `PATH` when no explicit client is configured.
    pub fn default_client_program(self) -> &'static str {
        match self {
            DatabaseBackend::Oracle => "sqlplus",
            DatabaseBackend::SqlServer => "sqlcmd",
        }
    }

    /// Label used in the abort notice written to the output log.
    pub fn error_label(self) -> &'static str {
        match self {
            DatabaseBackend::Oracle => "PLSQL",
            DatabaseBackend::SqlServer => "SQLServer",
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseBackend::Oracle => f.write_str("oracle"),
            DatabaseBackend::SqlServer => f.write_str("sql-server"),
        }
    }
}

impl FromStr for DatabaseBackend {
    type Err = TaskParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "oracle" | "sqlplus" => Ok(DatabaseBackend::Oracle),
            "sql-server" | "sqlserver" | "mssql" | "sqlcmd" => Ok(DatabaseBackend::SqlServer),
            _ => Err(TaskParseError::UnknownBackend(value.to_string())),
        }
    }
}
