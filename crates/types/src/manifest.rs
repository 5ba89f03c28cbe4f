//! YAML task manifests.
//!
//! A manifest captures the parameters of one rebuild job so it can be checked
//! in next to the SQL it drives:
//!
//! ```yaml
//! role: Admin
//! log_name: rebuild
//! grantee: App
//! backend: oracle
//! tasks:
//!   - script: Tables
//!   - script: Procedures
//!     dialect: procedure
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DatabaseBackend, ScriptTask};

/// Errors raised while reading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Declarative description of a run. Every field is optional so command-line
/// flags can fill in or override what the file leaves out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskManifest {
    /// Settings role whose `<role>Account`/`<role>Password` keys log in.
    #[serde(default)]
    pub role: Option<String>,
    /// Prefix for the log files and generated temp scripts.
    #[serde(default)]
    pub log_name: Option<String>,
    /// Settings role granted execute rights on installed procedures.
    #[serde(default)]
    pub grantee: Option<String>,
    #[serde(default)]
    pub backend: Option<DatabaseBackend>,
    /// Ordered task list; order is also the execution and abort order.
    #[serde(default)]
    pub tasks: Vec<ScriptTask>,
}

/// Parse a manifest from YAML text. `origin` is only used in error messages.
pub fn parse_manifest(content: &str, origin: &str) -> Result<TaskManifest, ManifestError> {
    serde_yaml::from_str(content).map_err(|source| ManifestError::Parse {
        path: origin.to_string(),
        source,
    })
}

/// Read and parse a manifest file.
pub fn load_manifest_from_path(path: &Path) -> Result<TaskManifest, ManifestError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: display.clone(),
        source,
    })?;
    parse_manifest(&content, &display)
}
