//! Flat `key=value` settings files.
//!
//! Each line is searched for the first `identifier=value` assignment, where
//! the value is the longest run of non-whitespace characters (possibly empty).
//! Lines without an assignment are ignored. There is no quoting, escaping or
//! multi-line support. A file that cannot be read yields an empty mapping and
//! a warning; loading never fails.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::expand_tilde;

/// Environment variable allowing callers to override the settings file path.
pub const SETTINGS_PATH_ENV: &str = "DBRUN_SETTINGS_PATH";

/// Default filename looked up under the base directory.
pub const SETTINGS_FILE_NAME: &str = "DBSettings.txt";

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<key>\w+)=(?P<value>\S*)").expect("valid settings pattern"));

/// Immutable mapping loaded from a settings file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: IndexMap<String, String>,
}

impl Settings {
    /// Parse settings from in-memory text.
    pub fn parse(content: &str) -> Self {
        let mut values = IndexMap::new();
        for line in content.lines() {
            if let Some(captures) = ASSIGNMENT.captures(line) {
                let key = captures["key"].to_string();
                let value = captures["value"].to_string();
                values.insert(key, value);
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Load a settings file. Never fails: unreadable files produce an empty mapping.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => {
            let settings = Settings::parse(&content);
            debug!(path = %path.display(), entries = settings.len(), "loaded settings");
            settings
        }
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "Unable to read settings file; continuing with empty settings"
            );
            Settings::default()
        }
    }
}

/// Resolve the settings path: `DBRUN_SETTINGS_PATH` when set, otherwise
/// `DBSettings.txt` under `base_dir`.
pub fn default_settings_path(base_dir: &Path) -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    base_dir.join(SETTINGS_FILE_NAME)
}
