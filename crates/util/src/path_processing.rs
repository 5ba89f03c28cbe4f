use std::path::{Path, PathBuf};

use dirs_next::home_dir;

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Resolve `candidate` against `base` unless it is already absolute.
pub fn resolve_under(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(expand_tilde("  SQL/Tables "), PathBuf::from("SQL/Tables"));
    }

    #[test]
    fn expands_home_prefix() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/db/DBSettings.txt"), home.join("db/DBSettings.txt"));
        }
    }

    #[test]
    fn resolve_under_keeps_absolute_candidates() {
        let base = Path::new("/work/DB");
        assert_eq!(resolve_under(base, Path::new("Logs")), PathBuf::from("/work/DB/Logs"));
        assert_eq!(resolve_under(base, Path::new("/var/log/db")), PathBuf::from("/var/log/db"));
    }
}
