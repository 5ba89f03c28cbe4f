//! # Text Processing Utilities
//!
//! Helpers for deciding which settings values must never be echoed to the
//! console or the tracing output.

const SECRET_KEY_KEYWORDS: &[&str] = &["PASSWORD", "PASSWD", "PWD", "SECRET", "TOKEN", "PASSPHRASE"];

/// Whether a settings key names a secret (for example `AdminPassword`).
///
/// # Example
/// ```rust
/// use dbrun_util::is_secret_key;
///
/// assert!(is_secret_key("AdminPassword"));
/// assert!(!is_secret_key("AdminAccount"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SECRET_KEY_KEYWORDS.iter().any(|keyword| upper.ends_with(keyword))
}
