//! Credential resolution from the loaded settings.
//!
//! A role `Admin` logs in with the `AdminAccount` and `AdminPassword` keys. A
//! procedure grantee role `App` resolves to the account in `AppAccount`. The
//! SQL Server client also needs the server name stored under `DB`.

use std::fmt;

use dbrun_types::DatabaseBackend;
use dbrun_util::Settings;

use crate::error::RunError;

pub const ACCOUNT_SUFFIX: &str = "Account";
pub const PASSWORD_SUFFIX: &str = "Password";
pub const SERVER_KEY: &str = "DB";

/// Login details for one run. Read-only once resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub role: String,
    pub account: String,
    password: String,
    /// Server or database name (`-S`) for clients that take it separately.
    pub server: Option<String>,
    /// Account receiving `EXECUTE` on installed procedures.
    pub grantee_account: Option<String>,
}

impl Credentials {
    pub fn new(role: impl Into<String>, account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            account: account.into(),
            password: password.into(),
            server: None,
            grantee_account: None,
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("role", &self.role)
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .field("server", &self.server)
            .field("grantee_account", &self.grantee_account)
            .finish()
    }
}

/// Resolve the credential set for `role` (and the optional grantee role).
pub fn resolve_credentials(
    settings: &Settings,
    role: &str,
    grantee_role: Option<&str>,
    backend: DatabaseBackend,
) -> Result<Credentials, RunError> {
    let account = required(settings, role, &format!("{role}{ACCOUNT_SUFFIX}"))?;
    let password = required(settings, role, &format!("{role}{PASSWORD_SUFFIX}"))?;
    let mut credentials = Credentials::new(role, account, password);

    if backend == DatabaseBackend::SqlServer {
        credentials.server = Some(required(settings, role, SERVER_KEY)?);
    }

    if let Some(grantee) = grantee_role.filter(|grantee| !grantee.trim().is_empty()) {
        credentials.grantee_account = Some(required(settings, grantee, &format!("{grantee}{ACCOUNT_SUFFIX}"))?);
    }

    Ok(credentials)
}

fn required(settings: &Settings, role: &str, key: &str) -> Result<String, RunError> {
    settings
        .get(key)
        .map(str::to_string)
        .ok_or_else(|| RunError::CredentialMissing {
            role: role.to_string(),
            key: key.to_string(),
        })
}
