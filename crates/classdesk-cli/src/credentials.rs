//! Passwords remembered with `login --remember`.
//!
//! Entries are scoped to the API URL they were used against, so switching
//! `CLASSDESK_API_URL` between a local and a staging backend never offers
//! one server's password to the other.

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "classdesk";

/// Secret storage keyed by an opaque account string.
pub trait PasswordVault: Send + Sync {
    /// Returns `Ok(None)` if nothing is stored for `account`.
    fn get(&self, account: &str) -> Result<Option<String>>;

    fn set(&self, account: &str, password: &str) -> Result<()>;

    /// Returns `Ok(())` even if nothing was stored.
    fn delete(&self, account: &str) -> Result<()>;
}

/// The OS keychain, under the `classdesk` service.
#[derive(Debug, Default)]
pub struct KeychainVault;

impl KeychainVault {
    fn entry(account: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, account).context("Failed to create keyring entry")
    }
}

impl PasswordVault for KeychainVault {
    fn get(&self, account: &str) -> Result<Option<String>> {
        match Self::entry(account)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve password from keychain"),
        }
    }

    fn set(&self, account: &str, password: &str) -> Result<()> {
        Self::entry(account)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    fn delete(&self, account: &str) -> Result<()> {
        match Self::entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

/// Remembered passwords for one backend.
pub struct CredentialStore {
    api_url: String,
    vault: Box<dyn PasswordVault>,
}

impl CredentialStore {
    /// Keychain-backed store for `api_url`.
    pub fn keychain(api_url: impl Into<String>) -> Self {
        Self::with_vault(api_url, Box::new(KeychainVault))
    }

    pub fn with_vault(api_url: impl Into<String>, vault: Box<dyn PasswordVault>) -> Self {
        Self {
            api_url: api_url.into(),
            vault,
        }
    }

    pub fn remember(&self, username: &str, password: &str) -> Result<()> {
        self.vault.set(&account_key(username, &self.api_url), password)?;
        debug!(username, api_url = %self.api_url, "Remembered password");
        Ok(())
    }

    /// The remembered password, if any. Vault failures are logged and read
    /// as "nothing remembered" so login can fall back to prompting.
    pub fn lookup(&self, username: &str) -> Option<String> {
        match self.vault.get(&account_key(username, &self.api_url)) {
            Ok(password) => password,
            Err(e) => {
                warn!(error = %e, "Could not read remembered password");
                None
            }
        }
    }

    pub fn forget(&self, username: &str) -> Result<()> {
        self.vault.delete(&account_key(username, &self.api_url))
    }
}

/// Keychain account name: the username qualified by the API URL, with any
/// trailing slash dropped so `http://host/api` and `http://host/api/` match.
pub fn account_key(username: &str, api_url: &str) -> String {
    format!("{}@{}", username, api_url.trim_end_matches('/'))
}
