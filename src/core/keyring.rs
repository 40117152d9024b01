use std::error::Error;
use std::fmt;

use keyring::Entry;
use tracing::debug;

use crate::core::constants::KEYRING_SERVICE;
use crate::utils::url::normalize_base_url;

/// Failure to reach the platform keyring.
///
/// Recoverable errors mean the backend is locked or unavailable right now;
/// callers fall back to prompting. Permanent errors are reported as is.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keyring unavailable: {}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Keyring account name for a user on a given server.
pub fn credential_account(username: &str, server_url: &str) -> String {
    format!("{username}@{}", normalize_base_url(server_url))
}

/// Remembered passwords, one per `<username>@<server>` account.
#[derive(Debug, Clone, Copy)]
pub struct PasswordStore {
    enabled: bool,
}

impl PasswordStore {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn entry(&self, username: &str, server_url: &str) -> Result<Entry, KeyringAccessError> {
        Ok(Entry::new(
            KEYRING_SERVICE,
            &credential_account(username, server_url),
        )?)
    }

    pub fn get(
        &self,
        username: &str,
        server_url: &str,
    ) -> Result<Option<String>, KeyringAccessError> {
        if !self.enabled {
            return Ok(None);
        }
        match self.entry(username, server_url)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => {
                debug!(username, "no remembered password");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn set(
        &self,
        username: &str,
        server_url: &str,
        password: &str,
    ) -> Result<(), KeyringAccessError> {
        if !self.enabled {
            return Ok(());
        }
        self.entry(username, server_url)?.set_password(password)?;
        Ok(())
    }

    /// Forget the password. Returns whether one was stored.
    pub fn remove(&self, username: &str, server_url: &str) -> Result<bool, KeyringAccessError> {
        if !self.enabled {
            return Ok(false);
        }
        match self.entry(username, server_url)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_normalizes_server() {
        assert_eq!(
            credential_account("alice", "http://127.0.0.1:5000/"),
            "alice@http://127.0.0.1:5000"
        );
    }

    #[test]
    fn disabled_store_is_inert() {
        let store = PasswordStore::disabled();
        assert!(!store.is_enabled());
        assert_eq!(store.get("alice", "http://x").unwrap(), None);
        store.set("alice", "http://x", "pw").unwrap();
        assert!(!store.remove("alice", "http://x").unwrap());
    }

    #[test]
    fn platform_failures_are_recoverable() {
        let err = KeyringAccessError::from(keyring::Error::NoStorageAccess(Box::new(
            std::io::Error::new(std::io::ErrorKind::Other, "locked"),
        )));
        assert!(err.is_recoverable());
        let err = KeyringAccessError::from(keyring::Error::TooLong("user".into(), 10));
        assert!(!err.is_recoverable());
    }
}
