// Secret storage behind the durable session backend.
//
// Production uses the OS keyring; tests and headless hosts without a
// secret service use the in-memory vault.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Keyring service name for every wgpilot secret.
pub const KEYRING_SERVICE: &str = "wgpilot";

/// Minimal key/value secret store.
pub trait SecretVault: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;

    fn set(&self, key: &str, secret: &str) -> Result<(), String>;

    /// Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), String>;
}

/// OS keyring (Keychain, Credential Manager, Secret Service).
#[derive(Debug, Clone, Default)]
pub struct KeyringVault;

impl KeyringVault {
    fn entry(key: &str) -> Result<keyring::Entry, String> {
        keyring::Entry::new(KEYRING_SERVICE, key).map_err(|e| e.to_string())
    }
}

impl SecretVault for KeyringVault {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        match Self::entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), String> {
        Self::entry(key)?
            .set_password(secret)
            .map_err(|e| e.to_string())
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Process-local vault.
#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretVault for MemoryVault {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self
            .secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), String> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), secret.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
