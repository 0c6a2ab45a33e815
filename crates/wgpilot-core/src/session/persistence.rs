// Durability seam for the session store.
//
// Implementations must make `save` atomic: a reader in a later process
// sees either the previous record or the new one, never a mix.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use secrecy::SecretString;

use super::store::SessionRecord;
use crate::error::CoreError;

/// Backing storage for [`SessionStore`](super::SessionStore).
///
/// Besides the session record, a backend may remember the password per
/// server so a later process can re-authenticate without prompting.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Result<Option<SessionRecord>, CoreError>;

    fn save(&self, record: &SessionRecord) -> Result<(), CoreError>;

    fn clear(&self) -> Result<(), CoreError>;

    fn store_password(&self, server_url: &str, password: &SecretString) -> Result<(), CoreError>;

    fn load_password(&self, server_url: &str) -> Result<Option<SecretString>, CoreError>;

    fn forget_password(&self, server_url: &str) -> Result<(), CoreError>;
}

/// Process-local persistence. Used in tests and by consumers that do not
/// want anything written to disk.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    record: Mutex<Option<SessionRecord>>,
    passwords: Mutex<HashMap<String, SecretString>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<SessionRecord>, CoreError> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, record: &SessionRecord) -> Result<(), CoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn store_password(&self, server_url: &str, password: &SecretString) -> Result<(), CoreError> {
        self.passwords
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(server_url.to_owned(), password.clone());
        Ok(())
    }

    fn load_password(&self, server_url: &str) -> Result<Option<SecretString>, CoreError> {
        Ok(self
            .passwords
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(server_url)
            .cloned())
    }

    fn forget_password(&self, server_url: &str) -> Result<(), CoreError> {
        self.passwords
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(server_url);
        Ok(())
    }
}
