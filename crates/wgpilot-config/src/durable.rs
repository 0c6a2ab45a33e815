// Durable `SessionPersistence`.
//
// Non-secret metadata goes to a TOML file that is replaced atomically
// (write temp, then rename). The credential and remembered passwords go
// to a `SecretVault`. A metadata file whose credential is missing from
// the vault loads as "no session".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wgpilot_core::{
    AuthFormat, CoreError, CredentialKind, SessionCredential, SessionPersistence, SessionRecord,
};

use crate::vault::{KeyringVault, SecretVault};

const SESSION_KEY: &str = "session";

fn password_key(server_url: &str) -> String {
    format!("password/{server_url}")
}

/// Vault form of the session credential: the record's `created_at`, a
/// newline, then the credential. A credential only loads next to the
/// metadata file written by the same save.
fn seal(created_at: DateTime<Utc>, credential: &str) -> String {
    format!(
        "{}\n{credential}",
        created_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

fn unseal(sealed: &str, created_at: DateTime<Utc>) -> Option<&str> {
    let (stamp, credential) = sealed.split_once('\n')?;
    let stamp = DateTime::parse_from_rfc3339(stamp).ok()?;
    (stamp == created_at).then_some(credential)
}

/// On-disk shape of `session.toml`.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    server_url: String,
    format: String,
    credential_kind: String,
    created_at: DateTime<Utc>,
}

pub struct DurableSessionPersistence {
    path: PathBuf,
    vault: Arc<dyn SecretVault>,
}

impl DurableSessionPersistence {
    /// Metadata at the platform data path, secrets in the OS keyring.
    pub fn open_default() -> Self {
        Self::new(crate::session_path(), Arc::new(KeyringVault))
    }

    pub fn new(path: impl Into<PathBuf>, vault: Arc<dyn SecretVault>) -> Self {
        Self {
            path: path.into(),
            vault,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Option<SessionFile>, CoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::storage(format!(
                    "reading {}: {e}",
                    self.path.display()
                )));
            }
        };
        match toml::from_str(&text) {
            Ok(file) => Ok(Some(file)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn write_file(&self, file: &SessionFile) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(CoreError::storage)?;
        }
        let text = toml::to_string_pretty(file).map_err(CoreError::storage)?;

        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text).map_err(CoreError::storage)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            CoreError::storage(format!("replacing {}: {e}", self.path.display()))
        })
    }
}

impl SessionPersistence for DurableSessionPersistence {
    fn load(&self) -> Result<Option<SessionRecord>, CoreError> {
        let Some(file) = self.read_file()? else {
            return Ok(None);
        };

        let (Ok(format), Ok(kind)) = (
            file.format.parse::<AuthFormat>(),
            file.credential_kind.parse::<CredentialKind>(),
        ) else {
            warn!(format = %file.format, kind = %file.credential_kind, "ignoring session with unknown format");
            return Ok(None);
        };

        let Some(sealed) = self.vault.get(SESSION_KEY).map_err(CoreError::storage)? else {
            debug!("session metadata present but credential missing from vault");
            return Ok(None);
        };
        let Some(secret) = unseal(&sealed, file.created_at) else {
            warn!("session credential does not match session metadata; ignoring");
            return Ok(None);
        };

        Ok(Some(SessionRecord {
            server_url: file.server_url,
            format,
            credential: SessionCredential::new(kind, secret),
            created_at: file.created_at,
        }))
    }

    fn save(&self, record: &SessionRecord) -> Result<(), CoreError> {
        let previous = self.vault.get(SESSION_KEY).map_err(CoreError::storage)?;
        self.vault
            .set(
                SESSION_KEY,
                &seal(record.created_at, record.credential.expose()),
            )
            .map_err(CoreError::storage)?;

        let written = self.write_file(&SessionFile {
            server_url: record.server_url.clone(),
            format: record.format.as_str().to_owned(),
            credential_kind: record.credential.kind().as_str().to_owned(),
            created_at: record.created_at,
        });
        if written.is_err() {
            let restored = match previous {
                Some(ref sealed) => self.vault.set(SESSION_KEY, sealed),
                None => self.vault.delete(SESSION_KEY),
            };
            if let Err(e) = restored {
                warn!(error = %e, "could not restore the previous session credential");
            }
        }
        written
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CoreError::storage(format!(
                    "removing {}: {e}",
                    self.path.display()
                )));
            }
        }
        self.vault.delete(SESSION_KEY).map_err(CoreError::storage)
    }

    fn store_password(&self, server_url: &str, password: &SecretString) -> Result<(), CoreError> {
        self.vault
            .set(&password_key(server_url), password.expose_secret())
            .map_err(CoreError::storage)
    }

    fn load_password(&self, server_url: &str) -> Result<Option<SecretString>, CoreError> {
        Ok(self
            .vault
            .get(&password_key(server_url))
            .map_err(CoreError::storage)?
            .map(SecretString::from))
    }

    fn forget_password(&self, server_url: &str) -> Result<(), CoreError> {
        self.vault
            .delete(&password_key(server_url))
            .map_err(CoreError::storage)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use wgpilot_core::{ServerProfile, SessionStore};

    use super::*;
    use crate::vault::MemoryVault;

    fn persistence(dir: &Path, vault: &Arc<MemoryVault>) -> DurableSessionPersistence {
        let vault: Arc<dyn SecretVault> = Arc::clone(vault) as Arc<dyn SecretVault>;
        DurableSessionPersistence::new(dir.join("data").join("session.toml"), vault)
    }

    fn profile() -> ServerProfile {
        ServerProfile::new(
            "http://10.0.0.1:51821",
            Some(SecretString::from("hunter2".to_owned())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn session_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());

        let store = SessionStore::init(Arc::new(persistence(dir.path(), &vault))).unwrap();
        store
            .save(
                &profile(),
                AuthFormat::FormPass,
                SessionCredential::new(CredentialKind::Cookie, "connect.sid=abc"),
            )
            .await
            .unwrap();

        let text = std::fs::read_to_string(dir.path().join("data/session.toml")).unwrap();
        assert!(text.contains("form-pass"));
        assert!(!text.contains("connect.sid"), "credential must not hit disk");

        let restarted = SessionStore::init(Arc::new(persistence(dir.path(), &vault))).unwrap();
        let record = restarted.load().unwrap();
        assert_eq!(record.server_url, "http://10.0.0.1:51821");
        assert_eq!(record.format, AuthFormat::FormPass);
        assert_eq!(record.credential.kind(), CredentialKind::Cookie);
        assert_eq!(record.credential.expose(), "connect.sid=abc");
    }

    #[tokio::test]
    async fn clear_removes_file_and_credential_but_keeps_password() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let store = SessionStore::init(Arc::new(persistence(dir.path(), &vault))).unwrap();

        store
            .save(
                &profile(),
                AuthFormat::JsonPassword,
                SessionCredential::new(CredentialKind::Bearer, "tok"),
            )
            .await
            .unwrap();
        store.remember_password(&profile()).unwrap();
        assert_eq!(vault.len(), 2);

        store.clear().await.unwrap();
        assert!(!dir.path().join("data/session.toml").exists());
        assert_eq!(vault.len(), 1);
        assert!(
            store
                .recall_password("http://10.0.0.1:51821")
                .unwrap()
                .is_some()
        );

        store.clear().await.unwrap();
    }

    #[test]
    fn missing_credential_loads_as_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let backend = persistence(dir.path(), &vault);
        backend
            .save(&SessionRecord {
                server_url: "http://h".into(),
                format: AuthFormat::PlainText,
                credential: SessionCredential::new(CredentialKind::Bearer, "tok"),
                created_at: Utc::now(),
            })
            .unwrap();

        vault.delete(SESSION_KEY).unwrap();
        assert!(backend.load().unwrap().is_none());
    }

    fn record(format: AuthFormat, kind: CredentialKind, secret: &str) -> SessionRecord {
        SessionRecord {
            server_url: "http://10.0.0.1:51821".into(),
            format,
            credential: SessionCredential::new(kind, secret),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn failed_metadata_write_keeps_the_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let backend = persistence(dir.path(), &vault);
        backend
            .save(&record(
                AuthFormat::JsonPassword,
                CredentialKind::Cookie,
                "connect.sid=old",
            ))
            .unwrap();

        std::fs::create_dir(dir.path().join("data/session.toml.tmp")).unwrap();
        let err = backend
            .save(&record(AuthFormat::PlainText, CredentialKind::Bearer, "tok-new"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage { .. }));

        let loaded = backend.load().unwrap().unwrap();
        assert_eq!(loaded.format, AuthFormat::JsonPassword);
        assert_eq!(loaded.credential.kind(), CredentialKind::Cookie);
        assert_eq!(loaded.credential.expose(), "connect.sid=old");
    }

    #[test]
    fn credential_from_another_save_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let backend = persistence(dir.path(), &vault);
        let saved = record(AuthFormat::JsonPassword, CredentialKind::Cookie, "sid=old");
        backend.save(&saved).unwrap();

        let later = saved.created_at + chrono::TimeDelta::seconds(5);
        vault.set(SESSION_KEY, &seal(later, "tok-new")).unwrap();
        assert!(backend.load().unwrap().is_none());

        vault.set(SESSION_KEY, "sid=unsealed").unwrap();
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_metadata_loads_as_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let backend = persistence(dir.path(), &vault);

        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(backend.path(), "server_url = 3\n").unwrap();
        assert!(backend.load().unwrap().is_none());

        std::fs::write(
            backend.path(),
            "server_url = \"http://h\"\nformat = \"xml\"\ncredential_kind = \"cookie\"\ncreated_at = \"2026-01-01T00:00:00Z\"\n",
        )
        .unwrap();
        vault.set(SESSION_KEY, "sid=1").unwrap();
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn passwords_are_keyed_by_server() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let backend = persistence(dir.path(), &vault);

        backend
            .store_password("http://a", &SecretString::from("pa".to_owned()))
            .unwrap();
        assert_eq!(
            backend
                .load_password("http://a")
                .unwrap()
                .unwrap()
                .expose_secret(),
            "pa"
        );
        assert!(backend.load_password("http://b").unwrap().is_none());

        backend.forget_password("http://a").unwrap();
        assert!(backend.load_password("http://a").unwrap().is_none());
        assert!(vault.is_empty());
    }
}
