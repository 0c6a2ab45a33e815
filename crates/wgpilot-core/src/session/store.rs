// ── Session store ──
//
// One active session per store. Readers load an `Arc` snapshot without
// locking; writers (login, clear) are serialized through an async mutex
// that can be held across a whole probe-then-save sequence.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use wgpilot_api::{AuthFormat, SessionCredential};

use super::persistence::{MemoryPersistence, SessionPersistence};
use crate::config::ServerProfile;
use crate::error::CoreError;

/// The cached outcome of a successful login.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub server_url: String,
    pub format: AuthFormat,
    pub credential: SessionCredential,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Syntactic validity only: says nothing about whether the server
    /// still accepts the credential.
    pub fn is_complete(&self) -> bool {
        !self.server_url.trim().is_empty() && !self.credential.is_empty()
    }
}

/// Holder of the single active session.
///
/// Create one per logical connection with [`SessionStore::init`] and pass
/// it (as `Arc<SessionStore>`) to whatever needs it.
pub struct SessionStore {
    persistence: Arc<dyn SessionPersistence>,
    current: ArcSwapOption<SessionRecord>,
    writer: Mutex<()>,
}

impl SessionStore {
    /// Open a store over `persistence`, loading any record a previous
    /// process left behind.
    pub fn init(persistence: Arc<dyn SessionPersistence>) -> Result<Self, CoreError> {
        let restored = persistence.load()?.filter(SessionRecord::is_complete);
        if let Some(ref record) = restored {
            debug!(server = %record.server_url, format = %record.format, "restored cached session");
        }

        Ok(Self {
            persistence,
            current: ArcSwapOption::new(restored.map(Arc::new)),
            writer: Mutex::new(()),
        })
    }

    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self {
            persistence: Arc::new(MemoryPersistence::new()),
            current: ArcSwapOption::empty(),
            writer: Mutex::new(()),
        }
    }

    /// Drop the in-memory view without touching durable storage.
    pub fn teardown(&self) {
        self.current.store(None);
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current record, if any.
    pub fn load(&self) -> Option<Arc<SessionRecord>> {
        self.current.load_full()
    }

    /// `true` iff a record exists with a non-empty URL and credential.
    ///
    /// A fast-path hint: only a live call proves the server still accepts
    /// the session.
    pub fn has_cached_session(&self) -> bool {
        self.current
            .load()
            .as_deref()
            .is_some_and(SessionRecord::is_complete)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Take the writer lock. Hold it across a probe so a concurrent
    /// `clear()` (e.g. switching servers) cannot interleave with the save.
    pub async fn write(&self) -> SessionWriter<'_> {
        SessionWriter {
            store: self,
            _guard: self.writer.lock().await,
        }
    }

    /// Persist a new session, replacing any record for the same server.
    pub async fn save(
        &self,
        profile: &ServerProfile,
        format: AuthFormat,
        credential: SessionCredential,
    ) -> Result<Arc<SessionRecord>, CoreError> {
        self.write().await.save(profile, format, credential)
    }

    /// Erase the session (logout, or a 401 was observed).
    pub async fn clear(&self) -> Result<(), CoreError> {
        self.write().await.clear()
    }

    /// Clear only if `stale` is still the current record.
    ///
    /// Used after a 401: a session saved by a concurrent login since the
    /// failing request was sent must survive.
    pub async fn expire(&self, stale: &Arc<SessionRecord>) -> Result<bool, CoreError> {
        let writer = self.write().await;
        match writer.current() {
            Some(ref current) if Arc::ptr_eq(current, stale) => {
                writer.clear()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ── Remembered passwords ─────────────────────────────────────────

    pub fn remember_password(&self, profile: &ServerProfile) -> Result<(), CoreError> {
        match profile.password() {
            Some(password) => self
                .persistence
                .store_password(&profile.server_key(), password),
            None => Ok(()),
        }
    }

    pub fn recall_password(&self, server_url: &str) -> Result<Option<SecretString>, CoreError> {
        self.persistence.load_password(server_url)
    }

    pub fn forget_password(&self, server_url: &str) -> Result<(), CoreError> {
        self.persistence.forget_password(server_url)
    }
}

/// Exclusive write access to a [`SessionStore`].
pub struct SessionWriter<'a> {
    store: &'a SessionStore,
    _guard: MutexGuard<'a, ()>,
}

impl SessionWriter<'_> {
    pub fn current(&self) -> Option<Arc<SessionRecord>> {
        self.store.load()
    }

    /// Persist then publish a new record.
    ///
    /// A record for a different server must be cleared first; the store
    /// never silently switches servers.
    pub fn save(
        &self,
        profile: &ServerProfile,
        format: AuthFormat,
        credential: SessionCredential,
    ) -> Result<Arc<SessionRecord>, CoreError> {
        let server_url = profile.server_key();

        if let Some(existing) = self.current() {
            if existing.server_url != server_url {
                return Err(CoreError::validation(
                    "session",
                    format!(
                        "a session for {} is active; clear it before switching to {server_url}",
                        existing.server_url
                    ),
                ));
            }
        }

        if credential.is_empty() {
            return Err(CoreError::validation("credential", "session credential is empty"));
        }

        let record = SessionRecord {
            server_url,
            format,
            credential,
            created_at: Utc::now(),
        };

        self.store.persistence.save(&record)?;
        let record = Arc::new(record);
        self.store.current.store(Some(Arc::clone(&record)));

        info!(server = %record.server_url, format = %record.format, "session saved");
        Ok(record)
    }

    pub fn clear(&self) -> Result<(), CoreError> {
        self.store.persistence.clear()?;
        if let Some(previous) = self.store.current.swap(None) {
            info!(server = %previous.server_url, "session cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use wgpilot_api::CredentialKind;

    use super::*;

    fn profile(url: &str) -> ServerProfile {
        ServerProfile::new(url, Some(SecretString::from("x".to_owned()))).unwrap()
    }

    fn cookie(value: &str) -> SessionCredential {
        SessionCredential::new(CredentialKind::Cookie, value)
    }

    #[tokio::test]
    async fn cached_session_follows_save_and_clear() {
        let store = SessionStore::in_memory();
        assert!(!store.has_cached_session());

        store
            .save(&profile("http://host:51821"), AuthFormat::JsonPass, cookie("sid=1"))
            .await
            .unwrap();
        assert!(store.has_cached_session());

        let record = store.load().unwrap();
        assert_eq!(record.server_url, "http://host:51821");
        assert_eq!(record.format, AuthFormat::JsonPass);

        store.clear().await.unwrap();
        assert!(!store.has_cached_session());
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn record_survives_a_new_store_over_same_persistence() {
        let persistence: Arc<dyn SessionPersistence> = Arc::new(MemoryPersistence::new());

        let first = SessionStore::init(Arc::clone(&persistence)).unwrap();
        first
            .save(&profile("http://host"), AuthFormat::FormPassword, cookie("sid=2"))
            .await
            .unwrap();
        first.teardown();
        assert!(!first.has_cached_session());

        let second = SessionStore::init(persistence).unwrap();
        let record = second.load().unwrap();
        assert_eq!(record.format, AuthFormat::FormPassword);
        assert_eq!(record.credential.expose(), "sid=2");
    }

    #[tokio::test]
    async fn switching_servers_requires_clear() {
        let store = SessionStore::in_memory();
        store
            .save(&profile("http://a"), AuthFormat::JsonPassword, cookie("sid=a"))
            .await
            .unwrap();

        let err = store
            .save(&profile("http://b"), AuthFormat::JsonPassword, cookie("sid=b"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        store
            .save(&profile("http://a/"), AuthFormat::JsonPass, cookie("sid=a2"))
            .await
            .unwrap();
        assert_eq!(store.load().unwrap().credential.expose(), "sid=a2");

        store.clear().await.unwrap();
        store
            .save(&profile("http://b"), AuthFormat::JsonPassword, cookie("sid=b"))
            .await
            .unwrap();
        assert_eq!(store.load().unwrap().server_url, "http://b");
    }

    #[tokio::test]
    async fn expire_ignores_a_newer_session() {
        let store = SessionStore::in_memory();
        let p = profile("http://a");
        let old = store
            .save(&p, AuthFormat::JsonPassword, cookie("sid=old"))
            .await
            .unwrap();
        store
            .save(&p, AuthFormat::JsonPassword, cookie("sid=new"))
            .await
            .unwrap();

        assert!(!store.expire(&old).await.unwrap());
        assert!(store.has_cached_session());

        let current = store.load().unwrap();
        assert!(store.expire(&current).await.unwrap());
        assert!(!store.has_cached_session());
    }

    #[tokio::test]
    async fn empty_credential_is_rejected() {
        let store = SessionStore::in_memory();
        let err = store
            .save(&profile("http://a"), AuthFormat::JsonPassword, cookie("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(!store.has_cached_session());
    }

    #[tokio::test]
    async fn passwords_are_remembered_per_server() {
        let store = SessionStore::in_memory();
        store.remember_password(&profile("http://a/")).unwrap();

        assert!(store.recall_password("http://a").unwrap().is_some());
        assert!(store.recall_password("http://b").unwrap().is_none());

        store.forget_password("http://a").unwrap();
        assert!(store.recall_password("http://a").unwrap().is_none());
    }
}
