// ── Adaptive API client ──
//
// Peer operations bound to one server profile and one session store.
// Authenticates lazily through the prober, attaches the cached credential
// to every call, and turns a 401 into a cleared store plus
// `CoreError::SessionExpired`. Never retries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use wgpilot_api::WgClient;

use crate::config::{ClientConfig, ServerProfile};
use crate::error::CoreError;
use crate::model::{PeerRecord, ServerInfo};
use crate::poller::PeerSource;
use crate::probe::AuthFormatProber;
use crate::session::{SessionRecord, SessionStore};

/// Outcome of validating a cached session at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// Nothing cached; the caller should authenticate.
    NoSession,
    /// The server accepted the cached session; the fetched peers are included.
    Resumed { peers: Vec<PeerRecord> },
}

/// Session-aware client for one server.
///
/// Cheaply cloneable via `Arc<ClientInner>`.
#[derive(Clone)]
pub struct AdaptiveClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    profile: ServerProfile,
    api: WgClient,
    prober: AuthFormatProber,
    store: Arc<SessionStore>,
}

impl AdaptiveClient {
    pub fn new(config: &ClientConfig, store: Arc<SessionStore>) -> Result<Self, CoreError> {
        let transport = config.transport();
        let api = WgClient::new(config.profile.url().clone(), &transport)?;
        let prober = AuthFormatProber::new(transport);
        Ok(Self::from_parts(config.profile.clone(), api, prober, store))
    }

    /// Assemble from pre-built parts (custom candidates, shared reqwest client).
    pub fn from_parts(
        profile: ServerProfile,
        api: WgClient,
        prober: AuthFormatProber,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                profile,
                api,
                prober,
                store,
            }),
        }
    }

    pub fn profile(&self) -> &ServerProfile {
        &self.inner.profile
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Probe and persist a fresh session, replacing any cached one for
    /// this server. Remembers the password on success.
    pub async fn authenticate(&self) -> Result<Arc<SessionRecord>, CoreError> {
        let writer = self.inner.store.write().await;
        let outcome = self
            .inner
            .prober
            .probe_with(&self.inner.api, &self.inner.profile)
            .await?;
        let record = writer.save(&self.inner.profile, outcome.format, outcome.credential)?;
        drop(writer);

        self.inner.store.remember_password(&self.inner.profile)?;
        Ok(record)
    }

    /// Validate a cached session with one authoritative round trip.
    ///
    /// Does not probe: with nothing cached it returns
    /// [`ResumeOutcome::NoSession`]. A rejected session is cleared and
    /// reported as `SessionExpired`.
    pub async fn resume(&self) -> Result<ResumeOutcome, CoreError> {
        let Some(session) = self.cached_session()? else {
            return Ok(ResumeOutcome::NoSession);
        };
        let peers = self.fetch_peers(&session).await?;
        info!(server = %session.server_url, "cached session accepted");
        Ok(ResumeOutcome::Resumed { peers })
    }

    /// End the session: best-effort server logout, then clear the store
    /// and forget the remembered password.
    ///
    /// A cached session for another server is refused with `Validation`
    /// before anything is sent or cleared.
    pub async fn logout(&self) -> Result<(), CoreError> {
        if let Some(session) = self.cached_session()? {
            if let Err(e) = self.inner.api.logout(&session.credential).await {
                warn!(error = %e, "server logout failed (non-fatal)");
            }
        }
        self.inner.store.clear().await?;
        self.inner
            .store
            .forget_password(&self.inner.profile.server_key())?;
        Ok(())
    }

    // ── Peer operations ──────────────────────────────────────────────

    pub async fn list_peers(&self) -> Result<Vec<PeerRecord>, CoreError> {
        let session = self.session().await?;
        self.fetch_peers(&session).await
    }

    pub async fn create_peer(&self, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("name", "peer name must not be empty"));
        }
        let session = self.session().await?;
        let result = self.inner.api.create_peer(name, &session.credential).await;
        self.settle(&session, result).await
    }

    pub async fn delete_peer(&self, id: &str) -> Result<(), CoreError> {
        let id = require_id(id)?;
        let session = self.session().await?;
        let result = self.inner.api.delete_peer(id, &session.credential).await;
        self.settle(&session, result).await
    }

    pub async fn enable_peer(&self, id: &str) -> Result<(), CoreError> {
        let id = require_id(id)?;
        let session = self.session().await?;
        let result = self.inner.api.enable_peer(id, &session.credential).await;
        self.settle(&session, result).await
    }

    pub async fn disable_peer(&self, id: &str) -> Result<(), CoreError> {
        let id = require_id(id)?;
        let session = self.session().await?;
        let result = self.inner.api.disable_peer(id, &session.credential).await;
        self.settle(&session, result).await
    }

    /// The peer's WireGuard configuration text (for QR/export consumers).
    pub async fn get_peer_config(&self, id: &str) -> Result<String, CoreError> {
        let id = require_id(id)?;
        let session = self.session().await?;
        let result = self
            .inner
            .api
            .peer_configuration(id, &session.credential)
            .await;
        self.settle(&session, result).await
    }

    pub async fn get_server_info(&self) -> Result<ServerInfo, CoreError> {
        let session = self.session().await?;
        let result = self.inner.api.server_info(&session.credential).await;
        self.settle(&session, result).await.map(ServerInfo::from)
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn fetch_peers(&self, session: &Arc<SessionRecord>) -> Result<Vec<PeerRecord>, CoreError> {
        let result = self.inner.api.list_peers(&session.credential).await;
        let peers = self.settle(session, result).await?;
        Ok(peers.into_iter().map(PeerRecord::from).collect())
    }

    /// The cached session, checked against this client's server.
    fn cached_session(&self) -> Result<Option<Arc<SessionRecord>>, CoreError> {
        let Some(record) = self.inner.store.load() else {
            return Ok(None);
        };
        if !record.is_complete() {
            return Ok(None);
        }
        if record.server_url != self.inner.profile.server_key() {
            return Err(CoreError::validation(
                "session",
                format!(
                    "cached session belongs to {owner}, not {target}; log out of {owner} first",
                    owner = record.server_url,
                    target = self.inner.profile.server_key()
                ),
            ));
        }
        Ok(Some(record))
    }

    /// The session to use for a call, probing first if nothing is cached.
    async fn session(&self) -> Result<Arc<SessionRecord>, CoreError> {
        if let Some(record) = self.cached_session()? {
            return Ok(record);
        }

        // Re-check under the writer lock so concurrent callers probe once.
        let writer = self.inner.store.write().await;
        if let Some(record) = self.cached_session()? {
            return Ok(record);
        }

        debug!(server = %self.inner.profile.server_key(), "no cached session; probing");
        let outcome = self
            .inner
            .prober
            .probe_with(&self.inner.api, &self.inner.profile)
            .await?;
        let record = writer.save(&self.inner.profile, outcome.format, outcome.credential)?;
        drop(writer);

        self.inner.store.remember_password(&self.inner.profile)?;
        Ok(record)
    }

    /// Fold an API result into the core taxonomy, expiring the session on 401.
    async fn settle<T>(
        &self,
        session: &Arc<SessionRecord>,
        result: Result<T, wgpilot_api::Error>,
    ) -> Result<T, CoreError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_auth_expired() => {
                warn!(server = %session.server_url, "server rejected session; clearing cache");
                self.inner.store.expire(session).await?;
                Err(CoreError::SessionExpired)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn require_id(id: &str) -> Result<&str, CoreError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CoreError::validation("id", "peer id must not be empty"));
    }
    Ok(id)
}

impl PeerSource for AdaptiveClient {
    async fn list_peers(&self) -> Result<Vec<PeerRecord>, CoreError> {
        AdaptiveClient::list_peers(self).await
    }
}
