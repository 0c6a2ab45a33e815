// ── Login format discovery ──
//
// Walks the fixed candidate list in priority order, one request per
// candidate, and stops at the first encoding that yields a credential.
// Each attempt is classified into an `Attempt`; no error escapes a
// single candidate.

use secrecy::SecretString;
use tracing::{debug, info};

use wgpilot_api::{AuthFormat, SessionCredential, TransportConfig, WgClient};

use crate::config::ServerProfile;
use crate::error::CoreError;

/// The winning encoding and the credential it produced.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub format: AuthFormat,
    pub credential: SessionCredential,
    /// Requests sent, including the successful one.
    pub attempts: usize,
}

/// Result of trying one candidate.
#[derive(Debug)]
enum Attempt {
    Accepted(SessionCredential),
    Rejected { status: u16 },
    NoCredential,
    Unreachable { reason: String },
    Failed { reason: String },
}

/// Discovers which login body encoding a server accepts.
#[derive(Debug, Clone)]
pub struct AuthFormatProber {
    transport: TransportConfig,
    candidates: Vec<AuthFormat>,
}

impl Default for AuthFormatProber {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl AuthFormatProber {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            candidates: AuthFormat::CANDIDATES.to_vec(),
        }
    }

    /// Restrict or reorder the candidates. Order is priority.
    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = AuthFormat>) -> Self {
        self.candidates = candidates.into_iter().collect();
        self
    }

    /// Find the first accepted encoding for `profile`.
    ///
    /// A profile without a password probes with the empty string.
    pub async fn probe(&self, profile: &ServerProfile) -> Result<ProbeOutcome, CoreError> {
        let client = WgClient::new(profile.url().clone(), &self.transport)?;
        self.probe_with(&client, profile).await
    }

    /// Like [`probe`](Self::probe) but over an existing client.
    pub async fn probe_with(
        &self,
        client: &WgClient,
        profile: &ServerProfile,
    ) -> Result<ProbeOutcome, CoreError> {
        if self.candidates.is_empty() {
            return Err(CoreError::validation("candidates", "no login formats to try"));
        }

        let empty = SecretString::from(String::new());
        let password = profile.password().unwrap_or(&empty);

        let mut unreachable = None;
        let mut reached_server = false;

        for (index, &format) in self.candidates.iter().enumerate() {
            let attempts = index + 1;
            match try_candidate(client, format, password).await {
                Attempt::Accepted(credential) => {
                    info!(server = %profile.server_key(), %format, attempts, "login format resolved");
                    return Ok(ProbeOutcome {
                        format,
                        credential,
                        attempts,
                    });
                }
                Attempt::Rejected { status } => {
                    reached_server = true;
                    debug!(%format, status, "login format rejected");
                }
                Attempt::NoCredential => {
                    reached_server = true;
                    debug!(%format, "login accepted without a credential");
                }
                Attempt::Failed { reason } => {
                    reached_server = true;
                    debug!(%format, %reason, "login attempt failed");
                }
                Attempt::Unreachable { reason } => {
                    debug!(%format, %reason, "login attempt could not reach server");
                    unreachable = Some(reason);
                }
            }
        }

        match unreachable {
            Some(reason) if !reached_server => Err(CoreError::Network { reason }),
            _ => Err(CoreError::AuthFormatExhausted {
                attempts: self.candidates.len(),
            }),
        }
    }
}

async fn try_candidate(client: &WgClient, format: AuthFormat, password: &SecretString) -> Attempt {
    match client.login(format, password).await {
        Ok(credential) => Attempt::Accepted(credential),
        Err(wgpilot_api::Error::Http { status, .. }) => Attempt::Rejected { status },
        Err(wgpilot_api::Error::MissingCredential) => Attempt::NoCredential,
        Err(e) if e.is_transient() || matches!(e, wgpilot_api::Error::Tls(_)) => {
            Attempt::Unreachable {
                reason: CoreError::from(e).to_string(),
            }
        }
        Err(e) => Attempt::Failed {
            reason: e.to_string(),
        },
    }
}
