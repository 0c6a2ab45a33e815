use thiserror::Error;

/// Top-level error type for the `wgpilot-api` crate.
///
/// Covers transport, HTTP status, and payload failures. `wgpilot-core`
/// maps these into the consumer-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server answered 401 on an authenticated call.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// Login answered 2xx but carried neither a session cookie nor a token.
    #[error("Login response carried no session credential")]
    MissingCredential,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Any non-2xx, non-401 response.
    #[error("Server error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server rejected the session.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` for connectivity failures worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
