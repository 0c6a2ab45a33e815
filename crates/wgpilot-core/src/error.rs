// ── Core error types ──
//
// Consumer-facing errors from wgpilot-core. Callers never see reqwest
// errors or JSON parse failures directly: the `From<wgpilot_api::Error>`
// impl folds transport-layer errors into this taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Local ────────────────────────────────────────────────────────
    /// Malformed profile or argument, caught before any network call.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The session could not be read from or written to durable storage.
    #[error("Session storage error: {message}")]
    Storage { message: String },

    // ── Authentication ───────────────────────────────────────────────
    /// No login encoding was accepted by the server.
    #[error("Authentication failed: server rejected all {attempts} login formats")]
    AuthFormatExhausted { attempts: usize },

    /// The server answered 401; the cached session has been cleared.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Remote ───────────────────────────────────────────────────────
    /// Connectivity, DNS, TLS or timeout failure.
    #[error("Cannot reach server: {reason}")]
    Network { reason: String },

    /// Any non-2xx response other than 401.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body could not be understood.
    #[error("Unexpected response from server: {message}")]
    InvalidResponse { message: String },
}

impl CoreError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: message.to_string(),
        }
    }

    /// Returns `true` if the caller must go back to the authentication step.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::AuthFormatExhausted { .. }
        )
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Failures a poller logs and rides out instead of stopping.
    pub fn is_swallowed_by_poller(&self) -> bool {
        self.is_transient() || matches!(self, Self::Server { .. } | Self::InvalidResponse { .. })
    }

    /// Returns `true` for failures that may resolve by retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wgpilot_api::Error> for CoreError {
    fn from(err: wgpilot_api::Error) -> Self {
        match err {
            wgpilot_api::Error::SessionExpired => CoreError::SessionExpired,
            wgpilot_api::Error::MissingCredential => CoreError::InvalidResponse {
                message: "login succeeded without a session credential".into(),
            },
            wgpilot_api::Error::Transport(ref e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_owned()
                } else {
                    e.to_string()
                };
                CoreError::Network { reason }
            }
            wgpilot_api::Error::InvalidUrl(e) => CoreError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            wgpilot_api::Error::Tls(msg) => CoreError::Network {
                reason: format!("TLS error: {msg}"),
            },
            wgpilot_api::Error::Http { status, message } => CoreError::Server { status, message },
            wgpilot_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}
