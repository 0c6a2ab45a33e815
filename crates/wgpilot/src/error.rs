//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wgpilot_config::ConfigError;
use wgpilot_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the server: {reason}")]
    #[diagnostic(
        code(wgpilot::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {reason}")]
    #[diagnostic(
        code(wgpilot::auth_failed),
        help("Check the password and run: wgpilot login")
    )]
    AuthFailed { reason: String },

    #[error("Session expired")]
    #[diagnostic(
        code(wgpilot::session_expired),
        help("The server no longer accepts the cached session. Run: wgpilot login")
    )]
    SessionExpired,

    #[error("Not logged in")]
    #[diagnostic(code(wgpilot::no_session), help("Run: wgpilot login --server <URL>"))]
    NoSession,

    // ── Resources ────────────────────────────────────────────────────
    #[error("peer '{identifier}' not found")]
    #[diagnostic(
        code(wgpilot::not_found),
        help("Run: wgpilot peers list to see available peers")
    )]
    NotFound { identifier: String },

    #[error("peer name '{name}' is ambiguous ({count} matches)")]
    #[diagnostic(code(wgpilot::ambiguous), help("Use the peer id instead."))]
    Ambiguous { name: String, count: usize },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Server error (HTTP {status}): {message}")]
    #[diagnostic(code(wgpilot::server_error))]
    Server { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(wgpilot::invalid_response))]
    InvalidResponse { message: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wgpilot::validation))]
    Validation { field: String, reason: String },

    #[error("No server configured")]
    #[diagnostic(
        code(wgpilot::no_server),
        help(
            "Pass --server <URL>, set WGPILOT_SERVER_URL, or add server_url to\n\
             {path}"
        )
    )]
    NoServer { path: String },

    #[error("Session storage failed: {message}")]
    #[diagnostic(
        code(wgpilot::storage),
        help("Use --ephemeral to skip the keyring and session file.")
    )]
    Storage { message: String },

    #[error(transparent)]
    #[diagnostic(code(wgpilot::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::SessionExpired | Self::NoSession => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Ambiguous { .. } | Self::NoServer { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, reason } => CliError::Validation { field, reason },
            CoreError::Storage { message } => CliError::Storage { message },
            e @ CoreError::AuthFormatExhausted { .. } => CliError::AuthFailed {
                reason: e.to_string(),
            },
            CoreError::SessionExpired => CliError::SessionExpired,
            CoreError::Network { reason } => CliError::ConnectionFailed { reason },
            CoreError::Server { status: 404, message } => CliError::NotFound {
                identifier: message,
            },
            CoreError::Server { status, message } => CliError::Server { status, message },
            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Core(core) => core.into(),
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoServer => CliError::NoServer {
                path: wgpilot_config::config_path().display().to_string(),
            },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_share_an_exit_code() {
        let exhausted: CliError = CoreError::AuthFormatExhausted { attempts: 5 }.into();
        assert_eq!(exhausted.exit_code(), exit_code::AUTH);
        assert_eq!(CliError::from(CoreError::SessionExpired).exit_code(), exit_code::AUTH);
    }

    #[test]
    fn network_errors_map_to_connection() {
        let err: CliError = CoreError::Network {
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn missing_server_is_a_usage_error() {
        let err: CliError = ConfigError::NoServer.into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
