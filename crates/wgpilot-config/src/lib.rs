//! Configuration and durable session storage for wgpilot.
//!
//! Settings load from defaults, then `config.toml`, then `WGPILOT_*`
//! environment variables. Sessions persist through
//! [`DurableSessionPersistence`]: a small TOML metadata file in the
//! platform data directory, with the credential and remembered passwords
//! in the OS keyring.

mod durable;
mod vault;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wgpilot_core::{ClientConfig, CoreError, ServerProfile, TlsVerification};

pub use durable::DurableSessionPersistence;
pub use vault::{KeyringVault, MemoryVault, SecretVault};

/// Environment prefix for every setting (`WGPILOT_SERVER_URL`, ...).
pub const ENV_PREFIX: &str = "WGPILOT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no server configured (pass --server or set WGPILOT_SERVER_URL)")]
    NoServer,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Everything `config.toml` may contain. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Server base URL, e.g. `http://10.0.0.1:51821`.
    pub server_url: Option<String>,

    /// Connect and read timeout for every request.
    pub timeout_secs: u64,

    /// Live dashboard cadence.
    pub poll_interval_secs: u64,

    /// Background list refresh cadence.
    pub list_refresh_secs: u64,

    /// Consecutive poll failures before data is flagged stale.
    pub stale_after: u32,

    /// Accept invalid TLS certificates.
    pub insecure: bool,

    /// Extra CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            timeout_secs: 10,
            poll_interval_secs: 2,
            list_refresh_secs: 30,
            stale_after: 3,
            insecure: false,
            ca_cert: None,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn list_refresh(&self) -> Duration {
        Duration::from_secs(self.list_refresh_secs.max(1))
    }

    /// Build a core `ClientConfig`. `server` overrides `server_url`.
    pub fn client_config(
        &self,
        server: Option<&str>,
        password: Option<SecretString>,
    ) -> Result<ClientConfig, ConfigError> {
        let url = server
            .or(self.server_url.as_deref())
            .ok_or(ConfigError::NoServer)?;
        let profile = ServerProfile::new(url, password)?;

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let mut config = ClientConfig::new(profile);
        config.tls = tls;
        config.timeout = self.timeout();
        Ok(config)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "wgpilot", "wgpilot")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("wgpilot");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the session metadata file lives.
pub fn session_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("session.toml"),
        |dirs| dirs.data_dir().join("session.toml"),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load settings from the canonical config path plus environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(&config_path())
}

/// Load settings from `path` plus environment. A missing file is not an
/// error.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()?;
    Ok(settings)
}

/// Serialize settings to TOML and write them to `path`.
pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    save_settings_to(settings, &config_path())
}
