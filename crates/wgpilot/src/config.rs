//! CLI-aware configuration helpers.
//!
//! Wraps `wgpilot-config` with `GlobalOpts` overrides: settings from the
//! config file, server resolution, password resolution, and the session
//! store backend.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::debug;

use wgpilot_config::{DurableSessionPersistence, Settings};
use wgpilot_core::{AdaptiveClient, SessionStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load settings and apply flag overrides.
pub fn load_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    let mut settings = match global.config {
        Some(ref path) => wgpilot_config::load_settings_from(path)?,
        None => wgpilot_config::load_settings()?,
    };
    if global.insecure {
        settings.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        settings.timeout_secs = timeout;
    }
    Ok(settings)
}

/// Persist the server URL after the first successful login so later
/// commands don't need `--server`.
pub fn remember_server(
    global: &GlobalOpts,
    settings: &Settings,
    server: &str,
) -> Result<(), CliError> {
    if global.ephemeral || settings.server_url.is_some() {
        return Ok(());
    }
    let updated = Settings {
        server_url: Some(server.to_owned()),
        ..settings.clone()
    };
    match global.config {
        Some(ref path) => wgpilot_config::save_settings_to(&updated, path)?,
        None => wgpilot_config::save_settings(&updated)?,
    }
    debug!(server, "server saved to config");
    Ok(())
}

pub fn open_store(global: &GlobalOpts) -> Result<Arc<SessionStore>, CliError> {
    if global.ephemeral {
        return Ok(Arc::new(SessionStore::in_memory()));
    }
    let persistence = DurableSessionPersistence::open_default();
    debug!(path = %persistence.path().display(), "opening session store");
    Ok(Arc::new(SessionStore::init(Arc::new(persistence))?))
}

/// Server URL from `--server`, then config, then the cached session.
pub fn resolve_server(
    global: &GlobalOpts,
    settings: &Settings,
    store: &SessionStore,
) -> Result<String, CliError> {
    global
        .server
        .clone()
        .or_else(|| settings.server_url.clone())
        .or_else(|| store.load().map(|record| record.server_url.clone()))
        .ok_or_else(|| CliError::NoServer {
            path: wgpilot_config::config_path().display().to_string(),
        })
}

/// Build a client for the resolved server.
///
/// Password resolution: `explicit`, then `--password` / `WGPILOT_PASSWORD`,
/// then the password remembered at the last login.
pub fn build_client(
    global: &GlobalOpts,
    settings: &Settings,
    store: Arc<SessionStore>,
    explicit: Option<SecretString>,
) -> Result<AdaptiveClient, CliError> {
    let server = resolve_server(global, settings, &store)?;
    let mut config = settings.client_config(Some(&server), None)?;

    let password = match explicit {
        Some(password) => Some(password),
        None => match global.password {
            Some(ref password) => Some(SecretString::from(password.clone())),
            None => store.recall_password(&config.profile.server_key())?,
        },
    };
    if let Some(password) = password {
        config.profile = config.profile.clone().with_password(password);
    }

    Ok(AdaptiveClient::new(&config, store)?)
}
