//! Session command handlers: login, logout, status, info.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tracing::info;

use wgpilot_config::Settings;
use wgpilot_core::{AdaptiveClient, ResumeOutcome, ServerInfo, SessionStore};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// What `status` shows. The credential itself is never printed.
#[derive(Serialize)]
struct SessionView {
    server_url: String,
    format: String,
    credential_kind: String,
    created_at: DateTime<Utc>,
}

fn session_detail(v: &SessionView) -> String {
    [
        format!("Server:      {}", v.server_url),
        format!("Format:      {}", v.format),
        format!("Credential:  {}", v.credential_kind),
        format!("Since:       {}", v.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ]
    .join("\n")
}

fn info_detail(i: &ServerInfo) -> String {
    let flag = |v: Option<bool>| v.map_or_else(|| "-".to_owned(), |b| b.to_string());
    let mut lines = vec![
        format!("Version:            {}", i.version.as_deref().unwrap_or("-")),
        format!("Latest release:     {}", i.latest_release.as_deref().unwrap_or("-")),
        format!("Authenticated:      {}", flag(i.authenticated)),
        format!("Requires password:  {}", flag(i.requires_password)),
    ];
    if i.update_available() {
        lines.push("Update available".into());
    }
    lines.join("\n")
}

fn prompt_password() -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(SecretString::from(password))
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn login(
    global: &GlobalOpts,
    settings: &Settings,
    store: Arc<SessionStore>,
) -> Result<(), CliError> {
    let password = match global.password {
        Some(ref password) => SecretString::from(password.clone()),
        None => prompt_password()?,
    };
    let client = config::build_client(global, settings, Arc::clone(&store), Some(password))?;
    let server = client.profile().server_key();

    // An explicit login is the one place switching servers is allowed.
    if let Some(existing) = store.load() {
        if existing.server_url != server {
            info!(from = %existing.server_url, to = %server, "switching servers");
            store.clear().await?;
        }
    }

    let record = client.authenticate().await?;
    config::remember_server(global, settings, &server)?;

    output::print_output(
        &format!("Logged in to {} ({})", record.server_url, record.format),
        global.quiet,
    );
    Ok(())
}

pub async fn logout(client: &AdaptiveClient, global: &GlobalOpts) -> Result<(), CliError> {
    client.logout().await?;
    output::print_output(
        &format!("Logged out of {}", client.profile().server_key()),
        global.quiet,
    );
    Ok(())
}

pub fn status(global: &GlobalOpts, store: &SessionStore) -> Result<(), CliError> {
    let record = store.load().ok_or(CliError::NoSession)?;
    let view = SessionView {
        server_url: record.server_url.clone(),
        format: record.format.to_string(),
        credential_kind: record.credential.kind().as_str().to_owned(),
        created_at: record.created_at,
    };
    let out = output::render_single(&global.output, &view, session_detail, |v| {
        v.server_url.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

/// One authoritative round trip; never probes.
pub async fn verify(client: &AdaptiveClient, global: &GlobalOpts) -> Result<(), CliError> {
    match client.resume().await? {
        ResumeOutcome::NoSession => Err(CliError::NoSession),
        ResumeOutcome::Resumed { peers } => {
            status(global, client.store())?;
            if matches!(global.output, OutputFormat::Table) {
                output::print_output(
                    &format!("Session accepted ({} peers)", peers.len()),
                    global.quiet,
                );
            }
            Ok(())
        }
    }
}

pub async fn info(client: &AdaptiveClient, global: &GlobalOpts) -> Result<(), CliError> {
    let info = client.get_server_info().await?;
    let out = output::render_single(&global.output, &info, info_detail, |i| {
        i.version.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
