//! Peer command handlers.

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::Tabled;

use wgpilot_config::Settings;
use wgpilot_core::derive::{self, PeerStats};
use wgpilot_core::format::{format_bytes, format_rate};
use wgpilot_core::{AdaptiveClient, PeerRecord};

use crate::cli::{GlobalOpts, OutputFormat, PeersArgs, PeersCommand};
use crate::error::CliError;
use crate::output;

use super::watch;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct PeerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Handshake")]
    handshake: String,
    #[tabled(rename = "Rx")]
    rx: String,
    #[tabled(rename = "Tx")]
    tx: String,
    #[tabled(rename = "Rate ↓/↑")]
    rate: String,
}

impl PeerRow {
    pub(crate) fn new(p: &PeerRecord, now: DateTime<Utc>, color: bool) -> Self {
        let status = match (p.enabled, derive::is_online(p, now)) {
            (false, _) => "disabled",
            (true, true) => "online",
            (true, false) => "offline",
        };
        let status = match (color, status) {
            (false, s) => s.to_owned(),
            (true, "online") => status.green().to_string(),
            (true, "disabled") => status.dimmed().to_string(),
            (true, s) => s.yellow().to_string(),
        };

        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            address: p.address.clone(),
            status,
            handshake: derive::time_since_last_handshake(p, now).to_string(),
            rx: format_bytes(p.transfer_rx),
            tx: format_bytes(p.transfer_tx),
            rate: format!(
                "{} / {}",
                format_rate(p.transfer_rx_current),
                format_rate(p.transfer_tx_current)
            ),
        }
    }
}

pub(crate) fn render_peers(peers: &[PeerRecord], format: &OutputFormat, color: bool) -> String {
    let now = Utc::now();
    output::render_list(format, peers, |p| PeerRow::new(p, now, color), |p| p.id.clone())
}

pub(crate) fn stats_detail(s: &PeerStats) -> String {
    [
        format!("Peers:     {}", s.total_count),
        format!("Enabled:   {}", s.active_count),
        format!("Online:    {}", s.online_count),
        format!("Traffic:   {}", format_bytes(s.total_traffic)),
        format!("Download:  {}", format_rate(s.current_download_rate)),
        format!("Upload:    {}", format_rate(s.current_upload_rate)),
    ]
    .join("\n")
}

/// Find a peer by exact id, then by unique name.
fn resolve_peer(peers: &[PeerRecord], identifier: &str) -> Result<String, CliError> {
    if let Some(peer) = peers.iter().find(|p| p.id == identifier) {
        return Ok(peer.id.clone());
    }
    let by_name: Vec<&PeerRecord> = peers.iter().filter(|p| p.name == identifier).collect();
    match by_name.as_slice() {
        [peer] => Ok(peer.id.clone()),
        [] => Err(CliError::NotFound {
            identifier: identifier.into(),
        }),
        many => Err(CliError::Ambiguous {
            name: identifier.into(),
            count: many.len(),
        }),
    }
}

async fn lookup(client: &AdaptiveClient, identifier: &str) -> Result<String, CliError> {
    let peers = client.list_peers().await?;
    resolve_peer(&peers, identifier)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &AdaptiveClient,
    args: PeersArgs,
    global: &GlobalOpts,
    settings: &Settings,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let (refresh, stale_after) = (settings.list_refresh(), settings.stale_after);

    match args.command {
        PeersCommand::List { follow: true, .. } => {
            watch::follow(client.clone(), refresh, None, global, stale_after, false).await
        }

        PeersCommand::List { online, .. } => {
            let mut peers = client.list_peers().await?;
            if online {
                let now = Utc::now();
                peers.retain(|p| derive::is_online(p, now));
            }
            output::print_output(&render_peers(&peers, &global.output, color), global.quiet);
            Ok(())
        }

        PeersCommand::Stats => {
            let peers = client.list_peers().await?;
            let stats = derive::aggregate(&peers, Utc::now());
            let out = output::render_single(&global.output, &stats, stats_detail, |s| {
                s.total_count.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PeersCommand::Create { name } => {
            client.create_peer(&name).await?;
            output::print_output(&format!("Created peer '{}'", name.trim()), global.quiet);
            Ok(())
        }

        PeersCommand::Delete { peer } => {
            let id = lookup(client, &peer).await?;
            client.delete_peer(&id).await?;
            output::print_output(&format!("Deleted peer {id}"), global.quiet);
            Ok(())
        }

        PeersCommand::Enable { peer } => {
            let id = lookup(client, &peer).await?;
            client.enable_peer(&id).await?;
            output::print_output(&format!("Enabled peer {id}"), global.quiet);
            Ok(())
        }

        PeersCommand::Disable { peer } => {
            let id = lookup(client, &peer).await?;
            client.disable_peer(&id).await?;
            output::print_output(&format!("Disabled peer {id}"), global.quiet);
            Ok(())
        }

        PeersCommand::Config { peer } => {
            let id = lookup(client, &peer).await?;
            let text = client.get_peer_config(&id).await?;
            output::print_output(text.trim_end(), global.quiet);
            Ok(())
        }
    }
}
