// ── Domain model ──
//
// Canonical peer and server types handed to consumers. Built only from
// server data (see `convert`); the only local mutation is the optimistic
// `enabled` flip applied by a poller handle.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A VPN peer managed by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub enabled: bool,
    pub latest_handshake_at: Option<DateTime<Utc>>,
    /// Cumulative bytes received by the server from this peer.
    pub transfer_rx: u64,
    /// Cumulative bytes sent by the server to this peer.
    pub transfer_tx: u64,
    /// Instantaneous receive rate in bytes/sec.
    pub transfer_rx_current: f64,
    /// Instantaneous send rate in bytes/sec.
    pub transfer_tx_current: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PeerRecord {
    /// Total bytes moved in both directions.
    pub fn total_transfer(&self) -> u64 {
        self.transfer_rx.saturating_add(self.transfer_tx)
    }
}

/// Server version and session status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub version: Option<String>,
    pub latest_release: Option<String>,
    pub authenticated: Option<bool>,
    pub requires_password: Option<bool>,
}

impl ServerInfo {
    /// `true` when both versions are known and differ.
    pub fn update_available(&self) -> bool {
        match (&self.version, &self.latest_release) {
            (Some(current), Some(latest)) => {
                current.trim_start_matches('v') != latest.trim_start_matches('v')
            }
            _ => false,
        }
    }
}
