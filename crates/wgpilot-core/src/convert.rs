// ── Wire → domain conversion ──
//
// Missing or null counters become zero and missing rates become 0.0; the
// poller later fills zero rates from counter deltas.

use wgpilot_api::{WirePeer, WireServerInfo};

use crate::model::{PeerRecord, ServerInfo};

impl From<WirePeer> for PeerRecord {
    fn from(p: WirePeer) -> Self {
        Self {
            id: p.id,
            name: p.name,
            address: p.address,
            public_key: p.public_key,
            enabled: p.enabled,
            latest_handshake_at: p.latest_handshake_at,
            transfer_rx: p.transfer_rx.unwrap_or(0),
            transfer_tx: p.transfer_tx.unwrap_or(0),
            transfer_rx_current: non_negative(p.transfer_rx_current),
            transfer_tx_current: non_negative(p.transfer_tx_current),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

fn non_negative(rate: Option<f64>) -> f64 {
    rate.filter(|r| r.is_finite() && *r > 0.0).unwrap_or(0.0)
}

impl From<WireServerInfo> for ServerInfo {
    fn from(info: WireServerInfo) -> Self {
        Self {
            version: info.version,
            latest_release: info.latest_release.map(|r| r.version().to_owned()),
            authenticated: info.authenticated,
            requires_password: info.requires_password,
        }
    }
}
