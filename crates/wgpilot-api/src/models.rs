// Wire models
//
// Shapes exactly as the server sends them. Field coverage is deliberately
// lenient: older and newer server releases disagree on ids, address field
// names and whether counters may be null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A peer as returned by `GET /api/wireguard/client`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePeer {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "ipv4Address")]
    pub address: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub latest_handshake_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transfer_rx: Option<u64>,
    #[serde(default)]
    pub transfer_tx: Option<u64>,
    #[serde(default)]
    pub transfer_rx_current: Option<f64>,
    #[serde(default)]
    pub transfer_tx_current: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

/// Peer ids are UUID strings on older servers and integers on newer ones.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Body of `POST /api/wireguard/client`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePeerRequest<'a> {
    pub name: &'a str,
}

/// Payload of `GET /api/session`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireServerInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub latest_release: Option<LatestRelease>,
    #[serde(default)]
    pub authenticated: Option<bool>,
    #[serde(default)]
    pub requires_password: Option<bool>,
}

/// Latest published release, either a bare version or a release object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LatestRelease {
    Version(String),
    Detailed {
        version: String,
        #[serde(default)]
        changelog: Option<String>,
    },
}

impl LatestRelease {
    pub fn version(&self) -> &str {
        match self {
            Self::Version(v) | Self::Detailed { version: v, .. } => v,
        }
    }
}
