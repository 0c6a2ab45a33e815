// ── Peer state derivation ──
//
// Pure functions over `PeerRecord`s. Every function takes `now` from the
// caller so results are deterministic under test.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::PeerRecord;

/// A handshake younger than this marks the peer online.
pub const ONLINE_WINDOW: Duration = Duration::from_secs(120);

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

/// Whole seconds since `at`, clamped at zero for timestamps in the future.
fn seconds_since(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - at).num_seconds().max(0)
}

/// Enabled, has handshaked, and the handshake is strictly younger than
/// [`ONLINE_WINDOW`].
pub fn is_online(peer: &PeerRecord, now: DateTime<Utc>) -> bool {
    if !peer.enabled {
        return false;
    }
    let Some(at) = peer.latest_handshake_at else {
        return false;
    };
    let window = i64::try_from(ONLINE_WINDOW.as_secs()).unwrap_or(i64::MAX);
    seconds_since(at, now) < window
}

// ── Handshake age ────────────────────────────────────────────────────

/// Coarse age of a peer's most recent handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum HandshakeAge {
    Never,
    /// Under a minute.
    JustNow,
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl HandshakeAge {
    fn from_seconds(secs: i64) -> Self {
        let units = |divisor: i64| u32::try_from(secs / divisor).unwrap_or(u32::MAX);
        match secs {
            s if s < MINUTE => Self::JustNow,
            s if s < HOUR => Self::Minutes(units(MINUTE)),
            s if s < DAY => Self::Hours(units(HOUR)),
            _ => Self::Days(units(DAY)),
        }
    }
}

impl fmt::Display for HandshakeAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("never"),
            Self::JustNow => f.write_str("just now"),
            Self::Minutes(n) => write!(f, "{n}m ago"),
            Self::Hours(n) => write!(f, "{n}h ago"),
            Self::Days(n) => write!(f, "{n}d ago"),
        }
    }
}

pub fn time_since_last_handshake(peer: &PeerRecord, now: DateTime<Utc>) -> HandshakeAge {
    peer.latest_handshake_at
        .map_or(HandshakeAge::Never, |at| {
            HandshakeAge::from_seconds(seconds_since(at, now))
        })
}

// ── Aggregates ───────────────────────────────────────────────────────

/// Summary counters for a peer list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeerStats {
    pub total_count: usize,
    /// Peers with `enabled == true`.
    pub active_count: usize,
    pub online_count: usize,
    /// Σ(rx + tx) in bytes, saturating.
    pub total_traffic: u64,
    /// Σ rx_current in bytes/sec.
    pub current_download_rate: f64,
    /// Σ tx_current in bytes/sec.
    pub current_upload_rate: f64,
}

pub fn aggregate(peers: &[PeerRecord], now: DateTime<Utc>) -> PeerStats {
    peers.iter().fold(
        PeerStats {
            total_count: peers.len(),
            ..PeerStats::default()
        },
        |mut stats, peer| {
            if peer.enabled {
                stats.active_count += 1;
            }
            if is_online(peer, now) {
                stats.online_count += 1;
            }
            stats.total_traffic = stats.total_traffic.saturating_add(peer.total_transfer());
            stats.current_download_rate += peer.transfer_rx_current;
            stats.current_upload_rate += peer.transfer_tx_current;
            stats
        },
    )
}

// ── Rates ────────────────────────────────────────────────────────────

/// Fill in zero instantaneous rates from counter deltas against the
/// previous snapshot.
///
/// Rates the server reported are kept. A counter that went backwards
/// (peer recreated, server restarted) yields no rate.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn derive_rates(previous: &[PeerRecord], current: &mut [PeerRecord], elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 || previous.is_empty() {
        return;
    }

    let before: HashMap<&str, &PeerRecord> =
        previous.iter().map(|p| (p.id.as_str(), p)).collect();

    let rate = |now: u64, then: u64| now.checked_sub(then).map_or(0.0, |d| d as f64 / secs);

    for peer in current.iter_mut() {
        let Some(old) = before.get(peer.id.as_str()) else {
            continue;
        };
        if peer.transfer_rx_current <= 0.0 {
            peer.transfer_rx_current = rate(peer.transfer_rx, old.transfer_rx);
        }
        if peer.transfer_tx_current <= 0.0 {
            peer.transfer_tx_current = rate(peer.transfer_tx, old.transfer_tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }

    fn peer(id: &str, enabled: bool, handshake_secs_ago: Option<i64>) -> PeerRecord {
        PeerRecord {
            id: id.into(),
            name: format!("peer-{id}"),
            address: "10.8.0.2".into(),
            public_key: "pk".into(),
            enabled,
            latest_handshake_at: handshake_secs_ago.map(|s| now() - TimeDelta::seconds(s)),
            transfer_rx: 0,
            transfer_tx: 0,
            transfer_rx_current: 0.0,
            transfer_tx_current: 0.0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn online_requires_enabled_and_recent_handshake() {
        assert!(!is_online(&peer("1", false, Some(0)), now()));
        assert!(is_online(&peer("1", true, Some(0)), now()));
        assert!(is_online(&peer("1", true, Some(90)), now()));
        assert!(!is_online(&peer("1", true, Some(121)), now()));
        assert!(!is_online(&peer("1", true, None), now()));
    }

    #[test]
    fn online_window_is_exclusive() {
        assert!(is_online(&peer("1", true, Some(119)), now()));
        assert!(!is_online(&peer("1", true, Some(120)), now()));
    }

    #[test]
    fn future_handshake_counts_as_now() {
        let p = peer("1", true, Some(-30));
        assert!(is_online(&p, now()));
        assert_eq!(time_since_last_handshake(&p, now()), HandshakeAge::JustNow);
    }

    #[test]
    fn handshake_age_thresholds() {
        let cases = [
            (None, HandshakeAge::Never),
            (Some(59), HandshakeAge::JustNow),
            (Some(60), HandshakeAge::Minutes(1)),
            (Some(3_599), HandshakeAge::Minutes(59)),
            (Some(3_600), HandshakeAge::Hours(1)),
            (Some(86_399), HandshakeAge::Hours(23)),
            (Some(86_400), HandshakeAge::Days(1)),
            (Some(10 * 86_400), HandshakeAge::Days(10)),
        ];
        for (ago, expected) in cases {
            assert_eq!(
                time_since_last_handshake(&peer("1", true, ago), now()),
                expected,
                "{ago:?}"
            );
        }
        assert_eq!(HandshakeAge::Minutes(5).to_string(), "5m ago");
        assert_eq!(HandshakeAge::Never.to_string(), "never");
    }

    #[test]
    fn aggregate_sums_counts_and_traffic() {
        let mut a = peer("a", true, Some(10));
        a.transfer_rx = 10;
        a.transfer_tx = 20;
        a.transfer_rx_current = 1.5;
        let mut b = peer("b", false, Some(10));
        b.transfer_rx = 30;
        b.transfer_tx = 6;
        b.transfer_tx_current = 2.0;

        let stats = aggregate(&[a, b], now());
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.online_count, 1);
        assert_eq!(stats.total_traffic, 66);
        assert!((stats.current_download_rate - 1.5).abs() < f64::EPSILON);
        assert!((stats.current_upload_rate - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        assert_eq!(aggregate(&[], now()), PeerStats::default());
    }

    #[test]
    fn aggregate_saturates() {
        let mut a = peer("a", true, None);
        a.transfer_rx = u64::MAX;
        let mut b = peer("b", true, None);
        b.transfer_tx = 5;
        assert_eq!(aggregate(&[a, b], now()).total_traffic, u64::MAX);
    }

    #[test]
    fn rates_are_derived_only_where_missing() {
        let mut old = peer("a", true, None);
        old.transfer_rx = 1_000;
        old.transfer_tx = 500;
        let mut gone_backwards = peer("b", true, None);
        gone_backwards.transfer_rx = 9_000;

        let mut fresh = peer("a", true, None);
        fresh.transfer_rx = 3_000;
        fresh.transfer_tx = 900;
        fresh.transfer_tx_current = 7.0;
        let mut reset = peer("b", true, None);
        reset.transfer_rx = 10;
        let newcomer = peer("c", true, None);

        let mut current = vec![fresh, reset, newcomer];
        derive_rates(&[old, gone_backwards], &mut current, Duration::from_secs(2));

        assert!((current[0].transfer_rx_current - 1_000.0).abs() < f64::EPSILON);
        assert!((current[0].transfer_tx_current - 7.0).abs() < f64::EPSILON);
        assert!(current[1].transfer_rx_current.abs() < f64::EPSILON);
        assert!(current[2].transfer_rx_current.abs() < f64::EPSILON);
    }

    #[test]
    fn negative_rate_counts_as_missing() {
        let mut old = peer("a", true, None);
        old.transfer_tx = 100;
        let mut fresh = peer("a", true, None);
        fresh.transfer_tx = 300;
        fresh.transfer_tx_current = -1.0;

        let mut current = vec![fresh];
        derive_rates(&[old], &mut current, Duration::from_secs(1));

        assert!((current[0].transfer_tx_current - 200.0).abs() < f64::EPSILON);
    }
}
