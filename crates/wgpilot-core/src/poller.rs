// ── Peer list poller ──
//
// One background task per started poller. Fetches are strictly serialized
// inside the task: a tick that arrives while a fetch is in flight is
// skipped, manual refreshes coalesce, and cancellation interrupts both the
// wait and an in-flight request. The task never outlives its handle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::derive::{self, PeerStats};
use crate::error::CoreError;
use crate::model::PeerRecord;

/// Consecutive failures after which a snapshot is reported stale.
pub const DEFAULT_STALE_AFTER: u32 = 3;

const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Anything that can produce the current peer list.
pub trait PeerSource: Send + Sync + 'static {
    fn list_peers(&self) -> impl Future<Output = Result<Vec<PeerRecord>, CoreError>> + Send;
}

/// How often to poll, and whether to poll at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub interval: Duration,
    pub enabled: bool,
}

impl PollingPolicy {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            enabled: true,
        }
    }

    pub fn paused(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    fn period(self) -> Duration {
        self.interval.max(MIN_INTERVAL)
    }
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self::every(Duration::from_secs(2))
    }
}

/// Why a poller stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called or the handle was dropped.
    Cancelled,
    /// The server rejected the session; the store has been cleared.
    SessionExpired,
    /// Re-authentication was attempted and no login format was accepted.
    AuthenticationFailed,
    /// An error that retrying cannot fix (storage, validation).
    Failed(CoreError),
}

impl StopReason {
    /// `true` when the owner should return to the login step.
    pub fn is_logout(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthenticationFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    /// Started, first fetch not yet begun.
    Idle,
    /// A fetch is in flight.
    Polling,
    /// Between fetches.
    Waiting {
        consecutive_failures: u32,
        /// The last successful snapshot is older than `stale_after` failures.
        stale: bool,
    },
    /// The policy is disabled; manual refreshes still run.
    Paused,
    Stopped(StopReason),
}

impl PollerState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Waiting { stale: true, .. })
    }
}

/// Immutable result of one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerSnapshot {
    pub peers: Vec<PeerRecord>,
    pub stats: PeerStats,
    pub fetched_at: DateTime<Utc>,
}

impl PeerSnapshot {
    fn new(peers: Vec<PeerRecord>, fetched_at: DateTime<Utc>) -> Self {
        let stats = derive::aggregate(&peers, fetched_at);
        Self {
            peers,
            stats,
            fetched_at,
        }
    }
}

type SnapshotSender = watch::Sender<Option<Arc<PeerSnapshot>>>;

// ── Poller ───────────────────────────────────────────────────────────

/// Factory for polling tasks over one [`PeerSource`].
///
/// Cheap to clone; each [`start`](Self::start) spawns an independent task
/// with its own policy, so a fast dashboard and a slow list refresh can
/// share one source.
pub struct PeerListPoller<S> {
    source: Arc<S>,
    stale_after: u32,
}

impl<S> Clone for PeerListPoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            stale_after: self.stale_after,
        }
    }
}

impl<S: PeerSource> PeerListPoller<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    pub fn with_stale_after(mut self, failures: u32) -> Self {
        self.stale_after = failures.max(1);
        self
    }

    /// Spawn the polling task. Must be called inside a tokio runtime.
    pub fn start(&self, policy: PollingPolicy) -> PollerHandle {
        let cancel = CancellationToken::new();
        let (policy_tx, policy_rx) = watch::channel(policy);
        let (state_tx, state_rx) = watch::channel(if policy.enabled {
            PollerState::Idle
        } else {
            PollerState::Paused
        });
        let snapshot_tx: Arc<SnapshotSender> = Arc::new(watch::channel(None).0);
        let refresh = Arc::new(Notify::new());

        let task = PollTask {
            source: Arc::clone(&self.source),
            stale_after: self.stale_after,
            cancel: cancel.clone(),
            policy_rx,
            state_tx,
            snapshot_tx: Arc::clone(&snapshot_tx),
            refresh: Arc::clone(&refresh),
        };
        let join = tokio::spawn(task.run());

        PollerHandle {
            cancel,
            policy_tx,
            state_rx,
            snapshot_tx,
            refresh,
            task: Some(join),
        }
    }
}

// ── Handle ───────────────────────────────────────────────────────────

/// Owner's end of a running poller. Dropping it cancels the task.
pub struct PollerHandle {
    cancel: CancellationToken,
    policy_tx: watch::Sender<PollingPolicy>,
    state_rx: watch::Receiver<PollerState>,
    snapshot_tx: Arc<SnapshotSender>,
    refresh: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollerState> {
        self.state_rx.clone()
    }

    /// The latest snapshot, if any fetch has succeeded yet.
    pub fn snapshot(&self) -> Option<Arc<PeerSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PeerSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    pub fn policy(&self) -> PollingPolicy {
        *self.policy_tx.borrow()
    }

    /// Change interval or pause/resume. Takes effect at the next wait.
    pub fn set_policy(&self, policy: PollingPolicy) {
        self.policy_tx.send_replace(policy);
    }

    /// Request an immediate fetch. Requests made while a fetch is in flight
    /// coalesce into one follow-up fetch.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Flip `enabled` on a peer in the current snapshot after a successful
    /// enable/disable call. The next poll overwrites it.
    ///
    /// Returns `false` if no snapshot contains the peer.
    pub fn mark_enabled(&self, id: &str, enabled: bool) -> bool {
        self.snapshot_tx.send_if_modified(|current| {
            let Some(snapshot) = current.as_deref() else {
                return false;
            };
            if !snapshot.peers.iter().any(|p| p.id == id) {
                return false;
            }

            let fetched_at = snapshot.fetched_at;
            let mut peers = snapshot.peers.clone();
            for peer in peers.iter_mut().filter(|p| p.id == id) {
                peer.enabled = enabled;
            }
            *current = Some(Arc::new(PeerSnapshot::new(peers, fetched_at)));
            true
        })
    }

    /// Wait until the task stops on its own and report why.
    pub async fn stopped(&self) -> StopReason {
        let mut rx = self.state_rx.clone();
        match rx.wait_for(PollerState::is_stopped).await.as_deref() {
            Ok(PollerState::Stopped(reason)) => reason.clone(),
            _ => StopReason::Cancelled,
        }
    }

    /// Cancel the task (including an in-flight fetch) and wait for it to
    /// exit. Idempotent.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Task ─────────────────────────────────────────────────────────────

struct PollTask<S> {
    source: Arc<S>,
    stale_after: u32,
    cancel: CancellationToken,
    policy_rx: watch::Receiver<PollingPolicy>,
    state_tx: watch::Sender<PollerState>,
    snapshot_tx: Arc<SnapshotSender>,
    refresh: Arc<Notify>,
}

enum Wake {
    Fetch,
    PolicyChanged,
    Cancelled,
}

fn interval_for(policy: PollingPolicy, start: Instant) -> Interval {
    let mut interval = tokio::time::interval_at(start, policy.period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl<S: PeerSource> PollTask<S> {
    async fn run(mut self) {
        let mut policy = *self.policy_rx.borrow_and_update();
        let mut interval = interval_for(policy, Instant::now());
        let mut failures: u32 = 0;
        let mut last_fetch: Option<Instant> = None;

        debug!(interval = ?policy.period(), enabled = policy.enabled, "poller started");

        let reason = loop {
            match self.wait(&mut interval, policy).await {
                Wake::Cancelled => break StopReason::Cancelled,
                Wake::PolicyChanged => {
                    let next = *self.policy_rx.borrow_and_update();
                    if next.period() != policy.period() {
                        interval = interval_for(next, Instant::now() + next.period());
                    }
                    policy = next;
                    self.state_tx.send_replace(self.resting_state(policy, failures));
                    continue;
                }
                Wake::Fetch => {}
            }

            self.state_tx.send_replace(PollerState::Polling);
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break StopReason::Cancelled,
                result = self.source.list_peers() => result,
            };

            match result {
                Ok(peers) => {
                    let now = Instant::now();
                    self.publish(peers, last_fetch.map(|at| now - at));
                    last_fetch = Some(now);
                    failures = 0;
                }
                Err(e) if e.is_swallowed_by_poller() => {
                    failures = failures.saturating_add(1);
                    warn!(error = %e, consecutive_failures = failures, "peer poll failed");
                }
                Err(e) if e.requires_login() => {
                    warn!(error = %e, "poll stopped: session is no longer valid");
                    break if e.is_session_expired() {
                        StopReason::SessionExpired
                    } else {
                        StopReason::AuthenticationFailed
                    };
                }
                Err(e) => {
                    warn!(error = %e, "poll stopped: error is not transient");
                    break StopReason::Failed(e);
                }
            }

            self.state_tx.send_replace(self.resting_state(policy, failures));
        };

        info!(?reason, "poller stopped");
        self.state_tx.send_replace(PollerState::Stopped(reason));
    }

    async fn wait(&mut self, interval: &mut Interval, policy: PollingPolicy) -> Wake {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Wake::Cancelled,
            changed = self.policy_rx.changed() => match changed {
                Ok(()) => Wake::PolicyChanged,
                Err(_) => Wake::Cancelled,
            },
            () = self.refresh.notified() => Wake::Fetch,
            _ = interval.tick(), if policy.enabled => Wake::Fetch,
        }
    }

    fn resting_state(&self, policy: PollingPolicy, failures: u32) -> PollerState {
        if policy.enabled {
            PollerState::Waiting {
                consecutive_failures: failures,
                stale: failures >= self.stale_after,
            }
        } else {
            PollerState::Paused
        }
    }

    fn publish(&self, mut peers: Vec<PeerRecord>, elapsed: Option<Duration>) {
        let previous = self.snapshot_tx.borrow().clone();
        if let (Some(elapsed), Some(previous)) = (elapsed, previous) {
            derive::derive_rates(&previous.peers, &mut peers, elapsed);
        }
        debug!(count = peers.len(), "peer snapshot published");
        let snapshot = PeerSnapshot::new(peers, Utc::now());
        self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
    }
}
