//! Session and live-data layer between `wgpilot-api` and UI consumers.
//!
//! - **[`AuthFormatProber`]**: discovers which login body encoding a server
//!   accepts by trying [`AuthFormat::CANDIDATES`] in order.
//!
//! - **[`SessionStore`]**: the single active session (server URL, winning
//!   encoding, credential). Readers get consistent `Arc` snapshots; writers
//!   are serialized. Durability is delegated to a [`SessionPersistence`].
//!
//! - **[`AdaptiveClient`]**: peer operations that authenticate lazily,
//!   attach the cached credential, and clear the store on a 401.
//!
//! - **[`PeerListPoller`]**: a cancellable background loop that publishes
//!   [`PeerSnapshot`]s through a [`PollerHandle`] owned by the caller.
//!
//! - **[`derive`]** / **[`format`]**: pure functions for online status,
//!   handshake age, aggregate statistics and byte formatting.

pub mod client;
pub mod config;
pub mod convert;
pub mod derive;
pub mod error;
pub mod format;
pub mod model;
pub mod poller;
pub mod probe;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{AdaptiveClient, ResumeOutcome};
pub use config::{ClientConfig, ServerProfile, TlsVerification};
pub use derive::{HandshakeAge, PeerStats};
pub use error::CoreError;
pub use model::{PeerRecord, ServerInfo};
pub use poller::{
    PeerListPoller, PeerSnapshot, PeerSource, PollerHandle, PollerState, PollingPolicy,
    StopReason,
};
pub use probe::{AuthFormatProber, ProbeOutcome};
pub use session::{MemoryPersistence, SessionPersistence, SessionRecord, SessionStore};

pub use wgpilot_api::{AuthFormat, CredentialKind, SessionCredential};
