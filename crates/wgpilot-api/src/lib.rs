// wgpilot-api: Async Rust client for wg-easy style WireGuard management servers

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod peers;
pub mod session;
pub mod transport;

pub use auth::{AuthFormat, CredentialKind, SessionCredential};
pub use client::WgClient;
pub use error::Error;
pub use models::{CreatePeerRequest, LatestRelease, WirePeer, WireServerInfo};
pub use transport::{TlsMode, TransportConfig};
