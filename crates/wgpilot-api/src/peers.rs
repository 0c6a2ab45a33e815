// Peer endpoints
//
// CRUD and enable/disable for WireGuard peers under `/api/wireguard/client`.

use crate::auth::SessionCredential;
use crate::client::WgClient;
use crate::error::Error;
use crate::models::{CreatePeerRequest, WirePeer};

const PEERS: [&str; 2] = ["wireguard", "client"];

impl WgClient {
    /// List all peers.
    pub async fn list_peers(&self, credential: &SessionCredential) -> Result<Vec<WirePeer>, Error> {
        let url = self.api_url(&PEERS)?;
        self.get_json(url, credential).await
    }

    /// Create a peer named `name`.
    pub async fn create_peer(&self, name: &str, credential: &SessionCredential) -> Result<(), Error> {
        let url = self.api_url(&PEERS)?;
        self.post(url, Some(&CreatePeerRequest { name }), credential)
            .await
    }

    /// Delete a peer.
    pub async fn delete_peer(&self, id: &str, credential: &SessionCredential) -> Result<(), Error> {
        let url = self.api_url(&[PEERS[0], PEERS[1], id])?;
        self.delete(url, credential).await
    }

    /// Enable a peer.
    pub async fn enable_peer(&self, id: &str, credential: &SessionCredential) -> Result<(), Error> {
        let url = self.api_url(&[PEERS[0], PEERS[1], id, "enable"])?;
        self.post(url, None::<&()>, credential).await
    }

    /// Disable a peer.
    pub async fn disable_peer(&self, id: &str, credential: &SessionCredential) -> Result<(), Error> {
        let url = self.api_url(&[PEERS[0], PEERS[1], id, "disable"])?;
        self.post(url, None::<&()>, credential).await
    }

    /// Fetch the peer's WireGuard configuration file as text.
    pub async fn peer_configuration(
        &self,
        id: &str,
        credential: &SessionCredential,
    ) -> Result<String, Error> {
        let url = self.api_url(&[PEERS[0], PEERS[1], id, "configuration"])?;
        self.get_text(url, credential).await
    }
}
