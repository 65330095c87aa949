use crate::{Error, Result};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keel_config::Peer;
use keel_modules::{BoxError, Module};
use parking_lot::RwLock;
use tracing::{debug, info};

const PEERS_FILE: &str = "peers.json";

/// The peers this node knows about.
///
/// Seeded from the resolved config; written to `peers.json` in the data
/// directory on cleanup.
#[derive(Debug)]
pub struct PeerBook {
    path: PathBuf,
    peers: RwLock<Vec<Peer>>,
}

impl PeerBook {
    /// Name the module is registered under.
    pub const NAME: &'static str = "peers";

    /// Create a peer book persisted under `data_dir`.
    #[must_use]
    pub fn new(data_dir: &Path, peers: Vec<Peer>) -> Self {
        Self {
            path: data_dir.join(PEERS_FILE),
            peers: RwLock::new(peers),
        }
    }

    /// Known peers, in insertion order.
    #[must_use]
    pub fn peers(&self) -> Vec<Peer> {
        self.peers.read().clone()
    }

    /// Remember a peer. Returns `false` if it was already known.
    pub fn add(&self, peer: Peer) -> bool {
        let mut peers = self.peers.write();
        if peers.contains(&peer) {
            return false;
        }

        debug!(ip = %peer.ip, port = peer.port, "peer added");
        peers.push(peer);

        true
    }

    /// Write the known peers to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.peers())?;

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(Error::io("failed to write peers file", &self.path))
    }
}

#[async_trait]
impl Module for PeerBook {
    fn module_name(&self) -> &str {
        Self::NAME
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        self.persist().await?;
        info!("saved {} peers to {}", self.peers.read().len(), self.path.display());

        Ok(())
    }
}
