//! Bootstrap Step 2: Peer Book

use super::Bootstrap;
use crate::error::Error;
use crate::peer_book::PeerBook;

use std::sync::Arc;

use tracing::{info, warn};

pub fn execute(bootstrap: &mut Bootstrap<'_>) -> Result<(), Error> {
    if bootstrap.store.is_none() {
        return Err(Error::MissingStep("state store", "peer book"));
    }

    let config = bootstrap.context.config();
    let peer_book = PeerBook::new(&config.data_dir, config.peers.clone());

    if config.peers.is_empty() {
        warn!("no peers configured");
    }

    info!("peer book seeded with {} peers", config.peers.len());

    bootstrap.add_module(Arc::new(peer_book))
}
