//! Bootstrap Step 3: Status Listener
//!
//! Binds the node's listening address. Accepting starts with the runtime.

use super::Bootstrap;
use crate::error::Error;
use crate::status::{NodeStatus, StatusListener};

use std::net::SocketAddr;
use std::sync::Arc;

pub async fn execute(bootstrap: &mut Bootstrap<'_>) -> Result<(), Error> {
    let config = bootstrap.context.config();

    let status_listener = Arc::new(
        StatusListener::bind(
            SocketAddr::new(config.address, config.port),
            NodeStatus {
                version: config.version.clone(),
                network: config.net_version.clone(),
                port: config.port,
            },
        )
        .await?,
    );

    bootstrap.status_listener = Some(status_listener.clone());
    bootstrap.add_module(status_listener)
}
