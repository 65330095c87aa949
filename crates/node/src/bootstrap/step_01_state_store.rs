//! Bootstrap Step 1: State Store
//!
//! Opens the file-backed state store in the data directory. The store is the
//! storage handle the supervisor closes last on shutdown.

use super::Bootstrap;
use crate::error::Error;
use crate::store::StateStore;

use std::sync::Arc;

use tracing::info;

pub async fn execute(bootstrap: &mut Bootstrap<'_>) -> Result<(), Error> {
    let config = bootstrap.context.config();

    let store = StateStore::open(&config.data_dir, &config.version).await?;

    bootstrap.store = Some(Arc::new(store));

    info!("state store opened in {}", config.data_dir.display());

    Ok(())
}
