use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keel_modules::BoxError;
use tracing::{error, info};

/// The process-wide storage the node writes through.
#[async_trait]
pub trait StorageHandle
where
    Self: Send + Sync + 'static,
{
    /// Flush and release the storage.
    async fn close(&self) -> Result<(), BoxError>;
}

/// Closes a [`StorageHandle`] at most once.
pub struct StorageGuard {
    handle: Arc<dyn StorageHandle>,
    closed: AtomicBool,
}

impl StorageGuard {
    /// Take responsibility for closing `handle`.
    #[must_use]
    pub fn new(handle: Arc<dyn StorageHandle>) -> Self {
        Self {
            handle,
            closed: AtomicBool::new(false),
        }
    }

    /// Close the storage unless it already was.
    ///
    /// A failing close is logged and otherwise ignored. Returns `false` if the
    /// storage had already been closed.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        match self.handle.close().await {
            Ok(()) => info!("storage closed"),
            Err(e) => error!("failed to close storage: {e}"),
        }

        true
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for StorageGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageGuard")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
