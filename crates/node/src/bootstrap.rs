mod step_01_state_store;
mod step_02_peer_book;
mod step_03_status_listener;

use crate::error::{Error, Result};
use crate::status::StatusListener;
use crate::store::StateStore;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use keel_modules::{BoxError, Module, ModuleRegistry};
use keel_supervisor::{NodeContext, NodeInitializer, Scope, ShutdownHandle, StorageHandle};
use tracing::{info, warn};

/// State carried from one bootstrap step to the next.
pub struct Bootstrap<'a> {
    context: &'a NodeContext,
    modules: ModuleRegistry,

    // added during initialization
    store: Option<Arc<StateStore>>,
    status_listener: Option<Arc<StatusListener>>,
}

impl<'a> Bootstrap<'a> {
    fn new(context: &'a NodeContext) -> Self {
        Self {
            context,
            modules: ModuleRegistry::new(),
            store: None,
            status_listener: None,
        }
    }

    fn add_module(&mut self, module: Arc<dyn Module>) -> Result<()> {
        self.modules.register_shared(module)?;

        Ok(())
    }

    async fn run_steps(&mut self) -> Result<()> {
        step_01_state_store::execute(self).await?;
        step_02_peer_book::execute(self)?;
        step_03_status_listener::execute(self).await?;

        Ok(())
    }

    /// Close what the steps opened before init gave up.
    async fn unwind(&mut self) {
        if let Some(store) = self.store.take() {
            if let Err(e) = store.close().await {
                warn!("failed to close state store: {e}");
            }
        }
    }

    fn finish(self) -> Result<(Scope, Arc<StatusListener>)> {
        let storage = self
            .store
            .ok_or(Error::MissingStep("state store", "finish"))?;
        let status_listener = self
            .status_listener
            .ok_or(Error::MissingStep("status listener", "finish"))?;

        Ok((
            Scope {
                modules: self.modules,
                storage,
            },
            status_listener,
        ))
    }
}

/// The node's default services, started in order.
///
/// 1. the state store, which doubles as the process-wide storage handle
/// 2. the peer book
/// 3. the status listener
#[derive(Debug, Default)]
pub struct KeelNode {
    status_listener: OnceLock<Arc<StatusListener>>,
}

impl KeelNode {
    /// Create the default services.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the status listener is bound, once initialized.
    #[must_use]
    pub fn status_addr(&self) -> Option<SocketAddr> {
        self.status_listener.get().map(|listener| listener.local_addr())
    }
}

#[async_trait]
impl NodeInitializer for KeelNode {
    async fn init(&self, context: &NodeContext) -> Result<Scope, BoxError> {
        let mut bootstrap = Bootstrap::new(context);

        if let Err(e) = bootstrap.run_steps().await {
            bootstrap.unwind().await;
            return Err(e.into());
        }

        let (scope, status_listener) = bootstrap.finish()?;
        // A second init would be a supervisor bug; keep the first listener.
        let _ = self.status_listener.set(status_listener);

        Ok(scope)
    }

    async fn init_runtime(
        &self,
        context: &NodeContext,
        _scope: &Scope,
        shutdown: ShutdownHandle,
    ) -> Result<(), BoxError> {
        let status_listener = self
            .status_listener
            .get()
            .ok_or(Error::MissingStep("status listener", "runtime"))?;

        status_listener.serve(&shutdown)?;

        info!(
            network = %context.config().net_version,
            peers = context.config().peers.len(),
            "runtime started"
        );

        Ok(())
    }
}
