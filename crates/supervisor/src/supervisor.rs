use crate::exit::{Exit, ExitReason};
use crate::{
    Error, LifecycleState, NodeContext, PidFile, Result, ShutdownController, ShutdownHandle,
    StateCell, StorageGuard, StorageHandle, install_panic_hook, install_signal_handlers,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keel_config::NodeConfig;
use keel_genesis::{GenesisBlock, GenesisCodec};
use keel_modules::{BoxError, CleanupReport, ModuleRegistry};
use tracing::{error, info, warn};

/// What the init routine hands back: the started modules and the storage
/// they share.
pub struct Scope {
    /// Modules in startup order.
    pub modules: ModuleRegistry,

    /// Process-wide storage, closed after every module is cleaned up.
    pub storage: Arc<dyn StorageHandle>,
}

/// Brings up the node's core services and runtime.
#[async_trait]
pub trait NodeInitializer
where
    Self: Send + Sync + 'static,
{
    /// Start the core services and register their modules.
    async fn init(&self, context: &NodeContext) -> Result<Scope, BoxError>;

    /// Start the runtime on top of an initialized scope.
    ///
    /// Background work should be spawned through `shutdown` so that its
    /// failure stops the node.
    async fn init_runtime(
        &self,
        context: &NodeContext,
        scope: &Scope,
        shutdown: ShutdownHandle,
    ) -> Result<(), BoxError>;
}

#[async_trait]
impl<T> NodeInitializer for Arc<T>
where
    T: NodeInitializer,
{
    async fn init(&self, context: &NodeContext) -> Result<Scope, BoxError> {
        (**self).init(context).await
    }

    async fn init_runtime(
        &self,
        context: &NodeContext,
        scope: &Scope,
        shutdown: ShutdownHandle,
    ) -> Result<(), BoxError> {
        (**self).init_runtime(context, scope, shutdown).await
    }
}

/// Check that no other node owns the pid marker and that the protocol
/// descriptor is on disk. Touches nothing.
///
/// # Errors
///
/// Exits with [`ExitReason::AlreadyRunning`] or
/// [`ExitReason::Configuration`].
pub fn preflight(config: &NodeConfig) -> Result<(), Exit> {
    PidFile::ensure_absent(&config.pid_path).map_err(|e| {
        error!("{e}");
        Exit::failed(ExitReason::AlreadyRunning, e)
    })?;

    if !config.proto_path.is_file() {
        let e = Error::MissingProtoDescriptor(config.proto_path.clone());
        error!(fatal = true, "{e}");
        return Err(Exit::failed(ExitReason::Configuration, e));
    }

    Ok(())
}

/// Tuning for a [`Supervisor`].
#[derive(Clone, Debug)]
pub struct SupervisorOptions {
    /// Route `SIGTERM`/`SIGINT` into shutdown.
    pub install_signal_handlers: bool,

    /// Route panics into shutdown.
    pub install_panic_hook: bool,

    /// Upper bound for each module's cleanup.
    pub module_cleanup_timeout: Option<Duration>,

    /// Upper bound for the whole shutdown sequence.
    pub shutdown_timeout: Option<Duration>,
}

impl SupervisorOptions {
    /// Options for a production node: handlers on, timeouts from config.
    #[must_use]
    pub const fn from_config(config: &NodeConfig) -> Self {
        Self {
            install_signal_handlers: true,
            install_panic_hook: true,
            module_cleanup_timeout: config.module_cleanup_timeout,
            shutdown_timeout: config.shutdown_timeout,
        }
    }
}

/// Drives a node from boot to exit.
///
/// ```text
/// Booting -> Verifying -> Initializing -> Running -> ShuttingDown -> Exited
/// ```
///
/// Any failure before `Running` exits straight away without a cleanup pass.
/// Once running, the first shutdown trigger drains the modules in
/// registration order, closes storage, and exits.
pub struct Supervisor<I, C> {
    config: Arc<NodeConfig>,
    initializer: I,
    codec: C,
    options: SupervisorOptions,
    state: Arc<StateCell>,
    controller: ShutdownController,
    pid_file: Option<PidFile>,
}

impl<I, C> Supervisor<I, C>
where
    I: NodeInitializer,
    C: GenesisCodec,
{
    /// Create a supervisor in the `Booting` phase.
    pub fn new(config: NodeConfig, initializer: I, codec: C) -> Self {
        let options = SupervisorOptions::from_config(&config);

        Self {
            config: Arc::new(config),
            initializer,
            codec,
            options,
            state: Arc::new(StateCell::new()),
            controller: ShutdownController::new(),
            pid_file: None,
        }
    }

    /// Replace the options derived from config.
    #[must_use]
    pub fn with_options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self
    }

    /// The shutdown controller every trigger goes through.
    #[must_use]
    pub const fn controller(&self) -> &ShutdownController {
        &self.controller
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Run [`preflight`] against this supervisor's config.
    ///
    /// # Errors
    ///
    /// See [`preflight`].
    pub fn preflight(&self) -> Result<(), Exit> {
        preflight(&self.config)
    }

    /// Write the pid marker.
    ///
    /// Separate from [`run`](Self::run) so that a daemonized process records
    /// its own pid rather than its parent's.
    ///
    /// # Errors
    ///
    /// Exits with [`ExitReason::AlreadyRunning`] if the marker exists, or
    /// [`ExitReason::Configuration`] if it cannot be written.
    pub fn claim_pid_file(&mut self) -> Result<(), Exit> {
        match PidFile::claim(&self.config.pid_path) {
            Ok(pid_file) => {
                self.pid_file = Some(pid_file);
                Ok(())
            }
            Err(e @ Error::AlreadyRunning(_)) => {
                error!("{e}");
                Err(Exit::failed(ExitReason::AlreadyRunning, e))
            }
            Err(e) => {
                error!(fatal = true, "{e}");
                Err(Exit::failed(ExitReason::Configuration, e))
            }
        }
    }

    /// Run the node until it exits.
    ///
    /// Performs [`preflight`](Self::preflight) and
    /// [`claim_pid_file`](Self::claim_pid_file) first unless the caller
    /// already did. The pid marker, once claimed, is removed on every path
    /// out of here.
    pub async fn run(mut self) -> Exit {
        if self.pid_file.is_none() {
            if let Err(exit) = self.preflight().and_then(|()| self.claim_pid_file()) {
                return exit;
            }
        }

        let exit = self.supervise().await;

        if let Some(pid_file) = self.pid_file.take() {
            pid_file.remove();
        }
        self.state.advance(LifecycleState::Exited);

        info!(code = exit.code(), "exiting: {exit}");

        exit
    }

    async fn supervise(&self) -> Exit {
        self.state.advance(LifecycleState::Verifying);

        let genesis = match self.verify_genesis() {
            Ok(genesis) => genesis,
            Err(exit) => return exit,
        };

        self.state.advance(LifecycleState::Initializing);

        let context = NodeContext::new(self.config.clone(), genesis, self.state.clone());

        let scope = match self.initializer.init(&context).await {
            Ok(scope) => scope,
            Err(e) => {
                let e = Error::Init(e);
                error!(fatal = true, "{e}");
                return Exit::failed(ExitReason::Initialization, e);
            }
        };

        let storage = StorageGuard::new(scope.storage.clone());
        let shutdown = self.controller.handle();

        if let Err(e) = self.start(&context, &scope, shutdown.clone()).await {
            error!(fatal = true, "{e}");
            storage.close().await;
            return Exit::failed(ExitReason::Initialization, e);
        }

        self.state.advance(LifecycleState::Running);
        context.features().freeze();

        info!(modules = ?scope.modules.names(), "modules ready and launched");

        if context.public_ip().is_none() {
            warn!("public ip unknown, block forging may not work");
        }

        let reason = self.controller.wait().await;

        self.state.advance(LifecycleState::ShuttingDown);
        info!(%reason, "cleaning up modules");

        let teardown = async {
            let report = scope
                .modules
                .cleanup_all(self.options.module_cleanup_timeout)
                .await;
            shutdown.drain().await;
            storage.close().await;
            report
        };

        match self.options.shutdown_timeout {
            Some(limit) => match tokio::time::timeout(limit, teardown).await {
                Ok(report) => Self::shut_down(reason, report),
                Err(_) => {
                    error!(
                        fatal = true,
                        timeout = ?limit,
                        "shutdown timed out, abandoning cleanup"
                    );
                    Exit::new(ExitReason::ShutdownTimedOut(reason), None)
                }
            },
            None => Self::shut_down(reason, teardown.await),
        }
    }

    fn verify_genesis(&self) -> Result<GenesisBlock, Exit> {
        let genesis = GenesisBlock::from_file(&self.config.genesis_path).map_err(|e| {
            error!(fatal = true, "failed to load genesis block: {e}");
            Exit::failed(ExitReason::Configuration, e.into())
        })?;

        keel_genesis::validate(&genesis, &self.codec).map_err(|e| {
            error!(fatal = true, "genesis block rejected: {e}");
            let reason = match e {
                keel_genesis::Error::Integrity(_) => ExitReason::Integrity,
                _ => ExitReason::Configuration,
            };
            Exit::failed(reason, e.into())
        })?;

        info!(id = genesis.id(), "genesis block verified");

        Ok(genesis)
    }

    async fn start(
        &self,
        context: &NodeContext,
        scope: &Scope,
        shutdown: ShutdownHandle,
    ) -> Result<()> {
        if self.options.install_signal_handlers {
            install_signal_handlers(&self.controller)?;
        }

        if self.options.install_panic_hook {
            install_panic_hook(&self.controller);
        }

        self.initializer
            .init_runtime(context, scope, shutdown)
            .await
            .map_err(Error::RuntimeInit)?;

        scope.modules.bind_all().await?;

        Ok(())
    }

    fn shut_down(reason: crate::ShutdownReason, report: CleanupReport) -> Exit {
        Exit::new(ExitReason::Shutdown(reason), None).with_report(report)
    }
}
