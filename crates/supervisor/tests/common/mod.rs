//! Fixtures shared by the supervisor integration tests: a node directory with
//! a sealed genesis block, recording modules and a scriptable initializer.

#![allow(dead_code)]

use keel_config::{ConfigFile, NodeConfig, Overrides};
use keel_genesis::{CanonicalJsonCodec, GenesisBlock, GenesisCodec, Transaction, payload_hash};
use keel_modules::{BoxError, Module, ModuleRegistry};
use keel_supervisor::{
    LifecycleState, NodeContext, NodeInitializer, Scope, ShutdownHandle, ShutdownReason, Signal,
    StorageHandle, Supervisor, SupervisorOptions,
};

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

pub type Journal = Arc<Mutex<Vec<String>>>;
pub type SharedHandle = Arc<Mutex<Option<ShutdownHandle>>>;

pub fn record(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn sealed_genesis() -> GenesisBlock {
    let codec = CanonicalJsonCodec;
    let header = json!({ "version": 0, "height": 1, "timestamp": 0 })
        .as_object()
        .unwrap()
        .clone();
    let transactions = vec![
        Transaction::new(json!({ "type": 0, "amount": 100, "recipientId": "A1" })),
        Transaction::new(json!({ "type": 2, "asset": { "delegate": { "username": "alice" } } })),
    ];
    let payload = payload_hash(&codec, &transactions).unwrap();
    let draft = GenesisBlock::new(String::new(), payload.clone(), header.clone(), vec![]);
    let id = codec.block_id(&draft).unwrap();

    GenesisBlock::new(id, payload, header, transactions)
}

pub fn write_genesis(path: &Path, block: &GenesisBlock) {
    std::fs::write(path, serde_json::to_vec_pretty(block).unwrap()).unwrap();
}

/// Signal handlers and the panic hook off, no timeouts.
pub const fn quiet_options() -> SupervisorOptions {
    SupervisorOptions {
        install_signal_handlers: false,
        install_panic_hook: false,
        module_cleanup_timeout: None,
        shutdown_timeout: None,
    }
}

pub struct Node {
    pub dir: TempDir,
    pub config: NodeConfig,
}

impl Node {
    pub fn new() -> Self {
        init_tracing();

        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::resolve(
            ConfigFile::default(),
            Overrides {
                base_dir: Some(dir.path().to_path_buf()),
                ..Overrides::default()
            },
            dir.path(),
        )
        .unwrap();

        std::fs::create_dir_all(config.proto_path.parent().unwrap()).unwrap();
        std::fs::write(&config.proto_path, "syntax = \"proto3\";\n").unwrap();
        write_genesis(&config.genesis_path, &sealed_genesis());

        Self { dir, config }
    }

    pub fn supervisor(
        &self,
        init: &Arc<TestInit>,
    ) -> Supervisor<Arc<TestInit>, CanonicalJsonCodec> {
        self.supervisor_with_options(init, quiet_options())
    }

    pub fn supervisor_with(
        &self,
        init: &Arc<TestInit>,
        module_cleanup_timeout: Option<Duration>,
        shutdown_timeout: Option<Duration>,
    ) -> Supervisor<Arc<TestInit>, CanonicalJsonCodec> {
        self.supervisor_with_options(
            init,
            SupervisorOptions {
                module_cleanup_timeout,
                shutdown_timeout,
                ..quiet_options()
            },
        )
    }

    pub fn supervisor_with_options(
        &self,
        init: &Arc<TestInit>,
        options: SupervisorOptions,
    ) -> Supervisor<Arc<TestInit>, CanonicalJsonCodec> {
        Supervisor::new(self.config.clone(), init.clone(), CanonicalJsonCodec)
            .with_options(options)
    }

    pub fn pid_path(&self) -> &Path {
        &self.config.pid_path
    }
}

pub struct Recording {
    pub name: String,
    pub journal: Journal,
    pub cleanups: AtomicUsize,
    pub fail_cleanup: bool,
    pub panic_in_cleanup: bool,
    pub fail_bind: bool,
    pub cleanup_delay: Option<Duration>,
    pub retrigger: Option<SharedHandle>,
}

#[async_trait]
impl Module for Recording {
    fn module_name(&self) -> &str {
        &self.name
    }

    async fn on_bind(&self, registry: &ModuleRegistry) -> Result<(), BoxError> {
        assert!(registry.get(&self.name).is_some());
        record(&self.journal, format!("bind:{}", self.name));

        if self.fail_bind {
            return Err("sibling missing".into());
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, format!("cleanup:{}", self.name));

        let handle = self.retrigger.as_ref().and_then(|h| h.lock().unwrap().clone());
        if let Some(handle) = handle {
            let started = handle.trigger(ShutdownReason::Signal(Signal::Interrupt));
            record(&self.journal, format!("retrigger:{}:{started}", self.name));
        }

        if let Some(delay) = self.cleanup_delay {
            tokio::time::sleep(delay).await;
        }

        assert!(!self.panic_in_cleanup, "{} lost its write-ahead log", self.name);

        if self.fail_cleanup {
            return Err(format!("{} refused to stop", self.name).into());
        }
        Ok(())
    }
}

pub struct TestStore {
    pub journal: Journal,
}

#[async_trait]
impl StorageHandle for TestStore {
    async fn close(&self) -> Result<(), BoxError> {
        record(&self.journal, "store:close");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ModulePlan {
    pub name: &'static str,
    pub fail_cleanup: bool,
    pub panic_in_cleanup: bool,
    pub fail_bind: bool,
    pub cleanup_delay: Option<Duration>,
}

impl ModulePlan {
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct TestInit {
    pub journal: Journal,
    pub plans: Vec<ModulePlan>,
    pub modules: Mutex<Vec<Arc<Recording>>>,
    pub context: Mutex<Option<NodeContext>>,
    pub init_calls: AtomicUsize,
    pub fail_init: bool,
    pub fail_runtime: bool,
    pub failing_task: bool,
    pub panicking_task: bool,
    pub retrigger_on_cleanup: bool,
    pub handle: SharedHandle,
}

impl TestInit {
    pub fn with_modules(plans: &[ModulePlan]) -> Self {
        Self {
            plans: plans.to_vec(),
            ..Self::default()
        }
    }

    pub fn cleanup_counts(&self) -> Vec<usize> {
        self.modules
            .lock()
            .unwrap()
            .iter()
            .map(|module| module.cleanups.load(Ordering::SeqCst))
            .collect()
    }

    fn state(&self) -> Option<LifecycleState> {
        self.context.lock().unwrap().as_ref().map(NodeContext::state)
    }

    /// Wait until the supervisor has declared the node running.
    pub async fn running(&self) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.state() != Some(LifecycleState::Running) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("node never reached Running");
    }
}

#[async_trait]
impl NodeInitializer for TestInit {
    async fn init(&self, context: &NodeContext) -> Result<Scope, BoxError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(context.state(), LifecycleState::Initializing);
        context.features().set("forging", true)?;
        *self.context.lock().unwrap() = Some(context.clone());

        if self.fail_init {
            return Err("database unreachable".into());
        }

        let mut modules = ModuleRegistry::new();
        for plan in &self.plans {
            let module = Arc::new(Recording {
                name: plan.name.to_string(),
                journal: self.journal.clone(),
                cleanups: AtomicUsize::new(0),
                fail_cleanup: plan.fail_cleanup,
                panic_in_cleanup: plan.panic_in_cleanup,
                fail_bind: plan.fail_bind,
                cleanup_delay: plan.cleanup_delay,
                retrigger: self.retrigger_on_cleanup.then(|| self.handle.clone()),
            });
            self.modules.lock().unwrap().push(module.clone());
            modules.register_shared(module)?;
        }

        Ok(Scope {
            modules,
            storage: Arc::new(TestStore {
                journal: self.journal.clone(),
            }),
        })
    }

    async fn init_runtime(
        &self,
        _context: &NodeContext,
        _scope: &Scope,
        shutdown: ShutdownHandle,
    ) -> Result<(), BoxError> {
        if self.fail_runtime {
            return Err("p2p port in use".into());
        }

        if self.failing_task {
            shutdown.spawn_guarded("sync", async { Err::<(), _>("fork detected") });
        }

        if self.panicking_task {
            shutdown.spawn_guarded("sync", async {
                let height: Option<u64> = None;
                assert!(height.is_some(), "ledger corrupted");
                Ok::<(), String>(())
            });
        }

        *self.handle.lock().unwrap() = Some(shutdown);

        Ok(())
    }
}
