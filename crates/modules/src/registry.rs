use crate::{Error, Module};

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

/// Result of cleaning up a single module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The cleanup hook completed successfully.
    Cleaned,

    /// The cleanup hook returned an error.
    Failed(String),

    /// The cleanup hook did not finish within the per-module timeout.
    TimedOut(Duration),
}

/// Per-module outcomes of a cleanup pass, in the order the pass ran.
#[derive(Clone, Debug, Default)]
pub struct CleanupReport {
    outcomes: Vec<(String, CleanupOutcome)>,
}

impl CleanupReport {
    /// Whether every module cleaned up successfully.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == CleanupOutcome::Cleaned)
    }

    /// Modules whose cleanup failed or timed out.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &CleanupOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome != CleanupOutcome::Cleaned)
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    /// All outcomes in cleanup order.
    #[must_use]
    pub fn outcomes(&self) -> &[(String, CleanupOutcome)] {
        &self.outcomes
    }
}

/// Ordered collection of node modules.
///
/// Registration order is the only ordering contract: bind notifications and
/// cleanups both walk the modules front to back.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module after all previously registered ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateModule`] if a module with the same name is
    /// already registered.
    pub fn register<M: Module>(&mut self, module: M) -> Result<(), Error> {
        self.register_shared(Arc::new(module))
    }

    /// Register a module that is also held elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateModule`] if a module with the same name is
    /// already registered.
    pub fn register_shared(&mut self, module: Arc<dyn Module>) -> Result<(), Error> {
        if self.get(module.module_name()).is_some() {
            return Err(Error::DuplicateModule(module.module_name().to_string()));
        }

        debug!(module = module.module_name(), "registered module");
        self.modules.push(module);

        Ok(())
    }

    /// Look up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.module_name() == name)
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.for_each_in_order(|module| module.module_name())
    }

    /// Visit every module in registration order, collecting what the visitor returns.
    pub fn for_each_in_order<'a, T>(
        &'a self,
        mut visitor: impl FnMut(&'a dyn Module) -> T,
    ) -> Vec<T> {
        self.modules
            .iter()
            .map(|module| visitor(module.as_ref()))
            .collect()
    }

    /// Tell every module that the node is assembled.
    ///
    /// # Errors
    ///
    /// Stops at the first module that fails and returns [`Error::Bind`].
    pub async fn bind_all(&self) -> Result<(), Error> {
        for module in &self.modules {
            module
                .on_bind(self)
                .await
                .map_err(|source| Error::Bind {
                    module: module.module_name().to_string(),
                    source,
                })?;
        }

        Ok(())
    }

    /// Run every module's cleanup hook, strictly one after another.
    ///
    /// A failing, panicking or timed-out module is logged and recorded; the
    /// modules after it still get their turn.
    pub async fn cleanup_all(&self, module_timeout: Option<Duration>) -> CleanupReport {
        let mut report = CleanupReport::default();

        for module in &self.modules {
            let name = module.module_name().to_string();
            debug!(module = %name, "cleaning up module");

            let outcome = Self::cleanup_one(&name, module.clone(), module_timeout).await;
            report.outcomes.push((name, outcome));
        }

        if report.is_clean() {
            info!("cleaned up {} modules", report.outcomes.len());
        } else {
            error!(
                "{} of {} modules failed to clean up",
                report.failures().count(),
                report.outcomes.len()
            );
        }

        report
    }

    async fn cleanup_one(
        name: &str,
        module: Arc<dyn Module>,
        module_timeout: Option<Duration>,
    ) -> CleanupOutcome {
        // Own task, so a panicking hook surfaces as a join error.
        let mut task = tokio::spawn(async move { module.cleanup().await });

        let joined = match module_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    error!(module = name, timeout = ?limit, "module cleanup timed out");
                    return CleanupOutcome::TimedOut(limit);
                }
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(())) => CleanupOutcome::Cleaned,
            Ok(Err(e)) => {
                error!(module = name, "module cleanup failed: {e}");
                CleanupOutcome::Failed(e.to_string())
            }
            Err(e) => {
                let message = if e.is_panic() {
                    format!("panicked: {}", panic_message(e.into_panic().as_ref()))
                } else {
                    e.to_string()
                };
                error!(module = name, "module cleanup failed: {message}");
                CleanupOutcome::Failed(message)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
