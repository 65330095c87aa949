//! Named node modules and the ordered registry that drains them on shutdown.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod registry;

pub use error::Error;
pub use registry::{CleanupOutcome, CleanupReport, ModuleRegistry};

use async_trait::async_trait;

/// Error type returned across module hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for independently lifecycled node subsystems.
#[async_trait]
pub trait Module
where
    Self: Send + Sync + 'static,
{
    /// Get the name the module is registered under.
    fn module_name(&self) -> &str;

    /// Called once every module is registered and the runtime is up.
    ///
    /// The registry is passed so a module can look up the siblings it talks to.
    async fn on_bind(&self, _registry: &ModuleRegistry) -> Result<(), BoxError> {
        Ok(())
    }

    /// Release whatever the module holds.
    ///
    /// Modules with nothing to release keep the default, which succeeds
    /// immediately.
    async fn cleanup(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
