use thiserror::Error;

use crate::BoxError;

/// Errors raised by the module registry.
#[derive(Debug, Error)]
pub enum Error {
    /// A module refused the bind notification.
    #[error("module {module} failed to bind: {source}")]
    Bind {
        /// Name of the failing module.
        module: String,

        /// Error returned by the module.
        #[source]
        source: BoxError,
    },

    /// Two modules were registered under the same name.
    #[error("module {0} is already registered")]
    DuplicateModule(String),
}
