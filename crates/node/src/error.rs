use std::path::PathBuf;

use thiserror::Error;

/// Result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while bootstrapping the node's default services.
#[derive(Debug, Error)]
pub enum Error {
    /// Config resolution failed.
    #[error(transparent)]
    Config(#[from] keel_config::Error),

    /// Detaching from the terminal failed.
    #[error("failed to daemonize: {0}")]
    Daemonize(#[from] nix::Error),

    /// File IO failed.
    #[error("{context} {}: {source}", path.display())]
    Io {
        /// What was being done.
        context: &'static str,

        /// The file or directory involved.
        path: PathBuf,

        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The status listener could not bind its address.
    #[error("failed to bind status listener on {addr}: {source}")]
    Listen {
        /// Address the listener tried to bind.
        addr: std::net::SocketAddr,

        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Module registration failed.
    #[error(transparent)]
    Modules(#[from] keel_modules::Error),

    /// A bootstrap step ran before the step it depends on.
    #[error("{0} not set before {1} step")]
    MissingStep(&'static str, &'static str),

    /// Could not set the global default subscriber.
    #[error("could not set global default subscriber: {0}")]
    SetTracing(#[from] tracing::subscriber::SetGlobalDefaultError),
}

impl Error {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            context,
            path,
            source,
        }
    }
}
