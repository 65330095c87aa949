use std::path::PathBuf;

use thiserror::Error;

/// Result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while resolving configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// The current directory could not be determined.
    #[error("failed to determine current directory: {0}")]
    CurrentDir(std::io::Error),

    /// A peer entry could not be parsed.
    #[error("invalid peer {0:?}: expected ip[:port]")]
    InvalidPeer(String),

    /// A log level name is not recognised.
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),

    /// The config file is not valid JSON for a node config.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// Path of the config file.
        path: PathBuf,

        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,

        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config could not be serialized for writing back.
    #[error("failed to serialize config: {0}")]
    Serialize(serde_json::Error),

    /// The config file could not be written back.
    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        /// Path of the config file.
        path: PathBuf,

        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
