use std::path::PathBuf;

use keel_modules::BoxError;
use thiserror::Error;

/// Result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that end a node's start.
#[derive(Debug, Error)]
pub enum Error {
    /// Another node owns the pid marker.
    #[error("pid file {} already exists", .0.display())]
    AlreadyRunning(PathBuf),

    /// A feature switch was set after the node started running.
    #[error("feature switch {0:?} set after startup")]
    FeaturesFrozen(String),

    /// The genesis file could not be loaded, or failed its integrity check.
    #[error(transparent)]
    Genesis(#[from] keel_genesis::Error),

    /// The external init routine failed.
    #[error("failed to initialize core services: {0}")]
    Init(#[source] BoxError),

    /// A module failed its bind notification.
    #[error(transparent)]
    Modules(#[from] keel_modules::Error),

    /// The protocol descriptor is not on disk.
    #[error("protocol descriptor {} not found", .0.display())]
    MissingProtoDescriptor(PathBuf),

    /// The pid marker could not be written.
    #[error("failed to write pid file {}: {source}", path.display())]
    PidFile {
        /// Path of the pid marker.
        path: PathBuf,

        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The external runtime initialization failed.
    #[error("failed to initialize runtime: {0}")]
    RuntimeInit(#[source] BoxError),

    /// OS signal handlers could not be registered.
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}
