use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which declared value of the genesis block failed to match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrityErrorKind {
    /// The transactions do not hash to the declared payload hash.
    PayloadHashMismatch,

    /// The header does not hash to the declared block id.
    BlockIdMismatch,
}

impl fmt::Display for IntegrityErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadHashMismatch => write!(f, "unexpected payload hash"),
            Self::BlockIdMismatch => write!(f, "unexpected block id"),
        }
    }
}

/// A genesis block whose contents disagree with what it declares.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: declared {expected}, computed {actual}")]
pub struct IntegrityError {
    /// Which check failed.
    pub kind: IntegrityErrorKind,

    /// Value declared by the genesis block.
    pub expected: String,

    /// Value computed from the block contents.
    pub actual: String,
}

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A transaction or header could not be serialized canonically.
    #[error("failed to serialize genesis block: {0}")]
    Codec(#[from] serde_json::Error),

    /// The block failed its integrity check.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// The genesis file is not a valid genesis block.
    #[error("invalid genesis file: {0}")]
    Parse(serde_json::Error),

    /// The genesis file could not be read.
    #[error("failed to read genesis file {}: {source}", path.display())]
    Read {
        /// Path of the genesis file.
        path: PathBuf,

        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
