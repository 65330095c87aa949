use crate::{Error, Result};

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A genesis transaction.
///
/// Its structure is opaque here; only its canonical bytes matter.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Transaction(Value);

impl Transaction {
    /// Wrap a JSON transaction record.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying record.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

/// The network's first block, as read from the genesis file.
///
/// Fields other than `id`, `payloadHash` and `transactions` make up the
/// header the block id is derived from.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisBlock {
    id: String,

    payload_hash: String,

    #[serde(default)]
    transactions: Vec<Transaction>,

    #[serde(flatten)]
    header: Map<String, Value>,
}

impl GenesisBlock {
    /// Assemble a genesis block from its parts.
    #[must_use]
    pub const fn new(
        id: String,
        payload_hash: String,
        header: Map<String, Value>,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            id,
            payload_hash,
            transactions,
            header,
        }
    }

    /// Parse a genesis block from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are not a genesis block.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(Error::Parse)
    }

    /// Read and parse a genesis file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file cannot be read and [`Error::Parse`]
    /// if it is not a genesis block.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_slice(&bytes)
    }

    /// Declared block id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared hex-encoded payload hash.
    #[must_use]
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Transactions in block order.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Remaining header fields.
    #[must_use]
    pub const fn header(&self) -> &Map<String, Value> {
        &self.header
    }
}
