//! Genesis block model and the integrity check every node runs before it
//! starts any subsystem.
//!
//! Verification is pure: the same genesis file yields the same verdict on
//! every node, and nothing but hashing happens along the way.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod block;
mod codec;
mod error;

pub use block::{GenesisBlock, Transaction};
pub use codec::{CanonicalJsonCodec, GenesisCodec, canonical_json};
pub use error::{Error, IntegrityError, IntegrityErrorKind, Result};

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 over the canonical bytes of `transactions`, fed in order.
///
/// An empty list hashes the empty byte sequence.
///
/// # Errors
///
/// Returns [`Error::Codec`] if a transaction cannot be serialized.
pub fn payload_hash<C>(codec: &C, transactions: &[Transaction]) -> Result<String>
where
    C: GenesisCodec + ?Sized,
{
    let mut hasher = Sha256::new();
    for transaction in transactions {
        hasher.update(codec.transaction_bytes(transaction)?);
    }
    let hash_bytes = hasher.finalize();

    Ok(format!("{hash_bytes:x}"))
}

/// Check a genesis block against its declared payload hash and id.
///
/// The payload hash is checked first, so a tampered transaction always
/// surfaces as [`IntegrityErrorKind::PayloadHashMismatch`].
///
/// # Errors
///
/// Returns [`Error::Integrity`] on any mismatch and [`Error::Codec`] if the
/// block cannot be serialized.
pub fn validate<C>(block: &GenesisBlock, codec: &C) -> Result<()>
where
    C: GenesisCodec + ?Sized,
{
    let actual_payload_hash = payload_hash(codec, block.transactions())?;
    if actual_payload_hash != block.payload_hash() {
        return Err(IntegrityError {
            kind: IntegrityErrorKind::PayloadHashMismatch,
            expected: block.payload_hash().to_string(),
            actual: actual_payload_hash,
        }
        .into());
    }

    let actual_id = codec.block_id(block)?;
    if actual_id != block.id() {
        return Err(IntegrityError {
            kind: IntegrityErrorKind::BlockIdMismatch,
            expected: block.id().to_string(),
            actual: actual_id,
        }
        .into());
    }

    Ok(())
}
