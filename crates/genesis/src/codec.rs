use crate::{GenesisBlock, Result, Transaction};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Canonical byte layout of genesis data.
///
/// Every node sharing a genesis file must use the same codec, otherwise the
/// verdicts diverge.
pub trait GenesisCodec: Send + Sync {
    /// Canonical bytes of one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be serialized.
    fn transaction_bytes(&self, transaction: &Transaction) -> Result<Vec<u8>>;

    /// Deterministic id derived from the block header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be serialized.
    fn block_id(&self, block: &GenesisBlock) -> Result<String>;
}

/// Default codec: sorted-key compact JSON for bytes, and an id made of the
/// first eight bytes of the header digest read as a little-endian `u64`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalJsonCodec;

impl GenesisCodec for CanonicalJsonCodec {
    fn transaction_bytes(&self, transaction: &Transaction) -> Result<Vec<u8>> {
        canonical_json(transaction.as_value())
    }

    fn block_id(&self, block: &GenesisBlock) -> Result<String> {
        let mut header: Map<String, Value> = block.header().clone();
        header.insert(
            "payloadHash".to_string(),
            Value::String(block.payload_hash().to_string()),
        );

        let digest = Sha256::digest(canonical_json(&Value::Object(header))?);

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);

        Ok(u64::from_le_bytes(prefix).to_string())
    }
}

/// Compact JSON with object keys sorted at every depth.
///
/// # Errors
///
/// Returns an error if a scalar fails to serialize.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            out.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(value, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys_at_every_depth() {
        let value = json!({ "b": 1, "a": { "z": [3, { "y": true, "x": null }], "m": "s" } });

        let bytes = canonical_json(&value).unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"m":"s","z":[3,{"x":null,"y":true}]},"b":1}"#
        );
    }

    #[test]
    fn test_block_id_ignores_transactions_and_tracks_header() {
        let block = GenesisBlock::new(
            "0".to_string(),
            "aa".to_string(),
            json!({ "height": 1, "timestamp": 0 }).as_object().unwrap().clone(),
            vec![],
        );
        let with_transactions = GenesisBlock::new(
            "0".to_string(),
            "aa".to_string(),
            block.header().clone(),
            vec![Transaction::new(json!({ "type": 0 }))],
        );
        let other_header = GenesisBlock::new(
            "0".to_string(),
            "aa".to_string(),
            json!({ "height": 2, "timestamp": 0 }).as_object().unwrap().clone(),
            vec![],
        );

        let codec = CanonicalJsonCodec;
        let id = codec.block_id(&block).unwrap();

        assert_eq!(id, codec.block_id(&with_transactions).unwrap());
        assert_ne!(id, codec.block_id(&other_header).unwrap());
        assert!(id.parse::<u64>().is_ok());
    }
}
