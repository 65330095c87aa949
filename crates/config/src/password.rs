use crate::{ConfigFile, Error, Result};

use std::path::Path;

use rand::Rng;
use serde_json::{Map, Value};
use tracing::info;

/// Length of a generated master password.
pub const MASTER_PASSWORD_LENGTH: usize = 12;

const MASTER_PASSWORD_KEY: &str = "masterpassword";

// Alphanumerics without the look-alikes 0, O, I and l.
const READABLE_ALPHANUMERIC: &[u8] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Generate a readable alphanumeric master password.
pub fn generate_master_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..MASTER_PASSWORD_LENGTH)
        .map(|_| char::from(READABLE_ALPHANUMERIC[rng.gen_range(0..READABLE_ALPHANUMERIC.len())]))
        .collect()
}

/// Make sure the config carries a master password, persisting a generated one.
///
/// Returns `true` if a password was generated and written to `path`.
///
/// # Errors
///
/// Fails if the config file at `path` cannot be read back or rewritten.
pub fn ensure_master_password(config: &mut ConfigFile, path: &Path) -> Result<bool> {
    if config
        .chain
        .masterpassword
        .as_deref()
        .is_some_and(|password| !password.is_empty())
    {
        return Ok(false);
    }

    let password = generate_master_password(&mut rand::thread_rng());
    persist_master_password(path, &password)?;
    config.chain.masterpassword = Some(password);

    info!("generated master password and saved it to {}", path.display());

    Ok(true)
}

/// Set `chain.masterpassword` in the config file at `path`.
///
/// Only that key changes; every other key keeps its value and position.
///
/// # Errors
///
/// Returns [`Error::Read`], [`Error::Parse`], [`Error::Serialize`] or
/// [`Error::Write`] for the step that failed.
pub fn persist_master_password(path: &Path, password: &str) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: Map<String, Value> =
        serde_json::from_slice(&bytes).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let chain = document
        .entry("chain")
        .or_insert_with(|| Value::Object(Map::new()));
    if !chain.is_object() {
        *chain = Value::Object(Map::new());
    }
    if let Some(chain) = chain.as_object_mut() {
        chain.insert(MASTER_PASSWORD_KEY.to_string(), password.into());
    }

    let mut contents = serde_json::to_string_pretty(&document).map_err(Error::Serialize)?;
    contents.push('\n');

    std::fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
