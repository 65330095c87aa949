use crate::{Error, LogLevel, Peer, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const fn default_port() -> u16 {
    7000
}

const fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// The `peers` section of the config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PeersSection {
    /// Peers dialed on startup.
    #[serde(default)]
    pub list: Vec<Peer>,

    /// Keys this node does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `chain` section of the config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ChainSection {
    /// Secret shared with side chains; generated on first start if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masterpassword: Option<String>,

    /// Keys this node does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `loading` section of the config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingSection {
    /// Re-verify every stored block while loading the chain.
    #[serde(default)]
    pub verify_on_loading: bool,

    /// Keys this node does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `shutdown` section of the config file.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownSection {
    /// Upper bound for a single module's cleanup, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_timeout_ms: Option<u64>,

    /// Upper bound for the whole shutdown sequence, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_timeout_ms: Option<u64>,
}

impl ShutdownSection {
    fn is_unset(&self) -> bool {
        self == &Self::default()
    }
}

/// The node config file as stored on disk.
///
/// Unknown keys are carried along so that writing the file back never drops
/// operator settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listening address.
    #[serde(default = "default_address")]
    pub address: IpAddr,

    /// Seed peers.
    #[serde(default)]
    pub peers: PeersSection,

    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Log verbosity.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Pid marker path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<PathBuf>,

    /// Publicly reachable address, if known up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<IpAddr>,

    /// Chain settings.
    #[serde(default)]
    pub chain: ChainSection,

    /// Chain loading settings.
    #[serde(default)]
    pub loading: LoadingSection,

    /// Shutdown limits.
    #[serde(default, skip_serializing_if = "ShutdownSection::is_unset")]
    pub shutdown: ShutdownSection,

    /// Keys this node does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            peers: PeersSection::default(),
            log_file: None,
            log_level: LogLevel::default(),
            pid_file: None,
            public_ip: None,
            chain: ChainSection::default(),
            loading: LoadingSection::default(),
            shutdown: ShutdownSection::default(),
            extra: Map::new(),
        }
    }
}

impl ConfigFile {
    /// Parse a config file from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are not a valid config.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file cannot be read and [`Error::Parse`]
    /// if it is not a valid config.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_slice(&bytes, path)
    }
}
