use crate::{
    ConfigFile, Error, LogLevel, Peer, Result, ensure_master_password, mainnet_seed_peers,
    parse_peer_list,
};

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

/// Network identifier that pulls in the fixed seed peers.
pub const MAINNET: &str = "mainnet";

/// Network identifier used when none is given.
pub const DEFAULT_NET_VERSION: &str = "localnet";

/// Command-line overrides applied on top of the config file.
///
/// Paths given here are resolved against the current directory.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// Root for every derived path.
    pub base_dir: Option<PathBuf>,

    /// Config file location.
    pub config_path: Option<PathBuf>,

    /// Data directory.
    pub data_dir: Option<PathBuf>,

    /// Side chain directory.
    pub chain_dir: Option<PathBuf>,

    /// Genesis block file.
    pub genesis_path: Option<PathBuf>,

    /// Listening port.
    pub port: Option<u16>,

    /// Listening address.
    pub address: Option<IpAddr>,

    /// Peer list. `Some(None)` clears the configured peers.
    pub peers: Option<Option<String>>,

    /// Log verbosity.
    pub log_level: Option<LogLevel>,

    /// Force re-verification of stored blocks.
    pub reindex: bool,

    /// Detach from the terminal.
    pub daemon: bool,

    /// Network identifier.
    pub net_version: Option<String>,
}

/// Fully resolved node configuration.
///
/// Built once before the supervisor starts and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Node software version.
    pub version: String,

    /// Build identifier, when the build recorded one.
    pub build_version: Option<String>,

    /// Network identifier.
    pub net_version: String,

    /// Root for derived paths.
    pub base_dir: PathBuf,

    /// Config file location.
    pub config_path: PathBuf,

    /// Data directory.
    pub data_dir: PathBuf,

    /// Side chain directory.
    pub chain_dir: PathBuf,

    /// Static assets served by the node.
    pub public_dir: PathBuf,

    /// Protocol descriptor that must exist before boot.
    pub proto_path: PathBuf,

    /// Pid marker.
    pub pid_path: PathBuf,

    /// Genesis block file.
    pub genesis_path: PathBuf,

    /// Log file.
    pub log_path: PathBuf,

    /// Listening port.
    pub port: u16,

    /// Listening address.
    pub address: IpAddr,

    /// Peers dialed on startup.
    pub peers: Vec<Peer>,

    /// Log verbosity.
    pub log_level: LogLevel,

    /// Secret shared with side chains.
    pub master_password: String,

    /// Re-verify stored blocks while loading.
    pub verify_on_loading: bool,

    /// Publicly reachable address from config, if any.
    pub public_ip: Option<IpAddr>,

    /// Detach from the terminal.
    pub daemon: bool,

    /// Upper bound for a single module's cleanup.
    pub module_cleanup_timeout: Option<Duration>,

    /// Upper bound for the whole shutdown sequence.
    pub shutdown_timeout: Option<Duration>,

    /// The config document with overrides applied, unknown keys included.
    pub file: ConfigFile,
}

impl NodeConfig {
    /// Read the config file and apply `overrides`. Nothing is written; see
    /// [`NodeConfig::ensure_master_password`].
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory is unavailable, the config
    /// file cannot be read or parsed, or an override is invalid.
    pub fn load(overrides: Overrides) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(Error::CurrentDir)?;
        let base_dir = base_dir(&overrides, &cwd);
        let config_path = config_path(&overrides, &base_dir, &cwd);

        debug!("loading config from {}", config_path.display());

        let file = ConfigFile::load(&config_path)?;

        Self::resolve(file, overrides, &cwd)
    }

    /// Generate a master password if the config has none and write it into
    /// the config file. Returns whether one was generated.
    ///
    /// Call this only once the node is known not to be running already.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read back or rewritten.
    pub fn ensure_master_password(&mut self) -> Result<bool> {
        let generated = ensure_master_password(&mut self.file, &self.config_path)?;
        if generated {
            self.master_password = self.file.chain.masterpassword.clone().unwrap_or_default();
        }
        Ok(generated)
    }

    /// Apply `overrides` to an already loaded config file.
    ///
    /// The port override is applied before the peer list is parsed so that
    /// portless peers take the overridden port. Mainnet seeds are appended
    /// after any peer override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPeer`] if the peer override cannot be parsed.
    pub fn resolve(mut file: ConfigFile, overrides: Overrides, cwd: &Path) -> Result<Self> {
        let base_dir = base_dir(&overrides, cwd);
        let config_path = config_path(&overrides, &base_dir, cwd);

        if let Some(port) = overrides.port {
            file.port = port;
        }

        if let Some(address) = overrides.address {
            file.address = address;
        }

        match overrides.peers {
            Some(Some(ref list)) => file.peers.list = parse_peer_list(list, file.port)?,
            Some(None) => file.peers.list.clear(),
            None => {}
        }

        let net_version = overrides
            .net_version
            .unwrap_or_else(|| DEFAULT_NET_VERSION.to_string());

        if net_version == MAINNET {
            file.peers.list.extend(mainnet_seed_peers());
        }

        if let Some(log_level) = overrides.log_level {
            file.log_level = log_level;
        }

        if overrides.reindex {
            file.loading.verify_on_loading = true;
        }

        let from_cli = |path: Option<PathBuf>, default: &str| {
            path.map_or_else(|| base_dir.join(default), |path| cwd.join(path))
        };
        let from_file = |path: Option<&PathBuf>, default: &str| {
            path.map_or_else(|| base_dir.join(default), |path| base_dir.join(path))
        };

        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_version: option_env!("KEEL_BUILD_VERSION").map(str::to_string),
            net_version,
            data_dir: from_cli(overrides.data_dir, "data"),
            chain_dir: from_cli(overrides.chain_dir, "chains"),
            genesis_path: from_cli(overrides.genesis_path, "genesisBlock.json"),
            public_dir: base_dir.join("public").join("dist"),
            proto_path: base_dir.join("proto").join("index.proto"),
            pid_path: from_file(file.pid_file.as_ref(), "keel.pid"),
            log_path: from_file(file.log_file.as_ref(), "logs/debug.log"),
            port: file.port,
            address: file.address,
            peers: file.peers.list.clone(),
            log_level: file.log_level,
            master_password: file.chain.masterpassword.clone().unwrap_or_default(),
            verify_on_loading: file.loading.verify_on_loading,
            public_ip: file.public_ip,
            daemon: overrides.daemon,
            module_cleanup_timeout: file.shutdown.module_timeout_ms.map(Duration::from_millis),
            shutdown_timeout: file.shutdown.total_timeout_ms.map(Duration::from_millis),
            base_dir,
            config_path,
            file,
        })
    }
}

fn base_dir(overrides: &Overrides, cwd: &Path) -> PathBuf {
    overrides
        .base_dir
        .as_ref()
        .map_or_else(|| cwd.to_path_buf(), |dir| cwd.join(dir))
}

fn config_path(overrides: &Overrides, base_dir: &Path, cwd: &Path) -> PathBuf {
    overrides
        .config_path
        .as_ref()
        .map_or_else(|| base_dir.join("config.json"), |path| cwd.join(path))
}
