//! Node configuration: the JSON config file, command-line overrides, and the
//! resolved record the rest of the node reads.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod file;
mod log_level;
mod node_config;
mod password;
mod peers;

pub use error::{Error, Result};
pub use file::{ChainSection, ConfigFile, LoadingSection, PeersSection, ShutdownSection};
pub use log_level::LogLevel;
pub use node_config::{DEFAULT_NET_VERSION, MAINNET, NodeConfig, Overrides};
pub use password::{
    MASTER_PASSWORD_LENGTH, ensure_master_password, generate_master_password,
    persist_master_password,
};
pub use peers::{MAINNET_SEED_PORT, Peer, mainnet_seed_peers, parse_peer_list};
