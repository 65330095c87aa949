use crate::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Port every mainnet seed listens on.
pub const MAINNET_SEED_PORT: u16 = 80;

/// Mainnet seed addresses as 32-bit big-endian IPv4 integers.
const MAINNET_SEEDS: [u32; 10] = [
    757_137_132,
    1_815_983_436,
    759_980_934,
    759_980_683,
    1_807_690_192,
    1_758_431_015,
    1_760_474_482,
    1_760_474_149,
    759_110_497,
    757_134_616,
];

/// A peer the node dials on startup.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Peer {
    /// Peer address.
    pub ip: IpAddr,

    /// Peer port.
    pub port: u16,
}

impl Peer {
    /// Create a peer entry.
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

/// Parse a comma-separated `ip[:port]` list.
///
/// Entries without a port take `default_port`. Bracketed IPv6 entries
/// (`[::1]:7000`) and bare IPv6 addresses are accepted; blank entries are
/// skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidPeer`] for an entry that is not an address or has
/// an unparseable port.
pub fn parse_peer_list(list: &str, default_port: u16) -> Result<Vec<Peer>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_peer(entry, default_port))
        .collect()
}

fn parse_peer(entry: &str, default_port: u16) -> Result<Peer> {
    let invalid = || Error::InvalidPeer(entry.to_string());

    if let Ok(ip) = entry.parse::<IpAddr>() {
        return Ok(Peer::new(ip, default_port));
    }

    let (host, port) = entry.rsplit_once(':').ok_or_else(invalid)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let ip = host.parse::<IpAddr>().map_err(|_| invalid())?;
    let port = if port.is_empty() {
        default_port
    } else {
        port.parse::<u16>().map_err(|_| invalid())?
    };

    Ok(Peer::new(ip, port))
}

/// The fixed mainnet seed peers.
#[must_use]
pub fn mainnet_seed_peers() -> Vec<Peer> {
    MAINNET_SEEDS
        .iter()
        .map(|&seed| Peer::new(IpAddr::V4(Ipv4Addr::from(seed)), MAINNET_SEED_PORT))
        .collect()
}
