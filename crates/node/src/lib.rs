//! The keel node: default services wired into the lifecycle supervisor.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod bootstrap;
mod daemon;
mod error;
mod logging;
mod peer_book;
mod status;
mod store;

pub use bootstrap::KeelNode;
pub use daemon::daemonize;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use peer_book::PeerBook;
pub use status::{NodeStatus, StatusListener};
pub use store::{StateRecord, StateStore};
