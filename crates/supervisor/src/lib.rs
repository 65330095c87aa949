//! Lifecycle supervisor for a keel node.
//!
//! The supervisor checks that it is the only node on its directories,
//! verifies the genesis block, hands over to the init routine and runtime,
//! and on the first signal or fault drains every module before exiting.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod context;
mod error;
mod exit;
mod faults;
mod pid;
mod shutdown;
mod signals;
mod state;
mod storage;
mod supervisor;

pub use context::{FeatureSwitches, NodeContext};
pub use error::{Error, Result};
pub use exit::{Exit, ExitReason};
pub use faults::install_panic_hook;
pub use pid::PidFile;
pub use shutdown::{ShutdownController, ShutdownHandle, ShutdownReason, Signal};
pub use signals::install_signal_handlers;
pub use state::{LifecycleState, StateCell};
pub use storage::{StorageGuard, StorageHandle};
pub use supervisor::{NodeInitializer, Scope, Supervisor, SupervisorOptions, preflight};
