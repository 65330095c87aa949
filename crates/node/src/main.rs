//! Command-line entry point for a keel node.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use keel_config::{LogLevel, NodeConfig, Overrides};
use keel_genesis::CanonicalJsonCodec;
use keel_node::{KeelNode, daemonize, init_logging};
use keel_supervisor::{ExitReason, Supervisor, preflight};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Root directory for config, data and derived paths
    #[arg(long, env = "KEEL_BASE_DIR")]
    base: Option<PathBuf>,

    /// Config file
    #[arg(short, long, env = "KEEL_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port
    #[arg(short, long, env = "KEEL_PORT")]
    port: Option<u16>,

    /// Listening address
    #[arg(short, long, env = "KEEL_ADDRESS")]
    address: Option<IpAddr>,

    /// Genesis block file
    #[arg(short, long, env = "KEEL_GENESIS_BLOCK")]
    genesisblock: Option<PathBuf>,

    /// Comma-separated `ip[:port]` peers; pass without a value to clear
    #[arg(long, env = "KEEL_PEERS")]
    peers: Option<Option<String>>,

    /// Log level: trace, debug, log, info, warn, error, fatal or none
    #[arg(short, long, env = "KEEL_LOG_LEVEL")]
    log: Option<LogLevel>,

    /// Data directory
    #[arg(long, env = "KEEL_DATA_DIR")]
    data: Option<PathBuf>,

    /// Side chain directory
    #[arg(long, env = "KEEL_CHAINS_DIR")]
    chains: Option<PathBuf>,

    /// Re-verify every stored block while loading
    #[arg(long, env = "KEEL_REINDEX")]
    reindex: bool,

    /// Detach from the terminal
    #[arg(long, env = "KEEL_DAEMON")]
    daemon: bool,

    /// Network identifier
    #[arg(long, env = "NET_VERSION")]
    net_version: Option<String>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Self {
            base_dir: args.base,
            config_path: args.config,
            data_dir: args.data,
            chain_dir: args.chains,
            genesis_path: args.genesisblock,
            port: args.port,
            address: args.address,
            peers: args.peers,
            log_level: args.log,
            reindex: args.reindex,
            daemon: args.daemon,
            net_version: args.net_version,
        }
    }
}

fn main() {
    std::process::exit(run(Args::parse()));
}

fn run(args: Args) -> i32 {
    let mut config = match NodeConfig::load(args.into()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed: {e}");
            return ExitReason::Configuration.code();
        }
    };

    // Nothing is logged yet, so preflight failures go to the console.
    if let Err(exit) = preflight(&config) {
        match exit.reason() {
            ExitReason::AlreadyRunning => eprintln!("Failed: keel node already started"),
            _ => eprintln!("Failed: {exit}"),
        }
        return exit.code();
    }

    if let Err(e) = config.ensure_master_password() {
        eprintln!("Failed: {e}");
        return ExitReason::Configuration.code();
    }

    if config.daemon {
        println!("Keel node started as daemon ...");

        if let Err(e) = daemonize() {
            eprintln!("Failed: {e}");
            return ExitReason::Initialization.code();
        }
    }

    if let Err(e) = init_logging(&config) {
        eprintln!("Failed: {e}");
        return ExitReason::Configuration.code();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(fatal = true, "failed to start async runtime: {e}");
            return ExitReason::Initialization.code();
        }
    };

    let mut supervisor = Supervisor::new(config, KeelNode::new(), CanonicalJsonCodec);
    if let Err(exit) = supervisor.claim_pid_file() {
        return exit.code();
    }

    runtime.block_on(supervisor.run()).code()
}
