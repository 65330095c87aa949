use crate::{Error, Result};

use std::fs::OpenOptions;
use std::sync::Mutex;

use keel_config::NodeConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, registry};

/// Install the global subscriber: a plain-text layer appending to the log
/// file, plus a console layer unless the node runs as a daemon.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already set.
pub fn init_logging(config: &NodeConfig) -> Result<()> {
    if let Some(dir) = config.log_path.parent() {
        std::fs::create_dir_all(dir).map_err(Error::io("failed to create log directory", dir))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .map_err(Error::io("failed to open log file", &config.log_path))?;

    let file_layer = fmt::Layer::default()
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    let console_layer = (!config.daemon).then(fmt::Layer::default);

    let subscriber = registry()
        .with(config.log_level.level_filter())
        .with(file_layer)
        .with(console_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
