use crate::{Error, Result};

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Pid marker asserting that this process owns the node's directories.
///
/// The marker is deleted when the handle is dropped, including while
/// unwinding from a panic.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Fail if a marker already exists at `path`. Never touches the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the marker exists.
    pub fn ensure_absent(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::AlreadyRunning(path.to_path_buf()));
        }

        Ok(())
    }

    /// Create the marker and write the current process id into it.
    ///
    /// Creation is exclusive, so two nodes racing for the same path cannot
    /// both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the marker appeared in the
    /// meantime and [`Error::PidFile`] for any other IO failure.
    pub fn claim(path: &Path) -> Result<Self> {
        let io_error = |source| Error::PidFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyRunning(path.to_path_buf()));
            }
            Err(e) => return Err(io_error(e)),
        };

        writeln!(file, "{}", std::process::id()).map_err(io_error)?;
        debug!("wrote pid file {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Location of the marker.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the marker now. Failures are logged, never returned.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed pid file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove pid file {}: {e}", self.path.display()),
        }
    }
}
