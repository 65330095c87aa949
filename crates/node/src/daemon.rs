use crate::Result;

/// Detach from the terminal. The working directory is kept and the standard
/// streams go to `/dev/null`.
///
/// Must run before the async runtime starts any threads.
///
/// # Errors
///
/// Returns [`crate::Error::Daemonize`] if the fork or new session fails.
pub fn daemonize() -> Result<()> {
    nix::unistd::daemon(true, false)?;
    Ok(())
}
