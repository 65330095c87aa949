use crate::{Error, Result, ShutdownController, ShutdownReason, Signal};

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal::unix::{SignalKind, signal};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Turn `SIGTERM` and `SIGINT` into shutdown triggers.
///
/// Handlers are registered once per process; later calls return `Ok(false)`.
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns [`Error::Signals`] if the OS refuses the registration.
pub fn install_signal_handlers(controller: &ShutdownController) -> Result<bool> {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return Ok(false);
    }

    let (mut terminate, mut interrupt) = signal(SignalKind::terminate())
        .and_then(|terminate| Ok((terminate, signal(SignalKind::interrupt())?)))
        .map_err(|e| {
            INSTALLED.store(false, Ordering::Release);
            Error::Signals(e)
        })?;
    let controller = controller.clone();

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = terminate.recv() => Signal::Terminate,
                Some(()) = interrupt.recv() => Signal::Interrupt,
                else => break,
            };

            controller.trigger(ShutdownReason::Signal(received));
        }
    });

    Ok(true)
}
