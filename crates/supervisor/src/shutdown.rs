use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

tokio::task_local! {
    static GUARDED_TASK: String;
}

/// OS signals that stop the node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal {
    /// `SIGTERM`
    Terminate,

    /// `SIGINT`
    Interrupt,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => f.write_str("SIGTERM"),
            Self::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// What started the shutdown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShutdownReason {
    /// An OS signal.
    Signal(Signal),

    /// A panic anywhere in the process.
    Panic {
        /// Panic payload and location.
        message: String,
    },

    /// A guarded background task returned an error or panicked.
    TaskFailed {
        /// Name the task was spawned under.
        task: String,

        /// What the task failed with.
        error: String,
    },
}

impl ShutdownReason {
    /// Whether the shutdown was caused by a fault rather than a request.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        !matches!(self, Self::Signal(_))
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(f, "{signal}"),
            Self::Panic { message } => write!(f, "panic: {message}"),
            Self::TaskFailed { task, error } => write!(f, "task {task} failed: {error}"),
        }
    }
}

struct Inner {
    shutting_down: AtomicBool,
    reason: Mutex<Option<ShutdownReason>>,
    token: CancellationToken,
}

/// Single entry point for every shutdown trigger.
///
/// The first call to [`trigger`](Self::trigger) wins; every later call is a
/// no-op, so at most one cleanup pass runs per process.
#[derive(Clone)]
pub struct ShutdownController {
    inner: Arc<Inner>,
}

impl ShutdownController {
    /// Create a controller that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                shutting_down: AtomicBool::new(false),
                reason: Mutex::new(None),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Request shutdown.
    ///
    /// Returns `true` if this call started the shutdown and `false` if one was
    /// already under way.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self
            .inner
            .shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%reason, "shutdown already in progress, ignoring trigger");
            return false;
        }

        if reason.is_fault() {
            error!(fatal = true, %reason, "shutting down after fault");
        } else {
            info!(%reason, "shutdown requested");
        }

        *self.inner.reason.lock() = Some(reason);
        self.inner.token.cancel();

        true
    }

    /// Whether a shutdown has been triggered.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    /// The reason recorded by the winning trigger.
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.inner.reason.lock().clone()
    }

    /// A token cancelled once shutdown is triggered.
    ///
    /// Cancelling the returned token does not trigger a shutdown.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// A handle for spawning guarded tasks that trigger this controller.
    #[must_use]
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.clone())
    }

    /// Wait for the winning trigger.
    pub async fn wait(&self) -> ShutdownReason {
        loop {
            self.inner.token.cancelled().await;

            // The reason is stored before the token is cancelled.
            if let Some(reason) = self.reason() {
                return reason;
            }

            tokio::task::yield_now().await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownController")
            .field("shutting_down", &self.is_shutting_down())
            .field("reason", &self.reason())
            .finish()
    }
}

/// Handed to the runtime so it can spawn tasks whose failure stops the node.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    controller: ShutdownController,
    tracker: TaskTracker,
}

impl ShutdownHandle {
    pub(crate) fn new(controller: ShutdownController) -> Self {
        Self {
            controller,
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn a background task whose error or panic triggers shutdown.
    ///
    /// Tasks should watch [`token`](Self::token) and return once it is
    /// cancelled; the supervisor waits for them before closing storage.
    pub fn spawn_guarded<F, E>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let name = name.into();
        let controller = self.controller.clone();
        let task = tokio::spawn(GUARDED_TASK.scope(name.clone(), task));

        self.tracker.spawn(async move {
            let error = match task.await {
                Ok(Ok(())) => {
                    debug!(task = %name, "task finished");
                    return;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => panic_message(e.into_panic().as_ref()),
                Err(e) => e.to_string(),
            };

            controller.trigger(ShutdownReason::TaskFailed { task: name, error });
        });
    }

    /// A token cancelled once shutdown is triggered.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.controller.token()
    }

    /// Request shutdown. See [`ShutdownController::trigger`].
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.controller.trigger(reason)
    }

    pub(crate) async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Whether the caller runs inside a task spawned by
/// [`ShutdownHandle::spawn_guarded`]. Panics there are reported by the guard.
pub(crate) fn in_guarded_task() -> bool {
    GUARDED_TASK.try_with(|_| ()).is_ok()
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_trigger_wins() {
        let controller = ShutdownController::new();
        let token = controller.token();

        assert!(controller.trigger(ShutdownReason::Signal(Signal::Interrupt)));
        assert!(!controller.trigger(ShutdownReason::Signal(Signal::Terminate)));
        assert!(token.is_cancelled());

        assert_eq!(
            controller.wait().await,
            ShutdownReason::Signal(Signal::Interrupt)
        );
    }

    #[tokio::test]
    async fn test_cancelling_a_child_token_does_not_trigger() {
        let controller = ShutdownController::new();

        controller.token().cancel();

        assert!(!controller.is_shutting_down());
        assert!(controller.reason().is_none());
    }

    #[tokio::test]
    async fn test_guarded_task_error_triggers_shutdown() {
        let controller = ShutdownController::new();
        let handle = ShutdownHandle::new(controller.clone());

        handle.spawn_guarded("sync", async { Err::<(), _>("peer table corrupt") });

        assert_eq!(
            controller.wait().await,
            ShutdownReason::TaskFailed {
                task: "sync".to_string(),
                error: "peer table corrupt".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_guarded_task_panic_triggers_shutdown() {
        let controller = ShutdownController::new();
        let handle = ShutdownHandle::new(controller.clone());

        let went_backwards = true;
        handle.spawn_guarded("forger", async move {
            assert!(!went_backwards, "slot clock went backwards");
            Ok::<(), String>(())
        });

        assert_eq!(
            controller.wait().await,
            ShutdownReason::TaskFailed {
                task: "forger".to_string(),
                error: "slot clock went backwards".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_finished_task_does_not_trigger() {
        let controller = ShutdownController::new();
        let handle = ShutdownHandle::new(controller.clone());

        handle.spawn_guarded("noop", async { Ok::<(), String>(()) });
        handle.drain().await;

        assert!(!controller.is_shutting_down());
    }
}
