use crate::{Error, ShutdownReason};

use std::fmt;

use keel_modules::CleanupReport;

/// Why the node stopped.
///
/// Every variant maps to a non-zero exit code; a node that was running never
/// exits with success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// A pid marker from another instance was present.
    AlreadyRunning,

    /// Config, genesis file or protocol descriptor unusable.
    Configuration,

    /// The genesis block failed its integrity check.
    Integrity,

    /// Core services or the runtime failed to start.
    Initialization,

    /// The cleanup pass ran to completion.
    Shutdown(ShutdownReason),

    /// The cleanup pass exceeded the total shutdown timeout.
    ShutdownTimedOut(ShutdownReason),
}

impl ExitReason {
    /// Process exit code for this reason.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::AlreadyRunning => 75,
            Self::Configuration => 78,
            Self::Integrity => 65,
            Self::Initialization => 70,
            Self::Shutdown(_) => 1,
            Self::ShutdownTimedOut(_) => 124,
        }
    }
}

/// How a supervised run ended.
#[derive(Debug)]
pub struct Exit {
    reason: ExitReason,
    error: Option<Error>,
    report: Option<CleanupReport>,
}

impl Exit {
    pub(crate) const fn new(reason: ExitReason, error: Option<Error>) -> Self {
        Self {
            reason,
            error,
            report: None,
        }
    }

    pub(crate) fn with_report(mut self, report: CleanupReport) -> Self {
        self.report = Some(report);
        self
    }

    pub(crate) const fn failed(reason: ExitReason, error: Error) -> Self {
        Self::new(reason, Some(error))
    }

    /// Why the node stopped.
    #[must_use]
    pub const fn reason(&self) -> &ExitReason {
        &self.reason
    }

    /// The error that stopped the node, for the failure paths.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Outcome of the cleanup pass, if one ran to completion.
    #[must_use]
    pub const fn cleanup_report(&self) -> Option<&CleanupReport> {
        self.report.as_ref()
    }

    /// Process exit code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.reason.code()
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, &self.error) {
            (ExitReason::Shutdown(reason), _) => write!(f, "shut down after {reason}"),
            (ExitReason::ShutdownTimedOut(reason), _) => {
                write!(f, "shutdown after {reason} timed out")
            }
            (_, Some(error)) => write!(f, "{error}"),
            (reason, None) => write!(f, "{reason:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signal;

    #[test]
    fn test_every_exit_is_non_zero() {
        let reasons = [
            ExitReason::AlreadyRunning,
            ExitReason::Configuration,
            ExitReason::Integrity,
            ExitReason::Initialization,
            ExitReason::Shutdown(ShutdownReason::Signal(Signal::Terminate)),
            ExitReason::ShutdownTimedOut(ShutdownReason::Signal(Signal::Interrupt)),
        ];

        for reason in reasons {
            assert_ne!(reason.code(), 0, "{reason:?}");
        }
    }
}
