use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Phase of the node's lifecycle.
///
/// Phases only move forward; the order of the variants is the order of the
/// lifecycle.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum LifecycleState {
    /// Preflight checks and pid marker.
    Booting = 0,

    /// Genesis integrity check.
    Verifying = 1,

    /// Core services and runtime starting.
    Initializing = 2,

    /// Steady state.
    Running = 3,

    /// Draining modules.
    ShuttingDown = 4,

    /// Terminal.
    Exited = 5,
}

impl LifecycleState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Booting,
            1 => Self::Verifying,
            2 => Self::Initializing,
            3 => Self::Running,
            4 => Self::ShuttingDown,
            _ => Self::Exited,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Booting => "booting",
            Self::Verifying => "verifying",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::ShuttingDown => "shutting down",
            Self::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// The process-wide lifecycle state.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Start in [`LifecycleState::Booting`].
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Booting as u8))
    }

    /// Current phase.
    #[must_use]
    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if it lies strictly ahead of the current phase.
    ///
    /// Returns `false`, leaving the phase unchanged, for any backwards or
    /// repeated transition.
    pub fn advance(&self, next: LifecycleState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (next as u8 > current).then_some(next as u8)
            })
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        let state = StateCell::new();
        assert_eq!(state.get(), LifecycleState::Booting);

        assert!(state.advance(LifecycleState::Verifying));
        assert!(state.advance(LifecycleState::Running));
        assert!(!state.advance(LifecycleState::Running));
        assert!(!state.advance(LifecycleState::Initializing));
        assert_eq!(state.get(), LifecycleState::Running);

        assert!(state.advance(LifecycleState::Exited));
        assert!(!state.advance(LifecycleState::ShuttingDown));
        assert_eq!(state.get(), LifecycleState::Exited);
    }
}
