//! Atom state and hydration phases

use std::fmt;

use super::errors::AtomError;

/// Hydration state machine
///
/// ```text
/// Pending -> Reading -> Decoding -> Validating -> Hydrated
///               |          |            |
///               +----------+------------+--> Recovering -> Hydrated | Failed
/// ```
///
/// `Reading` goes straight to `Hydrated` when no record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationPhase {
    Pending,
    Reading,
    Decoding,
    Validating,
    Recovering,
    Hydrated,
    Failed,
}

impl HydrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HydrationPhase::Pending => "PENDING",
            HydrationPhase::Reading => "READING",
            HydrationPhase::Decoding => "DECODING",
            HydrationPhase::Validating => "VALIDATING",
            HydrationPhase::Recovering => "RECOVERING",
            HydrationPhase::Hydrated => "HYDRATED",
            HydrationPhase::Failed => "FAILED",
        }
    }

    /// Hydrated or Failed; no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, HydrationPhase::Hydrated | HydrationPhase::Failed)
    }
}

impl fmt::Display for HydrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What `ready()` resolves to
#[derive(Debug, Clone)]
pub(crate) enum Readiness {
    Pending,
    Ready,
    Failed(AtomError),
}

impl Readiness {
    pub(crate) fn is_settled(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// In-memory value plus bookkeeping. Guarded by the atom's state mutex.
#[derive(Debug)]
pub(crate) struct AtomState<T> {
    pub(crate) value: T,
    pub(crate) phase: HydrationPhase,
    /// Bumped on every commit; orders writes
    pub(crate) seq: u64,
}

impl<T> AtomState<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self {
            value: initial,
            phase: HydrationPhase::Pending,
            seq: 0,
        }
    }

    pub(crate) fn is_hydrated(&self) -> bool {
        self.phase == HydrationPhase::Hydrated
    }

    /// Replace the value and return the new sequence number
    pub(crate) fn commit(&mut self, value: T) -> u64 {
        self.value = value;
        self.seq += 1;
        self.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_pending() {
        let state = AtomState::new(5);
        assert_eq!(state.phase, HydrationPhase::Pending);
        assert_eq!(state.seq, 0);
        assert!(!state.is_hydrated());
    }

    #[test]
    fn test_commit_bumps_sequence() {
        let mut state = AtomState::new(0);
        assert_eq!(state.commit(1), 1);
        assert_eq!(state.commit(2), 2);
        assert_eq!(state.value, 2);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(HydrationPhase::Hydrated.is_terminal());
        assert!(HydrationPhase::Failed.is_terminal());
        assert!(!HydrationPhase::Recovering.is_terminal());
    }
}
