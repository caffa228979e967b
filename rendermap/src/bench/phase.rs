//! Benchmark phase tracking.
//!
//! The main task walks `INIT → ACQUIRE → DISPATCH × niter → RELEASE → DONE`.
//! [`PhaseTracker`] refuses any other order, so a reordering bug in the
//! orchestration surfaces as an invariant violation instead of a wrong
//! timing.

use crate::runtime::RuntimeError;
use std::fmt;

/// One step of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Acquire,
    /// Dispatch round, counted from 0.
    Dispatch { round: i64 },
    Release,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "INIT"),
            Phase::Acquire => write!(f, "ACQUIRE"),
            Phase::Dispatch { round } => write!(f, "DISPATCH[{}]", round),
            Phase::Release => write!(f, "RELEASE"),
            Phase::Done => write!(f, "DONE"),
        }
    }
}

/// Enforces the phase order for a run of `iterations` dispatch rounds.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    iterations: i64,
    current: Phase,
    history: Vec<Phase>,
}

impl PhaseTracker {
    /// Starts in [`Phase::Init`]. A non-positive iteration count means no
    /// dispatch rounds.
    pub fn new(iterations: i64) -> Self {
        Self {
            iterations: iterations.max(0),
            current: Phase::Init,
            history: vec![Phase::Init],
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// The only phase that may follow the current one.
    pub fn next_phase(&self) -> Option<Phase> {
        match self.current {
            Phase::Init => Some(Phase::Acquire),
            Phase::Acquire if self.iterations > 0 => Some(Phase::Dispatch { round: 0 }),
            Phase::Acquire => Some(Phase::Release),
            Phase::Dispatch { round } if round + 1 < self.iterations => {
                Some(Phase::Dispatch { round: round + 1 })
            }
            Phase::Dispatch { .. } => Some(Phase::Release),
            Phase::Release => Some(Phase::Done),
            Phase::Done => None,
        }
    }

    /// Moves to `phase`, failing if it is not the next one.
    pub fn advance(&mut self, phase: Phase) -> Result<(), RuntimeError> {
        match self.next_phase() {
            Some(next) if next == phase => {
                tracing::trace!(from = %self.current, to = %phase, "Benchmark phase");
                self.current = phase;
                self.history.push(phase);
                Ok(())
            }
            Some(next) => Err(RuntimeError::invariant(format!(
                "benchmark phase {} cannot follow {} (expected {})",
                phase, self.current, next
            ))),
            None => Err(RuntimeError::invariant(format!(
                "benchmark already {}; cannot enter {}",
                self.current, phase
            ))),
        }
    }

    pub fn is_done(&self) -> bool {
        self.current == Phase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run() {
        let mut tracker = PhaseTracker::new(2);
        tracker.advance(Phase::Acquire).unwrap();
        tracker.advance(Phase::Dispatch { round: 0 }).unwrap();
        tracker.advance(Phase::Dispatch { round: 1 }).unwrap();
        tracker.advance(Phase::Release).unwrap();
        tracker.advance(Phase::Done).unwrap();

        assert!(tracker.is_done());
        assert_eq!(tracker.history().len(), 6);
        assert_eq!(tracker.next_phase(), None);
    }

    #[test]
    fn test_zero_iterations_skip_dispatch() {
        let mut tracker = PhaseTracker::new(0);
        tracker.advance(Phase::Acquire).unwrap();
        assert!(tracker.advance(Phase::Dispatch { round: 0 }).is_err());
        tracker.advance(Phase::Release).unwrap();
    }

    #[test]
    fn test_release_before_rounds_done_rejected() {
        let mut tracker = PhaseTracker::new(3);
        tracker.advance(Phase::Acquire).unwrap();
        tracker.advance(Phase::Dispatch { round: 0 }).unwrap();

        let err = tracker.advance(Phase::Release).unwrap_err();
        assert!(matches!(err, RuntimeError::InvariantViolation(_)));
        assert_eq!(tracker.current(), Phase::Dispatch { round: 0 });
    }

    #[test]
    fn test_dispatch_before_acquire_rejected() {
        let mut tracker = PhaseTracker::new(1);
        assert!(tracker.advance(Phase::Dispatch { round: 0 }).is_err());
    }

    #[test]
    fn test_nothing_after_done() {
        let mut tracker = PhaseTracker::new(0);
        tracker.advance(Phase::Acquire).unwrap();
        tracker.advance(Phase::Release).unwrap();
        tracker.advance(Phase::Done).unwrap();
        assert!(tracker.advance(Phase::Init).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Phase::Dispatch { round: 4 }.to_string(), "DISPATCH[4]");
        assert_eq!(Phase::Release.to_string(), "RELEASE");
    }
}
