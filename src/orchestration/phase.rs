//! Run phases.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    CachesReset,
    StaticGenerated,
    BucketsStreamed,
    HubsGenerated,
    IndexBuilt,
    Done,
    Failed,
}

impl RunPhase {
    /// The phase a healthy run moves to next.
    pub fn successor(self) -> Option<RunPhase> {
        match self {
            RunPhase::Idle => Some(RunPhase::CachesReset),
            RunPhase::CachesReset => Some(RunPhase::StaticGenerated),
            RunPhase::StaticGenerated => Some(RunPhase::BucketsStreamed),
            RunPhase::BucketsStreamed => Some(RunPhase::HubsGenerated),
            RunPhase::HubsGenerated => Some(RunPhase::IndexBuilt),
            RunPhase::IndexBuilt => Some(RunPhase::Done),
            RunPhase::Done | RunPhase::Failed => None,
        }
    }

    /// `Failed` is reachable from every non-terminal phase.
    pub fn can_advance_to(self, to: RunPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == RunPhase::Failed || self.successor() == Some(to)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::CachesReset => "caches_reset",
            RunPhase::StaticGenerated => "static_generated",
            RunPhase::BucketsStreamed => "buckets_streamed",
            RunPhase::HubsGenerated => "hubs_generated",
            RunPhase::IndexBuilt => "index_built",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current phase plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: RunPhase,
    history: Vec<RunPhase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: RunPhase::Idle,
            history: vec![RunPhase::Idle],
        }
    }

    pub fn current(&self) -> RunPhase {
        self.current
    }

    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }

    /// Move to `to`. Invalid transitions are refused and logged.
    pub fn advance(&mut self, to: RunPhase) -> bool {
        if !self.current.can_advance_to(to) {
            tracing::error!(from = %self.current, to = %to, "invalid phase transition");
            return false;
        }
        tracing::debug!(from = %self.current, to = %to, "phase transition");
        self.current = to;
        self.history.push(to);
        true
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut tracker = PhaseTracker::new();
        let mut phase = RunPhase::Idle;
        while let Some(next) = phase.successor() {
            assert!(tracker.advance(next));
            phase = next;
        }
        assert_eq!(tracker.current(), RunPhase::Done);
        assert_eq!(tracker.history().len(), 7);
    }

    #[test]
    fn test_failed_reachable_from_any_step() {
        for phase in [
            RunPhase::Idle,
            RunPhase::CachesReset,
            RunPhase::StaticGenerated,
            RunPhase::BucketsStreamed,
            RunPhase::HubsGenerated,
            RunPhase::IndexBuilt,
        ] {
            assert!(phase.can_advance_to(RunPhase::Failed), "{}", phase);
        }
        assert!(!RunPhase::Done.can_advance_to(RunPhase::Failed));
    }

    #[test]
    fn test_skipping_a_phase_is_refused() {
        let mut tracker = PhaseTracker::new();
        assert!(!tracker.advance(RunPhase::StaticGenerated));
        assert_eq!(tracker.current(), RunPhase::Idle);
    }
}
