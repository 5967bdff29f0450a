//! Remaining-time estimation from subphase targets.

use chrono::Duration;
use optrack_core::{Phase, Time, WorkItem};

/// Remaining work expressed in target minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemainingEstimate {
    /// Sum of `expected_duration` over unfinished subphases
    pub minutes: u64,

    /// Unfinished subphases that have no target and so add nothing
    pub unestimated_steps: usize,
}

impl RemainingEstimate {
    fn add(self, other: Self) -> Self {
        Self {
            minutes: self.minutes + other.minutes,
            unestimated_steps: self.unestimated_steps + other.unestimated_steps,
        }
    }
}

/// Completion time estimator.
pub struct CompletionEstimator;

impl CompletionEstimator {
    /// Remaining target minutes of a phase.
    pub fn remaining_for_phase(&self, phase: &Phase) -> RemainingEstimate {
        phase
            .subphases
            .iter()
            .filter(|s| !s.completed)
            .fold(RemainingEstimate::default(), |acc, s| match s.expected_duration {
                Some(minutes) => RemainingEstimate {
                    minutes: acc.minutes + u64::from(minutes),
                    ..acc
                },
                None => RemainingEstimate {
                    unestimated_steps: acc.unestimated_steps + 1,
                    ..acc
                },
            })
    }

    /// Remaining target minutes of a whole item.
    pub fn remaining_for_item(&self, item: &WorkItem) -> RemainingEstimate {
        item.phases
            .iter()
            .map(|p| self.remaining_for_phase(p))
            .fold(RemainingEstimate::default(), RemainingEstimate::add)
    }

    /// Estimate when an item finishes if work continues from `now`.
    ///
    /// `None` when nothing left has a target, unless nothing is left at all.
    pub fn estimate_item(&self, item: &WorkItem, now: Time) -> Option<Time> {
        let remaining = self.remaining_for_item(item);
        if remaining.minutes == 0 && remaining.unestimated_steps > 0 {
            return None;
        }
        let minutes = i64::try_from(remaining.minutes).ok()?;
        Some(now + Duration::minutes(minutes))
    }
}

impl Default for CompletionEstimator {
    fn default() -> Self {
        Self
    }
}
