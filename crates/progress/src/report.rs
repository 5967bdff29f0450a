//! Time report: actual vs expected durations per phase and subphase.

use optrack_core::{PartNumber, Phase, PhaseId, PhaseState, Subphase, SubphaseId, Time, WorkItem};
use serde::{Deserialize, Serialize};

/// Timing of one subphase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubphaseTime {
    /// Subphase
    pub id: SubphaseId,

    /// Name
    pub name: String,

    /// Whether it is done
    pub completed: bool,

    /// Assigned worker
    pub employee_name: Option<String>,

    /// Target in minutes
    pub expected_minutes: Option<u32>,

    /// Phase elapsed seconds recorded at completion
    pub recorded_seconds: Option<u64>,

    /// Recorded time exceeded the target
    pub overrun: bool,
}

impl SubphaseTime {
    fn of(subphase: &Subphase) -> Self {
        let overrun = match (subphase.time_duration, subphase.expected_duration) {
            (Some(actual), Some(expected)) => actual > u64::from(expected) * 60,
            _ => false,
        };
        Self {
            id: subphase.id,
            name: subphase.name.clone(),
            completed: subphase.completed,
            employee_name: subphase.employee_name.clone(),
            expected_minutes: subphase.expected_duration,
            recorded_seconds: subphase.time_duration,
            overrun,
        }
    }
}

/// Timing of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTime {
    /// Phase
    pub phase_id: PhaseId,

    /// Name
    pub name: String,

    /// Timer state at report time
    pub state: PhaseState,

    /// Active seconds at report time
    pub elapsed_seconds: u64,

    /// Seconds spent paused, including an open pause
    pub paused_seconds: u64,

    /// Per-step timings
    pub subphases: Vec<SubphaseTime>,
}

impl PhaseTime {
    fn of(phase: &Phase, now: Time) -> Self {
        let open_pause = match (phase.state(), phase.pause_time) {
            (PhaseState::Paused, Some(at)) => optrack_core::clock::pause_span_seconds(at, now),
            _ => 0,
        };
        Self {
            phase_id: phase.id,
            name: phase.name.clone(),
            state: phase.state(),
            elapsed_seconds: phase.elapsed(now),
            paused_seconds: phase.paused_duration.saturating_add(open_pause),
            subphases: phase.subphases.iter().map(SubphaseTime::of).collect(),
        }
    }
}

/// Time report for a work item at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeReport {
    /// Work item
    pub part_number: PartNumber,

    /// When the report was computed
    pub generated_at: Time,

    /// Per-phase timings, in phase order
    pub phases: Vec<PhaseTime>,

    /// Sum of phase elapsed seconds
    pub total_elapsed_seconds: u64,
}

impl TimeReport {
    /// Build the report for `item` as of `now`.
    pub fn build(item: &WorkItem, now: Time) -> Self {
        let phases: Vec<PhaseTime> = item.phases.iter().map(|p| PhaseTime::of(p, now)).collect();
        let total_elapsed_seconds = phases.iter().map(|p| p.elapsed_seconds).sum();
        Self {
            part_number: item.part_number.clone(),
            generated_at: now,
            phases,
            total_elapsed_seconds,
        }
    }

    /// Subphases whose recorded time exceeded their target.
    pub fn overruns(&self) -> impl Iterator<Item = &SubphaseTime> {
        self.phases.iter().flat_map(|p| p.subphases.iter()).filter(|s| s.overrun)
    }
}
