//! Phase model - an ordered, timed stage of a work item.

use serde::{Deserialize, Serialize};
use crate::clock::elapsed_seconds;
use crate::id::{PhaseId, SubphaseId};
use crate::subphase::Subphase;
use crate::Time;

/// A phase is one ordered stage of a work item, with a pause-aware timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Unique identifier
    pub id: PhaseId,

    /// Phase name
    pub name: String,

    /// Position among sibling phases
    pub order_index: u32,

    /// When the phase was started
    pub start_time: Option<Time>,

    /// When the current pause began
    pub pause_time: Option<Time>,

    /// When the phase was stopped
    pub end_time: Option<Time>,

    /// Seconds spent paused so far
    #[serde(default)]
    pub paused_duration: u64,

    /// Subphases, ordered by `order_index`
    #[serde(default)]
    pub subphases: Vec<Subphase>,
}

impl Phase {
    /// Create an untouched phase with no subphases.
    pub fn new(name: impl Into<String>, order_index: u32) -> Self {
        Self {
            id: PhaseId::new(),
            name: name.into(),
            order_index,
            start_time: None,
            pause_time: None,
            end_time: None,
            paused_duration: 0,
            subphases: Vec::new(),
        }
    }

    /// Append a subphase, keeping siblings sorted by `order_index`.
    pub fn with_subphase(mut self, subphase: Subphase) -> Self {
        self.subphases.push(subphase);
        self.subphases.sort_by_key(|s| s.order_index);
        self
    }

    /// Current timer state derived from the timestamps.
    pub fn state(&self) -> PhaseState {
        PhaseState::of(self)
    }

    /// Active seconds at `now`.
    pub fn elapsed(&self, now: Time) -> u64 {
        elapsed_seconds(
            self.start_time,
            self.pause_time,
            self.end_time,
            self.paused_duration,
            now,
        )
    }

    /// Look up a subphase by id.
    pub fn subphase(&self, id: SubphaseId) -> Option<&Subphase> {
        self.subphases.iter().find(|s| s.id == id)
    }

    /// Mutable lookup of a subphase by id.
    pub fn subphase_mut(&mut self, id: SubphaseId) -> Option<&mut Subphase> {
        self.subphases.iter_mut().find(|s| s.id == id)
    }

    /// The sibling immediately before `id` in order, if any.
    pub fn predecessor_of(&self, id: SubphaseId) -> Option<&Subphase> {
        let target = self.subphase(id)?;
        self.subphases
            .iter()
            .filter(|s| s.order_index < target.order_index)
            .max_by_key(|s| s.order_index)
    }

    /// Number of completed subphases.
    pub fn completed_count(&self) -> usize {
        self.subphases.iter().filter(|s| s.completed).count()
    }

    /// Whether every subphase is complete. Vacuously true when there are none.
    pub fn all_subphases_completed(&self) -> bool {
        self.subphases.iter().all(|s| s.completed)
    }
}

/// Timer state of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseState {
    /// Never started, or reset
    NotStarted,
    /// Clock is counting
    Running,
    /// Clock is stopped until resumed
    Paused,
    /// Stopped for good; only a reset leaves this state
    Completed,
}

impl PhaseState {
    /// Derive the state from a phase's timestamps.
    pub fn of(phase: &Phase) -> Self {
        if phase.start_time.is_none() {
            Self::NotStarted
        } else if phase.end_time.is_some() {
            Self::Completed
        } else if phase.pause_time.is_some() {
            Self::Paused
        } else {
            Self::Running
        }
    }

    /// Operations that are legal from this state.
    pub fn allowed_operations(&self) -> Vec<PhaseOperation> {
        match self {
            Self::NotStarted => vec![PhaseOperation::Start],
            Self::Running => vec![PhaseOperation::Pause, PhaseOperation::Stop, PhaseOperation::Reset],
            Self::Paused => vec![PhaseOperation::Resume, PhaseOperation::Reset],
            Self::Completed => vec![PhaseOperation::Reset],
        }
    }

    /// Whether `op` is legal from this state. `Stop` additionally needs all
    /// subphases complete, which is not a state property.
    pub fn permits(&self, op: PhaseOperation) -> bool {
        self.allowed_operations().contains(&op)
    }
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Timer transitions a caller can request on a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseOperation {
    /// Begin timing a phase that has not started
    Start,
    /// Suspend a running phase
    Pause,
    /// Continue a paused phase, banking the pause span
    Resume,
    /// Finish a running phase once every subphase is complete
    Stop,
    /// Clear all timer fields
    Reset,
}

impl std::fmt::Display for PhaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::Stop => write!(f, "stop"),
            Self::Reset => write!(f, "reset"),
        }
    }
}
