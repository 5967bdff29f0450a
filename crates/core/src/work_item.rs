//! Work item model - the unit of work tracked to completion.

use serde::{Deserialize, Serialize};
use crate::id::{PartNumber, PhaseId, SubphaseId};
use crate::phase::Phase;
use crate::subphase::Subphase;
use crate::Time;

/// A work item (order, production job) made of ordered phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Caller-assigned identity
    pub part_number: PartNumber,

    /// Display name
    pub name: String,

    /// Client the work is for
    #[serde(default)]
    pub client_name: Option<String>,

    /// Scheduling priority
    #[serde(default)]
    pub priority: Priority,

    /// Free-form notes
    #[serde(default)]
    pub remarks: Option<String>,

    /// Phases, ordered by `order_index`
    #[serde(default)]
    pub phases: Vec<Phase>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl WorkItem {
    /// Create an empty work item.
    pub fn new(part_number: PartNumber, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            part_number,
            name: name.into(),
            client_name: None,
            priority: Priority::default(),
            remarks: None,
            phases: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a phase, keeping phases sorted by `order_index`.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self.phases.sort_by_key(|p| p.order_index);
        self
    }

    /// Look up a phase by id.
    pub fn phase(&self, id: PhaseId) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    /// Mutable lookup of a phase by id.
    pub fn phase_mut(&mut self, id: PhaseId) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.id == id)
    }

    /// The phase that owns subphase `id`.
    pub fn phase_of_subphase(&self, id: SubphaseId) -> Option<&Phase> {
        self.phases.iter().find(|p| p.subphase(id).is_some())
    }

    /// Mutable access to the phase that owns subphase `id`.
    pub fn phase_of_subphase_mut(&mut self, id: SubphaseId) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.subphase(id).is_some())
    }

    /// Look up a subphase anywhere in the item.
    pub fn subphase(&self, id: SubphaseId) -> Option<&Subphase> {
        self.phases.iter().find_map(|p| p.subphase(id))
    }

    /// Whether subphase `id` belongs to this item.
    pub fn contains_subphase(&self, id: SubphaseId) -> bool {
        self.subphase(id).is_some()
    }

    /// Total subphases across all phases.
    pub fn subphase_count(&self) -> usize {
        self.phases.iter().map(|p| p.subphases.len()).sum()
    }

    /// Completed subphases across all phases.
    pub fn completed_subphase_count(&self) -> usize {
        self.phases.iter().map(|p| p.completed_count()).sum()
    }
}

/// Work item priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Most urgent
    High,
    /// Default priority
    #[default]
    Medium,
    /// Least urgent
    Low,
}

impl Priority {
    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}
