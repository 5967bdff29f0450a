//! Completion percentages derived from subphase counts.

use optrack_core::{PartNumber, Phase, PhaseId, WorkItem};
use serde::{Deserialize, Serialize};

/// `round(100 * completed / total)`, half-up, and 0 when `total` is 0.
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as u8
}

/// Where a work item stands, by its percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStatus {
    /// 0%
    NotStarted,
    /// Strictly between 0% and 100%
    InProgress,
    /// 100%
    Complete,
}

impl ProgressStatus {
    /// Classify a percentage.
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            0 => Self::NotStarted,
            100.. => Self::Complete,
            _ => Self::InProgress,
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::InProgress => write!(f, "in progress"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "notstarted" => Ok(Self::NotStarted),
            "inprogress" => Ok(Self::InProgress),
            "complete" | "completed" => Ok(Self::Complete),
            other => Err(format!("unknown progress status: {other}")),
        }
    }
}

/// Progress of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    /// Phase
    pub phase_id: PhaseId,

    /// Phase name
    pub name: String,

    /// Completed subphases
    pub completed_subphases: usize,

    /// Total subphases
    pub total_subphases: usize,

    /// Percentage complete (0-100)
    pub percentage: u8,
}

/// Progress of a whole work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProgress {
    /// Completed subphases across all phases
    pub completed_subphases: usize,

    /// Total subphases across all phases
    pub total_subphases: usize,

    /// Percentage complete (0-100)
    pub percentage: u8,

    /// Classification of `percentage`
    pub status: ProgressStatus,
}

/// Per-phase and per-item progress, as returned by `GetProgress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Work item
    pub part_number: PartNumber,

    /// One entry per phase, in phase order
    pub phases: Vec<PhaseProgress>,

    /// Whole-item figure
    pub item: ItemProgress,
}

/// Progress of a single phase.
pub fn phase_progress(phase: &Phase) -> PhaseProgress {
    let completed = phase.completed_count();
    let total = phase.subphases.len();
    PhaseProgress {
        phase_id: phase.id,
        name: phase.name.clone(),
        completed_subphases: completed,
        total_subphases: total,
        percentage: percentage(completed, total),
    }
}

/// Progress across every phase of an item. Pooled over subphases, so a
/// phase with many steps weighs more than one with few.
pub fn item_progress(item: &WorkItem) -> ItemProgress {
    let completed = item.completed_subphase_count();
    let total = item.subphase_count();
    let pct = percentage(completed, total);
    ItemProgress {
        completed_subphases: completed,
        total_subphases: total,
        percentage: pct,
        status: ProgressStatus::from_percentage(pct),
    }
}

/// Full progress report for an item.
pub fn progress_report(item: &WorkItem) -> ProgressReport {
    ProgressReport {
        part_number: item.part_number.clone(),
        phases: item.phases.iter().map(phase_progress).collect(),
        item: item_progress(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optrack_core::Subphase;

    fn phase_with(done: usize, total: usize) -> Phase {
        let mut phase = Phase::new("P", 0);
        for i in 0..total {
            let mut sub = Subphase::time_tracked(format!("s{i}"), i as u32);
            sub.completed = i < done;
            phase.subphases.push(sub);
        }
        phase
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(5, 3), 100);
    }

    #[test]
    fn test_percentage_matches_float_rounding_for_all_small_totals() {
        for total in 1..=60usize {
            for done in 0..=total {
                let expected = (100.0 * done as f64 / total as f64).round() as u8;
                assert_eq!(percentage(done, total), expected, "{done}/{total}");
            }
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(ProgressStatus::from_percentage(0), ProgressStatus::NotStarted);
        assert_eq!(ProgressStatus::from_percentage(1), ProgressStatus::InProgress);
        assert_eq!(ProgressStatus::from_percentage(99), ProgressStatus::InProgress);
        assert_eq!(ProgressStatus::from_percentage(100), ProgressStatus::Complete);
        assert_eq!("in-progress".parse::<ProgressStatus>(), Ok(ProgressStatus::InProgress));
    }

    #[test]
    fn test_empty_phase_is_zero() {
        let progress = phase_progress(&Phase::new("Empty", 0));
        assert_eq!(progress.percentage, 0);
        assert_eq!(progress.total_subphases, 0);
    }

    #[test]
    fn test_item_progress_pools_subphases() {
        let item = WorkItem::new(PartNumber::new("PN-1").unwrap(), "Crate")
            .with_phase(phase_with(1, 1))
            .with_phase(phase_with(0, 3));
        let progress = item_progress(&item);
        assert_eq!(progress.completed_subphases, 1);
        assert_eq!(progress.total_subphases, 4);
        assert_eq!(progress.percentage, 25);
        assert_eq!(progress.status, ProgressStatus::InProgress);

        let report = progress_report(&item);
        assert_eq!(report.phases.len(), 2);
        assert_eq!(report.phases[0].percentage, 100);
    }

    #[test]
    fn test_item_without_subphases_is_not_started() {
        let item = WorkItem::new(PartNumber::new("PN-2").unwrap(), "Bare")
            .with_phase(Phase::new("Only", 0));
        let progress = item_progress(&item);
        assert_eq!(progress.percentage, 0);
        assert_eq!(progress.status, ProgressStatus::NotStarted);
    }
}
