//! Listing, filtering and sorting of work items by derived progress.
//!
//! Nothing here is persisted; summaries are recomputed from the items on
//! every query.

use optrack_core::{PartNumber, PhaseState, Priority, WorkItem};
use serde::{Deserialize, Serialize};
use crate::aggregator::{item_progress, ProgressStatus};

/// One row of the work listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Work item
    pub part_number: PartNumber,

    /// Display name
    pub name: String,

    /// Client
    pub client_name: Option<String>,

    /// Priority
    pub priority: Priority,

    /// Item percentage (0-100)
    pub progress: u8,

    /// Classification of `progress`
    pub status: ProgressStatus,

    /// Phase work is currently happening in, if any
    pub current_phase: Option<String>,
}

impl ItemSummary {
    /// Summarise an item.
    pub fn of(item: &WorkItem) -> Self {
        let progress = item_progress(item);
        Self {
            part_number: item.part_number.clone(),
            name: item.name.clone(),
            client_name: item.client_name.clone(),
            priority: item.priority,
            progress: progress.percentage,
            status: progress.status,
            current_phase: current_phase(item),
        }
    }
}

/// The phase whose clock is running or paused; otherwise the first phase
/// with unfinished subphases.
fn current_phase(item: &WorkItem) -> Option<String> {
    item.phases
        .iter()
        .find(|p| matches!(p.state(), PhaseState::Running | PhaseState::Paused))
        .or_else(|| item.phases.iter().find(|p| !p.all_subphases_completed()))
        .map(|p| p.name.clone())
}

/// Criteria for the work listing. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressFilter {
    /// Only items in this status
    pub status: Option<ProgressStatus>,

    /// Only items with this priority
    pub priority: Option<Priority>,

    /// Only items for this client (case-insensitive)
    pub client_name: Option<String>,

    /// Substring of part number or name (case-insensitive)
    pub search: Option<String>,
}

impl ProgressFilter {
    /// Only in-progress items.
    pub fn in_progress() -> Self {
        Self {
            status: Some(ProgressStatus::InProgress),
            ..Default::default()
        }
    }

    /// Whether a summary passes every set criterion.
    pub fn matches(&self, summary: &ItemSummary) -> bool {
        if let Some(status) = self.status {
            if summary.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if summary.priority != priority {
                return false;
            }
        }
        if let Some(client) = &self.client_name {
            let matches_client = summary
                .client_name
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(client));
            if !matches_client {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let hit = summary.part_number.as_str().to_lowercase().contains(&needle)
                || summary.name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Ordering of the work listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgressSort {
    /// Highest percentage first
    Progress,
    /// High priority first, then highest percentage
    #[default]
    Priority,
    /// Part number ascending
    PartNumber,
}

impl std::str::FromStr for ProgressSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "progress" => Ok(Self::Progress),
            "priority" => Ok(Self::Priority),
            "part" | "part-number" | "part_number" => Ok(Self::PartNumber),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Summarise, filter and sort items. Ties fall back to part number.
pub fn list_items<'a>(
    items: impl IntoIterator<Item = &'a WorkItem>,
    filter: &ProgressFilter,
    sort: ProgressSort,
) -> Vec<ItemSummary> {
    let mut rows: Vec<ItemSummary> = items
        .into_iter()
        .map(ItemSummary::of)
        .filter(|s| filter.matches(s))
        .collect();

    rows.sort_by(|a, b| {
        let primary = match sort {
            ProgressSort::Progress => b.progress.cmp(&a.progress),
            ProgressSort::Priority => a
                .priority
                .rank()
                .cmp(&b.priority.rank())
                .then(b.progress.cmp(&a.progress)),
            ProgressSort::PartNumber => std::cmp::Ordering::Equal,
        };
        primary.then_with(|| a.part_number.cmp(&b.part_number))
    });
    rows
}
