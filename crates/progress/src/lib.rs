//! Progress Tracking
//!
//! Completion percentages, in-progress listings, time reports and
//! remaining-time estimates, all derived from work item state.

#![warn(missing_docs)]

pub mod aggregator;
pub mod filter;
pub mod report;
pub mod tracker;
pub mod estimator;

pub use aggregator::{
    percentage, phase_progress, item_progress, progress_report,
    PhaseProgress, ItemProgress, ProgressReport, ProgressStatus,
};
pub use filter::{list_items, ItemSummary, ProgressFilter, ProgressSort};
pub use report::{TimeReport, PhaseTime, SubphaseTime};
pub use tracker::{ProgressTracker, BasicProgressTracker};
pub use estimator::{CompletionEstimator, RemainingEstimate};
