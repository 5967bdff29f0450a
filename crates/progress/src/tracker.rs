//! Progress tracking service over the repository.

use std::sync::Arc;
use async_trait::async_trait;
use optrack_core::{Clock, PartNumber, SystemClock};
use optrack_storage::{Repository, Result};
use crate::aggregator::{progress_report, ProgressReport};
use crate::filter::{list_items, ItemSummary, ProgressFilter, ProgressSort};
use crate::report::TimeReport;

/// Read-only progress queries.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Per-phase and per-item progress of one work item.
    async fn get_progress(&self, part_number: &PartNumber) -> Result<Option<ProgressReport>>;

    /// Filtered, sorted listing of all work items.
    async fn list(&self, filter: &ProgressFilter, sort: ProgressSort) -> Result<Vec<ItemSummary>>;

    /// Time report of one work item as of now.
    async fn time_report(&self, part_number: &PartNumber) -> Result<Option<TimeReport>>;
}

/// Basic progress tracker implementation.
pub struct BasicProgressTracker<R: Repository> {
    storage: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: Repository> BasicProgressTracker<R> {
    /// Create a new progress tracker.
    pub fn new(storage: Arc<R>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a specific clock for time reports.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl<R: Repository + 'static> ProgressTracker for BasicProgressTracker<R> {
    async fn get_progress(&self, part_number: &PartNumber) -> Result<Option<ProgressReport>> {
        let item = self.storage.load_item(part_number).await?;
        Ok(item.map(|v| progress_report(&v.value)))
    }

    async fn list(&self, filter: &ProgressFilter, sort: ProgressSort) -> Result<Vec<ItemSummary>> {
        let items = self.storage.list_items().await?;
        Ok(list_items(&items, filter, sort))
    }

    async fn time_report(&self, part_number: &PartNumber) -> Result<Option<TimeReport>> {
        let item = self.storage.load_item(part_number).await?;
        let now = self.clock.now();
        Ok(item.map(|v| TimeReport::build(&v.value, now)))
    }
}
