//! Repository and directory trait abstractions.

use async_trait::async_trait;
use optrack_core::{Employee, PartNumber, SubphaseId, WorkItem};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The stored version moved on since the record was loaded
    #[error("Version conflict on {part_number}: expected {expected:?}, found {actual:?}")]
    Conflict {
        /// Record that conflicted
        part_number: PartNumber,
        /// Version the writer loaded (None = expected the record to be absent)
        expected: Option<u64>,
        /// Version currently stored (None = absent)
        actual: Option<u64>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// A record together with the store version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// The record
    pub value: T,
    /// Store version; bumped on every successful save
    pub version: u64,
}

/// Durable storage of work items with their phases and subphases.
///
/// Saves are compare-and-swap on the item version so that a read-modify-write
/// cycle never silently overwrites a concurrent writer.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Load a work item by part number.
    async fn load_item(&self, part_number: &PartNumber) -> Result<Option<Versioned<WorkItem>>>;

    /// Save a work item.
    ///
    /// `expected_version` is the version the caller loaded, or `None` to
    /// create a new item. Returns the new version, or
    /// [`StorageError::Conflict`] if the stored version differs.
    async fn save_item(&self, item: &WorkItem, expected_version: Option<u64>) -> Result<u64>;

    /// List all work items.
    async fn list_items(&self) -> Result<Vec<WorkItem>>;

    /// Find the work item that owns a subphase.
    async fn locate_subphase(&self, id: SubphaseId) -> Result<Option<PartNumber>> {
        let items = self.list_items().await?;
        Ok(items
            .into_iter()
            .find(|item| item.contains_subphase(id))
            .map(|item| item.part_number))
    }
}

/// Lookup of workers by scanned badge code.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Resolve a scanned code to a worker, or `None` if nobody matches.
    async fn resolve_by_barcode(&self, code: &str) -> Result<Option<Employee>>;
}

/// Check a compare-and-swap precondition shared by the backends.
pub(crate) fn check_version(
    part_number: &PartNumber,
    expected: Option<u64>,
    actual: Option<u64>,
) -> Result<u64> {
    if expected != actual {
        return Err(StorageError::Conflict {
            part_number: part_number.clone(),
            expected,
            actual,
        });
    }
    Ok(actual.unwrap_or(0) + 1)
}
