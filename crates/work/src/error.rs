//! Error type for tracking operations.

use optrack_core::{PartNumber, PhaseId, PhaseOperation, PhaseState, SubphaseId};
use optrack_storage::StorageError;
use crate::gate::GateDenial;

/// Result type for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Errors returned by tracking operations. None are retried by the engine.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// The phase is not in a state that allows the operation
    #[error("cannot {operation} phase {phase_id}: phase is {state}")]
    InvalidTransition {
        /// Phase the operation targeted
        phase_id: PhaseId,
        /// Requested operation
        operation: PhaseOperation,
        /// State the phase was in
        state: PhaseState,
    },

    /// Stop was requested while some subphases are unfinished
    #[error("cannot stop phase {phase_id}: {incomplete} of {total} subphases are incomplete")]
    IncompletePrerequisite {
        /// Phase the operation targeted
        phase_id: PhaseId,
        /// Unfinished subphases
        incomplete: usize,
        /// All subphases
        total: usize,
    },

    /// The subphase completion precondition does not hold
    #[error("subphase {subphase_id} cannot be completed: {}", describe(.reasons))]
    GateNotSatisfied {
        /// Subphase the toggle targeted
        subphase_id: SubphaseId,
        /// Every unmet condition
        reasons: Vec<GateDenial>,
    },

    /// Caller input out of range
    #[error("invalid input: {0}")]
    Validation(String),

    /// Unknown item, phase, subphase or worker code
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent writers kept winning the version check
    #[error("work item {part_number} kept changing concurrently; gave up after {attempts} attempts")]
    Conflict {
        /// Contended item
        part_number: PartNumber,
        /// Load-apply-save cycles tried
        attempts: u32,
    },

    /// Backing store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn describe(reasons: &[GateDenial]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
