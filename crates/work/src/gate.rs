//! Subphase completion gating.
//!
//! The single definition of when a subphase may be marked complete. The
//! ledger enforces it on every write and the manager exposes it read-only so
//! a client can grey out a checkbox with the very same rule.

use optrack_core::{Phase, PhaseState, Subphase, SubphaseId, TrackingMode};
use serde::{Deserialize, Serialize};

/// One unmet completion condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDenial {
    /// The preceding sibling is not complete yet
    OutOfOrder {
        /// The sibling that must be completed first
        predecessor: SubphaseId,
    },

    /// No worker has been assigned
    Unassigned,

    /// Quantity-tracked step below its target
    InsufficientQuantity {
        /// Produced so far
        current: u32,
        /// Target
        expected: u32,
    },

    /// Time-tracked step while the phase clock is not counting
    PhaseNotRunning {
        /// State the phase is in
        state: PhaseState,
    },
}

impl std::fmt::Display for GateDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfOrder { predecessor } => {
                write!(f, "previous subphase {predecessor} is not completed")
            }
            Self::Unassigned => write!(f, "no worker assigned"),
            Self::InsufficientQuantity { current, expected } => {
                write!(f, "quantity {current} of {expected} reached")
            }
            Self::PhaseNotRunning { state } => write!(f, "phase is {state}, not running"),
        }
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    /// The toggle may be applied
    Allowed,

    /// The toggle must be rejected, with every unmet condition
    Denied(Vec<GateDenial>),
}

impl GateDecision {
    /// Whether the toggle may be applied.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Decide whether `subphase` (a child of `phase`) may become completed.
///
/// All three conditions are checked so the caller learns everything that is
/// missing at once: ordering, assignment, and the mode-specific condition.
pub fn evaluate_completion(phase: &Phase, subphase: &Subphase) -> GateDecision {
    let mut denials = Vec::new();

    if let Some(prev) = phase.predecessor_of(subphase.id) {
        if !prev.completed {
            denials.push(GateDenial::OutOfOrder { predecessor: prev.id });
        }
    }

    if !subphase.is_assigned() {
        denials.push(GateDenial::Unassigned);
    }

    match subphase.mode() {
        TrackingMode::QuantityTracked => {
            if !subphase.quantity_reached() {
                denials.push(GateDenial::InsufficientQuantity {
                    current: subphase.current_completed_quantity,
                    expected: subphase.expected_quantity,
                });
            }
        }
        TrackingMode::TimeTracked => {
            let state = phase.state();
            if state != PhaseState::Running {
                denials.push(GateDenial::PhaseNotRunning { state });
            }
        }
    }

    if denials.is_empty() {
        GateDecision::Allowed
    } else {
        GateDecision::Denied(denials)
    }
}

/// Decide whether a toggle to `desired` may be applied. Un-completing is
/// never gated.
pub fn evaluate_toggle(phase: &Phase, subphase: &Subphase, desired: bool) -> GateDecision {
    if desired {
        evaluate_completion(phase, subphase)
    } else {
        GateDecision::Allowed
    }
}
