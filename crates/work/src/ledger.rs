//! Subphase ledger: completion, quantity and worker assignment writes.
//!
//! Each function takes the owning phase because gating and duration
//! recording read phase state. Validation happens before any field is
//! written.

use optrack_core::{Employee, Phase, Subphase, SubphaseId, Time};
use crate::error::{Result, TrackingError};
use crate::gate::{evaluate_toggle, GateDecision};

fn find<'a>(phase: &'a Phase, id: SubphaseId) -> Result<&'a Subphase> {
    phase
        .subphase(id)
        .ok_or_else(|| TrackingError::NotFound(format!("subphase {id}")))
}

fn find_mut(phase: &mut Phase, id: SubphaseId) -> Result<&mut Subphase> {
    phase
        .subphase_mut(id)
        .ok_or_else(|| TrackingError::NotFound(format!("subphase {id}")))
}

/// Mark a subphase complete or incomplete.
///
/// Completing is gated and stamps the phase's elapsed seconds into
/// `time_duration` the first time. Un-completing always succeeds and keeps
/// `time_duration` as history.
pub fn toggle_completion(phase: &mut Phase, id: SubphaseId, desired: bool, now: Time) -> Result<Subphase> {
    let subphase = find(phase, id)?;
    if let GateDecision::Denied(reasons) = evaluate_toggle(phase, subphase, desired) {
        return Err(TrackingError::GateNotSatisfied { subphase_id: id, reasons });
    }

    let elapsed = phase.elapsed(now);
    let subphase = find_mut(phase, id)?;
    subphase.completed = desired;
    if desired && subphase.time_duration.is_none() {
        subphase.time_duration = Some(elapsed);
    }
    Ok(subphase.clone())
}

/// Set the produced quantity, revoking completion if it drops below target.
pub fn update_completed_quantity(phase: &mut Phase, id: SubphaseId, quantity: i64) -> Result<Subphase> {
    let subphase = find_mut(phase, id)?;
    let expected = subphase.expected_quantity;
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= expected)
        .ok_or_else(|| {
            TrackingError::Validation(format!(
                "quantity {quantity} is outside 0..={expected} for subphase {id}"
            ))
        })?;

    subphase.current_completed_quantity = quantity;
    if subphase.completed && quantity < expected {
        subphase.completed = false;
    }
    Ok(subphase.clone())
}

/// Record `employee` as the worker on a subphase, replacing any previous one.
pub fn assign_worker(phase: &mut Phase, id: SubphaseId, employee: &Employee) -> Result<Subphase> {
    let subphase = find_mut(phase, id)?;
    subphase.employee_barcode = Some(employee.barcode.clone());
    subphase.employee_name = Some(employee.name.clone());
    Ok(subphase.clone())
}
