//! Subphase model - the smallest trackable step of a phase.

use serde::{Deserialize, Serialize};
use crate::id::SubphaseId;

/// A single step within a phase, tracked either by time or by quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subphase {
    /// Unique identifier
    pub id: SubphaseId,

    /// Step name
    pub name: String,

    /// Position among sibling subphases
    pub order_index: u32,

    /// Whether the step is done
    #[serde(default)]
    pub completed: bool,

    /// Target duration in minutes (informational)
    pub expected_duration: Option<u32>,

    /// Target quantity; 0 means the step is time-tracked
    #[serde(default)]
    pub expected_quantity: u32,

    /// Quantity produced so far
    #[serde(default)]
    pub current_completed_quantity: u32,

    /// Barcode of the assigned worker
    pub employee_barcode: Option<String>,

    /// Name of the assigned worker
    pub employee_name: Option<String>,

    /// Phase elapsed seconds recorded when the step was first completed
    pub time_duration: Option<u64>,
}

/// How a subphase decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingMode {
    /// Finished while the phase clock is running
    TimeTracked,
    /// Finished once the expected quantity is reached
    QuantityTracked,
}

impl Subphase {
    /// Create a time-tracked step.
    pub fn time_tracked(name: impl Into<String>, order_index: u32) -> Self {
        Self {
            id: SubphaseId::new(),
            name: name.into(),
            order_index,
            completed: false,
            expected_duration: None,
            expected_quantity: 0,
            current_completed_quantity: 0,
            employee_barcode: None,
            employee_name: None,
            time_duration: None,
        }
    }

    /// Create a quantity-tracked step.
    pub fn quantity_tracked(name: impl Into<String>, order_index: u32, expected_quantity: u32) -> Self {
        Self {
            expected_quantity,
            ..Self::time_tracked(name, order_index)
        }
    }

    /// Set the informational target duration in minutes.
    pub fn with_expected_duration(mut self, minutes: u32) -> Self {
        self.expected_duration = Some(minutes);
        self
    }

    /// Tracking mode implied by `expected_quantity`.
    pub fn mode(&self) -> TrackingMode {
        if self.expected_quantity > 0 {
            TrackingMode::QuantityTracked
        } else {
            TrackingMode::TimeTracked
        }
    }

    /// Whether a worker has been assigned.
    pub fn is_assigned(&self) -> bool {
        self.employee_barcode.is_some()
    }

    /// Whether the produced quantity has reached the target.
    pub fn quantity_reached(&self) -> bool {
        self.current_completed_quantity >= self.expected_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_follows_expected_quantity() {
        assert_eq!(Subphase::time_tracked("Inspect", 0).mode(), TrackingMode::TimeTracked);
        assert_eq!(
            Subphase::quantity_tracked("Drill", 1, 10).mode(),
            TrackingMode::QuantityTracked
        );
    }

    #[test]
    fn test_missing_counters_default_on_deserialize() {
        let id = SubphaseId::new();
        let json = format!(
            r#"{{"id":"{}","name":"Pack","order_index":2,"expected_duration":15,
                "employee_barcode":null,"employee_name":null,"time_duration":null}}"#,
            serde_json::to_value(id).unwrap().as_str().unwrap()
        );
        let sub: Subphase = serde_json::from_str(&json).unwrap();
        assert_eq!(sub.id, id);
        assert!(!sub.completed);
        assert_eq!(sub.expected_quantity, 0);
        assert_eq!(sub.current_completed_quantity, 0);
        assert_eq!(sub.expected_duration, Some(15));
    }
}
