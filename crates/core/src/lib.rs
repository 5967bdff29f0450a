//! optrack core data models.
//!
//! This crate defines the work item / phase / subphase hierarchy tracked by
//! the operations checklist, plus the pure clock arithmetic that derives
//! elapsed time from a phase's timestamps.

#![warn(missing_docs)]

// Core identities
mod id;

// Work hierarchy
mod work_item;
mod phase;
mod subphase;
mod employee;

// Time
pub mod clock;

// Re-exports
pub use id::*;

pub use work_item::{WorkItem, Priority};
pub use phase::{Phase, PhaseState, PhaseOperation};
pub use subphase::{Subphase, TrackingMode};
pub use employee::Employee;
pub use clock::{Clock, SystemClock, ManualClock, elapsed_seconds};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
