//! Work Tracking
//!
//! Phase timers, subphase gating and the ledger of completions, quantities
//! and worker assignments, behind the `TrackingManager` operation contract.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod gate;
pub mod phase_machine;
pub mod ledger;
pub mod manager;

pub use config::TrackingConfig;
pub use error::{TrackingError, Result};
pub use gate::{evaluate_completion, evaluate_toggle, GateDecision, GateDenial};
pub use manager::{TrackingManager, BasicTrackingManager};
