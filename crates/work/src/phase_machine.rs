//! Phase timer state machine.
//!
//! ```text
//! NotStarted -> Running <-> Paused
//!               Running -> Completed (all subphases done)
//! any touched state -> NotStarted (reset)
//! ```
//!
//! Every function validates before mutating, so a rejected transition leaves
//! the phase exactly as it was.

use optrack_core::clock::pause_span_seconds;
use optrack_core::{Phase, PhaseOperation, PhaseState, Time};
use crate::error::{Result, TrackingError};

fn require(phase: &Phase, operation: PhaseOperation, allowed: PhaseState) -> Result<()> {
    let state = phase.state();
    if state != allowed {
        return Err(TrackingError::InvalidTransition {
            phase_id: phase.id,
            operation,
            state,
        });
    }
    Ok(())
}

/// Start the clock. Only from `NotStarted`.
pub fn start(phase: &mut Phase, now: Time) -> Result<()> {
    require(phase, PhaseOperation::Start, PhaseState::NotStarted)?;
    phase.start_time = Some(now);
    Ok(())
}

/// Pause the clock. Only from `Running`.
pub fn pause(phase: &mut Phase, now: Time) -> Result<()> {
    require(phase, PhaseOperation::Pause, PhaseState::Running)?;
    phase.pause_time = Some(now);
    Ok(())
}

/// Resume the clock, folding the pause span into `paused_duration`. Only
/// from `Paused`.
pub fn resume(phase: &mut Phase, now: Time) -> Result<()> {
    require(phase, PhaseOperation::Resume, PhaseState::Paused)?;
    if let Some(paused_at) = phase.pause_time.take() {
        phase.paused_duration = phase
            .paused_duration
            .saturating_add(pause_span_seconds(paused_at, now));
    }
    Ok(())
}

/// Stop the clock for good. Only from `Running`, and only once every
/// subphase is complete.
pub fn stop(phase: &mut Phase, now: Time) -> Result<()> {
    require(phase, PhaseOperation::Stop, PhaseState::Running)?;
    let total = phase.subphases.len();
    let incomplete = total - phase.completed_count();
    if incomplete > 0 {
        return Err(TrackingError::IncompletePrerequisite {
            phase_id: phase.id,
            incomplete,
            total,
        });
    }
    phase.end_time = Some(now);
    Ok(())
}

/// Clear the timer back to `NotStarted`. Allowed once the phase has been
/// started; subphase data is left alone.
pub fn reset(phase: &mut Phase) -> Result<()> {
    if phase.start_time.is_none() {
        return Err(TrackingError::InvalidTransition {
            phase_id: phase.id,
            operation: PhaseOperation::Reset,
            state: PhaseState::NotStarted,
        });
    }
    phase.start_time = None;
    phase.pause_time = None;
    phase.end_time = None;
    phase.paused_duration = 0;
    Ok(())
}

/// Apply `operation` at `now`.
pub fn apply(phase: &mut Phase, operation: PhaseOperation, now: Time) -> Result<()> {
    match operation {
        PhaseOperation::Start => start(phase, now),
        PhaseOperation::Pause => pause(phase, now),
        PhaseOperation::Resume => resume(phase, now),
        PhaseOperation::Stop => stop(phase, now),
        PhaseOperation::Reset => reset(phase),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use optrack_core::Subphase;

    fn at(secs: i64) -> Time {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn phase() -> Phase {
        Phase::new("Welding", 0).with_subphase(Subphase::time_tracked("Tack", 0))
    }

    fn assert_invalid(result: Result<()>, expected_state: PhaseState) {
        match result {
            Err(TrackingError::InvalidTransition { state, .. }) => assert_eq!(state, expected_state),
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let mut p = phase();
        start(&mut p, at(0)).unwrap();
        pause(&mut p, at(100)).unwrap();
        resume(&mut p, at(160)).unwrap();
        assert_eq!(p.paused_duration, 60);
        assert_eq!(p.elapsed(at(200)), 140);

        p.subphases[0].completed = true;
        stop(&mut p, at(300)).unwrap();
        assert_eq!(p.state(), PhaseState::Completed);
        assert_eq!(p.elapsed(at(10_000)), 240);
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut p = phase();
        start(&mut p, at(0)).unwrap();
        assert_invalid(start(&mut p, at(5)), PhaseState::Running);
        assert_eq!(p.start_time, Some(at(0)));
    }

    #[test]
    fn test_pause_requires_running() {
        let mut p = phase();
        assert_invalid(pause(&mut p, at(0)), PhaseState::NotStarted);
        start(&mut p, at(0)).unwrap();
        pause(&mut p, at(1)).unwrap();
        assert_invalid(pause(&mut p, at(2)), PhaseState::Paused);
        assert_eq!(p.pause_time, Some(at(1)));
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut p = phase();
        assert_invalid(resume(&mut p, at(0)), PhaseState::NotStarted);
        start(&mut p, at(0)).unwrap();
        assert_invalid(resume(&mut p, at(1)), PhaseState::Running);
        assert_eq!(p.paused_duration, 0);
    }

    #[test]
    fn test_immediate_pause_resume_does_not_reduce_elapsed() {
        let mut p = phase();
        start(&mut p, at(0)).unwrap();
        let before = p.elapsed(at(50));
        pause(&mut p, at(50)).unwrap();
        resume(&mut p, at(50)).unwrap();
        assert_eq!(p.elapsed(at(50)), before);
        assert_eq!(p.paused_duration, 0);
    }

    #[test]
    fn test_resume_with_skewed_clock_adds_nothing() {
        let mut p = phase();
        start(&mut p, at(0)).unwrap();
        pause(&mut p, at(100)).unwrap();
        resume(&mut p, at(40)).unwrap();
        assert_eq!(p.paused_duration, 0);
    }

    #[test]
    fn test_stop_checks_state_then_subphases() {
        let mut p = phase();
        assert_invalid(stop(&mut p, at(0)), PhaseState::NotStarted);

        start(&mut p, at(0)).unwrap();
        match stop(&mut p, at(10)) {
            Err(TrackingError::IncompletePrerequisite { incomplete, total, .. }) => {
                assert_eq!((incomplete, total), (1, 1));
            }
            other => panic!("expected IncompletePrerequisite, got {other:?}"),
        }
        assert!(p.end_time.is_none());

        p.subphases[0].completed = true;
        pause(&mut p, at(20)).unwrap();
        assert_invalid(stop(&mut p, at(30)), PhaseState::Paused);

        resume(&mut p, at(40)).unwrap();
        stop(&mut p, at(50)).unwrap();
        assert_invalid(stop(&mut p, at(60)), PhaseState::Completed);
    }

    #[test]
    fn test_stop_without_subphases() {
        let mut p = Phase::new("Inspection", 2);
        start(&mut p, at(0)).unwrap();
        stop(&mut p, at(5)).unwrap();
        assert_eq!(p.end_time, Some(at(5)));
    }

    #[test]
    fn test_reset_clears_timer_but_not_subphases() {
        let mut p = phase();
        assert_invalid(reset(&mut p), PhaseState::NotStarted);

        start(&mut p, at(0)).unwrap();
        pause(&mut p, at(10)).unwrap();
        resume(&mut p, at(30)).unwrap();
        p.subphases[0].completed = true;
        stop(&mut p, at(40)).unwrap();

        reset(&mut p).unwrap();
        assert_eq!(p.state(), PhaseState::NotStarted);
        assert_eq!(p.paused_duration, 0);
        assert!(p.pause_time.is_none() && p.end_time.is_none());
        assert_eq!(p.elapsed(at(1000)), 0);
        assert!(p.subphases[0].completed);
    }

    #[test]
    fn test_apply_dispatches() {
        let mut p = phase();
        apply(&mut p, PhaseOperation::Start, at(0)).unwrap();
        apply(&mut p, PhaseOperation::Pause, at(1)).unwrap();
        assert_eq!(p.state(), PhaseState::Paused);
        apply(&mut p, PhaseOperation::Reset, at(2)).unwrap();
        assert_eq!(p.state(), PhaseState::NotStarted);
    }
}
