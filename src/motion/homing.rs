//! Cable-safe homing job state.
//!
//! Phases run in order: lower elevation to the floor, play the azimuth
//! history back newest-first with each count negated, unwind whatever the
//! history no longer covers as one net burst, then wait for the steppers
//! to go idle.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    LowerElevation,
    Backtrack,
    Unwind,
    Settle,
}

/// Outcome of a completed `return_to_null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HomingReport {
    /// History entries played back
    pub entries_replayed: u32,
    /// Steps played back from history (absolute)
    pub steps_replayed: u64,
    /// Net steps unwound without history: the boot position plus any
    /// entries the history dropped
    pub untracked_steps: i64,
    /// History overflowed during the session, so part of the way back was
    /// a net move instead of an exact replay
    pub history_overflowed: bool,
}

impl HomingReport {
    /// Every issued step was replayed in reverse.
    pub fn exact(&self) -> bool {
        !self.history_overflowed
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HomingJob {
    pub phase: HomingPhase,
    /// Elevation steps still to be queued
    pub el_steps: i32,
    pub report: HomingReport,
}

impl HomingJob {
    pub fn new(el_steps: i32, history_overflowed: bool) -> Self {
        Self {
            phase: HomingPhase::LowerElevation,
            el_steps,
            report: HomingReport {
                history_overflowed,
                ..HomingReport::default()
            },
        }
    }
}
