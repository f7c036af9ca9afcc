//! Angle bookkeeping: current az/el, unwrap math, azimuth step history.
//!
//! Azimuth is stored as unbounded "turns from the reference" degrees, so
//! 370° and 10° are different physical states (one extra cable wrap).
//! The step history keeps every issued azimuth step count so homing can
//! play them back exactly in reverse.

use heapless::Deque;

use crate::config::STEP_HISTORY_LEN;

/// `target_wrapped + 360k` closest to `reference`.
///
/// `k = round((reference - target) / 360)`. Targets outside `[0, 360)` are
/// wrapped first.
pub fn unwrap_nearest(target_wrapped: f32, reference: f32) -> f32 {
    let target = wrap_360(target_wrapped);
    let k = libm::roundf((reference - target) / 360.0);
    target + 360.0 * k
}

/// Wrap into `[0, 360)`.
pub fn wrap_360(deg: f32) -> f32 {
    let w = libm::fmodf(deg, 360.0);
    let w = if w < 0.0 { w + 360.0 } else { w };
    // -1e-8 + 360 rounds to 360.0
    if w >= 360.0 {
        0.0
    } else {
        w
    }
}

/// Bounded record of issued azimuth step counts.
///
/// Consecutive same-direction counts are merged into one entry, which
/// replays identically. When full, the oldest entry is dropped and its
/// steps move to `untracked`: the net count no entry accounts for any
/// more. Untracked steps also carry the position restored at boot.
#[derive(Debug, Clone, Default)]
pub struct StepHistory {
    entries: Deque<i32, STEP_HISTORY_LEN>,
    untracked: i64,
    overflowed: bool,
}

impl StepHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signed step count.
    pub fn push(&mut self, delta: i32) {
        if delta == 0 {
            return;
        }
        if let Some(back) = self.entries.back_mut() {
            if back.signum() == delta.signum() {
                if let Some(sum) = back.checked_add(delta) {
                    *back = sum;
                    return;
                }
            }
        }
        if self.entries.is_full() {
            if let Some(oldest) = self.entries.pop_front() {
                self.untracked += oldest as i64;
                self.overflowed = true;
            }
        }
        let _ = self.entries.push_back(delta);
    }

    /// Newest entry.
    pub fn newest(&self) -> Option<i32> {
        self.entries.back().copied()
    }

    /// Newest entry, removed.
    pub fn pop_newest(&mut self) -> Option<i32> {
        self.entries.pop_back()
    }

    /// Undo the newest `steps` of recorded motion (steps that were issued
    /// but never executed). `steps` has the sign they were recorded with.
    pub fn retract(&mut self, steps: i32) {
        let mut rem = steps;
        while rem != 0 {
            match self.entries.back_mut() {
                Some(back) if back.signum() == rem.signum() => {
                    if back.unsigned_abs() <= rem.unsigned_abs() {
                        rem -= *back;
                        self.entries.pop_back();
                    } else {
                        *back -= rem;
                        rem = 0;
                    }
                }
                Some(_) => {
                    // Older direction change: keep the net count honest
                    let _ = self.entries.push_back(-rem);
                    rem = 0;
                }
                None => {
                    self.untracked -= rem as i64;
                    rem = 0;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Net steps of all retained entries.
    pub fn net_steps(&self) -> i64 {
        self.entries.iter().map(|s| *s as i64).sum()
    }

    pub fn untracked(&self) -> i64 {
        self.untracked
    }

    /// Take the untracked count, leaving zero.
    pub fn take_untracked(&mut self) -> i64 {
        core::mem::take(&mut self.untracked)
    }

    pub fn set_untracked(&mut self, steps: i64) {
        self.untracked = steps;
    }

    /// An entry has been dropped since the last clear.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.untracked = 0;
        self.overflowed = false;
    }
}

/// Current pointing state.
#[derive(Debug, Clone, Default)]
pub struct AngleState {
    pub az_deg: f32,
    pub el_deg: f32,
    pub history: StepHistory,
}

impl AngleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record issued azimuth steps and move the stored azimuth with them.
    pub fn record_step(&mut self, delta: i32, steps_per_deg: f32) {
        self.history.push(delta);
        self.az_deg += delta as f32 / steps_per_deg;
    }

    /// Re-center stored azimuth into `±bound` by whole turns. Physical
    /// position and step accounting are unaffected.
    pub fn clamp_state(&mut self, bound: f32) {
        if !self.az_deg.is_finite() {
            return;
        }
        while self.az_deg > bound {
            self.az_deg -= 360.0;
        }
        while self.az_deg < -bound {
            self.az_deg += 360.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_examples() {
        assert_eq!(unwrap_nearest(10.0, 350.0), 370.0);
        assert_eq!(unwrap_nearest(350.0, 10.0), -10.0);
        assert_eq!(unwrap_nearest(90.0, 720.0), 810.0);
        assert_eq!(unwrap_nearest(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_wrap_360() {
        assert_eq!(wrap_360(-10.0), 350.0);
        assert_eq!(wrap_360(725.0), 5.0);
        assert_eq!(wrap_360(360.0), 0.0);
    }

    #[test]
    fn test_history_merges_same_direction() {
        let mut h = StepHistory::new();
        h.push(10);
        h.push(5);
        h.push(-3);
        h.push(0);
        assert_eq!(h.len(), 2);
        assert_eq!(h.net_steps(), 12);
    }

    #[test]
    fn test_history_overflow_moves_steps_to_untracked() {
        let mut h = StepHistory::new();
        for i in 0..(STEP_HISTORY_LEN + 2) {
            h.push(if i % 2 == 0 { 1 } else { -2 });
        }
        assert!(h.overflowed());
        assert_eq!(h.len(), STEP_HISTORY_LEN);
        // dropped +1, -2
        assert_eq!(h.untracked(), -1);
    }

    #[test]
    fn test_retract_splits_tail() {
        let mut h = StepHistory::new();
        h.push(-4);
        h.push(10);
        h.retract(6);
        assert_eq!(h.net_steps(), 0);
        assert_eq!(h.len(), 2);
        h.retract(4);
        assert_eq!(h.len(), 1);
        h.retract(-4);
        assert!(h.is_empty());
    }

    #[test]
    fn test_clamp_state_recenters() {
        let mut a = AngleState::new();
        a.az_deg = 725.0;
        a.clamp_state(360.0);
        assert_eq!(a.az_deg, 5.0);
        a.az_deg = -400.0;
        a.clamp_state(360.0);
        assert_eq!(a.az_deg, -40.0);
    }
}
