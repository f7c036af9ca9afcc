//! Angle bookkeeping tests: unwrap, step history, re-centering

use proptest::prelude::*;
use rust_antenna_pointer::config::STEP_HISTORY_LEN;
use rust_antenna_pointer::motion::{unwrap_nearest, AngleState, StepHistory};

proptest! {
    /// Result is the target plus whole turns, and within half a turn of the reference
    #[test]
    fn prop_unwrap_nearest(target in 0.0f32..360.0, reference in -5000.0f32..5000.0) {
        let r = unwrap_nearest(target, reference);
        let turns = (r - target) / 360.0;
        prop_assert!((turns - turns.round()).abs() < 1e-4, "not congruent: {} vs {}", r, target);
        prop_assert!((r - reference).abs() <= 180.0 + 1e-3, "too far: {} from {}", r, reference);
    }

    /// Net steps are preserved by merging, whatever the sequence
    #[test]
    fn prop_history_net_preserved(deltas in prop::collection::vec(-500i32..500, 0..200)) {
        let mut h = StepHistory::new();
        for d in &deltas {
            h.push(*d);
        }
        let net: i64 = deltas.iter().map(|d| *d as i64).sum();
        prop_assert_eq!(h.net_steps() + h.untracked(), net);
        prop_assert!(!h.overflowed());
    }
}

#[test]
fn test_unwrap_crossing_north() {
    // heading 350 → 10 must go +20, not -340
    assert_eq!(unwrap_nearest(10.0, 350.0), 370.0);
    // and back
    assert_eq!(unwrap_nearest(350.0, 370.0), 350.0);
}

#[test]
fn test_overflow_keeps_net_exact() {
    let mut h = StepHistory::new();
    let mut net = 0i64;
    for i in 0..(STEP_HISTORY_LEN * 2) {
        let d = if i % 2 == 0 { 3 } else { -1 };
        h.push(d);
        net += d as i64;
    }
    assert!(h.overflowed());
    assert_eq!(h.len(), STEP_HISTORY_LEN);
    assert_eq!(h.net_steps() + h.untracked(), net);
}

#[test]
fn test_record_step_moves_azimuth() {
    let mut a = AngleState::new();
    a.record_step(800, 800.0 / 90.0);
    assert!((a.az_deg - 90.0).abs() < 1e-4);
    a.record_step(-1600, 800.0 / 90.0);
    assert!((a.az_deg + 90.0).abs() < 1e-4);
    assert_eq!(a.history.net_steps(), -800);
}

#[test]
fn test_clamp_state_leaves_history_alone() {
    let mut a = AngleState::new();
    a.record_step(400 * 9, 10.0);
    assert_eq!(a.az_deg, 360.0);
    a.record_step(10, 10.0);
    a.clamp_state(360.0);
    assert!((a.az_deg - 1.0).abs() < 1e-4);
    assert_eq!(a.history.net_steps(), 3610);
}
