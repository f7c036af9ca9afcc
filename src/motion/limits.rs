//! Axis tuning: steps per degree, speed limits, step timing, bounds.

use crate::config::{
    AZ_GEAR_RATIO, AZ_MAX_SPEED_DPS, AZ_MICROSTEPS, AZ_STATE_BOUND_DEG, AZ_STEPS_PER_REV,
    AZ_STEP_DELAY_US, EL_MAX_DEG, EL_MAX_SPEED_DPS, EL_MIN_DEG, EL_STEPS_PER_DEG, EL_STEP_DELAY_US,
    TRACK_DT_MAX_S, TRACK_DT_MIN_S,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Azimuth,
    Elevation,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Azimuth => "AZ",
            Axis::Elevation => "EL",
        }
    }
}

/// Immutable motion configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimits {
    pub az_steps_per_deg: f32,
    pub el_steps_per_deg: f32,
    /// deg/s
    pub az_max_speed: f32,
    /// deg/s
    pub el_max_speed: f32,
    /// STEP high and low time each
    pub az_step_delay_us: u32,
    /// Time per elevation half-step phase
    pub el_step_delay_us: u32,
    pub el_min_deg: f32,
    pub el_max_deg: f32,
    /// Stored azimuth is kept within ±this
    pub az_state_bound_deg: f32,
    /// Tracking dt floor (s)
    pub track_dt_min_s: f32,
    /// Tracking dt ceiling (s)
    pub track_dt_max_s: f32,
}

impl MotionLimits {
    #[inline]
    pub fn steps_per_deg(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Azimuth => self.az_steps_per_deg,
            Axis::Elevation => self.el_steps_per_deg,
        }
    }

    #[inline]
    pub fn max_speed(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Azimuth => self.az_max_speed,
            Axis::Elevation => self.el_max_speed,
        }
    }

    #[inline]
    pub fn clamp_el(&self, el: f32) -> f32 {
        if el.is_nan() {
            self.el_min_deg
        } else {
            el.clamp(self.el_min_deg, self.el_max_deg)
        }
    }

    /// Strictly inside the elevation bounds.
    #[inline]
    pub fn el_inside(&self, el: f32) -> bool {
        el > self.el_min_deg && el < self.el_max_deg
    }

    /// Nearest whole step count for `deg` on `axis`.
    #[inline]
    pub fn deg_to_steps(&self, axis: Axis, deg: f32) -> i32 {
        libm::roundf(deg * self.steps_per_deg(axis)) as i32
    }
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            az_steps_per_deg: AZ_STEPS_PER_REV * AZ_MICROSTEPS * AZ_GEAR_RATIO / 360.0,
            el_steps_per_deg: EL_STEPS_PER_DEG,
            az_max_speed: AZ_MAX_SPEED_DPS,
            el_max_speed: EL_MAX_SPEED_DPS,
            az_step_delay_us: AZ_STEP_DELAY_US,
            el_step_delay_us: EL_STEP_DELAY_US,
            el_min_deg: EL_MIN_DEG,
            el_max_deg: EL_MAX_DEG,
            az_state_bound_deg: AZ_STATE_BOUND_DEG,
            track_dt_min_s: TRACK_DT_MIN_S,
            track_dt_max_s: TRACK_DT_MAX_S,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_az_resolution() {
        let l = MotionLimits::default();
        assert!((l.az_steps_per_deg - 8.888_889).abs() < 1e-4);
        assert_eq!(l.deg_to_steps(Axis::Azimuth, 90.0), 800);
    }

    #[test]
    fn test_el_clamp() {
        let l = MotionLimits::default();
        assert_eq!(l.clamp_el(-5.0), 0.0);
        assert_eq!(l.clamp_el(200.0), 180.0);
        assert_eq!(l.clamp_el(f32::NAN), 0.0);
        assert!(!l.el_inside(0.0));
        assert!(l.el_inside(0.1));
    }
}
