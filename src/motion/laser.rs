//! Laser indicator mode.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaserMode {
    Off,
    On,
    /// Lit while tracking with elevation strictly inside the bounds
    #[default]
    TrackFollow,
}

impl LaserMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LaserMode::Off => "OFF",
            LaserMode::On => "ON",
            LaserMode::TrackFollow => "TRACK",
        }
    }

    /// Output level for the given state. Homing always forces the laser off.
    #[inline]
    pub fn output(self, tracking: bool, el_inside: bool, homing: bool) -> bool {
        if homing {
            return false;
        }
        match self {
            LaserMode::Off => false,
            LaserMode::On => true,
            LaserMode::TrackFollow => tracking && el_inside,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_follow_truth_table() {
        let m = LaserMode::TrackFollow;
        assert!(m.output(true, true, false));
        assert!(!m.output(true, false, false));
        assert!(!m.output(false, true, false));
        assert!(!m.output(true, true, true));
    }

    #[test]
    fn test_fixed_modes() {
        assert!(LaserMode::On.output(false, false, false));
        assert!(!LaserMode::On.output(false, false, true));
        assert!(!LaserMode::Off.output(true, true, false));
    }
}
