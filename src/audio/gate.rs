//! Amplitude gate with hysteresis.
//!
//! Opens when |sample| >= open threshold, closes when |sample| < close
//! threshold. The close threshold never exceeds the open threshold. With
//! both at zero the first sample opens the gate and nothing closes it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    open: bool,
    open_threshold: u16,
    close_threshold: u16,
}

impl Gate {
    pub fn new(open_threshold: u16, close_threshold: u16) -> Self {
        let mut gate = Self {
            open: false,
            open_threshold: 0,
            close_threshold: 0,
        };
        gate.set_thresholds(open_threshold, close_threshold);
        gate
    }

    /// Set thresholds; `close` is lowered to `open` if above it.
    pub fn set_thresholds(&mut self, open: u16, close: u16) {
        self.open_threshold = open;
        self.close_threshold = close.min(open);
    }

    pub fn thresholds(&self) -> (u16, u16) {
        (self.open_threshold, self.close_threshold)
    }

    /// Feed one sample; returns the new state.
    #[inline]
    pub fn update(&mut self, sample: i32) -> bool {
        let mag = sample.unsigned_abs();
        if self.open {
            if mag < self.close_threshold as u32 {
                self.open = false;
            }
        } else if mag >= self.open_threshold as u32 {
            self.open = true;
        }
        self.open
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Force closed (start of a new activity period).
    pub fn rearm(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_opens_and_closes_once() {
        let mut gate = Gate::new(250, 180);
        let mut transitions = 0;
        let mut prev = gate.is_open();
        let up = (0..=300).step_by(5);
        let down = (0..=300).rev().step_by(5);
        for s in up.chain(down) {
            let now = gate.update(s);
            if now != prev {
                transitions += 1;
                if now {
                    assert!(s >= 250);
                } else {
                    assert!(s < 180);
                }
            }
            prev = now;
        }
        assert_eq!(transitions, 2);
        assert!(!gate.is_open());
    }

    #[test]
    fn test_close_clamped_to_open() {
        let gate = Gate::new(100, 400);
        assert_eq!(gate.thresholds(), (100, 100));
    }

    #[test]
    fn test_zero_thresholds_always_open() {
        let mut gate = Gate::new(0, 0);
        assert!(gate.update(0));
        assert!(gate.update(0));
        assert!(gate.update(-3000));
    }

    #[test]
    fn test_negative_samples_use_magnitude() {
        let mut gate = Gate::new(250, 180);
        assert!(gate.update(-260));
        assert!(gate.update(-200));
        assert!(!gate.update(-100));
    }
}
