//! Direct-form biquad with RBJ notch design.
//!
//! Transposed direct form II: two state values carried sample to sample.
//! Coefficients are normalized by `a0` at design time.

use core::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Unity pass-through (b0 = 1, everything else 0).
    pub const fn passthrough() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Notch at `f0` Hz with quality `q`, sampled at `sample_rate` Hz.
    pub fn notch(sample_rate: f32, f0: f32, q: f32) -> Self {
        let mut bq = Self::passthrough();
        bq.set_notch(sample_rate, f0, q);
        bq
    }

    /// Redesign as a notch. Running state is cleared.
    pub fn set_notch(&mut self, sample_rate: f32, f0: f32, q: f32) {
        let w0 = 2.0 * PI * f0 / sample_rate;
        let alpha = libm::sinf(w0) / (2.0 * q);
        let cos_w0 = libm::cosf(w0);

        let a0 = 1.0 + alpha;
        self.b0 = 1.0 / a0;
        self.b1 = -2.0 * cos_w0 / a0;
        self.b2 = 1.0 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.reset();
    }

    /// Zero the delay state.
    #[inline]
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    /// `(b0, b1, b2, a1, a2)`
    pub fn coefficients(&self) -> (f32, f32, f32, f32, f32) {
        (self.b0, self.b1, self.b2, self.a1, self.a2)
    }

    /// `(z1, z2)`
    pub fn state(&self) -> (f32, f32) {
        (self.z1, self.z2)
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::passthrough()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_is_identity() {
        let mut bq = Biquad::passthrough();
        for x in [0.0, 1.0, -250.0, 1000.0] {
            assert_eq!(bq.process(x), x);
        }
    }

    #[test]
    fn test_notch_passes_dc() {
        let mut bq = Biquad::notch(16_000.0, 2500.0, 12.0);
        let mut y = 0.0;
        for _ in 0..2000 {
            y = bq.process(100.0);
        }
        assert!((y - 100.0).abs() < 0.5, "dc gain drifted: {}", y);
    }

    #[test]
    fn test_redesign_clears_state() {
        let mut bq = Biquad::notch(16_000.0, 1000.0, 5.0);
        bq.process(500.0);
        assert_ne!(bq.state(), (0.0, 0.0));
        bq.set_notch(16_000.0, 2000.0, 5.0);
        assert_eq!(bq.state(), (0.0, 0.0));
    }

    #[test]
    fn test_symmetric_numerator() {
        let (b0, b1, b2, a1, _) = Biquad::notch(16_000.0, 2500.0, 12.0).coefficients();
        assert_eq!(b0, b2);
        assert_eq!(b1, a1);
    }
}
