//! Audio settings record and its validation.
//!
//! One record holds every operator-tunable audio parameter and is
//! persisted as a unit. [`AudioSettings::clamped`] is the single place
//! where ranges are enforced; setters and loads both go through it.

use crate::config::{
    AUDIO_SAMPLE_RATE, DEFAULT_ADC_ATTEN_DB, DEFAULT_BEEP_ON_TRACK_END, DEFAULT_BEEP_ON_TRACK_START,
    DEFAULT_BOOT_TONE, DEFAULT_GATE_CLOSE, DEFAULT_GATE_OPEN, DEFAULT_LIMITER, DEFAULT_MUTE_WHEN_IDLE,
    DEFAULT_NOISE_ENABLED, DEFAULT_NOISE_FLOOR, DEFAULT_NOISE_MIX, DEFAULT_NOTCH_ENABLED,
    DEFAULT_NOTCH_FREQ_HZ, DEFAULT_NOTCH_Q, DEFAULT_PASSTHROUGH_GAIN, DEFAULT_VOLUME, NOISE_SEED,
};
use crate::hal::audio::{Attenuation, ADC_MAX};

use super::beep::BeepParams;

pub const PASSTHROUGH_GAIN_MIN: f32 = 0.1;
pub const PASSTHROUGH_GAIN_MAX: f32 = 12.0;
/// Smallest mix while noise injection is enabled.
pub const NOISE_MIX_MIN_ENABLED: f32 = 0.01;
pub const NOTCH_FREQ_MIN_HZ: f32 = 20.0;
pub const NOTCH_Q_MIN: f32 = 0.1;
pub const NOTCH_Q_MAX: f32 = 100.0;

/// Fixed audio path configuration (not operator-tunable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    /// Pass-through and beep sample rate in Hz
    pub sample_rate: u32,
    /// Comfort-noise seed
    pub noise_seed: u32,
}

impl AudioConfig {
    /// Sample period in microseconds (rounded down).
    pub fn sample_period_us(&self) -> u64 {
        1_000_000 / self.sample_rate.max(1) as u64
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: AUDIO_SAMPLE_RATE,
            noise_seed: NOISE_SEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    /// 128 = unity
    pub volume: u8,
    /// Extra multiplier on top of volume
    pub passthrough_gain: f32,
    /// Output ceiling in 12-bit codes
    pub limiter: u16,
    pub gate_open: u16,
    pub gate_close: u16,
    pub noise_enabled: bool,
    pub noise_mix: f32,
    pub noise_floor: u16,
    pub notch_enabled: bool,
    pub notch_freq_hz: f32,
    pub notch_q: f32,
    pub mute_when_idle: bool,
    pub attenuation: Attenuation,
    pub beep: BeepParams,
    pub beep_on_track_start: bool,
    pub beep_on_track_end: bool,
    pub boot_tone: bool,
}

#[inline]
fn clamp_or(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

impl AudioSettings {
    /// Every field forced into its valid domain.
    pub fn clamped(self, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let gate_open = self.gate_open.min(ADC_MAX);
        let mut noise_mix = clamp_or(self.noise_mix, 0.0, 1.0, DEFAULT_NOISE_MIX);
        if self.noise_enabled && noise_mix < NOISE_MIX_MIN_ENABLED {
            noise_mix = NOISE_MIX_MIN_ENABLED;
        }

        Self {
            volume: self.volume,
            passthrough_gain: clamp_or(
                self.passthrough_gain,
                PASSTHROUGH_GAIN_MIN,
                PASSTHROUGH_GAIN_MAX,
                DEFAULT_PASSTHROUGH_GAIN,
            ),
            limiter: self.limiter.min(ADC_MAX),
            gate_open,
            gate_close: self.gate_close.min(gate_open),
            noise_enabled: self.noise_enabled,
            noise_mix,
            noise_floor: self.noise_floor.min(ADC_MAX),
            notch_enabled: self.notch_enabled,
            notch_freq_hz: clamp_or(
                self.notch_freq_hz,
                NOTCH_FREQ_MIN_HZ,
                (nyquist - 1.0).max(NOTCH_FREQ_MIN_HZ),
                DEFAULT_NOTCH_FREQ_HZ,
            ),
            notch_q: clamp_or(self.notch_q, NOTCH_Q_MIN, NOTCH_Q_MAX, DEFAULT_NOTCH_Q),
            mute_when_idle: self.mute_when_idle,
            attenuation: self.attenuation,
            beep: self.beep.clamped(sample_rate),
            beep_on_track_start: self.beep_on_track_start,
            beep_on_track_end: self.beep_on_track_end,
            boot_tone: self.boot_tone,
        }
    }

    /// Combined linear gain: `max(volume, 1) / 128 * passthrough_gain`.
    pub fn gain(&self) -> f32 {
        self.volume.max(1) as f32 / 128.0 * self.passthrough_gain
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            passthrough_gain: DEFAULT_PASSTHROUGH_GAIN,
            limiter: DEFAULT_LIMITER,
            gate_open: DEFAULT_GATE_OPEN,
            gate_close: DEFAULT_GATE_CLOSE,
            noise_enabled: DEFAULT_NOISE_ENABLED,
            noise_mix: DEFAULT_NOISE_MIX,
            noise_floor: DEFAULT_NOISE_FLOOR,
            notch_enabled: DEFAULT_NOTCH_ENABLED,
            notch_freq_hz: DEFAULT_NOTCH_FREQ_HZ,
            notch_q: DEFAULT_NOTCH_Q,
            mute_when_idle: DEFAULT_MUTE_WHEN_IDLE,
            attenuation: Attenuation::from_db(DEFAULT_ADC_ATTEN_DB),
            beep: BeepParams::default(),
            beep_on_track_start: DEFAULT_BEEP_ON_TRACK_START,
            beep_on_track_end: DEFAULT_BEEP_ON_TRACK_END,
            boot_tone: DEFAULT_BOOT_TONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_already_valid() {
        let d = AudioSettings::default();
        assert_eq!(d.clamped(16_000), d);
    }

    #[test]
    fn test_clamps_out_of_range() {
        let s = AudioSettings {
            passthrough_gain: 50.0,
            limiter: 9000,
            gate_open: 200,
            gate_close: 300,
            noise_mix: f32::NAN,
            notch_freq_hz: 12_000.0,
            notch_q: 0.0,
            ..AudioSettings::default()
        }
        .clamped(16_000);
        assert_eq!(s.passthrough_gain, 12.0);
        assert_eq!(s.limiter, 4095);
        assert_eq!(s.gate_close, 200);
        assert_eq!(s.noise_mix, 0.12);
        assert_eq!(s.notch_freq_hz, 7999.0);
        assert_eq!(s.notch_q, 0.1);
    }

    #[test]
    fn test_enabled_noise_has_minimum_mix() {
        let s = AudioSettings { noise_enabled: true, noise_mix: 0.0, ..AudioSettings::default() };
        assert_eq!(s.clamped(16_000).noise_mix, 0.01);

        let s = AudioSettings { noise_enabled: false, noise_mix: 0.0, ..AudioSettings::default() };
        assert_eq!(s.clamped(16_000).noise_mix, 0.0);
    }

    #[test]
    fn test_gain() {
        let mut s = AudioSettings::default();
        s.volume = 128;
        assert_eq!(s.gain(), 1.0);
        s.volume = 0;
        assert_eq!(s.gain(), 1.0 / 128.0);
    }
}
