//! Beep/echo generator.
//!
//! A beep is a main tone of `duration_ms` plus an echo copy of the same
//! length starting `echo_delay_ms` after the main tone, scaled by
//! `echo_decay`. The job is finite: exactly `main + delay + echo` samples,
//! then the DAC goes back to mid-scale.
//!
//! Uses a 32-bit phase accumulator per voice, so phase error does not grow
//! with playback length.

use core::f32::consts::PI;

use crate::cancel::CancelToken;
use crate::config::{
    BOOT_TONE_DURATION_MS, BOOT_TONE_FREQ_HZ, BOOT_TONE_VOLUME, DEFAULT_BEEP_DURATION_MS,
    DEFAULT_BEEP_ECHO_DECAY, DEFAULT_BEEP_ECHO_DELAY_MS, DEFAULT_BEEP_FREQ_HZ, DEFAULT_BEEP_VOLUME,
};
use crate::error::HalError;
use crate::hal::audio::{AnalogOutput, OutputChannel, DAC_MID};
use crate::hal::timing::Clock;

/// Lowest beep frequency accepted.
pub const BEEP_FREQ_MIN_HZ: f32 = 50.0;
/// Shortest beep accepted.
pub const BEEP_DURATION_MIN_MS: u16 = 10;
/// Longest beep accepted (keeps a job bounded).
pub const BEEP_DURATION_MAX_MS: u16 = 5000;
/// Longest echo delay accepted.
pub const BEEP_ECHO_DELAY_MAX_MS: u16 = 5000;

/// Beep peak as a fraction of full scale at volume 255.
const BEEP_HEADROOM: f32 = 0.7 * 127.0;
/// Tone-test peak at volume 255.
const TONE_PEAK: f32 = 120.0;

/// Beep parameters. Setters clamp, playback never sees out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeepParams {
    pub freq_hz: f32,
    pub duration_ms: u16,
    pub echo_delay_ms: u16,
    /// Echo amplitude relative to the main tone, `[0, 1]`
    pub echo_decay: f32,
    pub volume: u8,
}

impl BeepParams {
    /// Clamp every field into its valid domain.
    pub fn clamped(self, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let freq_hz = if self.freq_hz.is_nan() {
            DEFAULT_BEEP_FREQ_HZ as f32
        } else {
            self.freq_hz.clamp(BEEP_FREQ_MIN_HZ, nyquist.max(BEEP_FREQ_MIN_HZ))
        };
        let echo_decay = if self.echo_decay.is_nan() {
            DEFAULT_BEEP_ECHO_DECAY
        } else {
            self.echo_decay.clamp(0.0, 1.0)
        };
        Self {
            freq_hz,
            duration_ms: self.duration_ms.clamp(BEEP_DURATION_MIN_MS, BEEP_DURATION_MAX_MS),
            echo_delay_ms: self.echo_delay_ms.min(BEEP_ECHO_DELAY_MAX_MS),
            echo_decay,
            volume: self.volume,
        }
    }
}

impl Default for BeepParams {
    fn default() -> Self {
        Self {
            freq_hz: DEFAULT_BEEP_FREQ_HZ as f32,
            duration_ms: DEFAULT_BEEP_DURATION_MS,
            echo_delay_ms: DEFAULT_BEEP_ECHO_DELAY_MS,
            echo_decay: DEFAULT_BEEP_ECHO_DECAY,
            volume: DEFAULT_BEEP_VOLUME,
        }
    }
}

/// Samples covering `ms` at `sample_rate`.
#[inline]
pub fn samples_for_ms(ms: u16, sample_rate: u32) -> u32 {
    (ms as u64 * sample_rate as u64 / 1000) as u32
}

#[inline]
fn phase_inc(freq_hz: f32, sample_rate: u32) -> u32 {
    ((freq_hz as f64 * 4_294_967_296.0) / sample_rate as f64) as u32
}

#[inline]
fn phase_sin(phase: u32) -> f32 {
    libm::sinf(phase as f32 * (2.0 * PI / 4_294_967_296.0))
}

/// Resumable beep job.
///
/// Yields one DAC code per sample period. Poll it from the audio tick, or
/// drive it to completion with [`BeepPlayer::play_blocking`].
#[derive(Debug, Clone)]
pub struct BeepPlayer {
    sample_rate: u32,
    phase_inc: u32,
    main_phase: u32,
    echo_phase: u32,
    amplitude: f32,
    echo_decay: f32,
    n_main: u32,
    n_delay: u32,
    n_echo: u32,
    index: u32,
    start_us: Option<u64>,
    finished: bool,
}

impl BeepPlayer {
    /// Beep with echo.
    pub fn beep(params: &BeepParams, sample_rate: u32) -> Self {
        let p = params.clamped(sample_rate);
        let n = samples_for_ms(p.duration_ms, sample_rate);
        Self::build(
            sample_rate,
            p.freq_hz,
            p.volume as f32 / 255.0 * BEEP_HEADROOM,
            p.echo_decay,
            n,
            samples_for_ms(p.echo_delay_ms, sample_rate),
            n,
        )
    }

    /// Plain tone without echo.
    pub fn tone(freq_hz: u16, duration_ms: u16, volume: u8, sample_rate: u32) -> Self {
        let freq = (freq_hz as f32).clamp(BEEP_FREQ_MIN_HZ, (sample_rate as f32 / 2.0).max(BEEP_FREQ_MIN_HZ));
        Self::build(
            sample_rate,
            freq,
            volume as f32 / 255.0 * TONE_PEAK,
            0.0,
            samples_for_ms(duration_ms, sample_rate),
            0,
            0,
        )
    }

    /// Startup tone test.
    pub fn boot_tone(sample_rate: u32) -> Self {
        Self::tone(BOOT_TONE_FREQ_HZ, BOOT_TONE_DURATION_MS, BOOT_TONE_VOLUME, sample_rate)
    }

    fn build(
        sample_rate: u32,
        freq_hz: f32,
        amplitude: f32,
        echo_decay: f32,
        n_main: u32,
        n_delay: u32,
        n_echo: u32,
    ) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            phase_inc: phase_inc(freq_hz, sample_rate.max(1)),
            main_phase: 0,
            echo_phase: 0,
            amplitude,
            echo_decay,
            n_main,
            n_delay,
            n_echo,
            index: 0,
            start_us: None,
            finished: false,
        }
    }

    /// Samples the job emits before returning to mid-scale.
    pub fn total_samples(&self) -> u32 {
        self.n_main + self.n_delay + self.n_echo
    }

    /// Samples emitted so far.
    pub fn position(&self) -> u32 {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Compute the next sample without touching hardware.
    pub fn next_sample(&mut self) -> Option<u8> {
        let i = self.index;
        if i >= self.total_samples() {
            return None;
        }

        let mut sm = 0.0f32;
        if i < self.n_main {
            sm += phase_sin(self.main_phase);
            self.main_phase = self.main_phase.wrapping_add(self.phase_inc);
        }
        if i >= self.n_delay && i < self.n_delay + self.n_echo {
            sm += self.echo_decay * phase_sin(self.echo_phase);
            self.echo_phase = self.echo_phase.wrapping_add(self.phase_inc);
        }
        self.index += 1;

        let v = DAC_MID as i32 + (sm * self.amplitude) as i32;
        Some(v.clamp(0, 255) as u8)
    }

    /// Due time of the next write, once playback has started.
    pub fn next_due_us(&self) -> Option<u64> {
        if self.finished {
            return None;
        }
        self.start_us
            .map(|start| start + self.index as u64 * 1_000_000 / self.sample_rate as u64)
    }

    /// Write the next sample if it is due. The first call starts playback.
    ///
    /// Returns `true` while the job is still running.
    pub fn poll<O: AnalogOutput + ?Sized>(&mut self, dac: &mut O, now_us: u64) -> Result<bool, HalError> {
        if self.finished {
            return Ok(false);
        }
        let start = *self.start_us.get_or_insert(now_us);
        let due = start + self.index as u64 * 1_000_000 / self.sample_rate as u64;
        if now_us < due {
            return Ok(true);
        }

        match self.next_sample() {
            Some(v) => {
                if let Err(e) = dac.write(OutputChannel::Speaker, v) {
                    self.stop(dac)?;
                    return Err(e);
                }
                Ok(true)
            }
            None => {
                self.stop(dac)?;
                Ok(false)
            }
        }
    }

    /// Abort and restore silence.
    pub fn stop<O: AnalogOutput + ?Sized>(&mut self, dac: &mut O) -> Result<(), HalError> {
        self.finished = true;
        self.index = self.total_samples();
        dac.write(OutputChannel::Speaker, DAC_MID)
    }

    /// Play to completion, sleeping between samples.
    ///
    /// Checks `cancel` between samples. Returns the number of waveform
    /// samples written; mid-scale is restored on every exit path.
    pub fn play_blocking<O, C>(
        mut self,
        dac: &mut O,
        clock: &mut C,
        cancel: Option<&CancelToken>,
    ) -> Result<u32, HalError>
    where
        O: AnalogOutput + ?Sized,
        C: Clock + ?Sized,
    {
        loop {
            if cancel.map_or(false, |c| c.take()) {
                let written = self.index;
                self.stop(dac)?;
                return Ok(written);
            }
            let now = clock.now_us();
            if let Some(due) = self.next_due_us() {
                if due > now {
                    clock.delay_us((due - now) as u32);
                    continue;
                }
            }
            let written = self.index;
            if !self.poll(dac, clock.now_us())? {
                return Ok(written);
            }
        }
    }
}

impl Iterator for BeepPlayer {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.next_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count_default_beep() {
        let player = BeepPlayer::beep(&BeepParams::default(), 16_000);
        assert_eq!(player.total_samples(), 2 * 2880 + 960);
        assert_eq!(player.count(), 6720);
    }

    #[test]
    fn test_zero_volume_is_silent() {
        let params = BeepParams { volume: 0, ..BeepParams::default() };
        assert!(BeepPlayer::beep(&params, 16_000).all(|v| v == 128));
    }

    #[test]
    fn test_clamping() {
        let p = BeepParams {
            freq_hz: 10.0,
            duration_ms: 1,
            echo_delay_ms: 60_000,
            echo_decay: 3.0,
            volume: 200,
        }
        .clamped(16_000);
        assert_eq!(p.freq_hz, 50.0);
        assert_eq!(p.duration_ms, 10);
        assert_eq!(p.echo_delay_ms, 5000);
        assert_eq!(p.echo_decay, 1.0);
    }

    #[test]
    fn test_tone_stays_in_range() {
        let tone = BeepPlayer::boot_tone(16_000);
        assert_eq!(tone.total_samples(), 2880);
        for v in tone {
            assert!((128 - 58..=128 + 58).contains(&(v as i32)));
        }
    }

    #[test]
    fn test_echo_only_region() {
        // 10 ms main, 20 ms delay: samples 160..320 are silence
        let params = BeepParams {
            freq_hz: 1000.0,
            duration_ms: 10,
            echo_delay_ms: 20,
            echo_decay: 0.5,
            volume: 255,
        };
        let samples: std::vec::Vec<u8> = BeepPlayer::beep(&params, 16_000).collect();
        assert_eq!(samples.len(), 160 + 320 + 160);
        assert!(samples[160..320].iter().all(|v| *v == 128));
        assert!(samples[320..].iter().any(|v| *v != 128));
    }
}
