//! Per-sample monitor pipeline.
//!
//! Chain: center → idle mute → gain → gate → comfort noise → notch →
//! soft clip → limiter → 8-bit DAC code.
//!
//! The gate sees the post-gain sample, so its thresholds are in output
//! units regardless of the volume setting.

use crate::config::persistence::AudioSettingsStore;
use crate::error::{HalError, StorageError};
use crate::hal::audio::{AnalogInput, AnalogOutput, Attenuation, InputChannel, OutputChannel, ADC_MID, DAC_MID};
use crate::log_globals::EVENT_LOG;
use crate::logging::LogSource;
use crate::{rt_debug, rt_info, rt_warn};

use super::beep::{BeepParams, BeepPlayer};
use super::biquad::Biquad;
use super::clip::{limit, soft_clip, to_dac};
use super::gate::Gate;
use super::noise::NoiseSource;
use super::settings::{AudioConfig, AudioSettings};

pub struct AudioEngine {
    config: AudioConfig,
    settings: AudioSettings,
    gate: Gate,
    noise: NoiseSource,
    notch: Biquad,
    was_active: bool,
    attenuation_dirty: bool,
}

impl AudioEngine {
    pub fn new(config: AudioConfig, settings: AudioSettings) -> Self {
        let mut engine = Self {
            config,
            settings: AudioSettings::default(),
            gate: Gate::new(0, 0),
            noise: NoiseSource::new(config.noise_seed),
            notch: Biquad::passthrough(),
            was_active: false,
            attenuation_dirty: true,
        };
        engine.settings = settings.clamped(config.sample_rate);
        engine.gate.set_thresholds(engine.settings.gate_open, engine.settings.gate_close);
        engine.rebuild_notch();
        engine
    }

    /// Park the DAC at mid-scale and push the attenuation to the ADC.
    pub fn init<I, O>(&mut self, adc: &mut I, dac: &mut O) -> Result<(), HalError>
    where
        I: AnalogInput + ?Sized,
        O: AnalogOutput + ?Sized,
    {
        dac.write(OutputChannel::Speaker, DAC_MID)?;
        self.sync_attenuation(adc)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn gate_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Transform one raw 12-bit input sample into a DAC code.
    ///
    /// The gate compares the post-gain sample against its thresholds, so
    /// gate decisions depend on volume and pass-through gain. At volume 128
    /// (unity) a centered input of 150 closes a 250/180 gate; at the
    /// default volume 180 the same input becomes 211 and keeps it open.
    pub fn process(&mut self, raw: u16, active: bool) -> u8 {
        if active && !self.was_active {
            self.gate.rearm();
        }
        self.was_active = active;

        if self.settings.mute_when_idle && !active {
            return DAC_MID;
        }

        let centered = raw as i32 - ADC_MID;
        let mut s = libm::roundf(centered as f32 * self.settings.gain()) as i32;

        if !self.gate.update(s) {
            return DAC_MID;
        }

        if active && self.settings.noise_enabled && s.unsigned_abs() < self.settings.noise_floor as u32 {
            let n = self.noise.next_sample() as f32;
            let mix = self.settings.noise_mix;
            s = ((1.0 - mix) * s as f32 + mix * n) as i32;
        }

        if self.settings.notch_enabled {
            s = self.notch.process(s as f32) as i32;
        }

        to_dac(limit(soft_clip(s), self.settings.limiter))
    }

    /// One audio tick: read the mic (unless muted), process, write the DAC.
    pub fn tick<I, O>(&mut self, adc: &mut I, dac: &mut O, active: bool) -> Result<u8, HalError>
    where
        I: AnalogInput + ?Sized,
        O: AnalogOutput + ?Sized,
    {
        self.sync_attenuation(adc)?;

        let out = if self.settings.mute_when_idle && !active {
            self.process(ADC_MID as u16, false)
        } else {
            let raw = adc.read(InputChannel::Microphone)?;
            self.process(raw, active)
        };
        dac.write(OutputChannel::Speaker, out)?;
        Ok(out)
    }

    fn sync_attenuation<I: AnalogInput + ?Sized>(&mut self, adc: &mut I) -> Result<(), HalError> {
        if self.attenuation_dirty {
            adc.set_attenuation(InputChannel::Microphone, self.settings.attenuation)?;
            self.attenuation_dirty = false;
        }
        Ok(())
    }

    /// Replace all settings at once (clamped). Notch state is reset when
    /// the notch parameters change.
    pub fn apply(&mut self, settings: AudioSettings) {
        let s = settings.clamped(self.config.sample_rate);
        if s.attenuation != self.settings.attenuation {
            self.attenuation_dirty = true;
        }
        let notch_changed = s.notch_enabled != self.settings.notch_enabled
            || s.notch_freq_hz != self.settings.notch_freq_hz
            || s.notch_q != self.settings.notch_q;
        self.settings = s;
        self.gate.set_thresholds(s.gate_open, s.gate_close);
        if notch_changed {
            self.rebuild_notch();
        }
    }

    fn rebuild_notch(&mut self) {
        if self.settings.notch_enabled {
            self.notch.set_notch(
                self.config.sample_rate as f32,
                self.settings.notch_freq_hz,
                self.settings.notch_q,
            );
        } else {
            self.notch = Biquad::passthrough();
        }
    }

    fn update(&mut self, f: impl FnOnce(&mut AudioSettings)) {
        let mut s = self.settings;
        f(&mut s);
        self.apply(s);
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.update(|s| s.volume = volume);
        rt_info!(EVENT_LOG, LogSource::Audio, "volume {}", volume);
    }

    pub fn set_passthrough_gain(&mut self, gain: f32) {
        self.update(|s| s.passthrough_gain = gain);
        rt_info!(EVENT_LOG, LogSource::Audio, "pt gain {:.2}", self.settings.passthrough_gain);
    }

    pub fn set_limiter(&mut self, ceiling: i32) {
        self.update(|s| s.limiter = ceiling.clamp(0, u16::MAX as i32) as u16);
        rt_info!(EVENT_LOG, LogSource::Audio, "limiter {}", self.settings.limiter);
    }

    pub fn set_gate(&mut self, open: i32, close: i32) {
        self.update(|s| {
            s.gate_open = open.clamp(0, u16::MAX as i32) as u16;
            s.gate_close = close.clamp(0, u16::MAX as i32) as u16;
        });
        rt_info!(
            EVENT_LOG,
            LogSource::Audio,
            "gate open {} close {}",
            self.settings.gate_open,
            self.settings.gate_close
        );
    }

    pub fn set_noise(&mut self, enabled: bool, mix: f32, floor: i32) {
        self.update(|s| {
            s.noise_enabled = enabled;
            s.noise_mix = mix;
            s.noise_floor = floor.clamp(0, u16::MAX as i32) as u16;
        });
        rt_info!(
            EVENT_LOG,
            LogSource::Audio,
            "noise {} mix {:.2} floor {}",
            if enabled { "on" } else { "off" },
            self.settings.noise_mix,
            self.settings.noise_floor
        );
    }

    pub fn set_notch(&mut self, enabled: bool, freq_hz: f32, q: f32) {
        self.update(|s| {
            s.notch_enabled = enabled;
            s.notch_freq_hz = freq_hz;
            s.notch_q = q;
        });
        rt_info!(
            EVENT_LOG,
            LogSource::Audio,
            "notch {} {:.1}Hz Q {:.1}",
            if enabled { "on" } else { "off" },
            self.settings.notch_freq_hz,
            self.settings.notch_q
        );
    }

    pub fn set_mute_when_idle(&mut self, enabled: bool) {
        self.update(|s| s.mute_when_idle = enabled);
    }

    /// Takes effect at the next tick.
    pub fn set_attenuation_db(&mut self, db: i32) {
        let level = Attenuation::from_db(db);
        self.update(|s| s.attenuation = level);
        rt_debug!(EVENT_LOG, LogSource::Audio, "adc atten {}dB", level.as_db());
    }

    pub fn set_beep_params(&mut self, params: BeepParams) {
        self.update(|s| s.beep = params);
    }

    pub fn set_beep_volume(&mut self, volume: u8) {
        self.update(|s| s.beep.volume = volume);
    }

    pub fn set_beep_on_track_start(&mut self, enabled: bool) {
        self.update(|s| s.beep_on_track_start = enabled);
    }

    pub fn set_beep_on_track_end(&mut self, enabled: bool) {
        self.update(|s| s.beep_on_track_end = enabled);
    }

    pub fn set_boot_tone(&mut self, enabled: bool) {
        self.update(|s| s.boot_tone = enabled);
    }

    /// Back to compile-time defaults. Stored settings are untouched.
    pub fn reset_to_defaults(&mut self) {
        self.apply(AudioSettings::default());
        rt_info!(EVENT_LOG, LogSource::Audio, "settings reset to defaults");
    }

    /// Beep job for the current parameters.
    pub fn beep(&self) -> BeepPlayer {
        BeepPlayer::beep(&self.settings.beep, self.config.sample_rate)
    }

    /// Load stored settings. `Ok(false)` when nothing is stored; on any
    /// failure the current settings stay in force.
    pub fn load_settings<S: AudioSettingsStore + ?Sized>(&mut self, store: &mut S) -> Result<bool, StorageError> {
        match store.load_audio_settings() {
            Ok(Some(settings)) => {
                self.apply(settings);
                rt_info!(EVENT_LOG, LogSource::Storage, "audio settings loaded");
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                rt_warn!(EVENT_LOG, LogSource::Storage, "audio settings load failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn save_settings<S: AudioSettingsStore + ?Sized>(&self, store: &mut S) -> Result<(), StorageError> {
        store.save_audio_settings(&self.settings).map_err(|e| {
            rt_warn!(EVENT_LOG, LogSource::Storage, "audio settings save failed: {}", e);
            e
        })
    }

    pub fn delete_settings<S: AudioSettingsStore + ?Sized>(&self, store: &mut S) -> Result<(), StorageError> {
        store.delete_audio_settings()
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(AudioConfig::default(), AudioSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(centered: i32) -> u16 {
        (centered + ADC_MID) as u16
    }

    #[test]
    fn test_idle_mute_emits_mid_scale() {
        let mut engine = AudioEngine::default();
        assert_eq!(engine.process(raw(1000), false), DAC_MID);
    }

    #[test]
    fn test_unity_passthrough_small_signal() {
        let mut engine = AudioEngine::default();
        engine.set_volume(128);
        engine.set_noise(false, 0.0, 0);
        // 320 → soft clip 320 - 320³/2048² = 313 → (313 + 2048) >> 4 = 147
        assert_eq!(engine.process(raw(320), true), 147);
    }

    #[test]
    fn test_limiter_ceiling() {
        let mut engine = AudioEngine::default();
        engine.set_noise(false, 0.0, 0);
        engine.set_limiter(2048);
        assert_eq!(engine.process(raw(2000), true), 128);
    }

    #[test]
    fn test_gate_on_post_gain_sample() {
        let mut engine = AudioEngine::default();
        engine.set_gate(250, 180);
        let states: Vec<bool> = [0, 0, 260, 260, 260, 150, 0]
            .iter()
            .map(|s| {
                engine.process(raw(*s), true);
                engine.gate_open()
            })
            .collect();
        assert_eq!(states, [false, false, true, true, true, true, false]);
    }

    #[test]
    fn test_activity_edge_rearms_gate() {
        let mut engine = AudioEngine::default();
        engine.set_mute_when_idle(false);
        engine.set_gate(250, 180);
        engine.process(raw(400), true);
        assert!(engine.gate_open());
        engine.process(raw(400), false);
        engine.process(raw(0), true);
        assert!(!engine.gate_open());
    }

    #[test]
    fn test_noise_only_when_active() {
        let mut engine = AudioEngine::default();
        engine.set_mute_when_idle(false);
        engine.set_noise(true, 1.0, 4095);
        assert_eq!(engine.process(raw(0), false), 128);
        let outs: Vec<u8> = (0..32).map(|_| engine.process(raw(0), true)).collect();
        assert!(outs.iter().any(|v| *v != 128));
    }

    #[test]
    fn test_notch_change_resets_state() {
        let mut engine = AudioEngine::default();
        engine.set_notch(true, 1000.0, 4.0);
        engine.process(raw(500), true);
        engine.set_notch(true, 1500.0, 4.0);
        assert_eq!(engine.notch.state(), (0.0, 0.0));
    }
}
