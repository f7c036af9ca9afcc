//! Monitor audio path integration tests
//!
//! Drives the engine through the simulated ADC/DAC the same way the
//! control loop does, one tick per sample.

use proptest::prelude::*;
use rust_antenna_pointer::audio::{soft_clip, AudioEngine, AudioSettings, Biquad};
use rust_antenna_pointer::config::{AudioSettingsStore, MemoryStore, AUDIO_SAMPLE_RATE};
use rust_antenna_pointer::hal::sim::{SimAdc, SimDac};
use rust_antenna_pointer::hal::Attenuation;
use rust_antenna_pointer::StorageError;

const MID: u16 = 2048;

fn engine() -> (AudioEngine, SimAdc, SimDac) {
    let mut engine = AudioEngine::default();
    let mut adc = SimAdc::new();
    let mut dac = SimDac::new();
    engine.init(&mut adc, &mut dac).unwrap();
    (engine, adc, dac)
}

#[test]
fn test_init_parks_dac_and_sets_attenuation() {
    let (_engine, adc, dac) = engine();
    assert_eq!(dac.last(), Some(128));
    assert_eq!(adc.attenuation(), Some(Attenuation::Db11));
}

#[test]
fn test_gate_hysteresis_end_to_end() {
    let (mut engine, mut adc, mut dac) = engine();
    engine.set_gate(250, 180);

    let input: [i32; 7] = [0, 0, 260, 260, 260, 150, 0];
    let raw: Vec<u16> = input.iter().map(|s| (MID as i32 + s) as u16).collect();
    adc.script(&raw);

    let mut states = Vec::new();
    let mut outs = Vec::new();
    for _ in 0..input.len() {
        outs.push(engine.tick(&mut adc, &mut dac, true).unwrap());
        states.push(engine.gate_open());
    }

    assert_eq!(states, [false, false, true, true, true, true, false]);
    // closed gate emits exact silence
    assert_eq!(outs[0], 128);
    assert_eq!(outs[6], 128);
    assert!(outs[2] > 128);
}

#[test]
fn test_gate_thresholds_apply_after_gain() {
    let (mut engine, mut adc, mut dac) = engine();
    engine.set_volume(128);
    engine.set_gate(250, 180);

    let input: [i32; 7] = [0, 0, 260, 260, 260, 150, 0];
    let raw: Vec<u16> = input.iter().map(|s| (MID as i32 + s) as u16).collect();
    adc.script(&raw);

    let states: Vec<bool> = input
        .iter()
        .map(|_| {
            engine.tick(&mut adc, &mut dac, true).unwrap();
            engine.gate_open()
        })
        .collect();
    // unity gain: 150 is below the close threshold
    assert_eq!(states, [false, false, true, true, true, false, false]);
}

#[test]
fn test_idle_mute_skips_adc() {
    let (mut engine, mut adc, mut dac) = engine();
    adc.script(&[4000; 16]);
    for _ in 0..16 {
        assert_eq!(engine.tick(&mut adc, &mut dac, false).unwrap(), 128);
    }
    assert_eq!(adc.reads(), 0);

    engine.set_mute_when_idle(false);
    engine.tick(&mut adc, &mut dac, false).unwrap();
    assert_eq!(adc.reads(), 1);
}

#[test]
fn test_attenuation_change_applies_on_next_tick() {
    let (mut engine, mut adc, mut dac) = engine();
    engine.set_attenuation_db(6);
    assert_eq!(adc.attenuation(), Some(Attenuation::Db11));
    engine.tick(&mut adc, &mut dac, true).unwrap();
    assert_eq!(adc.attenuation(), Some(Attenuation::Db6));

    // unsupported values fall back to 11 dB
    engine.set_attenuation_db(3);
    engine.tick(&mut adc, &mut dac, true).unwrap();
    assert_eq!(adc.attenuation(), Some(Attenuation::Db11));
}

#[test]
fn test_loud_input_stays_within_limiter() {
    let (mut engine, mut adc, mut dac) = engine();
    engine.set_volume(255);
    engine.set_passthrough_gain(12.0);
    engine.set_limiter(3000);
    adc.script(&[4095, 0, 4095, 0, 4095, 0]);
    for _ in 0..6 {
        engine.tick(&mut adc, &mut dac, true).unwrap();
    }
    let (lo, hi) = dac.range().unwrap();
    assert!(hi <= (3000 >> 4) as u8);
    assert!(lo >= ((2048 - 1182) >> 4) as u8 - 1);
}

#[test]
fn test_notch_attenuates_centre_frequency() {
    let fs = AUDIO_SAMPLE_RATE as f32;
    let peak_after_settle = |freq: f32| {
        let mut f = Biquad::notch(fs, 2500.0, 12.0);
        let mut peak = 0.0f32;
        for n in 0..4000 {
            let x = 1000.0 * (2.0 * core::f32::consts::PI * freq * n as f32 / fs).sin();
            let y = f.process(x);
            if n >= 3000 {
                peak = peak.max(y.abs());
            }
        }
        peak
    };

    let at_centre = peak_after_settle(2500.0);
    let octave_up = peak_after_settle(5000.0);
    assert!(octave_up > 900.0, "octave away passes: {}", octave_up);
    assert!(at_centre * 20.0 < octave_up, "centre {} vs octave {}", at_centre, octave_up);
}

#[test]
fn test_notch_disabled_is_transparent() {
    let (mut a, _, _) = engine();
    let (mut b, _, _) = engine();
    a.set_noise(false, 0.0, 0);
    b.set_noise(false, 0.0, 0);
    b.set_notch(true, 2500.0, 12.0);
    b.set_notch(false, 2500.0, 12.0);
    for s in [100u16, 3000, 2048, 1500, 2600] {
        assert_eq!(a.process(s, true), b.process(s, true));
    }
}

#[test]
fn test_settings_persist_round_trip() {
    let (mut engine, _, _) = engine();
    let mut store = MemoryStore::new();
    assert_eq!(engine.load_settings(&mut store), Ok(false));

    engine.set_volume(77);
    engine.set_notch(true, 1800.0, 8.0);
    engine.set_beep_on_track_end(true);
    engine.save_settings(&mut store).unwrap();

    let (mut fresh, _, _) = self::engine();
    assert_eq!(fresh.load_settings(&mut store), Ok(true));
    assert_eq!(fresh.settings(), engine.settings());

    engine.delete_settings(&mut store).unwrap();
    assert_eq!(engine.delete_settings(&mut store), Err(StorageError::NotFound));
    assert_eq!(store.load_audio_settings(), Ok(None));
}

#[test]
fn test_failed_load_keeps_current_settings() {
    let (mut engine, _, _) = engine();
    engine.set_volume(42);
    let mut store = MemoryStore::new();
    store.save_audio_settings(&AudioSettings::default()).unwrap();
    store.fail_with(Some(StorageError::Corrupt));

    assert_eq!(engine.load_settings(&mut store), Err(StorageError::Corrupt));
    assert_eq!(engine.settings().volume, 42);
}

#[test]
fn test_reset_to_defaults() {
    let (mut engine, _, _) = engine();
    engine.set_volume(10);
    engine.set_gate(900, 100);
    engine.reset_to_defaults();
    assert_eq!(*engine.settings(), AudioSettings::default());
}

#[test]
fn test_noise_mix_raised_when_enabled() {
    let (mut engine, _, _) = engine();
    engine.set_noise(true, 0.0, 100);
    assert!((engine.settings().noise_mix - 0.01).abs() < 1e-6);
    engine.set_noise(false, 0.0, 100);
    assert_eq!(engine.settings().noise_mix, 0.0);
}

proptest! {
    /// Soft clip never amplifies and never folds back
    #[test]
    fn prop_soft_clip_bounded_monotone(x in -8192i32..8192) {
        let y = soft_clip(x);
        prop_assert!(y.abs() <= x.abs());
        prop_assert!(soft_clip(x + 1) >= y);
        prop_assert_eq!(soft_clip(-x), -y);
    }

    /// Every DAC code respects the limiter ceiling
    #[test]
    fn prop_output_below_ceiling(raw in 0u16..4096, ceiling in 0i32..4096, volume in 0u8..=255) {
        let mut engine = AudioEngine::default();
        engine.set_volume(volume);
        engine.set_limiter(ceiling);
        let out = engine.process(raw, true);
        prop_assert!(out as i32 <= ceiling >> 4);
    }
}
