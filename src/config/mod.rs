//! Module: config
//!
//! Purpose: Compile-time defaults for the pointer hardware and tuning,
//! plus the persistence hooks for position and audio settings.
//!
//! Pin numbers are GPIO numbers on the ESP32 DevKit. Everything else is a
//! default that `MotionLimits` / `AudioSettings` start from.

pub mod persistence;
pub mod nvs;

pub use persistence::{AudioSettingsStore, MemoryStore, PositionStore};

// ========================================
// Pins
// ========================================

/// AZ A4988 STEP
pub const AZ_STEP_PIN: i32 = 14;
/// AZ A4988 DIR
pub const AZ_DIR_PIN: i32 = 27;
/// AZ A4988 ENABLE (LOW = enabled)
pub const AZ_ENABLE_PIN: i32 = 12;
/// EL ULN2003 IN1..IN4
pub const EL_COIL_PINS: [i32; 4] = [32, 33, 5, 4];
/// Laser NPN base
pub const LASER_PIN: i32 = 15;
/// Microphone (ADC1 channel 6)
pub const MIC_ADC_PIN: i32 = 34;
/// Speaker amplifier (DAC channel 2)
pub const DAC_PIN: i32 = 26;

// ========================================
// Motion
// ========================================

/// NEMA17 full steps per revolution
pub const AZ_STEPS_PER_REV: f32 = 200.0;
/// A4988 microstepping
pub const AZ_MICROSTEPS: f32 = 16.0;
/// Belt/gear ratio on the azimuth axis
pub const AZ_GEAR_RATIO: f32 = 1.0;
/// 28BYJ-48 half-steps per degree (4096 / 360 after gearing, rounded as calibrated)
pub const EL_STEPS_PER_DEG: f32 = 10.6667;

pub const AZ_MAX_SPEED_DPS: f32 = 90.0;
pub const EL_MAX_SPEED_DPS: f32 = 45.0;

/// STEP high/low half-period
pub const AZ_STEP_DELAY_US: u32 = 500;
/// Time between elevation phases
pub const EL_STEP_DELAY_US: u32 = 1200;

pub const EL_MIN_DEG: f32 = 0.0;
pub const EL_MAX_DEG: f32 = 180.0;

/// Stored azimuth is re-centered into ±this bound
pub const AZ_STATE_BOUND_DEG: f32 = 360.0;

/// Tracking dt floor/ceiling (seconds)
pub const TRACK_DT_MIN_S: f32 = 0.001;
pub const TRACK_DT_MAX_S: f32 = 0.5;

/// Azimuth step-history capacity (entries)
pub const STEP_HISTORY_LEN: usize = 1024;

/// Per-axis pending burst queue depth
pub const STEP_QUEUE_LEN: usize = 16;

// ========================================
// Audio
// ========================================

pub const AUDIO_SAMPLE_RATE: u32 = 16_000;
pub const NOISE_SEED: u32 = 0xA5A5_A5A5;

pub const DEFAULT_VOLUME: u8 = 180;
pub const DEFAULT_PASSTHROUGH_GAIN: f32 = 1.0;
pub const DEFAULT_LIMITER: u16 = 3600;
pub const DEFAULT_GATE_OPEN: u16 = 0;
pub const DEFAULT_GATE_CLOSE: u16 = 0;
pub const DEFAULT_NOISE_ENABLED: bool = true;
pub const DEFAULT_NOISE_MIX: f32 = 0.12;
pub const DEFAULT_NOISE_FLOOR: u16 = 180;
pub const DEFAULT_NOTCH_ENABLED: bool = false;
pub const DEFAULT_NOTCH_FREQ_HZ: f32 = 2500.0;
pub const DEFAULT_NOTCH_Q: f32 = 12.0;
pub const DEFAULT_MUTE_WHEN_IDLE: bool = true;
pub const DEFAULT_ADC_ATTEN_DB: i32 = 11;

// ========================================
// Beeps
// ========================================

pub const DEFAULT_BEEP_FREQ_HZ: u16 = 1200;
pub const DEFAULT_BEEP_DURATION_MS: u16 = 180;
pub const DEFAULT_BEEP_ECHO_DELAY_MS: u16 = 60;
pub const DEFAULT_BEEP_ECHO_DECAY: f32 = 0.45;
pub const DEFAULT_BEEP_VOLUME: u8 = 0;
pub const DEFAULT_BEEP_ON_TRACK_START: bool = false;
pub const DEFAULT_BEEP_ON_TRACK_END: bool = false;
pub const DEFAULT_BOOT_TONE: bool = true;

/// Boot tone: 1 kHz, 180 ms, fixed level, no echo
pub const BOOT_TONE_FREQ_HZ: u16 = 1000;
pub const BOOT_TONE_DURATION_MS: u16 = 180;
pub const BOOT_TONE_VOLUME: u8 = 120;

// ========================================
// Loop
// ========================================

/// Target supplier polling period
pub const TRACK_PERIOD_US: u64 = 100_000;

/// Firmware version string stamped by build.rs
pub const VERSION_STRING: &str = env!("VERSION_STRING");
