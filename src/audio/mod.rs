//! Monitor audio path
//!
//! Architecture:
//! - Mic ADC (12-bit) → [`AudioEngine`] → speaker DAC (8-bit), one sample
//!   per audio tick at 16 kHz
//! - The motion activity flag drives idle muting, gate re-arm and comfort
//!   noise
//! - [`BeepPlayer`] owns the DAC while a beep or tone test plays

pub mod biquad;
pub mod noise;
pub mod gate;
pub mod clip;
pub mod beep;
pub mod settings;
pub mod engine;

pub use beep::{BeepParams, BeepPlayer};
pub use biquad::Biquad;
pub use clip::{limit, soft_clip};
pub use engine::AudioEngine;
pub use gate::Gate;
pub use noise::NoiseSource;
pub use settings::{AudioConfig, AudioSettings};
