//! # RustAntennaPointer
//!
//! Firmware core of a motorized antenna pointer: two steppers aim an
//! antenna at azimuth/elevation targets, a laser marks the pointing while
//! tracking, and a monitor audio path lets the operator hear the
//! mechanism while motor noise is gated and notched out.
//!
//! ## Architecture
//!
//! One cooperative [`ControlLoop`] owns everything:
//! - [`motion::MotionController`] turns targets into queued step bursts and
//!   publishes the activity signal (`is_moving`)
//! - [`audio::AudioEngine`] processes one mic sample per audio tick and
//!   reads the activity signal for muting, gating and comfort noise
//! - Hardware is reached only through the [`hal`] capability traits, so
//!   everything here runs on the host against [`hal::sim`]
//!
//! No allocation, no locks, no blocking in the loop. Logging goes through
//! the lock-free [`log_globals::EVENT_LOG`] ring.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod logging;
pub mod log_globals;
pub mod log_drain;
pub mod cancel;
pub mod hal;
pub mod config;
pub mod audio;
pub mod motion;
pub mod control;
pub mod status;

pub use audio::{AudioConfig, AudioEngine, AudioSettings, BeepParams, BeepPlayer};
pub use cancel::CancelToken;
pub use control::{ControlLoop, LoopConfig, NoTarget, TargetSupplier};
pub use error::{Error, HalError, MotionError, StorageError};
pub use log_globals::EVENT_LOG;
pub use motion::{Axis, HomingReport, LaserMode, MotionController, MotionLimits};
