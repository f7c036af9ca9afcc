//! Motion control
//!
//! Architecture:
//! - [`AngleState`]: az/el bookkeeping plus the azimuth step history
//! - [`PulseStepper`] (A4988, azimuth) and [`PhaseStepper`] (28BYJ-48,
//!   elevation) play queued step bursts out edge by edge
//! - [`MotionController`]: moves, tracking, homing, laser
//!
//! Open loop: no position feedback, every issued step is assumed taken.

pub mod angle;
pub mod limits;
pub mod laser;
pub mod stepper;
pub mod homing;
pub mod controller;

pub use angle::{unwrap_nearest, wrap_360, AngleState, StepHistory};
pub use controller::MotionController;
pub use homing::{HomingPhase, HomingReport};
pub use laser::LaserMode;
pub use limits::{Axis, MotionLimits};
pub use stepper::{PhaseStepper, PulseStepper, StepQueue};
