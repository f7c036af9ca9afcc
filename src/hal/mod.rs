//! Hardware Abstraction Layer for the antenna pointer.
//!
//! Capability contracts only: digital output lines, analog in/out and
//! time. Business logic stays in core modules, HAL is just I/O.
//! `sim` backs the host tests; `esp` binds the ESP32 peripherals.

pub mod gpio;
pub mod audio;
pub mod timing;
pub mod sim;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use audio::{AnalogInput, AnalogOutput, Attenuation, InputChannel, OutputChannel};
pub use gpio::{DigitalOutput, OutputLine};
pub use timing::Clock;
