//! Global log stream instance.
//!
//! Motion, audio and storage code all log here; the firmware drains it from
//! the idle part of the control loop.

use crate::logging::LogStream;

/// Event log shared by every subsystem of the pointer core.
pub static EVENT_LOG: LogStream = LogStream::new();
