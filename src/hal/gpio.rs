//! Digital output lines (motor step/direction/enable, coils, laser).

use crate::config::{AZ_DIR_PIN, AZ_ENABLE_PIN, AZ_STEP_PIN, EL_COIL_PINS, LASER_PIN};
use crate::error::HalError;

/// Logical output line.
///
/// Motion owns every line; the audio path never touches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine {
    /// A4988 STEP input (rising edge = one microstep)
    AzStep,
    /// A4988 DIR input (high = positive/clockwise)
    AzDir,
    /// A4988 ENABLE input (active low)
    AzEnable,
    /// ULN2003 IN1..IN4 for the 28BYJ-48
    ElCoil1,
    ElCoil2,
    ElCoil3,
    ElCoil4,
    /// Laser indicator (via NPN)
    Laser,
}

impl OutputLine {
    /// Number of logical lines.
    pub const COUNT: usize = 8;

    /// Elevation coils in sequence order.
    pub const EL_COILS: [OutputLine; 4] = [
        OutputLine::ElCoil1,
        OutputLine::ElCoil2,
        OutputLine::ElCoil3,
        OutputLine::ElCoil4,
    ];

    /// Every line in `index` order.
    pub const ALL: [OutputLine; OutputLine::COUNT] = [
        OutputLine::AzStep,
        OutputLine::AzDir,
        OutputLine::AzEnable,
        OutputLine::ElCoil1,
        OutputLine::ElCoil2,
        OutputLine::ElCoil3,
        OutputLine::ElCoil4,
        OutputLine::Laser,
    ];

    /// Dense index (0..COUNT) for table lookups.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            OutputLine::AzStep => 0,
            OutputLine::AzDir => 1,
            OutputLine::AzEnable => 2,
            OutputLine::ElCoil1 => 3,
            OutputLine::ElCoil2 => 4,
            OutputLine::ElCoil3 => 5,
            OutputLine::ElCoil4 => 6,
            OutputLine::Laser => 7,
        }
    }

    /// GPIO number the line is wired to.
    pub fn gpio(self) -> i32 {
        match self {
            OutputLine::AzStep => AZ_STEP_PIN,
            OutputLine::AzDir => AZ_DIR_PIN,
            OutputLine::AzEnable => AZ_ENABLE_PIN,
            OutputLine::ElCoil1 => EL_COIL_PINS[0],
            OutputLine::ElCoil2 => EL_COIL_PINS[1],
            OutputLine::ElCoil3 => EL_COIL_PINS[2],
            OutputLine::ElCoil4 => EL_COIL_PINS[3],
            OutputLine::Laser => LASER_PIN,
        }
    }
}

/// Set a named logical line high or low.
pub trait DigitalOutput {
    fn set_line(&mut self, line: OutputLine, high: bool) -> Result<(), HalError>;
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for &mut T {
    fn set_line(&mut self, line: OutputLine, high: bool) -> Result<(), HalError> {
        (**self).set_line(line, high)
    }
}
