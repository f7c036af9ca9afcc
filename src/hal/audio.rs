//! Analog audio capabilities: microphone ADC in, speaker DAC out.

use crate::error::HalError;

/// ADC resolution in bits.
pub const ADC_BITS: u32 = 12;
/// Largest ADC code.
pub const ADC_MAX: u16 = (1 << ADC_BITS) - 1;
/// ADC mid-scale (zero signal).
pub const ADC_MID: i32 = 1 << (ADC_BITS - 1);
/// DAC mid-scale (silence).
pub const DAC_MID: u8 = 128;

/// Named analog input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChannel {
    Microphone,
}

/// Named analog output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Speaker,
}

/// ADC input attenuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    Db11,
}

impl Attenuation {
    /// Map a requested dB figure; anything unsupported selects 11 dB.
    pub fn from_db(db: i32) -> Self {
        match db {
            0 => Attenuation::Db0,
            2 => Attenuation::Db2_5,
            6 => Attenuation::Db6,
            _ => Attenuation::Db11,
        }
    }

    /// Integer dB as used on the command line (2.5 dB reports as 2).
    pub fn as_db(self) -> i32 {
        match self {
            Attenuation::Db0 => 0,
            Attenuation::Db2_5 => 2,
            Attenuation::Db6 => 6,
            Attenuation::Db11 => 11,
        }
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation::Db11
    }
}

/// Quantized analog input (12-bit codes).
pub trait AnalogInput {
    fn read(&mut self, channel: InputChannel) -> Result<u16, HalError>;
    fn set_attenuation(&mut self, channel: InputChannel, level: Attenuation) -> Result<(), HalError>;
}

/// Quantized analog output (8-bit codes).
pub trait AnalogOutput {
    fn write(&mut self, channel: OutputChannel, value: u8) -> Result<(), HalError>;
}
