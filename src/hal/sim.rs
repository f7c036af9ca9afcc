//! Simulated hardware for host runs and tests.
//!
//! Every capability records what it was asked to do so tests can assert on
//! line levels, edge counts and DAC output without a board attached.

use heapless::{Deque, Vec};

use super::audio::{AnalogInput, AnalogOutput, Attenuation, InputChannel, OutputChannel, ADC_MID};
use super::gpio::{DigitalOutput, OutputLine};
use super::timing::Clock;
use crate::error::HalError;

/// Digital outputs with per-line level and rising-edge counters.
#[derive(Debug, Default)]
pub struct SimOutputs {
    levels: [bool; OutputLine::COUNT],
    rising: [u32; OutputLine::COUNT],
    writes: u32,
    fail: bool,
}

impl SimOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, line: OutputLine) -> bool {
        self.levels[line.index()]
    }

    /// Low-to-high transitions seen on `line`.
    pub fn rising_edges(&self, line: OutputLine) -> u32 {
        self.rising[line.index()]
    }

    /// Total number of `set_line` calls.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Coil levels packed as bits (IN1 = bit 0).
    pub fn coil_pattern(&self) -> u8 {
        OutputLine::EL_COILS
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, l)| acc | ((self.level(*l) as u8) << i))
    }

    /// Make every following write fail with `LineWrite`.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl DigitalOutput for SimOutputs {
    fn set_line(&mut self, line: OutputLine, high: bool) -> Result<(), HalError> {
        if self.fail {
            return Err(HalError::LineWrite);
        }
        let i = line.index();
        if high && !self.levels[i] {
            self.rising[i] += 1;
        }
        self.levels[i] = high;
        self.writes += 1;
        Ok(())
    }
}

/// Capacity of the scripted ADC queue.
pub const SIM_ADC_DEPTH: usize = 256;

/// ADC returning scripted samples, then mid-scale forever.
#[derive(Debug, Default)]
pub struct SimAdc {
    script: Deque<u16, SIM_ADC_DEPTH>,
    attenuation: Option<Attenuation>,
    reads: u32,
}

impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue samples; returns how many fit.
    pub fn script(&mut self, samples: &[u16]) -> usize {
        samples
            .iter()
            .take_while(|s| self.script.push_back(**s).is_ok())
            .count()
    }

    pub fn attenuation(&self) -> Option<Attenuation> {
        self.attenuation
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl AnalogInput for SimAdc {
    fn read(&mut self, _channel: InputChannel) -> Result<u16, HalError> {
        self.reads += 1;
        Ok(self.script.pop_front().unwrap_or(ADC_MID as u16))
    }

    fn set_attenuation(&mut self, _channel: InputChannel, level: Attenuation) -> Result<(), HalError> {
        self.attenuation = Some(level);
        Ok(())
    }
}

/// Number of leading DAC writes kept verbatim.
pub const SIM_DAC_CAPTURE: usize = 512;

/// DAC recording write count, last value and the first writes.
#[derive(Debug, Default)]
pub struct SimDac {
    captured: Vec<u8, SIM_DAC_CAPTURE>,
    writes: u32,
    last: Option<u8>,
    min: u8,
    max: u8,
}

impl SimDac {
    pub fn new() -> Self {
        Self { min: u8::MAX, ..Self::default() }
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// Smallest and largest value written, if any.
    pub fn range(&self) -> Option<(u8, u8)> {
        self.last.map(|_| (self.min, self.max))
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl AnalogOutput for SimDac {
    fn write(&mut self, _channel: OutputChannel, value: u8) -> Result<(), HalError> {
        let _ = self.captured.push(value);
        self.writes += 1;
        self.last = Some(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }
}

/// Manually advanced clock; `delay_us` just moves time forward.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_us: u64) -> Self {
        Self { now_us }
    }

    pub fn advance(&mut self, us: u64) {
        self.now_us += us;
    }

    pub fn set(&mut self, now_us: u64) {
        self.now_us = now_us;
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u64 {
        self.now_us
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += us as u64;
    }
}
