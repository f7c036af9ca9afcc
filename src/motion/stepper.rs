//! Step generation for both axes.
//!
//! Bursts of signed steps wait in a small FIFO per axis. `poll` emits at
//! most one edge per call, and only once its due time has passed:
//!
//! - Azimuth (A4988): DIR is set before each burst, then every step is a
//!   STEP high followed by STEP low, each held for the step delay.
//! - Elevation (28BYJ-48 via ULN2003): 8-phase half-step sequence. The
//!   phase index persists across bursts so direction reversals do not skip.

use heapless::{Deque, Vec};

use crate::config::STEP_QUEUE_LEN;
use crate::error::HalError;
use crate::hal::gpio::{DigitalOutput, OutputLine};

/// Half-step coil pattern, IN1..IN4.
pub const HALF_STEP_SEQ: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

/// Unexecuted work returned by a cancel, oldest first.
pub type Remainder = Vec<i32, { STEP_QUEUE_LEN + 1 }>;

/// FIFO of pending signed bursts.
#[derive(Debug, Clone, Default)]
pub struct StepQueue {
    bursts: Deque<i32, STEP_QUEUE_LEN>,
}

impl StepQueue {
    /// A push of `steps` would succeed.
    pub fn can_accept(&self, steps: i32) -> bool {
        steps == 0 || !self.bursts.is_full() || self.merges(steps)
    }

    fn merges(&self, steps: i32) -> bool {
        self.bursts
            .back()
            .map_or(false, |b| b.signum() == steps.signum() && b.checked_add(steps).is_some())
    }

    /// Append a burst, merging into the tail when it runs the same way.
    /// Returns `false` when the queue is full.
    pub fn push(&mut self, steps: i32) -> bool {
        if steps == 0 {
            return true;
        }
        if self.merges(steps) {
            if let Some(back) = self.bursts.back_mut() {
                *back += steps;
            }
            return true;
        }
        self.bursts.push_back(steps).is_ok()
    }

    pub fn pop(&mut self) -> Option<i32> {
        self.bursts.pop_front()
    }

    pub fn pending_steps(&self) -> i64 {
        self.bursts.iter().map(|b| b.unsigned_abs() as i64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }

    fn drain_into(&mut self, out: &mut Remainder) {
        while let Some(b) = self.bursts.pop_front() {
            let _ = out.push(b);
        }
    }
}

/// A4988 pulse stepper (azimuth).
#[derive(Debug, Clone)]
pub struct PulseStepper {
    queue: StepQueue,
    /// Signed steps left in the active burst
    active: i32,
    step_high: bool,
    half_period_us: u32,
    next_due_us: Option<u64>,
    position: i64,
}

impl PulseStepper {
    pub fn new(half_period_us: u32) -> Self {
        Self {
            queue: StepQueue::default(),
            active: 0,
            step_high: false,
            half_period_us,
            next_due_us: None,
            position: 0,
        }
    }

    /// Drive STEP low, DIR low and ENABLE low (driver enabled).
    pub fn init<D: DigitalOutput + ?Sized>(&mut self, out: &mut D) -> Result<(), HalError> {
        out.set_line(OutputLine::AzStep, false)?;
        out.set_line(OutputLine::AzDir, false)?;
        out.set_line(OutputLine::AzEnable, false)
    }

    pub fn queue(&self) -> &StepQueue {
        &self.queue
    }

    pub fn can_accept(&self, steps: i32) -> bool {
        self.queue.can_accept(steps)
    }

    pub fn enqueue(&mut self, steps: i32) -> bool {
        self.queue.push(steps)
    }

    /// Steps not yet started (active burst plus queue).
    pub fn pending_steps(&self) -> i64 {
        self.active.unsigned_abs() as i64 + self.queue.pending_steps()
    }

    /// Work remains, or STEP still has to come back down.
    pub fn is_busy(&self) -> bool {
        self.step_high || self.active != 0 || !self.queue.is_empty()
    }

    /// Net executed steps since construction.
    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn next_due_us(&self) -> Option<u64> {
        if self.is_busy() {
            Some(self.next_due_us.unwrap_or(0))
        } else {
            None
        }
    }

    /// Emit the next edge if due. Returns the direction of a step that
    /// started on this call (`+1`/`-1`), or 0.
    pub fn poll<D: DigitalOutput + ?Sized>(&mut self, out: &mut D, now_us: u64) -> Result<i32, HalError> {
        if self.next_due_us.map_or(false, |due| now_us < due) {
            return Ok(0);
        }

        if self.step_high {
            out.set_line(OutputLine::AzStep, false)?;
            self.step_high = false;
            self.next_due_us = Some(now_us + self.half_period_us as u64);
            return Ok(0);
        }

        if self.active == 0 {
            match self.queue.pop() {
                Some(burst) => {
                    out.set_line(OutputLine::AzDir, burst > 0)?;
                    self.active = burst;
                }
                None => {
                    self.next_due_us = None;
                    return Ok(0);
                }
            }
        }

        out.set_line(OutputLine::AzStep, true)?;
        let dir = self.active.signum();
        self.active -= dir;
        self.position += dir as i64;
        self.step_high = true;
        self.next_due_us = Some(now_us + self.half_period_us as u64);
        Ok(dir)
    }

    /// Drop everything not yet started. A STEP already high is still
    /// brought low by the next poll.
    pub fn cancel(&mut self) -> Remainder {
        let mut rem = Remainder::new();
        if self.active != 0 {
            let _ = rem.push(self.active);
            self.active = 0;
        }
        self.queue.drain_into(&mut rem);
        rem
    }
}

/// 28BYJ-48 half-step stepper (elevation).
#[derive(Debug, Clone)]
pub struct PhaseStepper {
    queue: StepQueue,
    active: i32,
    phase: u8,
    interval_us: u32,
    next_due_us: Option<u64>,
    position: i64,
}

impl PhaseStepper {
    pub fn new(interval_us: u32) -> Self {
        Self {
            queue: StepQueue::default(),
            active: 0,
            phase: 0,
            interval_us,
            next_due_us: None,
            position: 0,
        }
    }

    /// Coils off.
    pub fn init<D: DigitalOutput + ?Sized>(&mut self, out: &mut D) -> Result<(), HalError> {
        for coil in OutputLine::EL_COILS {
            out.set_line(coil, false)?;
        }
        Ok(())
    }

    pub fn queue(&self) -> &StepQueue {
        &self.queue
    }

    pub fn can_accept(&self, steps: i32) -> bool {
        self.queue.can_accept(steps)
    }

    pub fn enqueue(&mut self, steps: i32) -> bool {
        self.queue.push(steps)
    }

    pub fn pending_steps(&self) -> i64 {
        self.active.unsigned_abs() as i64 + self.queue.pending_steps()
    }

    pub fn is_busy(&self) -> bool {
        self.active != 0 || !self.queue.is_empty()
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn next_due_us(&self) -> Option<u64> {
        if self.is_busy() {
            Some(self.next_due_us.unwrap_or(0))
        } else {
            None
        }
    }

    /// Advance one phase if due. Returns the step direction, or 0.
    pub fn poll<D: DigitalOutput + ?Sized>(&mut self, out: &mut D, now_us: u64) -> Result<i32, HalError> {
        if self.next_due_us.map_or(false, |due| now_us < due) {
            return Ok(0);
        }
        if self.active == 0 {
            match self.queue.pop() {
                Some(burst) => self.active = burst,
                None => {
                    self.next_due_us = None;
                    return Ok(0);
                }
            }
        }

        let dir = self.active.signum();
        self.phase = (self.phase + if dir > 0 { 1 } else { 7 }) & 0x07;
        let pattern = HALF_STEP_SEQ[self.phase as usize];
        for (coil, level) in OutputLine::EL_COILS.iter().zip(pattern) {
            out.set_line(*coil, level)?;
        }

        self.active -= dir;
        self.position += dir as i64;
        self.next_due_us = Some(now_us + self.interval_us as u64);
        Ok(dir)
    }

    pub fn cancel(&mut self) -> Remainder {
        let mut rem = Remainder::new();
        if self.active != 0 {
            let _ = rem.push(self.active);
            self.active = 0;
        }
        self.queue.drain_into(&mut rem);
        rem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimOutputs;

    fn run_pulse(stepper: &mut PulseStepper, out: &mut SimOutputs) -> u64 {
        let mut now = 0;
        while let Some(due) = stepper.next_due_us() {
            now = now.max(due);
            stepper.poll(out, now).unwrap();
        }
        now
    }

    #[test]
    fn test_queue_merges_and_fills() {
        let mut q = StepQueue::default();
        assert!(q.push(5));
        assert!(q.push(7));
        assert_eq!(q.pending_steps(), 12);
        for i in 0..STEP_QUEUE_LEN {
            q.push(if i % 2 == 0 { -1 } else { 1 });
        }
        // full; tail is -1
        assert!(!q.can_accept(1));
        assert!(q.can_accept(-1));
        assert!(q.can_accept(0));
    }

    #[test]
    fn test_pulse_edges_and_timing() {
        let mut out = SimOutputs::new();
        let mut s = PulseStepper::new(500);
        s.enqueue(3);
        let end = run_pulse(&mut s, &mut out);
        assert_eq!(out.rising_edges(OutputLine::AzStep), 3);
        assert!(!out.level(OutputLine::AzStep));
        assert!(out.level(OutputLine::AzDir));
        assert_eq!(s.position(), 3);
        // last falling edge: 5 half-periods after the first rising edge
        assert_eq!(end, 5 * 500);
    }

    #[test]
    fn test_pulse_direction_change() {
        let mut out = SimOutputs::new();
        let mut s = PulseStepper::new(500);
        s.enqueue(2);
        s.enqueue(-5);
        run_pulse(&mut s, &mut out);
        assert_eq!(s.position(), -3);
        assert!(!out.level(OutputLine::AzDir));
    }

    #[test]
    fn test_phase_sequence_persists() {
        let mut out = SimOutputs::new();
        let mut s = PhaseStepper::new(1200);
        s.enqueue(2);
        let mut now = 0;
        while let Some(due) = s.next_due_us() {
            now = now.max(due);
            s.poll(&mut out, now).unwrap();
        }
        assert_eq!(s.phase(), 2);
        assert_eq!(out.coil_pattern(), 0b0010);

        s.enqueue(-3);
        while let Some(due) = s.next_due_us() {
            now = now.max(due);
            s.poll(&mut out, now).unwrap();
        }
        assert_eq!(s.phase(), 7);
        assert_eq!(out.coil_pattern(), 0b1001);
        assert_eq!(s.position(), -1);
    }

    #[test]
    fn test_cancel_returns_remainder() {
        let mut out = SimOutputs::new();
        let mut s = PulseStepper::new(500);
        s.enqueue(4);
        s.enqueue(-2);
        s.poll(&mut out, 0).unwrap();
        let rem = s.cancel();
        assert_eq!(&rem[..], &[3, -2]);
        // falling edge still pending
        assert!(s.is_busy());
        s.poll(&mut out, 500).unwrap();
        assert!(!s.is_busy());
        assert!(!out.level(OutputLine::AzStep));
    }
}
