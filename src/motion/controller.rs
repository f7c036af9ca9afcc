//! Motion controller: absolute moves, rate-limited tracking, homing and
//! laser arbitration on top of the two steppers.
//!
//! Commands update the angle state and step history at issue time and
//! queue the steps; `poll` plays them out. Stored angles therefore always
//! describe where the mechanism will be once the queues drain.

use crate::cancel::CancelToken;
use crate::config::persistence::PositionStore;
use crate::error::{HalError, MotionError, StorageError};
use crate::hal::gpio::{DigitalOutput, OutputLine};
use crate::hal::timing::Clock;
use crate::log_globals::EVENT_LOG;
use crate::logging::LogSource;
use crate::{rt_debug, rt_info, rt_warn};

use super::angle::{unwrap_nearest, AngleState, StepHistory};
use super::homing::{HomingJob, HomingPhase, HomingReport};
use super::laser::LaserMode;
use super::limits::{Axis, MotionLimits};
use super::stepper::{PhaseStepper, PulseStepper};

/// Slack on the elevation bound check for manual steps (deg).
const EL_LIMIT_EPSILON: f32 = 1e-3;

pub struct MotionController<D: DigitalOutput> {
    out: D,
    limits: MotionLimits,
    angles: AngleState,
    az: PulseStepper,
    el: PhaseStepper,
    laser_mode: LaserMode,
    laser_level: Option<bool>,
    tracking: bool,
    last_track_us: Option<u64>,
    homing: Option<HomingJob>,
    last_homing: Option<HomingReport>,
    was_busy: bool,
    save_requested: bool,
}

impl<D: DigitalOutput> MotionController<D> {
    pub fn new(out: D, limits: MotionLimits) -> Self {
        Self {
            out,
            az: PulseStepper::new(limits.az_step_delay_us),
            el: PhaseStepper::new(limits.el_step_delay_us),
            limits,
            angles: AngleState::new(),
            laser_mode: LaserMode::default(),
            laser_level: None,
            tracking: false,
            last_track_us: None,
            homing: None,
            last_homing: None,
            was_busy: false,
            save_requested: false,
        }
    }

    /// Configure outputs, restore the last saved position and apply the
    /// laser for it. A failing store leaves the position at zero.
    pub fn init<S: PositionStore + ?Sized>(&mut self, store: &mut S) -> Result<(), HalError> {
        self.az.init(&mut self.out)?;
        self.el.init(&mut self.out)?;
        self.out.set_line(OutputLine::Laser, false)?;
        self.laser_level = Some(false);

        match store.load_position() {
            Ok(Some((az, el))) if az.is_finite() && el.is_finite() => {
                self.angles.az_deg = az;
                self.angles.el_deg = self.limits.clamp_el(el);
                self.angles.history.clear();
                self.angles
                    .history
                    .set_untracked(self.limits.deg_to_steps(Axis::Azimuth, az) as i64);
                self.angles.clamp_state(self.limits.az_state_bound_deg);
                rt_info!(
                    EVENT_LOG,
                    LogSource::Storage,
                    "restored AZ={:.2} EL={:.2}",
                    self.angles.az_deg,
                    self.angles.el_deg
                );
            }
            Ok(Some(_)) => {
                rt_warn!(EVENT_LOG, LogSource::Storage, "stored position not finite, ignored");
            }
            Ok(None) => {
                rt_info!(EVENT_LOG, LogSource::Storage, "no stored position");
            }
            Err(e) => {
                rt_warn!(EVENT_LOG, LogSource::Storage, "position load failed: {}", e);
            }
        }

        self.apply_laser()
    }

    // ========================================
    // Commands
    // ========================================

    /// Raw steps on one axis. Elevation steps that would leave the bounds
    /// are rejected without moving.
    pub fn manual_step(&mut self, axis: Axis, steps: i32) -> Result<(), MotionError> {
        self.ensure_not_homing()?;
        match axis {
            Axis::Azimuth => self.issue_az(steps),
            Axis::Elevation => {
                let target = self.angles.el_deg + steps as f32 / self.limits.el_steps_per_deg;
                if target < self.limits.el_min_deg - EL_LIMIT_EPSILON
                    || target > self.limits.el_max_deg + EL_LIMIT_EPSILON
                {
                    rt_warn!(
                        EVENT_LOG,
                        LogSource::Motion,
                        "EL step {} rejected: {:.2} out of bounds",
                        steps,
                        target
                    );
                    return Err(MotionError::ElevationLimit);
                }
                self.issue_el(steps)
            }
        }
    }

    /// Move one axis to an absolute angle. Azimuth takes the nearest turn;
    /// elevation is clamped.
    pub fn goto_absolute(&mut self, axis: Axis, target_deg: f32) -> Result<(), MotionError> {
        self.ensure_not_homing()?;
        match axis {
            Axis::Azimuth => {
                let target = unwrap_nearest(target_deg, self.angles.az_deg);
                let steps = self.limits.deg_to_steps(Axis::Azimuth, target - self.angles.az_deg);
                self.issue_az(steps)
            }
            Axis::Elevation => {
                let steps = self.el_steps_toward(self.limits.clamp_el(target_deg));
                self.issue_el(steps)
            }
        }
    }

    /// Rate-limited step toward a moving target.
    ///
    /// Each axis moves at most `max_speed × dt` (plus half a step of
    /// rounding), where `dt` is the time since the previous call bounded
    /// to the configured floor/ceiling. The first call uses the floor.
    pub fn track_to(&mut self, target_az: f32, target_el: f32, now_us: u64) -> Result<(), MotionError> {
        self.ensure_not_homing()?;

        let dt = match self.last_track_us {
            Some(prev) => (now_us.saturating_sub(prev) as f32 / 1_000_000.0)
                .clamp(self.limits.track_dt_min_s, self.limits.track_dt_max_s),
            None => self.limits.track_dt_min_s,
        };

        let max_az = self.limits.az_max_speed * dt;
        let az_target = unwrap_nearest(target_az, self.angles.az_deg);
        let d_az = (az_target - self.angles.az_deg).clamp(-max_az, max_az);
        let az_steps = self.limits.deg_to_steps(Axis::Azimuth, d_az);

        let max_el = self.limits.el_max_speed * dt;
        let el_target = self.limits.clamp_el(target_el);
        let d_el = (el_target - self.angles.el_deg).clamp(-max_el, max_el);
        let el_steps = self.el_steps_toward(self.angles.el_deg + d_el);

        if !self.az.can_accept(az_steps) || !self.el.can_accept(el_steps) {
            return Err(MotionError::Busy);
        }

        self.set_tracking_active(true);
        self.last_track_us = Some(now_us);
        self.issue_az(az_steps)?;
        self.issue_el(el_steps)
    }

    /// Start cable-safe homing. Tracking is stopped first.
    pub fn return_to_null(&mut self) -> Result<(), MotionError> {
        self.ensure_not_homing()?;
        self.set_tracking_active(false);

        let el_steps = self.el_steps_toward(self.limits.el_min_deg);
        self.angles.el_deg += el_steps as f32 / self.limits.el_steps_per_deg;
        self.angles.el_deg = self.limits.clamp_el(self.angles.el_deg);

        let overflowed = self.angles.history.overflowed();
        self.homing = Some(HomingJob::new(el_steps, overflowed));
        self.refresh_laser();
        rt_info!(
            EVENT_LOG,
            LogSource::Motion,
            "homing: {} history entries, {} untracked steps",
            self.angles.history.len(),
            self.angles.history.untracked()
        );
        if overflowed {
            rt_warn!(EVENT_LOG, LogSource::Motion, "homing: history overflowed, replay is partial");
        }
        Ok(())
    }

    /// Declare the current physical position as az = el = 0.
    pub fn zero_here(&mut self) -> Result<(), MotionError> {
        self.ensure_not_homing()?;
        if self.az.is_busy() || self.el.is_busy() {
            return Err(MotionError::Busy);
        }
        self.angles.az_deg = 0.0;
        self.angles.el_deg = self.limits.clamp_el(0.0);
        self.angles.history.clear();
        self.save_requested = true;
        self.refresh_laser();
        rt_info!(EVENT_LOG, LogSource::Motion, "zero set here");
        Ok(())
    }

    /// Change the laser mode and drive the line for it right away.
    pub fn set_laser_mode(&mut self, mode: LaserMode) -> Result<(), HalError> {
        self.laser_mode = mode;
        rt_debug!(EVENT_LOG, LogSource::Motion, "laser mode {}", mode.as_str());
        self.apply_laser()
    }

    pub fn set_tracking_active(&mut self, active: bool) {
        if active == self.tracking {
            return;
        }
        self.tracking = active;
        if active {
            rt_info!(EVENT_LOG, LogSource::Motion, "tracking start");
        } else {
            self.last_track_us = None;
            self.save_requested = true;
            rt_info!(EVENT_LOG, LogSource::Motion, "tracking stop");
        }
        self.refresh_laser();
    }

    /// Drop all queued steps and undo them in the angle state. Homing is
    /// abandoned; the steps it had not yet replayed go back into history.
    pub fn cancel(&mut self) {
        let az_rem = self.az.cancel();
        let el_rem = self.el.cancel();
        let az_spd = self.limits.az_steps_per_deg;

        if let Some(job) = self.homing.take() {
            for item in az_rem.iter().rev() {
                self.angles.history.push(-item);
                self.angles.az_deg -= *item as f32 / az_spd;
            }
            // Elevation steps not yet queued never reached the angle state
            let unqueued = job.el_steps as f32 / self.limits.el_steps_per_deg;
            self.angles.el_deg -= unqueued;
            rt_warn!(EVENT_LOG, LogSource::Motion, "homing cancelled in {:?}", job.phase);
        } else {
            for item in az_rem.iter().rev() {
                self.angles.history.retract(*item);
                self.angles.az_deg -= *item as f32 / az_spd;
            }
        }

        let el_left: i32 = el_rem.iter().sum();
        self.angles.el_deg -= el_left as f32 / self.limits.el_steps_per_deg;
        self.angles.el_deg = self.limits.clamp_el(self.angles.el_deg);
        self.angles.clamp_state(self.limits.az_state_bound_deg);

        if !az_rem.is_empty() || !el_rem.is_empty() {
            rt_info!(EVENT_LOG, LogSource::Motion, "motion cancelled");
        }
        self.refresh_laser();
    }

    // ========================================
    // Execution
    // ========================================

    /// Advance homing, emit due step edges, update the laser.
    pub fn poll(&mut self, now_us: u64) -> Result<(), HalError> {
        self.advance_homing();
        self.az.poll(&mut self.out, now_us)?;
        self.el.poll(&mut self.out, now_us)?;
        self.advance_homing();

        // While tracking, bursts finish every period; the stop edge saves
        let busy = self.is_busy();
        if self.was_busy && !busy && !self.tracking {
            self.save_requested = true;
        }
        self.was_busy = busy;

        self.apply_laser()
    }

    /// Earliest time `poll` has work to do, or `None` when idle.
    pub fn next_due_us(&self) -> Option<u64> {
        let due = match (self.az.next_due_us(), self.el.next_due_us()) {
            (Some(a), Some(e)) => Some(a.min(e)),
            (a, e) => a.or(e),
        };
        if due.is_none() && self.homing.is_some() {
            Some(0)
        } else {
            due
        }
    }

    /// Poll and sleep until every queued step (and homing) has finished.
    /// Tracking does not keep this waiting.
    pub fn run_until_idle<C: Clock + ?Sized>(
        &mut self,
        clock: &mut C,
        cancel: Option<&CancelToken>,
    ) -> Result<(), HalError> {
        loop {
            if cancel.map_or(false, |c| c.take()) {
                self.cancel();
            }
            self.poll(clock.now_us())?;
            if !self.is_busy() {
                return Ok(());
            }
            if let Some(due) = self.next_due_us() {
                let now = clock.now_us();
                if due > now {
                    clock.delay_us((due - now).min(u32::MAX as u64) as u32);
                }
            }
        }
    }

    /// Hand out a pending position-save request (burst finished, tracking
    /// stopped, homing done, zero set).
    pub fn take_save_request(&mut self) -> bool {
        core::mem::take(&mut self.save_requested)
    }

    pub fn save_position<S: PositionStore + ?Sized>(&self, store: &mut S) -> Result<(), StorageError> {
        store
            .save_position(self.angles.az_deg, self.angles.el_deg)
            .map_err(|e| {
                rt_warn!(EVENT_LOG, LogSource::Storage, "position save failed: {}", e);
                e
            })
    }

    // ========================================
    // State
    // ========================================

    /// Activity signal for the audio path.
    pub fn is_moving(&self) -> bool {
        self.tracking || self.is_busy()
    }

    /// Steps queued or running, or homing in progress.
    pub fn is_busy(&self) -> bool {
        self.homing.is_some() || self.az.is_busy() || self.el.is_busy()
    }

    pub fn az_deg(&self) -> f32 {
        self.angles.az_deg
    }

    pub fn el_deg(&self) -> f32 {
        self.angles.el_deg
    }

    pub fn history(&self) -> &StepHistory {
        &self.angles.history
    }

    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    pub fn laser_mode(&self) -> LaserMode {
        self.laser_mode
    }

    /// Level last written to the laser line.
    pub fn laser_on(&self) -> bool {
        self.laser_level.unwrap_or(false)
    }

    pub fn tracking_active(&self) -> bool {
        self.tracking
    }

    pub fn homing_active(&self) -> bool {
        self.homing.is_some()
    }

    pub fn homing_phase(&self) -> Option<HomingPhase> {
        self.homing.as_ref().map(|j| j.phase)
    }

    pub fn last_homing(&self) -> Option<&HomingReport> {
        self.last_homing.as_ref()
    }

    pub fn pending_steps(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Azimuth => self.az.pending_steps(),
            Axis::Elevation => self.el.pending_steps(),
        }
    }

    /// Net executed steps per axis since start.
    pub fn executed_steps(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Azimuth => self.az.position(),
            Axis::Elevation => self.el.position(),
        }
    }

    pub fn outputs(&self) -> &D {
        &self.out
    }

    pub fn outputs_mut(&mut self) -> &mut D {
        &mut self.out
    }

    // ========================================
    // Internals
    // ========================================

    fn ensure_not_homing(&self) -> Result<(), MotionError> {
        if self.homing.is_some() {
            Err(MotionError::Busy)
        } else {
            Ok(())
        }
    }

    fn issue_az(&mut self, steps: i32) -> Result<(), MotionError> {
        if steps == 0 {
            return Ok(());
        }
        if !self.az.enqueue(steps) {
            return Err(MotionError::Busy);
        }
        self.angles.record_step(steps, self.limits.az_steps_per_deg);
        self.angles.clamp_state(self.limits.az_state_bound_deg);
        Ok(())
    }

    fn issue_el(&mut self, steps: i32) -> Result<(), MotionError> {
        if steps == 0 {
            return Ok(());
        }
        if !self.el.enqueue(steps) {
            return Err(MotionError::Busy);
        }
        self.angles.el_deg += steps as f32 / self.limits.el_steps_per_deg;
        self.angles.el_deg = self.limits.clamp_el(self.angles.el_deg);
        self.refresh_laser();
        Ok(())
    }

    /// Whole steps toward `target`, never overshooting the bounds.
    fn el_steps_toward(&self, target: f32) -> i32 {
        let spd = self.limits.el_steps_per_deg;
        let el = self.angles.el_deg;
        let mut steps = self.limits.deg_to_steps(Axis::Elevation, target - el);
        if el + steps as f32 / spd > self.limits.el_max_deg && steps > 0 {
            steps -= 1;
        }
        if el + steps as f32 / spd < self.limits.el_min_deg && steps < 0 {
            steps += 1;
        }
        steps
    }

    fn advance_homing(&mut self) {
        let Some(job) = self.homing.as_mut() else {
            return;
        };
        let az_spd = self.limits.az_steps_per_deg;

        loop {
            match job.phase {
                HomingPhase::LowerElevation => {
                    if job.el_steps != 0 && self.el.enqueue(job.el_steps) {
                        job.el_steps = 0;
                    }
                    if job.el_steps != 0 || self.el.is_busy() {
                        return;
                    }
                    job.phase = HomingPhase::Backtrack;
                }
                HomingPhase::Backtrack => {
                    while let Some(entry) = self.angles.history.newest() {
                        if !self.az.enqueue(-entry) {
                            return;
                        }
                        self.angles.history.pop_newest();
                        self.angles.az_deg -= entry as f32 / az_spd;
                        job.report.entries_replayed += 1;
                        job.report.steps_replayed += entry.unsigned_abs() as u64;
                    }
                    job.phase = HomingPhase::Unwind;
                }
                HomingPhase::Unwind => {
                    let untracked = self.angles.history.untracked();
                    if untracked != 0 {
                        let chunk = untracked.clamp(-(i32::MAX as i64), i32::MAX as i64) as i32;
                        if !self.az.enqueue(-chunk) {
                            return;
                        }
                        self.angles.history.set_untracked(untracked - chunk as i64);
                        self.angles.az_deg -= chunk as f32 / az_spd;
                        job.report.untracked_steps += chunk as i64;
                        continue;
                    }
                    job.phase = HomingPhase::Settle;
                }
                HomingPhase::Settle => {
                    if self.az.is_busy() || self.el.is_busy() {
                        return;
                    }
                    let report = job.report;
                    self.finish_homing(report);
                    return;
                }
            }
        }
    }

    fn finish_homing(&mut self, report: HomingReport) {
        self.homing = None;
        self.angles.az_deg = 0.0;
        self.angles.el_deg = self.limits.el_min_deg;
        self.angles.history.clear();
        self.last_homing = Some(report);
        self.save_requested = true;

        if report.exact() {
            rt_info!(
                EVENT_LOG,
                LogSource::Motion,
                "homing done: {} entries, {} steps",
                report.entries_replayed,
                report.steps_replayed
            );
        } else {
            rt_warn!(
                EVENT_LOG,
                LogSource::Motion,
                "homing done from partial history: {} steps unwound as net move",
                report.untracked_steps
            );
        }
    }

    /// Apply the laser from a command path, where a line failure is
    /// logged and retried by the next `poll`.
    fn refresh_laser(&mut self) {
        if let Err(e) = self.apply_laser() {
            self.laser_level = None;
            rt_warn!(EVENT_LOG, LogSource::Motion, "laser write failed: {}", e);
        }
    }

    fn apply_laser(&mut self) -> Result<(), HalError> {
        let on = self.laser_mode.output(
            self.tracking,
            self.limits.el_inside(self.angles.el_deg),
            self.homing.is_some(),
        );
        if self.laser_level != Some(on) {
            self.out.set_line(OutputLine::Laser, on)?;
            self.laser_level = Some(on);
            rt_debug!(EVENT_LOG, LogSource::Motion, "laser {}", if on { "on" } else { "off" });
        }
        Ok(())
    }
}
