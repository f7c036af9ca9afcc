//! Control loop: the composition root.
//!
//! One cooperative loop owns motion, audio and the analog I/O. Each
//! `tick` does whatever is due at `now_us`:
//!
//! 1. publish log time, honour a pending cancel
//! 2. every tracking period: ask the target supplier, track or stop
//! 3. emit due step edges, save position when a move settles
//! 4. every audio period: one beep sample, or one pass-through sample
//!
//! Nothing blocks; `next_due_us` tells the caller how long it may sleep.

use crate::audio::{AudioConfig, AudioEngine, AudioSettings, BeepPlayer};
use crate::cancel::CancelToken;
use crate::config::persistence::{AudioSettingsStore, PositionStore};
use crate::config::TRACK_PERIOD_US;
use crate::error::HalError;
use crate::hal::audio::{AnalogInput, AnalogOutput};
use crate::hal::gpio::DigitalOutput;
use crate::log_globals::EVENT_LOG;
use crate::logging::LogSource;
use crate::motion::{MotionController, MotionLimits};
use crate::{rt_debug, rt_info};

/// Source of pointing targets (orbit predictor, test run).
///
/// Gets the loop's monotonic time in µs; `None` means nothing to point at.
pub trait TargetSupplier {
    fn supply_target(&mut self, now_us: u64) -> Option<(f32, f32)>;
}

impl<F: FnMut(u64) -> Option<(f32, f32)>> TargetSupplier for F {
    fn supply_target(&mut self, now_us: u64) -> Option<(f32, f32)> {
        self(now_us)
    }
}

/// No target, ever.
pub struct NoTarget;

impl TargetSupplier for NoTarget {
    fn supply_target(&mut self, _now_us: u64) -> Option<(f32, f32)> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// How often the target supplier is asked
    pub track_period_us: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            track_period_us: TRACK_PERIOD_US,
        }
    }
}

pub struct ControlLoop<'a, D, I, O>
where
    D: DigitalOutput,
    I: AnalogInput,
    O: AnalogOutput,
{
    motion: MotionController<D>,
    audio: AudioEngine,
    adc: I,
    dac: O,
    config: LoopConfig,
    cancel: &'a CancelToken,
    beep: Option<BeepPlayer>,
    next_track_us: u64,
    audio_epoch_us: Option<u64>,
    audio_ticks: u64,
    was_tracking: bool,
}

impl<'a, D, I, O> ControlLoop<'a, D, I, O>
where
    D: DigitalOutput,
    I: AnalogInput,
    O: AnalogOutput,
{
    pub fn new(
        outputs: D,
        adc: I,
        dac: O,
        limits: MotionLimits,
        audio_config: AudioConfig,
        config: LoopConfig,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            motion: MotionController::new(outputs, limits),
            audio: AudioEngine::new(audio_config, AudioSettings::default()),
            adc,
            dac,
            config,
            cancel,
            beep: None,
            next_track_us: 0,
            audio_epoch_us: None,
            audio_ticks: 0,
            was_tracking: false,
        }
    }

    /// Bring up outputs, restore position and audio settings, start the
    /// boot tone. Storage failures are logged and defaults stay in force;
    /// hardware failures are returned.
    pub fn init<S>(&mut self, store: &mut S) -> Result<(), HalError>
    where
        S: PositionStore + AudioSettingsStore + ?Sized,
    {
        self.motion.init(store)?;
        let _ = self.audio.load_settings(store);
        self.audio.init(&mut self.adc, &mut self.dac)?;

        if self.audio.settings().boot_tone {
            self.beep = Some(BeepPlayer::boot_tone(self.audio.config().sample_rate));
        }
        rt_info!(EVENT_LOG, LogSource::Loop, "init done");
        Ok(())
    }

    pub fn tick<T, S>(&mut self, now_us: u64, supplier: &mut T, store: &mut S) -> Result<(), HalError>
    where
        T: TargetSupplier + ?Sized,
        S: PositionStore + ?Sized,
    {
        EVENT_LOG.set_time(now_us);

        if self.cancel.take() {
            self.motion.cancel();
            if let Some(mut beep) = self.beep.take() {
                beep.stop(&mut self.dac)?;
            }
            rt_info!(EVENT_LOG, LogSource::Loop, "cancel");
        }

        if now_us >= self.next_track_us {
            self.next_track_us = now_us + self.config.track_period_us;
            self.poll_target(now_us, supplier);
        }

        self.motion.poll(now_us)?;

        let tracking = self.motion.tracking_active();
        if tracking != self.was_tracking {
            self.was_tracking = tracking;
            let s = self.audio.settings();
            if (tracking && s.beep_on_track_start) || (!tracking && s.beep_on_track_end) {
                self.start_beep();
            }
        }

        if self.motion.take_save_request() {
            let _ = self.motion.save_position(store);
        }

        if now_us >= self.next_audio_us(now_us) {
            self.audio_ticks += 1;
            self.audio_tick(now_us)?;
        }
        Ok(())
    }

    fn poll_target<T: TargetSupplier + ?Sized>(&mut self, now_us: u64, supplier: &mut T) {
        if self.motion.homing_active() {
            return;
        }
        match supplier.supply_target(now_us) {
            Some((az, el)) => {
                if let Err(e) = self.motion.track_to(az, el, now_us) {
                    rt_debug!(EVENT_LOG, LogSource::Loop, "track_to skipped: {}", e);
                }
            }
            None => self.motion.set_tracking_active(false),
        }
    }

    fn next_audio_us(&mut self, now_us: u64) -> u64 {
        let rate = self.audio.config().sample_rate.max(1) as u64;
        let epoch = *self.audio_epoch_us.get_or_insert(now_us);
        let due = epoch + self.audio_ticks * 1_000_000 / rate;
        // Fell more than a period behind: resync instead of bursting
        if now_us > due + 1_000_000 / rate {
            self.audio_epoch_us = Some(now_us);
            self.audio_ticks = 0;
            return now_us;
        }
        due
    }

    fn audio_tick(&mut self, now_us: u64) -> Result<(), HalError> {
        if let Some(beep) = self.beep.as_mut() {
            if !beep.poll(&mut self.dac, now_us)? {
                self.beep = None;
            }
            return Ok(());
        }
        let active = self.motion.is_moving();
        self.audio.tick(&mut self.adc, &mut self.dac, active)?;
        Ok(())
    }

    /// Queue the configured beep; replaces one already playing.
    pub fn start_beep(&mut self) {
        self.beep = Some(self.audio.beep());
    }

    pub fn beep_active(&self) -> bool {
        self.beep.is_some()
    }

    /// Earliest time the next `tick` has work.
    pub fn next_due_us(&self) -> u64 {
        let rate = self.audio.config().sample_rate.max(1) as u64;
        let audio = match self.audio_epoch_us {
            Some(epoch) => epoch + self.audio_ticks * 1_000_000 / rate,
            None => 0,
        };
        let mut due = audio.min(self.next_track_us);
        if let Some(m) = self.motion.next_due_us() {
            due = due.min(m);
        }
        due
    }

    pub fn motion(&self) -> &MotionController<D> {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionController<D> {
        &mut self.motion
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine {
        &mut self.audio
    }

    pub fn adc_mut(&mut self) -> &mut I {
        &mut self.adc
    }

    pub fn dac(&self) -> &O {
        &self.dac
    }

    pub fn write_status(&self, out: &mut dyn core::fmt::Write) -> core::fmt::Result {
        crate::status::write_status(out, &self.motion, &self.audio)
    }
}
