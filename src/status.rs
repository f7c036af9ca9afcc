//! Human-readable status dump for the console.
//!
//! Not a machine contract; it lists every audio setting, the current
//! angles, laser state and the bookkeeping counters.

use core::fmt::{self, Write};

use crate::audio::AudioEngine;
use crate::config::{STEP_HISTORY_LEN, VERSION_STRING};
use crate::hal::gpio::DigitalOutput;
use crate::log_globals::EVENT_LOG;
use crate::motion::{Axis, MotionController};

fn on_off(b: bool) -> &'static str {
    if b {
        "ON"
    } else {
        "OFF"
    }
}

pub fn write_motion_status<D: DigitalOutput>(out: &mut dyn Write, motion: &MotionController<D>) -> fmt::Result {
    writeln!(
        out,
        "Motion: AZ={:.2} EL={:.2} tracking={} moving={} homing={} laser={}({})",
        motion.az_deg(),
        motion.el_deg(),
        on_off(motion.tracking_active()),
        on_off(motion.is_moving()),
        on_off(motion.homing_active()),
        motion.laser_mode().as_str(),
        if motion.laser_on() { "lit" } else { "dark" },
    )?;

    let history = motion.history();
    writeln!(
        out,
        "Steps: AZ pending={} EL pending={} history={}/{} overflow={} untracked={}",
        motion.pending_steps(Axis::Azimuth),
        motion.pending_steps(Axis::Elevation),
        history.len(),
        STEP_HISTORY_LEN,
        on_off(history.overflowed()),
        history.untracked(),
    )?;

    if let Some(report) = motion.last_homing() {
        writeln!(
            out,
            "Homing: {} entries={} steps={} untracked={}",
            if report.exact() { "exact" } else { "PARTIAL" },
            report.entries_replayed,
            report.steps_replayed,
            report.untracked_steps,
        )?;
    }
    Ok(())
}

pub fn write_audio_status(out: &mut dyn Write, audio: &AudioEngine) -> fmt::Result {
    let s = audio.settings();
    writeln!(
        out,
        "Audio: vol={} ptGain={:.2} limit={} gate={}/{}({}) noise={} mix={:.2} floor={} notch={} f={:.1}Hz Q={:.1} idleMute={} attn={}dB",
        s.volume,
        s.passthrough_gain,
        s.limiter,
        s.gate_open,
        s.gate_close,
        if audio.gate_open() { "open" } else { "closed" },
        on_off(s.noise_enabled),
        s.noise_mix,
        s.noise_floor,
        on_off(s.notch_enabled),
        s.notch_freq_hz,
        s.notch_q,
        on_off(s.mute_when_idle),
        s.attenuation.as_db(),
    )?;
    writeln!(
        out,
        "Beep: f={:.1}Hz dur={}ms delay={}ms decay={:.2} vol={} start={} end={} boot={}",
        s.beep.freq_hz,
        s.beep.duration_ms,
        s.beep.echo_delay_ms,
        s.beep.echo_decay,
        s.beep.volume,
        on_off(s.beep_on_track_start),
        on_off(s.beep_on_track_end),
        on_off(s.boot_tone),
    )
}

/// Full dump: version, motion, audio, log health.
pub fn write_status<D: DigitalOutput>(
    out: &mut dyn Write,
    motion: &MotionController<D>,
    audio: &AudioEngine,
) -> fmt::Result {
    writeln!(out, "{}", VERSION_STRING)?;
    write_motion_status(out, motion)?;
    write_audio_status(out, audio)?;
    writeln!(out, "Log: dropped={}", EVENT_LOG.dropped())
}
