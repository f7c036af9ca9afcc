//! RustAntennaPointer - Main entry point
//!
//! On the ESP32 this binds the real peripherals and runs the control loop
//! forever. On the host it runs the same loop against the simulated HAL
//! through a synthetic satellite pass, homes, and prints status and logs.

use rust_antenna_pointer::log_drain::drain_to;
use rust_antenna_pointer::EVENT_LOG;

fn drain_logs() {
    let mut text = String::new();
    drain_to(&EVENT_LOG, &mut text);
    print!("{}", text);
}

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    if let Err(e) = firmware::run() {
        drain_logs();
        println!("FATAL: {}", e);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    if let Err(e) = host::run() {
        drain_logs();
        println!("FATAL: {}", e);
    }
}

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use rust_antenna_pointer::config::nvs::NvsStore;
    use rust_antenna_pointer::config::persistence::{AudioSettingsStore, PositionStore};
    use rust_antenna_pointer::config::{MemoryStore, TRACK_PERIOD_US};
    use rust_antenna_pointer::hal::esp::{EspAdc, EspClock, EspPeripherals};
    use rust_antenna_pointer::hal::Clock;
    use rust_antenna_pointer::{
        AudioConfig, CancelToken, ControlLoop, Error, LoopConfig, MotionLimits, NoTarget,
    };

    use super::drain_logs;

    /// Raised by the console task to abort a motion burst or beep.
    pub static CANCEL: CancelToken = CancelToken::new();

    pub fn run() -> Result<(), Error> {
        let nvs = EspDefaultNvsPartition::take()
            .ok()
            .and_then(|p| NvsStore::open(p).ok());
        match nvs {
            Some(mut store) => run_with(&mut store),
            None => {
                println!("NVS unavailable, settings will not persist");
                run_with(&mut MemoryStore::new())
            }
        }
    }

    fn run_with<S: PositionStore + AudioSettingsStore>(store: &mut S) -> Result<(), Error> {
        let mut clock = EspClock;
        let EspPeripherals {
            outputs,
            adc_unit,
            mic_pin,
            dac,
        } = EspPeripherals::take()?;
        let mut lp = ControlLoop::new(
            outputs,
            EspAdc::new(&adc_unit, mic_pin)?,
            dac,
            MotionLimits::default(),
            AudioConfig::default(),
            LoopConfig::default(),
            &CANCEL,
        );
        lp.init(store)?;
        println!("{}", rust_antenna_pointer::config::VERSION_STRING);

        // Targets arrive from the tracking collaborator; none wired here.
        let mut supplier = NoTarget;
        let mut next_yield = clock.now_us() + TRACK_PERIOD_US;

        loop {
            let now = clock.now_us();
            lp.tick(now, &mut supplier, store)?;

            if now >= next_yield {
                // Let the idle task feed the watchdog and flush the log ring
                drain_logs();
                FreeRtos::delay_ms(1);
                next_yield = clock.now_us() + TRACK_PERIOD_US;
                continue;
            }

            let due = lp.next_due_us();
            let now = clock.now_us();
            if due > now {
                clock.delay_us((due - now).min(TRACK_PERIOD_US) as u32);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use core::f32::consts::PI;

    use rust_antenna_pointer::config::MemoryStore;
    use rust_antenna_pointer::hal::sim::{SimAdc, SimClock, SimDac, SimOutputs};
    use rust_antenna_pointer::hal::Clock;
    use rust_antenna_pointer::logging::LogLevel;
    use rust_antenna_pointer::{
        AudioConfig, CancelToken, ControlLoop, Error, LoopConfig, MotionLimits, NoTarget, EVENT_LOG,
    };

    use super::drain_logs;

    /// Pass length in seconds.
    const PASS_S: f32 = 60.0;

    /// Synthetic pass: AZ 100° → 280°, EL peaking at 70° mid-pass, visible
    /// for `PASS_S` seconds starting 1 s in.
    fn pass_target(now_us: u64) -> Option<(f32, f32)> {
        let t = now_us as f32 / 1_000_000.0 - 1.0;
        if !(0.0..=PASS_S).contains(&t) {
            return None;
        }
        let frac = t / PASS_S;
        let az = (100.0 + 180.0 * frac) % 360.0;
        let el = 70.0 * libm::sinf(PI * frac);
        Some((az, el))
    }

    pub fn run() -> Result<(), Error> {
        EVENT_LOG.set_level(LogLevel::Info);

        let cancel = CancelToken::new();
        let mut store = MemoryStore::with_position(0.0, 0.0);
        let mut clock = SimClock::new();
        let mut lp = ControlLoop::new(
            SimOutputs::new(),
            SimAdc::new(),
            SimDac::new(),
            MotionLimits::default(),
            AudioConfig::default(),
            LoopConfig::default(),
            &cancel,
        );
        lp.init(&mut store)?;
        lp.audio_mut().set_beep_on_track_start(true);
        lp.audio_mut().set_beep_on_track_end(true);
        lp.audio_mut().set_beep_volume(120);

        let mut supplier = pass_target;
        let end_us = ((PASS_S + 3.0) * 1_000_000.0) as u64;
        let mut next_report = 0u64;
        while clock.now_us() < end_us {
            let now = clock.now_us();
            lp.tick(now, &mut supplier, &mut store)?;
            if now >= next_report {
                drain_logs();
                next_report = now + 5_000_000;
                println!(
                    "t={:5.1}s AZ={:7.2} EL={:6.2} laser={}",
                    now as f32 / 1e6,
                    lp.motion().az_deg(),
                    lp.motion().el_deg(),
                    lp.motion().laser_on()
                );
            }
            clock.set(lp.next_due_us().max(now + 1));
        }

        println!("--- homing ---");
        lp.motion_mut().return_to_null()?;
        while lp.motion().is_busy() {
            let now = clock.now_us();
            lp.tick(now, &mut NoTarget, &mut store)?;
            clock.set(lp.next_due_us().max(now + 1));
        }

        drain_logs();
        let mut status = String::new();
        let _ = lp.write_status(&mut status);
        print!("{}", status);
        println!(
            "DAC writes={} saved position={:?} saves={}",
            lp.dac().writes(),
            store.position(),
            store.position_saves()
        );
        Ok(())
    }
}
