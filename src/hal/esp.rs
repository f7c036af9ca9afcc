//! ESP32 bindings for the capability traits.
//!
//! GPIO and the microphone ADC go through the esp-idf-hal drivers. The
//! HAL has no DAC driver, so the speaker uses the IDF5 oneshot DAC API.

use esp_idf_svc::hal::adc::attenuation;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{AnyOutputPin, Gpio34, Output, OutputPin, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::sys::{self, esp};
use heapless::Vec;

use super::audio::{AnalogInput, AnalogOutput, Attenuation, InputChannel, OutputChannel, ADC_MAX};
use super::gpio::{DigitalOutput, OutputLine};
use super::timing::Clock;
use crate::config::MIC_ADC_PIN;
use crate::error::HalError;

/// GPIO26 is DAC channel 1 (second DAC).
const SPEAKER_DAC_CHANNEL: sys::dac_channel_t = sys::dac_channel_t_DAC_CHAN_1;

/// Sleeps longer than this go through FreeRTOS instead of busy-waiting.
const BUSY_WAIT_MAX_US: u32 = 10_000;

/// Every peripheral the control loop needs. The ADC unit is handed out
/// on its own so `EspAdc` can borrow it from the caller's frame.
pub struct EspPeripherals {
    pub outputs: EspOutputs,
    pub adc_unit: AdcDriver<'static, ADC1>,
    pub mic_pin: Gpio34,
    pub dac: EspDac,
}

impl EspPeripherals {
    pub fn take() -> Result<Self, HalError> {
        let p = Peripherals::take().map_err(|_| HalError::Init)?;
        let pins = p.pins;
        let outputs = EspOutputs::new([
            pins.gpio14.downgrade_output(),
            pins.gpio27.downgrade_output(),
            pins.gpio12.downgrade_output(),
            pins.gpio32.downgrade_output(),
            pins.gpio33.downgrade_output(),
            pins.gpio5.downgrade_output(),
            pins.gpio4.downgrade_output(),
            pins.gpio15.downgrade_output(),
        ])?;
        Ok(Self {
            outputs,
            adc_unit: AdcDriver::new(p.adc1).map_err(|_| HalError::Init)?,
            mic_pin: pins.gpio34,
            dac: EspDac::new()?,
        })
    }
}

/// Motor and laser GPIOs.
pub struct EspOutputs {
    lines: Vec<PinDriver<'static, AnyOutputPin, Output>, { OutputLine::COUNT }>,
}

impl EspOutputs {
    /// `pins` in `OutputLine::ALL` order; each must match `OutputLine::gpio`.
    pub fn new(pins: [AnyOutputPin; OutputLine::COUNT]) -> Result<Self, HalError> {
        let mut lines = Vec::new();
        for (pin, line) in pins.into_iter().zip(OutputLine::ALL) {
            let driver = PinDriver::output(pin).map_err(|_| HalError::Init)?;
            if driver.pin() != line.gpio() {
                return Err(HalError::Init);
            }
            lines.push(driver).map_err(|_| HalError::Init)?;
        }
        Ok(Self { lines })
    }
}

impl DigitalOutput for EspOutputs {
    fn set_line(&mut self, line: OutputLine, high: bool) -> Result<(), HalError> {
        let driver = self.lines.get_mut(line.index()).ok_or(HalError::LineWrite)?;
        let res = if high { driver.set_high() } else { driver.set_low() };
        res.map_err(|_| HalError::LineWrite)
    }
}

type MicChannel<'a> = AdcChannelDriver<'a, Gpio34, &'a AdcDriver<'static, ADC1>>;

/// ADC1 oneshot channel for the microphone.
pub struct EspAdc<'a> {
    unit: &'a AdcDriver<'static, ADC1>,
    pin: Gpio34,
    channel: Option<MicChannel<'a>>,
}

impl<'a> EspAdc<'a> {
    pub fn new(unit: &'a AdcDriver<'static, ADC1>, pin: Gpio34) -> Result<Self, HalError> {
        if MIC_ADC_PIN != 34 {
            return Err(HalError::Init);
        }
        let mut adc = Self {
            unit,
            pin,
            channel: None,
        };
        adc.set_attenuation(InputChannel::Microphone, Attenuation::default())
            .map_err(|_| HalError::Init)?;
        Ok(adc)
    }
}

impl AnalogInput for EspAdc<'_> {
    fn read(&mut self, _channel: InputChannel) -> Result<u16, HalError> {
        let channel = self.channel.as_mut().ok_or(HalError::AnalogRead)?;
        let raw = self.unit.read(channel).map_err(|_| HalError::AnalogRead)?;
        Ok(raw.min(ADC_MAX))
    }

    fn set_attenuation(&mut self, _channel: InputChannel, level: Attenuation) -> Result<(), HalError> {
        let config = AdcChannelConfig {
            attenuation: match level {
                Attenuation::Db0 => attenuation::NONE,
                Attenuation::Db2_5 => attenuation::DB_2_5,
                Attenuation::Db6 => attenuation::DB_6,
                Attenuation::Db11 => attenuation::DB_11,
            },
            ..Default::default()
        };
        self.channel = None;
        // SAFETY: the previous channel driver on this pin was dropped above,
        // so only one driver ever owns GPIO34
        let pin = unsafe { self.pin.clone_unchecked() };
        let channel = AdcChannelDriver::new(self.unit, pin, &config).map_err(|_| HalError::AnalogRead)?;
        self.channel = Some(channel);
        Ok(())
    }
}

/// DAC oneshot channel for the speaker amplifier.
pub struct EspDac {
    handle: sys::dac_oneshot_handle_t,
}

impl EspDac {
    pub fn new() -> Result<Self, HalError> {
        let mut handle: sys::dac_oneshot_handle_t = core::ptr::null_mut();
        let cfg = sys::dac_oneshot_config_t {
            chan_id: SPEAKER_DAC_CHANNEL,
        };
        // SAFETY: cfg and handle outlive the call
        unsafe { esp!(sys::dac_oneshot_new_channel(&cfg, &mut handle)) }.map_err(|_| HalError::Init)?;
        Ok(Self { handle })
    }
}

impl AnalogOutput for EspDac {
    fn write(&mut self, _channel: OutputChannel, value: u8) -> Result<(), HalError> {
        // SAFETY: handle created in `new`
        unsafe { esp!(sys::dac_oneshot_output_voltage(self.handle, value)) }.map_err(|_| HalError::AnalogWrite)
    }
}

impl Drop for EspDac {
    fn drop(&mut self) {
        // SAFETY: handle created in `new` and not used after this
        unsafe {
            sys::dac_oneshot_del_channel(self.handle);
        }
    }
}

/// esp_timer based clock.
pub struct EspClock;

impl Clock for EspClock {
    fn now_us(&self) -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main
        unsafe { sys::esp_timer_get_time() as u64 }
    }

    fn delay_us(&mut self, us: u32) {
        if us > BUSY_WAIT_MAX_US {
            FreeRtos::delay_ms(us / 1000);
        } else {
            Ets::delay_us(us);
        }
    }
}
