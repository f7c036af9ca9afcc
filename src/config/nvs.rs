//! NVS persistence for position and audio settings with schema versioning.
//!
//! # Version History
//!
//! - **v1** (current): position as two f32 bit patterns, audio settings as
//!   one fixed-layout little-endian blob of [`AUDIO_RECORD_LEN`] bytes
//!
//! # Future Migration
//!
//! When the blob layout changes:
//! 1. Increment CURRENT_SCHEMA_VERSION
//! 2. Teach [`decode_audio_settings`] the old length
//! 3. Map the old version in [`check_schema`]
//!
//! Until then an older stored version drops the audio record and keeps
//! the position.

use core::cmp::Ordering;

use crate::audio::{AudioSettings, BeepParams};
use crate::error::StorageError;
use crate::hal::audio::Attenuation;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

#[cfg(target_os = "espidf")]
use super::persistence::{AudioSettingsStore, PositionStore};
#[cfg(target_os = "espidf")]
use crate::log_globals::EVENT_LOG;
#[cfg(target_os = "espidf")]
use crate::logging::LogSource;

/// Current NVS schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// NVS namespace for the pointer
pub const NVS_NAMESPACE: &str = "pointer";

/// NVS key for schema version
pub const VERSION_KEY: &str = "schema_ver";
pub const POS_AZ_KEY: &str = "pos_az";
pub const POS_EL_KEY: &str = "pos_el";
pub const AUDIO_KEY: &str = "audio";

/// Encoded audio settings size
pub const AUDIO_RECORD_LEN: usize = 40;

/// Migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationResult {
    /// Fresh install, no migration needed (using defaults)
    FreshInstall,
    /// Schema up-to-date, loaded successfully
    UpToDate,
    /// Migrated from older version
    Migrated { from_version: u32, to_version: u32 },
}

/// Classify the stored schema version (`None` = never written).
pub fn check_schema(stored: Option<u32>) -> Result<MigrationResult, StorageError> {
    let stored_version = stored.unwrap_or(0);
    match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
        Ordering::Equal => Ok(MigrationResult::UpToDate),
        Ordering::Less if stored_version == 0 => Ok(MigrationResult::FreshInstall),
        Ordering::Less => Ok(MigrationResult::Migrated {
            from_version: stored_version,
            to_version: CURRENT_SCHEMA_VERSION,
        }),
        // Newer version - cannot downgrade
        Ordering::Greater => Err(StorageError::TooNew { stored_version }),
    }
}

const FLAG_NOISE: u8 = 1 << 0;
const FLAG_NOTCH: u8 = 1 << 1;
const FLAG_MUTE_IDLE: u8 = 1 << 2;
const FLAG_BEEP_START: u8 = 1 << 3;
const FLAG_BEEP_END: u8 = 1 << 4;
const FLAG_BOOT_TONE: u8 = 1 << 5;

/// Serialize settings into the v1 blob.
pub fn encode_audio_settings(s: &AudioSettings) -> [u8; AUDIO_RECORD_LEN] {
    let mut out = [0u8; AUDIO_RECORD_LEN];
    let flags = [
        (s.noise_enabled, FLAG_NOISE),
        (s.notch_enabled, FLAG_NOTCH),
        (s.mute_when_idle, FLAG_MUTE_IDLE),
        (s.beep_on_track_start, FLAG_BEEP_START),
        (s.beep_on_track_end, FLAG_BEEP_END),
        (s.boot_tone, FLAG_BOOT_TONE),
    ]
    .iter()
    .fold(0u8, |acc, (on, bit)| if *on { acc | bit } else { acc });

    out[0] = s.volume;
    out[1] = flags;
    out[2] = s.attenuation.as_db() as u8;
    out[3] = s.beep.volume;
    out[4..8].copy_from_slice(&s.passthrough_gain.to_le_bytes());
    out[8..10].copy_from_slice(&s.limiter.to_le_bytes());
    out[10..12].copy_from_slice(&s.gate_open.to_le_bytes());
    out[12..14].copy_from_slice(&s.gate_close.to_le_bytes());
    out[14..16].copy_from_slice(&s.noise_floor.to_le_bytes());
    out[16..20].copy_from_slice(&s.noise_mix.to_le_bytes());
    out[20..24].copy_from_slice(&s.notch_freq_hz.to_le_bytes());
    out[24..28].copy_from_slice(&s.notch_q.to_le_bytes());
    out[28..32].copy_from_slice(&s.beep.freq_hz.to_le_bytes());
    out[32..34].copy_from_slice(&s.beep.duration_ms.to_le_bytes());
    out[34..36].copy_from_slice(&s.beep.echo_delay_ms.to_le_bytes());
    out[36..40].copy_from_slice(&s.beep.echo_decay.to_le_bytes());
    out
}

fn u16_at(b: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([b[i], b[i + 1]])
}

fn f32_at(b: &[u8], i: usize) -> f32 {
    f32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]])
}

/// Parse a v1 blob. The result is not clamped; the audio engine does that.
pub fn decode_audio_settings(b: &[u8]) -> Result<AudioSettings, StorageError> {
    if b.len() != AUDIO_RECORD_LEN {
        return Err(StorageError::Corrupt);
    }
    let flags = b[1];
    Ok(AudioSettings {
        volume: b[0],
        passthrough_gain: f32_at(b, 4),
        limiter: u16_at(b, 8),
        gate_open: u16_at(b, 10),
        gate_close: u16_at(b, 12),
        noise_enabled: flags & FLAG_NOISE != 0,
        noise_mix: f32_at(b, 16),
        noise_floor: u16_at(b, 14),
        notch_enabled: flags & FLAG_NOTCH != 0,
        notch_freq_hz: f32_at(b, 20),
        notch_q: f32_at(b, 24),
        mute_when_idle: flags & FLAG_MUTE_IDLE != 0,
        attenuation: Attenuation::from_db(b[2] as i32),
        beep: BeepParams {
            freq_hz: f32_at(b, 28),
            duration_ms: u16_at(b, 32),
            echo_delay_ms: u16_at(b, 34),
            echo_decay: f32_at(b, 36),
            volume: b[3],
        },
        beep_on_track_start: flags & FLAG_BEEP_START != 0,
        beep_on_track_end: flags & FLAG_BEEP_END != 0,
        boot_tone: flags & FLAG_BOOT_TONE != 0,
    })
}

#[cfg(target_os = "espidf")]
fn io<E>(_: E) -> StorageError {
    StorageError::Io
}

/// NVS-backed store.
#[cfg(target_os = "espidf")]
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
    migration: MigrationResult,
    /// Bits last written, to skip rewriting an unchanged position
    saved_position: Option<(u32, u32)>,
}

#[cfg(target_os = "espidf")]
impl NvsStore {
    /// Open the namespace and reconcile the schema version.
    pub fn open(partition: EspDefaultNvsPartition) -> Result<Self, StorageError> {
        let mut nvs =
            EspNvs::new(partition, NVS_NAMESPACE, true).map_err(|_| StorageError::Unavailable)?;

        let migration = check_schema(nvs.get_u32(VERSION_KEY).map_err(io)?)?;
        match migration {
            MigrationResult::UpToDate => {}
            MigrationResult::FreshInstall => {
                nvs.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION).map_err(io)?;
            }
            MigrationResult::Migrated { from_version, to_version } => {
                nvs.remove(AUDIO_KEY).map_err(io)?;
                nvs.set_u32(VERSION_KEY, to_version).map_err(io)?;
                crate::rt_warn!(
                    EVENT_LOG,
                    LogSource::Storage,
                    "nvs v{} -> v{}: audio settings reset",
                    from_version,
                    to_version
                );
            }
        }

        Ok(Self {
            nvs,
            migration,
            saved_position: None,
        })
    }

    pub fn migration(&self) -> MigrationResult {
        self.migration
    }
}

#[cfg(target_os = "espidf")]
impl PositionStore for NvsStore {
    fn load_position(&mut self) -> Result<Option<(f32, f32)>, StorageError> {
        let az = self.nvs.get_u32(POS_AZ_KEY).map_err(io)?;
        let el = self.nvs.get_u32(POS_EL_KEY).map_err(io)?;
        Ok(match (az, el) {
            (Some(az), Some(el)) => Some((f32::from_bits(az), f32::from_bits(el))),
            _ => None,
        })
    }

    fn save_position(&mut self, az: f32, el: f32) -> Result<(), StorageError> {
        let bits = (az.to_bits(), el.to_bits());
        if self.saved_position == Some(bits) {
            return Ok(());
        }
        self.nvs.set_u32(POS_AZ_KEY, bits.0).map_err(io)?;
        self.nvs.set_u32(POS_EL_KEY, bits.1).map_err(io)?;
        self.saved_position = Some(bits);
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl AudioSettingsStore for NvsStore {
    fn load_audio_settings(&mut self) -> Result<Option<AudioSettings>, StorageError> {
        let mut buf = [0u8; AUDIO_RECORD_LEN];
        match self.nvs.get_blob(AUDIO_KEY, &mut buf).map_err(io)? {
            Some(blob) => decode_audio_settings(blob).map(Some),
            None => Ok(None),
        }
    }

    fn save_audio_settings(&mut self, settings: &AudioSettings) -> Result<(), StorageError> {
        self.nvs
            .set_blob(AUDIO_KEY, &encode_audio_settings(settings))
            .map_err(io)
    }

    fn delete_audio_settings(&mut self) -> Result<(), StorageError> {
        match self.nvs.remove(AUDIO_KEY).map_err(io)? {
            true => Ok(()),
            false => Err(StorageError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_classification() {
        assert_eq!(check_schema(None), Ok(MigrationResult::FreshInstall));
        assert_eq!(check_schema(Some(0)), Ok(MigrationResult::FreshInstall));
        assert_eq!(check_schema(Some(CURRENT_SCHEMA_VERSION)), Ok(MigrationResult::UpToDate));
        assert_eq!(
            check_schema(Some(CURRENT_SCHEMA_VERSION + 1)),
            Err(StorageError::TooNew { stored_version: CURRENT_SCHEMA_VERSION + 1 })
        );
    }

    #[test]
    fn test_blob_preserves_every_field() {
        let s = AudioSettings {
            volume: 77,
            passthrough_gain: 2.5,
            limiter: 3000,
            gate_open: 250,
            gate_close: 180,
            noise_enabled: false,
            noise_mix: 0.3,
            noise_floor: 90,
            notch_enabled: true,
            notch_freq_hz: 1800.0,
            notch_q: 7.5,
            mute_when_idle: false,
            attenuation: Attenuation::Db6,
            beep: BeepParams {
                freq_hz: 900.0,
                duration_ms: 250,
                echo_delay_ms: 40,
                echo_decay: 0.25,
                volume: 64,
            },
            beep_on_track_start: true,
            beep_on_track_end: true,
            boot_tone: false,
        };
        assert_eq!(decode_audio_settings(&encode_audio_settings(&s)), Ok(s));
    }

    #[test]
    fn test_short_blob_is_corrupt() {
        assert_eq!(decode_audio_settings(&[0u8; 12]), Err(StorageError::Corrupt));
    }

    #[test]
    fn test_nvs_namespace_constant() {
        assert!(NVS_NAMESPACE.len() <= 15);
        assert!(AUDIO_KEY.len() <= 15);
    }
}
