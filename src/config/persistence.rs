//! Persistence hooks for position and audio settings.
//!
//! The core only talks to these traits. [`MemoryStore`] keeps records in
//! RAM (host runs, tests, boards without a flash partition); the NVS
//! store in [`super::nvs`] backs them on the ESP32.

use crate::audio::AudioSettings;
use crate::error::StorageError;

/// Last known pointing position `(az, el)` in degrees.
pub trait PositionStore {
    fn load_position(&mut self) -> Result<Option<(f32, f32)>, StorageError>;
    fn save_position(&mut self, az: f32, el: f32) -> Result<(), StorageError>;
}

/// The audio settings record.
pub trait AudioSettingsStore {
    fn load_audio_settings(&mut self) -> Result<Option<AudioSettings>, StorageError>;
    fn save_audio_settings(&mut self, settings: &AudioSettings) -> Result<(), StorageError>;
    /// Remove the stored record. Deleting a missing record is `NotFound`.
    fn delete_audio_settings(&mut self) -> Result<(), StorageError>;
}

/// RAM-backed store with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    position: Option<(f32, f32)>,
    audio: Option<AudioSettings>,
    fail_with: Option<StorageError>,
    position_saves: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(az: f32, el: f32) -> Self {
        Self {
            position: Some((az, el)),
            ..Self::default()
        }
    }

    /// Make every operation fail with `error` (or succeed again with `None`).
    pub fn fail_with(&mut self, error: Option<StorageError>) {
        self.fail_with = error;
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        self.position
    }

    pub fn audio(&self) -> Option<&AudioSettings> {
        self.audio.as_ref()
    }

    /// Successful position saves so far.
    pub fn position_saves(&self) -> u32 {
        self.position_saves
    }

    fn check(&self) -> Result<(), StorageError> {
        match self.fail_with {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl PositionStore for MemoryStore {
    fn load_position(&mut self) -> Result<Option<(f32, f32)>, StorageError> {
        self.check()?;
        Ok(self.position)
    }

    fn save_position(&mut self, az: f32, el: f32) -> Result<(), StorageError> {
        self.check()?;
        self.position = Some((az, el));
        self.position_saves += 1;
        Ok(())
    }
}

impl AudioSettingsStore for MemoryStore {
    fn load_audio_settings(&mut self) -> Result<Option<AudioSettings>, StorageError> {
        self.check()?;
        Ok(self.audio)
    }

    fn save_audio_settings(&mut self, settings: &AudioSettings) -> Result<(), StorageError> {
        self.check()?;
        self.audio = Some(*settings);
        Ok(())
    }

    fn delete_audio_settings(&mut self) -> Result<(), StorageError> {
        self.check()?;
        self.audio.take().map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load_position(), Ok(None));
        store.save_position(12.5, 30.0).unwrap();
        assert_eq!(store.load_position(), Ok(Some((12.5, 30.0))));
        assert_eq!(store.position_saves(), 1);
    }

    #[test]
    fn test_failure_injection() {
        let mut store = MemoryStore::with_position(1.0, 2.0);
        store.fail_with(Some(StorageError::Unavailable));
        assert_eq!(store.load_position(), Err(StorageError::Unavailable));
        assert_eq!(store.save_position(0.0, 0.0), Err(StorageError::Unavailable));
        store.fail_with(None);
        assert_eq!(store.load_position(), Ok(Some((1.0, 2.0))));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let mut store = MemoryStore::new();
        assert_eq!(store.delete_audio_settings(), Err(StorageError::NotFound));
        store.save_audio_settings(&AudioSettings::default()).unwrap();
        assert_eq!(store.delete_audio_settings(), Ok(()));
        assert_eq!(store.load_audio_settings(), Ok(None));
    }
}
