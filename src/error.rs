//! Error types for the pointer core.
//!
//! Clamped configuration input is not an error, and neither is a missing
//! target or a closed gate. Only hardware, storage and rejected motion
//! commands surface here.

/// Hardware capability failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// H01: Digital output line could not be driven
    LineWrite,
    /// H02: Analog input conversion failed
    AnalogRead,
    /// H03: Analog output write failed
    AnalogWrite,
    /// H04: Peripheral bring-up failed (fatal at startup)
    Init,
}

impl HalError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::LineWrite => "H01",
            Self::AnalogRead => "H02",
            Self::AnalogWrite => "H03",
            Self::Init => "H04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::LineWrite => "digital output write failed",
            Self::AnalogRead => "analog input read failed",
            Self::AnalogWrite => "analog output write failed",
            Self::Init => "hardware init failed",
        }
    }
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Persistence collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// S01: Storage missing or not mounted
    Unavailable,
    /// S02: No record stored
    NotFound,
    /// S03: Stored record could not be decoded
    Corrupt,
    /// S04: Stored schema is newer than this firmware understands
    TooNew { stored_version: u32 },
    /// S05: Read/write error
    Io,
}

impl StorageError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "S01",
            Self::NotFound => "S02",
            Self::Corrupt => "S03",
            Self::TooNew { .. } => "S04",
            Self::Io => "S05",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unavailable => "storage unavailable",
            Self::NotFound => "record not found",
            Self::Corrupt => "record corrupt",
            Self::TooNew { .. } => "schema too new",
            Self::Io => "storage I/O error",
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooNew { stored_version } => {
                write!(f, "{}: {} (v{})", self.code(), self.message(), stored_version)
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

/// Rejected motion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionError {
    /// M01: Homing in progress, or steps pending where an idle mechanism is required
    Busy,
    /// M02: Manual elevation step would leave the elevation bounds
    ElevationLimit,
}

impl MotionError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy => "M01",
            Self::ElevationLimit => "M02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Busy => "mechanism busy",
            Self::ElevationLimit => "elevation limit",
        }
    }
}

impl core::fmt::Display for MotionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Crate-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Hal(HalError),
    Storage(StorageError),
    Motion(MotionError),
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        Error::Hal(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Hal(e) => e.fmt(f),
            Error::Storage(e) => e.fmt(f),
            Error::Motion(e) => e.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_has_code_and_message() {
        let text = format!("{}", Error::from(MotionError::ElevationLimit));
        assert_eq!(text, "M02: elevation limit");
    }

    #[test]
    fn test_too_new_shows_version() {
        let text = format!("{}", StorageError::TooNew { stored_version: 7 });
        assert!(text.starts_with("S04"));
        assert!(text.contains("v7"));
    }
}
