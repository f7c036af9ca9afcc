//! RT-safe event logging for the pointer core.
//!
//! ```text
//! Control loop           LogStream            Drain (idle time)
//! ────────────           ─────────            ─────────────────
//!
//! rt_info!() ─────────▶ [L0][L1][L2] ───────▶ console / UART
//! non-blocking            lock-free           blocking ok
//! ```
//!
//! - Pushing never blocks; messages are dropped (and counted) when the ring is full.
//! - Entries above the runtime level are discarded before they reach the ring.
//! - The stream keeps the loop's current timestamp so setters can log
//!   without being handed a clock.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 128;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Subsystem that produced an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LogSource {
    Motion = 0,
    Audio = 1,
    Storage = 2,
    Loop = 3,
}

impl LogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LogSource::Motion => "motion",
            LogSource::Audio => "audio",
            LogSource::Storage => "storage",
            LogSource::Loop => "loop",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    pub level: LogLevel,
    pub source: LogSource,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        timestamp_us: 0,
        level: LogLevel::Info,
        source: LogSource::Loop,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text (lossy: invalid UTF-8 yields a placeholder).
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Lock-free log ring.
///
/// Producers and the consumer each serialize through a try-lock flag: a
/// push that finds another push in flight is dropped instead of waiting,
/// so the stream can live in a `static` shared by the control loop, a UART
/// drain task and parallel test threads without ever blocking.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    entries: UnsafeCell<[LogEntry; N]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    min_level: AtomicU8,
    now_us: AtomicU64,
    pushing: AtomicBool,
    draining: AtomicBool,
}

// SAFETY: at most one producer and one consumer are active at a time (try-lock
// flags); they touch disjoint slots, published through acquire/release indices.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream (level Info).
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        Self {
            entries: UnsafeCell::new([LogEntry::EMPTY; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            min_level: AtomicU8::new(LogLevel::Info as u8),
            now_us: AtomicU64::new(0),
            pushing: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    /// Publish the current loop time used for subsequent entries.
    #[inline]
    pub fn set_time(&self, now_us: u64) {
        self.now_us.store(now_us, Ordering::Relaxed);
    }

    #[inline]
    pub fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::Relaxed)
    }

    /// Set the most verbose level that is still recorded.
    pub fn set_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    /// Whether an entry at `level` would be recorded.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        (level as u8) <= self.min_level.load(Ordering::Relaxed)
    }

    /// Push a log entry stamped with the stored loop time.
    ///
    /// Returns `true` if the message was queued, `false` if filtered or dropped.
    #[inline]
    pub fn push(&self, level: LogLevel, source: LogSource, msg: &[u8]) -> bool {
        if !self.enabled(level) {
            return false;
        }

        if self
            .pushing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.pushing.store(false, Ordering::Release);
            return false;
        }

        let idx = (write as usize) & Self::MASK;

        // SAFETY: exclusive producer; slot stays outside the consumer's window
        // until write_idx is published.
        unsafe {
            let entry = &mut (*self.entries.get())[idx];
            entry.timestamp_us = self.now_us();
            entry.level = level;
            entry.source = source;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
        self.pushing.store(false, Ordering::Release);
        true
    }

    /// Drain next log entry.
    ///
    /// Returns `None` when empty or when another drain is in flight.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        let entry = if read == write {
            None
        } else {
            let idx = (read as usize) & Self::MASK;
            // SAFETY: slot published by write_idx, producers never touch it until read_idx passes
            let entry = unsafe { (*self.entries.get())[idx] };
            self.read_idx.store(read.wrapping_add(1), Ordering::Release);
            Some(entry)
        };

        self.draining.store(false, Ordering::Release);
        entry
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset dropped counter (e.g., after reporting).
    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Get number of entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating at the buffer end.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    let mut writer = SliceWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// `fmt::Write` over a byte slice that silently truncates.
pub(crate) struct SliceWriter<'a> {
    pub(crate) buf: &'a mut [u8],
    pub(crate) pos: usize,
}

impl core::fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}

/// RT-safe log macro.
///
/// ```ignore
/// rt_log!(LogLevel::Info, EVENT_LOG, LogSource::Motion, "AZ {} steps", n);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $source:expr, $($arg:tt)*) => {{
        if $stream.enabled($level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            $stream.push($level, $source, &buf[..len]);
        }
    }};
}

/// RT-safe error log.
#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $source, $($arg)*)
    };
}

/// RT-safe warning log.
#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $source, $($arg)*)
    };
}

/// RT-safe info log.
#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $source, $($arg)*)
    };
}

/// RT-safe debug log.
#[macro_export]
macro_rules! rt_debug {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Debug, $stream, $source, $($arg)*)
    };
}

/// RT-safe trace log (maximum verbosity).
#[macro_export]
macro_rules! rt_trace {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Trace, $stream, $source, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_stream_basic() {
        let stream = LogStream::<16>::new();
        stream.set_time(1000);

        assert!(stream.push(LogLevel::Info, LogSource::Motion, b"homing done"));
        assert_eq!(stream.pending(), 1);

        let entry = stream.drain().unwrap();
        assert_eq!(entry.timestamp_us, 1000);
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.source, LogSource::Motion);
        assert_eq!(entry.text(), "homing done");

        assert!(stream.drain().is_none());
    }

    #[test]
    fn test_log_stream_full_drops_and_counts() {
        let stream = LogStream::<4>::new();

        for _ in 0..4 {
            assert!(stream.push(LogLevel::Info, LogSource::Audio, b"x"));
        }
        assert!(!stream.push(LogLevel::Info, LogSource::Audio, b"y"));
        assert_eq!(stream.dropped(), 1);

        stream.drain();
        assert!(stream.push(LogLevel::Info, LogSource::Audio, b"z"));
    }

    #[test]
    fn test_level_filter_is_not_a_drop() {
        let stream = LogStream::<4>::new();
        assert_eq!(stream.level(), LogLevel::Info);

        assert!(!stream.push(LogLevel::Debug, LogSource::Loop, b"noise"));
        assert_eq!(stream.dropped(), 0);
        assert_eq!(stream.pending(), 0);

        stream.set_level(LogLevel::Trace);
        assert!(stream.push(LogLevel::Debug, LogSource::Loop, b"noise"));
    }

    #[test]
    fn test_macro_formats_and_truncates() {
        let stream = LogStream::<4>::new();
        crate::rt_warn!(stream, LogSource::Motion, "history overflow: {} steps", 42);
        let entry = stream.drain().unwrap();
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.text(), "history overflow: 42 steps");

        let long = [b'a'; 200];
        let long = core::str::from_utf8(&long).unwrap();
        crate::rt_info!(stream, LogSource::Loop, "{}", long);
        assert_eq!(stream.drain().unwrap().len as usize, MAX_MSG_LEN);
    }

    #[test]
    fn test_format_to_buffer() {
        let mut buf = [0u8; 8];
        let len = format_to_buffer(&mut buf, format_args!("AZ={:.1}", 123.45));
        assert_eq!(&buf[..len], b"AZ=123.5");
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }
}
