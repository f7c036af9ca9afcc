//! Log drain: formats queued entries onto a text sink.
//!
//! The firmware calls [`drain_to`] from the idle part of the loop with the
//! serial console as sink. Format: `[timestamp_us] LEVEL source: message`.

use core::fmt::Write;

use crate::logging::{LogEntry, LogStream, SliceWriter};

/// Longest formatted line (timestamp, level, source, message, newline).
pub const MAX_LINE_LEN: usize = 160;

/// Format one entry (with trailing newline) into `buf`.
///
/// Returns the number of bytes written.
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = SliceWriter { buf, pos: 0 };

    let _ = writeln!(
        writer,
        "[{:10}] {}: {}: {}",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.source.as_str(),
        entry.text()
    );

    writer.pos
}

/// Drain every pending entry of `stream` into `out`.
///
/// Appends a warning line when messages were dropped since the last drain
/// and resets the drop counter. Returns the number of entries written.
pub fn drain_to<const N: usize>(stream: &LogStream<N>, out: &mut dyn Write) -> usize {
    let mut line = [0u8; MAX_LINE_LEN];
    let mut count = 0;

    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, &mut line);
        let _ = out.write_str(core::str::from_utf8(&line[..len]).unwrap_or("<invalid utf8>\n"));
        count += 1;
    }

    let dropped = stream.dropped();
    if dropped > 0 {
        let _ = writeln!(out, "[WARN] log dropped {} entries", dropped);
        stream.reset_dropped();
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, LogSource, MAX_MSG_LEN};

    fn entry(level: LogLevel, text: &[u8]) -> LogEntry {
        let mut msg = [0u8; MAX_MSG_LEN];
        msg[..text.len()].copy_from_slice(text);
        LogEntry {
            timestamp_us: 1234567,
            level,
            source: LogSource::Motion,
            len: text.len() as u8,
            msg,
        }
    }

    #[test]
    fn test_format_log_entry() {
        let mut buf = [0u8; MAX_LINE_LEN];
        let len = format_log_entry(&entry(LogLevel::Info, b"homing done"), &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.contains("1234567"));
        assert!(formatted.contains("INFO: motion: homing done"));
        assert!(formatted.ends_with('\n'));
    }

    #[test]
    fn test_format_uses_only_len_bytes() {
        let mut e = entry(LogLevel::Error, b"TEST12345X");
        e.len = 5;

        let mut buf = [0u8; MAX_LINE_LEN];
        let len = format_log_entry(&e, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("TEST1"));
        assert!(!formatted.contains('X'));
    }

    #[test]
    fn test_drain_to_reports_drops() {
        let stream = LogStream::<2>::new();
        stream.push(LogLevel::Info, LogSource::Audio, b"one");
        stream.push(LogLevel::Info, LogSource::Audio, b"two");
        stream.push(LogLevel::Info, LogSource::Audio, b"three");

        let mut out = String::new();
        assert_eq!(drain_to(&stream, &mut out), 2);
        assert!(out.contains("audio: one"));
        assert!(out.contains("audio: two"));
        assert!(out.contains("dropped 1 entries"));
        assert_eq!(stream.dropped(), 0);
    }
}
