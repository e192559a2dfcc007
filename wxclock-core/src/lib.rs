// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! wxclock is a tiny WiFi clock and weather display.
//!
//! wxclock-core - Core protocol concepts used by wxclock.
//!
//! Provides the error taxonomy, the HTTP request builder and reply body
//! locator, and the fixed field windows used to pull the time and weather
//! strings out of a relay reply.
//!
//! Designed to be used in conjunction with the `wxclock-at` library, which
//! drives an ESP8266 WiFi module over its serial AT command interface.
//!
//! This library is `no_std` compatible and allocation free.

#![cfg_attr(not(test), no_std)]

pub mod field;
pub mod http;

use core::fmt;

/// Largest reply collected from the WiFi module, in bytes.
///
/// A payload collection that fills the buffer is complete, not an error.
/// Filling the buffer while still waiting for a terminator is
/// [`Error::BufferOverflow`].
pub const REPLY_CAPACITY: usize = 1024;

/// Largest command or request sent to the WiFi module, in bytes.
pub const COMMAND_CAPACITY: usize = 256;

/// Returns the offset of the first occurrence of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&idx| &haystack[idx..idx + needle.len()] == needle)
}

/// Core error type used by all wxclock objects
///
/// [`Error::requires_retry()`] distinguishes errors worth another attempt
/// from wiring and driver faults that will not clear on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The WiFi module did not produce the expected reply within the
    /// caller's timeout.  Whatever arrived before the deadline is retained
    /// so the partial reply can still be logged.  Usually transient - the
    /// module may be mid-boot or the access point slow - so a retry is
    /// worthwhile.
    SerialTimeout,

    /// A reply filled the collection buffer before its terminator was seen.
    /// The first [`REPLY_CAPACITY`] bytes are retained.  Retrying is
    /// reasonable: overlong replies are normally one-offs, such as boot
    /// noise prepended to a banner.
    BufferOverflow,

    /// A reply arrived but did not have the expected shape, such as a
    /// payload without an HTTP status line, or one too short to contain
    /// the advertised fields.
    MalformedResponse,

    /// The module reported failure for a connection level command, such as
    /// joining the access point or opening the TCP link.
    ConnectionFailed,

    /// The serial port itself failed.  Retrying will not help - this points
    /// at wiring, UART configuration, or the driver.
    Port(embedded_io::ErrorKind),
}

impl Error {
    /// Returns true if the error is worth retrying.  Timeouts, overflows,
    /// malformed replies and connection failures can all clear on a second
    /// attempt; port faults cannot.
    pub fn requires_retry(&self) -> bool {
        !matches!(self, Error::Port(_))
    }
}

impl Error {
    /// Returns a string representation of the error.
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::SerialTimeout => "Serial Timeout",
            Error::BufferOverflow => "Buffer Overflow",
            Error::MalformedResponse => "Malformed Response",
            Error::ConnectionFailed => "Connection Failed",
            Error::Port(_) => "Port Error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Port(kind) => write!(f, "{}: {kind:?}", self.as_str()),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(Error::SerialTimeout.requires_retry());
        assert!(Error::BufferOverflow.requires_retry());
        assert!(Error::MalformedResponse.requires_retry());
        assert!(Error::ConnectionFailed.requires_retry());
        assert!(!Error::Port(embedded_io::ErrorKind::Other).requires_retry());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Error::SerialTimeout), "Serial Timeout");
        assert_eq!(
            format!("{}", Error::Port(embedded_io::ErrorKind::BrokenPipe)),
            "Port Error: BrokenPipe"
        );
    }

    #[test]
    fn subslice_search() {
        assert_eq!(find_subslice(b"abcOK\r\n", b"OK\r\n"), Some(3));
        assert_eq!(find_subslice(b"OK\r\n", b"OK\r\n"), Some(0));
        assert_eq!(find_subslice(b"OK\r", b"OK\r\n"), None);
        assert_eq!(find_subslice(b"abc", b""), None);
        assert_eq!(find_subslice(b"", b"x"), None);
    }
}
