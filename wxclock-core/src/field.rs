// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! Fixed field windows into a relay reply.
//!
//! The ThingHTTP relay is configured so the time and weather strings land
//! at known offsets within the collected payload, module framing included.
//! A [`Window`] names one such field.  Extraction is bounds checked: a
//! payload too short for the window is rejected rather than sliced.

use static_assertions::const_assert;

use crate::{Error, REPLY_CAPACITY};

/// Byte window for the time-of-day string, e.g. `01:17:09 PM v`.
pub const TIME_WINDOW: Window = Window {
    offset: 674,
    len: 13,
};

/// Byte window for the weather conditions string, e.g. `Partly Cloud`.
pub const WEATHER_WINDOW: Window = Window {
    offset: 695,
    len: 12,
};

// Both windows must fit a full reply buffer.
const_assert!(TIME_WINDOW.end() <= REPLY_CAPACITY);
const_assert!(WEATHER_WINDOW.end() <= REPLY_CAPACITY);

/// A fixed byte range within a collected payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Offset of the field's first byte within the payload.
    pub offset: usize,

    /// Field length in bytes.
    pub len: usize,
}

impl Window {
    /// Returns the offset one past the field's last byte.
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Extracts the field from `payload`.
    ///
    /// Returns:
    /// - `Ok(&[u8])` borrowing the field bytes
    /// - `Err(Error::MalformedResponse)` if `payload` ends before the window
    ///   does
    pub fn extract<'p>(&self, payload: &'p [u8]) -> Result<&'p [u8], Error> {
        if self.end() > payload.len() {
            return Err(Error::MalformedResponse);
        }
        Ok(&payload[self.offset..self.end()])
    }
}
