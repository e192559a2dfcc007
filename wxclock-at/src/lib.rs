// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! wxclock-at library
//!
//! ESP8266 AT command support.
//!
//! Drives an ESP8266 WiFi module over its serial AT command interface to
//! join an access point, open a TCP link to a ThingHTTP relay, and fetch
//! the time and weather strings wxclock displays.
//!
//! It is `no_std`, allocation free, and designed to run on the ESP32 using
//! [embassy](https://embassy.dev/) and
//! [`esp-hal`](https://docs.espressif.com/projects/rust/).  Any serial port
//! implementing the `embedded-io-async` traits will do, which is also how
//! the protocol is exercised off target.
//!
//! The following diagram shows the key `wxclock-at` concepts.
//!
//! ```text
//!    wxclock firmware
//! ----------------------
//!        Station          \
//! ----------------------   \
//!         Modem             |--  Error
//! ----------------------   /
//!        AtLink           /
//! ----------------------
//!      UART TX/RX        >======================<    ESP8266 module
//!                              115200 8N1
//! ```
//!
//! * [`Station`] owns the bring-up state machine: reset, configure, join,
//!   connect, fetch, with a bounded retry budget per state.
//! * [`Modem`] knows the AT command set and each command's terminators.
//! * [`AtLink`] exchanges raw bytes: it sends commands and collects replies
//!   into a bounded buffer against a deadline.
//!
//! Most applications should use [`Station`]; those composing their own
//! command sequences can drive [`Modem`] directly.
//!
//! `wxclock-at` is designed to be used alongside the [`wxclock_core`]
//! library, which provides the error taxonomy, HTTP handling and field
//! windows, but nothing serial specific.

#![cfg_attr(not(test), no_std)]

pub mod link;
pub mod modem;
pub mod station;

#[doc(inline)]
pub use crate::link::AtLink;
#[doc(inline)]
pub use crate::modem::Modem;
#[doc(inline)]
pub use crate::station::Station;

pub use wxclock_core::Error;

#[cfg(test)]
pub(crate) mod mock;
