// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! Bring-up state machine.
//!
//! [`Station`] walks the module from hardware-reset mystery meat to two
//! fetched display fields: reset, configure, join, connect, fetch time,
//! fetch weather.  Each state runs with a bounded retry budget.  The first
//! state to exhaust its budget parks the station in [`State::Failed`] with
//! the error kept for display, so a dead access point shows up on the panel
//! rather than as a hung boot.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use core::fmt;

use embassy_time::Duration;
use embedded_io_async::{Read, Write};
use heapless::String;

use crate::modem::Modem;
use wxclock_core::Error;
use wxclock_core::field::{TIME_WINDOW, WEATHER_WINDOW, Window};
use wxclock_core::http;

/// Largest displayable field, in bytes.  Sized for a 16 column panel.
pub const FIELD_CAPACITY: usize = 16;

/// How many times one state may run before the station gives up.
pub const DEFAULT_STEP_ATTEMPTS: u8 = 3;

// All traffic uses the first multiplexed link.
const LINK_ID: u8 = 0;

/// Bring-up states, in order.
///
/// [`State::Done`] and [`State::Failed`] are terminal; every other state
/// advances to the next on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Checking the module is listening and soft resetting it.
    Resetting,

    /// Reporting the firmware version and setting station mode and
    /// multiple link support.
    Configuring,

    /// Joining the access point and confirming an address was issued.
    ConnectingWifi,

    /// Opening the TCP link to the relay.
    OpeningSocket,

    /// Fetching the time-of-day string.
    FetchingTime,

    /// Fetching the weather conditions string.
    FetchingWeather,

    /// Both fields fetched.
    Done,

    /// A state exhausted its retry budget.  The error that parked the
    /// station here is kept for display.
    Failed,
}

impl State {
    /// Returns a string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Resetting => "Resetting",
            State::Configuring => "Configuring",
            State::ConnectingWifi => "Connecting WiFi",
            State::OpeningSocket => "Opening Socket",
            State::FetchingTime => "Fetching Time",
            State::FetchingWeather => "Fetching Weather",
            State::Done => "Done",
            State::Failed => "Failed",
        }
    }

    // The state entered after this one succeeds.
    fn next(&self) -> State {
        match self {
            State::Resetting => State::Configuring,
            State::Configuring => State::ConnectingWifi,
            State::ConnectingWifi => State::OpeningSocket,
            State::OpeningSocket => State::FetchingTime,
            State::FetchingTime => State::FetchingWeather,
            State::FetchingWeather => State::Done,
            State::Done => State::Done,
            State::Failed => State::Failed,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Network and relay parameters for a [`Station`].
#[derive(Debug, Clone, Copy)]
pub struct Config<'a> {
    /// Access point SSID.
    pub ssid: &'a str,

    /// Access point password.
    pub password: &'a str,

    /// Relay IP address, as text for `AT+CIPSTART`.
    pub relay_ip: &'a str,

    /// Relay TCP port.
    pub relay_port: u16,

    /// ThingHTTP API key for the time request.
    pub time_key: &'a str,

    /// ThingHTTP API key for the weather request.
    pub weather_key: &'a str,
}

/// Per command reply timeouts.
///
/// The defaults suit a freshly powered module on a home access point.
/// Joining and socket opening are network bound and get the longest
/// windows.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// `AT` liveness check.
    pub check: Duration,

    /// `AT+RST` boot banner.
    pub reset: Duration,

    /// `AT+GMR` version report.
    pub version: Duration,

    /// Plain configuration commands.
    pub command: Duration,

    /// `AT+CWJAP` access point join.
    pub join: Duration,

    /// `AT+CIFSR` address report.
    pub address: Duration,

    /// `AT+CIPSTATUS` status report.
    pub status: Duration,

    /// `AT+CIPSTART` TCP link opening.
    pub connect: Duration,

    /// `AT+CIPSEND` prompt.
    pub prompt: Duration,

    /// Payload collection window.
    pub payload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            check: Duration::from_secs(1),
            reset: Duration::from_secs(2),
            version: Duration::from_secs(2),
            command: Duration::from_secs(1),
            join: Duration::from_secs(3),
            address: Duration::from_secs(5),
            status: Duration::from_secs(3),
            connect: Duration::from_secs(10),
            prompt: Duration::from_secs(5),
            payload: Duration::from_secs(5),
        }
    }
}

/// The two strings a successful run produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readings {
    /// Time of day, e.g. `01:17:09 PM v`.
    pub time: String<FIELD_CAPACITY>,

    /// Weather conditions, e.g. `Partly Cloud`.
    pub weather: String<FIELD_CAPACITY>,
}

/// The wxclock bring-up state machine.
///
/// Owns the modem and walks [`State`]s in order.  Each state runs with a
/// bounded retry budget; retries stop early for errors that cannot clear,
/// such as port faults.  The first state to run out of attempts parks the
/// station in [`State::Failed`].
pub struct Station<'a, P> {
    modem: Modem<P>,
    config: Config<'a>,
    timeouts: Timeouts,
    attempts: u8,
    state: State,
    readings: Readings,
    last_error: Option<Error>,
}

impl<'a, P> Station<'a, P>
where
    P: Read + Write,
{
    /// Creates a station over `port` with default timeouts and retry
    /// budget.
    pub fn new(port: P, config: Config<'a>) -> Self {
        Self {
            modem: Modem::new(port),
            config,
            timeouts: Timeouts::default(),
            attempts: DEFAULT_STEP_ATTEMPTS,
            state: State::Resetting,
            readings: Readings::default(),
            last_error: None,
        }
    }

    /// Replaces the per command timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replaces the per state retry budget.  Zero is treated as one.
    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the error that parked the station in [`State::Failed`].
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    /// Runs the station to completion.
    ///
    /// A station runs once.  Calling again after it reaches a terminal
    /// state repeats the outcome without touching the module.
    ///
    /// Returns:
    /// - `Ok(Readings)` once both fields are fetched
    /// - `Err(Error)` with the error that exhausted a state's retry budget
    pub async fn run(&mut self) -> Result<Readings, Error> {
        while self.state != State::Done && self.state != State::Failed {
            info!("Exec:  {}", self.state);
            match self.run_state().await {
                Ok(()) => {
                    info!("OK:    {}", self.state);
                    self.state = self.state.next();
                }
                Err(e) => {
                    error!("Error: {} failed: {e}", self.state);
                    self.last_error = Some(e);
                    self.state = State::Failed;
                }
            }
        }
        match self.state {
            State::Failed => Err(self.last_error.unwrap_or(Error::ConnectionFailed)),
            _ => Ok(self.readings.clone()),
        }
    }

    // Runs the current state within the retry budget.
    async fn run_state(&mut self) -> Result<(), Error> {
        let budget = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.step().await {
                Ok(()) => break Ok(()),
                Err(e) => {
                    attempt += 1;
                    if !e.requires_retry() || attempt >= budget {
                        break Err(e);
                    }
                    warn!("Retry: {} {attempt}: {e}", self.state);
                }
            }
        }
    }

    // Runs the current state once.
    async fn step(&mut self) -> Result<(), Error> {
        let timeouts = self.timeouts;
        match self.state {
            State::Resetting => {
                self.modem.check(timeouts.check).await?;
                self.modem.reset(timeouts.reset).await
            }
            State::Configuring => {
                self.modem.firmware_version(timeouts.version).await?;
                self.modem.set_station_mode(timeouts.command).await?;
                self.modem.enable_multiplexing(timeouts.command).await
            }
            State::ConnectingWifi => {
                self.modem
                    .join_access_point(self.config.ssid, self.config.password, timeouts.join)
                    .await?;
                self.modem.station_address(timeouts.address).await?;
                self.modem.connection_status(timeouts.status).await
            }
            State::OpeningSocket => {
                self.modem
                    .open_connection(
                        LINK_ID,
                        self.config.relay_ip,
                        self.config.relay_port,
                        timeouts.connect,
                    )
                    .await
            }
            State::FetchingTime => {
                self.readings.time = self.fetch(self.config.time_key, TIME_WINDOW).await?;
                Ok(())
            }
            State::FetchingWeather => {
                self.readings.weather = self.fetch(self.config.weather_key, WEATHER_WINDOW).await?;
                Ok(())
            }
            State::Done | State::Failed => Ok(()),
        }
    }

    // Fetches one field: renders the request, sends it, checks the payload
    // holds a complete HTTP response, and extracts the field window.
    async fn fetch(
        &mut self,
        api_key: &str,
        window: Window,
    ) -> Result<String<FIELD_CAPACITY>, Error> {
        let request = http::Request::new(api_key).render()?;
        let payload = self
            .modem
            .send_request(
                LINK_ID,
                request.as_bytes(),
                self.timeouts.prompt,
                self.timeouts.payload,
            )
            .await?;
        http::locate_body(&payload)?;
        let field = window.extract(&payload)?;
        Ok(field_to_text(field))
    }
}

// Renders raw field bytes printable, one display cell per byte.
fn field_to_text(field: &[u8]) -> String<FIELD_CAPACITY> {
    let mut text = String::new();
    for &byte in field.iter().take(FIELD_CAPACITY) {
        let c = match byte {
            0x20..=0x7e => byte as char,
            _ => '.',
        };
        if text.push(c).is_err() {
            break;
        }
    }
    text
}
