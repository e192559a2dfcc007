// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! ESP8266 AT command set.
//!
//! One method per command wxclock uses.  Every exchange names its own
//! terminators: most commands end in `OK`, a reset ends with the boot
//! banner's `ready`, and `AT+CIPSEND` ends with the `>` prompt that must
//! arrive before any request byte is sent.  Timeouts are the caller's to
//! choose, per command.
//!
//! Replies are echoed to the log at debug level for diagnosis.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use core::fmt;
use core::fmt::Write as _;

use embassy_time::Duration;
use embedded_io_async::{Read, Write};
use heapless::{String, Vec};

use crate::link::AtLink;
use wxclock_core::{COMMAND_CAPACITY, Error, REPLY_CAPACITY};

// Reply terminators.
const OK: &[u8] = b"OK\r\n";
const READY: &[u8] = b"ready\r\n";
const ERROR: &[u8] = b"ERROR\r\n";
const FAIL: &[u8] = b"FAIL\r\n";
const CLOSED: &[u8] = b"CLOSED\r\n";
// Old firmware says "ALREADY CONNECT", newer "ALREADY CONNECTED".
const ALREADY: &[u8] = b"ALREADY CONNECT";
const PROMPT: &[u8] = b">";

/// The ESP8266 AT command set, one method per command.
///
/// Commands build on [`AtLink`] for the raw exchange.  Methods return
/// `Err(Error::ConnectionFailed)` when the module answers with a failure
/// terminator, and pass link errors through unchanged.
pub struct Modem<P> {
    link: AtLink<P>,
}

impl<P> Modem<P>
where
    P: Read + Write,
{
    /// Creates a modem over `port`.
    pub fn new(port: P) -> Self {
        Self {
            link: AtLink::new(port),
        }
    }

    /// Checks the module is listening (`AT`).
    pub async fn check(&mut self, timeout: Duration) -> Result<(), Error> {
        self.exchange(b"AT\r\n", timeout).await
    }

    /// Soft resets the module (`AT+RST`) and waits for the boot banner.
    pub async fn reset(&mut self, timeout: Duration) -> Result<(), Error> {
        self.command(b"AT+RST\r\n", &[READY], timeout)
            .await
            .map(|_| ())
    }

    /// Queries the firmware version (`AT+GMR`).  The report is echoed to
    /// the log rather than parsed.
    pub async fn firmware_version(&mut self, timeout: Duration) -> Result<(), Error> {
        self.exchange(b"AT+GMR\r\n", timeout).await
    }

    /// Puts the module in station mode (`AT+CWMODE=1`).
    pub async fn set_station_mode(&mut self, timeout: Duration) -> Result<(), Error> {
        self.exchange(b"AT+CWMODE=1\r\n", timeout).await
    }

    /// Enables multiple link support (`AT+CIPMUX=1`).  Link IDs are then
    /// quoted in `AT+CIPSTART` and `AT+CIPSEND`.
    pub async fn enable_multiplexing(&mut self, timeout: Duration) -> Result<(), Error> {
        self.exchange(b"AT+CIPMUX=1\r\n", timeout).await
    }

    /// Joins an access point (`AT+CWJAP`).
    ///
    /// Returns `Err(Error::ConnectionFailed)` if the module reports `FAIL`
    /// or `ERROR`, typically wrong credentials or the access point out of
    /// reach.
    pub async fn join_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<(), Error> {
        let mut command: String<COMMAND_CAPACITY> = String::new();
        write!(command, "AT+CWJAP=\"{ssid}\",\"{password}\"\r\n")
            .map_err(|_| Error::BufferOverflow)?;
        match self
            .command(command.as_bytes(), &[OK, FAIL, ERROR], timeout)
            .await?
        {
            0 => Ok(()),
            _ => Err(Error::ConnectionFailed),
        }
    }

    /// Queries the module's station address (`AT+CIFSR`).
    pub async fn station_address(&mut self, timeout: Duration) -> Result<(), Error> {
        self.exchange(b"AT+CIFSR\r\n", timeout).await
    }

    /// Queries connection status (`AT+CIPSTATUS`).
    pub async fn connection_status(&mut self, timeout: Duration) -> Result<(), Error> {
        self.exchange(b"AT+CIPSTATUS\r\n", timeout).await
    }

    /// Opens a TCP link to `ip:port` (`AT+CIPSTART`).
    ///
    /// A link already open is fine: the module answers `ALREADY CONNECT`,
    /// which counts as success even though the module follows it with
    /// `ERROR`.
    pub async fn open_connection(
        &mut self,
        link_id: u8,
        ip: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), Error> {
        let mut command: String<COMMAND_CAPACITY> = String::new();
        write!(command, "AT+CIPSTART={link_id},\"TCP\",\"{ip}\",{port}\r\n")
            .map_err(|_| Error::BufferOverflow)?;
        match self
            .command(
                command.as_bytes(),
                &[ALREADY, OK, ERROR, FAIL, CLOSED],
                timeout,
            )
            .await?
        {
            0 | 1 => Ok(()),
            _ => Err(Error::ConnectionFailed),
        }
    }

    /// Sends `request` over an open link (`AT+CIPSEND`) and collects the
    /// payload that comes back.
    ///
    /// The module is quoted the exact request length, then sent the request
    /// bytes once it raises its `>` prompt.  Collection runs until the
    /// buffer fills or the payload window closes.
    ///
    /// Returns a snapshot of the collected payload, module framing
    /// included.
    pub async fn send_request(
        &mut self,
        link_id: u8,
        request: &[u8],
        prompt_timeout: Duration,
        payload_timeout: Duration,
    ) -> Result<Vec<u8, REPLY_CAPACITY>, Error> {
        let mut command: String<COMMAND_CAPACITY> = String::new();
        write!(command, "AT+CIPSEND={link_id},{}\r\n", request.len())
            .map_err(|_| Error::BufferOverflow)?;
        if self
            .command(command.as_bytes(), &[PROMPT, ERROR], prompt_timeout)
            .await?
            != 0
        {
            return Err(Error::ConnectionFailed);
        }

        trace!("Exec:  {}", Echo(request));
        self.link.send_command(request).await?;
        let result = self.link.collect_payload(payload_timeout).await;
        self.echo_reply();
        match &result {
            Ok(()) => trace!("OK:    Payload {} bytes", self.link.reply().len()),
            Err(e) => debug!("Error: Payload: {e}"),
        }
        result?;

        Vec::from_slice(self.link.reply()).map_err(|_| Error::BufferOverflow)
    }

    // Sends a command and collects until plain `OK`.
    async fn exchange(&mut self, command: &[u8], timeout: Duration) -> Result<(), Error> {
        self.command(command, &[OK], timeout).await.map(|_| ())
    }

    // Sends a command and collects until one of `terminators` appears.
    // Returns the index of the terminator that did.
    async fn command(
        &mut self,
        command: &[u8],
        terminators: &[&[u8]],
        timeout: Duration,
    ) -> Result<usize, Error> {
        trace!("Exec:  {}", Echo(command));

        self.link.send_command(command).await?;
        let result = self.link.collect_until_any(terminators, timeout).await;
        self.echo_reply();

        match &result {
            Ok(_) => trace!("OK:    {}", Echo(command)),
            Err(e) => debug!("Error: {} {e}", Echo(command)),
        }

        result
    }

    // Echoes the collected reply to the log.
    fn echo_reply(&self) {
        if !self.link.reply().is_empty() {
            debug!("Reply: {}", Echo(self.link.reply()));
        }
    }
}

/// Printable rendering of raw module bytes for the log.
///
/// Carriage returns are dropped, newlines become ` | `, and anything else
/// outside printable ASCII becomes `.`.
struct Echo<'a>(&'a [u8]);

impl fmt::Display for Echo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0 {
            match byte {
                b'\r' => (),
                b'\n' => f.write_str(" | ")?,
                0x20..=0x7e => f.write_char(byte as char)?,
                _ => f.write_char('.')?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPort;
    use embassy_futures::block_on;

    const TIMEOUT: Duration = Duration::from_millis(20);

    #[test]
    fn check_sends_at() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"AT\r\r\n\r\nOK\r\n");
            let mut modem = Modem::new(&mut port);
            modem.check(TIMEOUT).await.unwrap();
            drop(modem);
            assert_eq!(&port.written[..], b"AT\r\n");
        })
    }

    #[test]
    fn reset_waits_for_banner() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"AT+RST\r\r\n\r\nOK\r\nbcn 0\r\nready\r\n");
            let mut modem = Modem::new(&mut port);
            modem.reset(TIMEOUT).await.unwrap();
            drop(modem);
            assert_eq!(&port.written[..], b"AT+RST\r\n");
        })
    }

    #[test]
    fn join_builds_quoted_command() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
            let mut modem = Modem::new(&mut port);
            modem
                .join_access_point("MSU_IOT", "msucowboys", TIMEOUT)
                .await
                .unwrap();
            drop(modem);
            assert_eq!(&port.written[..], b"AT+CWJAP=\"MSU_IOT\",\"msucowboys\"\r\n");
        })
    }

    #[test]
    fn join_failure_is_connection_failed() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"AT+CWJAP=\"MSU_IOT\",\"wrong\"\r\r\n\r\nFAIL\r\n");
            let mut modem = Modem::new(&mut port);
            assert_eq!(
                modem.join_access_point("MSU_IOT", "wrong", TIMEOUT).await,
                Err(Error::ConnectionFailed)
            );
        })
    }

    #[test]
    fn open_builds_quoted_command() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"0,CONNECT\r\n\r\nOK\r\n");
            let mut modem = Modem::new(&mut port);
            modem
                .open_connection(0, "18.235.222.172", 8080, TIMEOUT)
                .await
                .unwrap();
            drop(modem);
            assert_eq!(
                &port.written[..],
                b"AT+CIPSTART=0,\"TCP\",\"18.235.222.172\",8080\r\n"
            );
        })
    }

    #[test]
    fn open_accepts_already_connected() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"ALREADY CONNECTED\r\n\r\nERROR\r\n");
            let mut modem = Modem::new(&mut port);
            modem
                .open_connection(0, "18.235.222.172", 8080, TIMEOUT)
                .await
                .unwrap();
        })
    }

    #[test]
    fn open_rejects_error() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"\r\nERROR\r\n");
            let mut modem = Modem::new(&mut port);
            assert_eq!(
                modem.open_connection(0, "18.235.222.172", 8080, TIMEOUT).await,
                Err(Error::ConnectionFailed)
            );
        })
    }

    #[test]
    fn send_request_quotes_length_and_sends_bytes() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"AT+CIPSEND=0,12\r\r\n\r\nOK\r\n> ");
            port.push_chunk(b"\r\nSEND OK\r\n\r\n+IPD,0,5:hello");
            let mut modem = Modem::new(&mut port);
            let payload = modem
                .send_request(0, b"GET /r\r\n\r\n..", TIMEOUT, TIMEOUT)
                .await
                .unwrap();
            assert_eq!(&payload[..], b"\r\nSEND OK\r\n\r\n+IPD,0,5:hello");
            drop(modem);
            let written = &port.written[..];
            assert!(written.starts_with(b"AT+CIPSEND=0,12\r\n"));
            assert!(written.ends_with(b"GET /r\r\n\r\n.."));
        })
    }

    #[test]
    fn send_request_without_prompt_fails() {
        block_on(async {
            let mut port = MockPort::new();
            port.push_chunk(b"AT+CIPSEND=0,4\r\r\n\r\nERROR\r\n");
            let mut modem = Modem::new(&mut port);
            assert_eq!(
                modem.send_request(0, b"GET ", TIMEOUT, TIMEOUT).await,
                Err(Error::ConnectionFailed)
            );
        })
    }

    #[test]
    fn echo_renders_printable() {
        let rendered = format!("{}", Echo(b"AT+GMR\r\n\r\nOK\r\n\x00"));
        assert_eq!(rendered, "AT+GMR |  | OK | .");
    }
}
