// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! Serial AT link.
//!
//! [`AtLink`] owns the serial port and a single bounded reply buffer.  A
//! collection runs until a terminator arrives, the buffer fills, or the
//! caller's deadline passes.  Whatever arrived stays in the buffer, so a
//! failed exchange can still be inspected and logged.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use embassy_time::{Duration, Instant, with_timeout};
use embedded_io::Error as _;
use embedded_io_async::{Read, Write};
use heapless::Vec;

use wxclock_core::{Error, REPLY_CAPACITY, find_subslice};

/// Largest single port read.  Replies arrive in short bursts, so a small
/// chunk keeps deadline checks frequent.
const READ_CHUNK: usize = 64;

/// A serial AT link.
///
/// Generic over any async serial port.  On target this is an `esp-hal`
/// UART in async mode; off target it is a scripted port.
pub struct AtLink<P> {
    port: P,
    reply: Vec<u8, REPLY_CAPACITY>,
}

impl<P> AtLink<P>
where
    P: Read + Write,
{
    /// Creates a link over `port`.
    pub fn new(port: P) -> Self {
        Self {
            port,
            reply: Vec::new(),
        }
    }

    /// Sends `command` to the module.
    ///
    /// The reply buffer is untouched: the module's echo and reply are
    /// collected by a following [`AtLink::collect_until_any()`] call.
    pub async fn send_command(&mut self, command: &[u8]) -> Result<(), Error> {
        self.port
            .write_all(command)
            .await
            .map_err(|e| Error::Port(e.kind()))?;
        self.port.flush().await.map_err(|e| Error::Port(e.kind()))
    }

    /// Collects reply bytes until one of `patterns` appears.
    ///
    /// Returns:
    /// - `Ok(index)` of the first pattern present in the reply
    /// - `Err(Error::SerialTimeout)` if the deadline passes first
    /// - `Err(Error::BufferOverflow)` if the buffer fills first
    pub async fn collect_until_any(
        &mut self,
        patterns: &[&[u8]],
        timeout: Duration,
    ) -> Result<usize, Error> {
        self.reply.clear();
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(index) = self.match_any(patterns) {
                return Ok(index);
            }
            if self.reply.is_full() {
                return Err(Error::BufferOverflow);
            }
            self.fill(deadline).await?;
        }
    }

    /// Collects reply bytes until `pattern` appears.  See
    /// [`AtLink::collect_until_any()`].
    pub async fn collect_until(&mut self, pattern: &[u8], timeout: Duration) -> Result<(), Error> {
        self.collect_until_any(&[pattern], timeout)
            .await
            .map(|_| ())
    }

    /// Collects payload bytes until the buffer fills or `timeout` passes,
    /// whichever is first.
    ///
    /// There is no terminator to look for: one deadline covers the whole
    /// collection, and whatever has arrived when it passes is the payload.
    /// A full buffer is a complete collection here, not an overflow.
    ///
    /// Returns `Err(Error::SerialTimeout)` only if nothing arrived at all.
    pub async fn collect_payload(&mut self, timeout: Duration) -> Result<(), Error> {
        self.reply.clear();
        let deadline = Instant::now() + timeout;
        while !self.reply.is_full() {
            match self.fill(deadline).await {
                Ok(()) => (),
                Err(Error::SerialTimeout) => break,
                Err(e) => return Err(e),
            }
        }
        if self.reply.is_empty() {
            Err(Error::SerialTimeout)
        } else {
            Ok(())
        }
    }

    /// Returns the bytes collected by the last exchange.
    pub fn reply(&self) -> &[u8] {
        &self.reply
    }

    // Reads one chunk into the reply buffer, observing `deadline`.
    async fn fill(&mut self, deadline: Instant) -> Result<(), Error> {
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::SerialTimeout);
        }

        let mut chunk = [0u8; READ_CHUNK];
        let space = REPLY_CAPACITY - self.reply.len();
        let want = space.min(READ_CHUNK);
        match with_timeout(deadline - now, self.port.read(&mut chunk[..want])).await {
            Ok(Ok(0)) => Err(Error::Port(embedded_io::ErrorKind::BrokenPipe)),
            Ok(Ok(n)) => self
                .reply
                .extend_from_slice(&chunk[..n])
                .map_err(|_| Error::BufferOverflow),
            Ok(Err(e)) => Err(Error::Port(e.kind())),
            Err(_) => Err(Error::SerialTimeout),
        }
    }

    // Returns the index of the first pattern present in the reply.
    fn match_any(&self, patterns: &[&[u8]]) -> Option<usize> {
        patterns
            .iter()
            .position(|pattern| find_subslice(&self.reply, pattern).is_some())
    }
}
