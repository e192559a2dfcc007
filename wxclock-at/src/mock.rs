// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! Scripted serial port for exercising the protocol off target.

use std::collections::VecDeque;

use embassy_time::{Duration, Timer};
use embedded_io::ErrorKind;

/// Error surfaced by a scripted [`Step::Fail`].
#[derive(Debug)]
pub struct MockError(pub ErrorKind);

impl embedded_io::Error for MockError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// One scripted read outcome.
#[derive(Debug)]
pub enum Step {
    /// Bytes the port yields, possibly across several reads.
    Chunk(Vec<u8>),

    /// Bytes served one at a time, each preceded by a pause.
    Trickle(Duration, Vec<u8>),

    /// A port fault.
    Fail(ErrorKind),

    /// A read that never completes, standing in for a silent module.
    Stall,
}

/// A scripted serial port.
///
/// Reads are served from a queue of [`Step`]s in order; writes are captured
/// so tests can assert on the exact bytes sent.  An exhausted script reads
/// like a silent module.
pub struct MockPort {
    reads: VecDeque<Step>,
    pub written: Vec<u8>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            written: Vec::new(),
        }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.reads.push_back(Step::Chunk(chunk.to_vec()));
    }

    pub fn push_trickle(&mut self, delay: Duration, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.reads.push_back(Step::Trickle(delay, bytes.to_vec()));
        }
    }

    pub fn push_fail(&mut self, kind: ErrorKind) {
        self.reads.push_back(Step::Fail(kind));
    }

    pub fn push_stall(&mut self) {
        self.reads.push_back(Step::Stall);
    }
}

impl embedded_io::ErrorType for MockPort {
    type Error = MockError;
}

impl embedded_io_async::Read for MockPort {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.reads.pop_front() {
            Some(Step::Chunk(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunk.drain(..n);
                    self.reads.push_front(Step::Chunk(chunk));
                }
                Ok(n)
            }
            Some(Step::Trickle(delay, mut bytes)) => {
                Timer::after(delay).await;
                buf[0] = bytes.remove(0);
                if !bytes.is_empty() {
                    self.reads.push_front(Step::Trickle(delay, bytes));
                }
                Ok(1)
            }
            Some(Step::Fail(kind)) => Err(MockError(kind)),
            Some(Step::Stall) | None => {
                core::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

impl embedded_io_async::Write for MockPort {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
