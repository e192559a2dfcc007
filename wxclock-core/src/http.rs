// Copyright (C) 2025 wxclock contributors
//
// MIT License

//! HTTP request builder and reply body locator.
//!
//! wxclock talks plain HTTP/1.1 to a ThingHTTP relay.  Requests are built
//! into a fixed capacity buffer so the byte count can be quoted to the WiFi
//! module before the bytes themselves are sent.  Replies arrive wrapped in
//! the module's `+IPD` framing, so the body locator scans forward to the
//! status line before parsing headers.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use core::fmt::Write as _;
use core::ops::Range;
use heapless::String;

use crate::{COMMAND_CAPACITY, Error, find_subslice};

/// Host the relay requests are addressed to.
pub const RELAY_HOST: &str = "api.thingspeak.com";

/// Header asking the relay to close the TCP link after replying.
///
/// Not sent by default: both fields are fetched over one link, and the
/// second fetch needs the link still open.
pub const CONNECTION_CLOSE: &str = "Connection: close\r\n";

/// Headers expected in a relay reply.  ThingHTTP sends half this many.
const MAX_HEADERS: usize = 16;

/// A ThingHTTP GET request for one relay-side API key.
///
/// [`Request::render()`] produces the exact bytes to send.  The length of
/// the rendered request is quoted in `AT+CIPSEND`, so rendering happens
/// before any byte reaches the module.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    api_key: &'a str,
    close: bool,
}

impl<'a> Request<'a> {
    /// Creates a request for `api_key`, leaving the TCP link open after the
    /// reply.
    pub const fn new(api_key: &'a str) -> Self {
        Self {
            api_key,
            close: false,
        }
    }

    /// Asks the relay to close the TCP link after replying.
    pub const fn with_close(self) -> Self {
        Self {
            close: true,
            ..self
        }
    }

    /// Renders the request into a fixed capacity buffer.
    ///
    /// Returns:
    /// - `Ok(String)` containing the request bytes
    /// - `Err(Error::BufferOverflow)` if the API key pushes the request past
    ///   [`COMMAND_CAPACITY`]
    pub fn render(&self) -> Result<String<COMMAND_CAPACITY>, Error> {
        let mut out = String::new();
        write!(
            out,
            "GET /apps/thinghttp/send_request?api_key={} HTTP/1.1\r\nHost: {RELAY_HOST}\r\n",
            self.api_key
        )
        .map_err(|_| Error::BufferOverflow)?;
        if self.close {
            out.push_str(CONNECTION_CLOSE)
                .map_err(|_| Error::BufferOverflow)?;
        }
        out.push_str("\r\n").map_err(|_| Error::BufferOverflow)?;
        Ok(out)
    }
}

/// Locates the HTTP body within a collected payload.
///
/// Scans forward to the status line, then parses the headers to find where
/// they end.  Everything after the blank line is body, module framing and
/// all trailing status lines included, which is why field extraction works
/// on offsets into the whole payload rather than this range alone.
///
/// Returns:
/// - `Ok(Range)` spanning the body bytes within `raw`
/// - `Err(Error::MalformedResponse)` if no status line is present or the
///   headers never complete
pub fn locate_body(raw: &[u8]) -> Result<Range<usize>, Error> {
    let Some(start) = find_subslice(raw, b"HTTP/") else {
        debug!("Error: No status line in reply");
        return Err(Error::MalformedResponse);
    };

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(&raw[start..]) {
        Ok(httparse::Status::Complete(len)) => Ok(start + len..raw.len()),
        Ok(httparse::Status::Partial) => {
            debug!("Error: Reply headers incomplete");
            Err(Error::MalformedResponse)
        }
        Err(e) => {
            debug!("Error: Failed to parse reply headers: {e}");
            Err(Error::MalformedResponse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "GPZOQ1CYCORFIET5";

    #[test]
    fn render_request() {
        let request = Request::new(KEY).render().unwrap();
        assert_eq!(
            request.as_str(),
            "GET /apps/thinghttp/send_request?api_key=GPZOQ1CYCORFIET5 \
             HTTP/1.1\r\nHost: api.thingspeak.com\r\n\r\n"
        );
        assert_eq!(request.len(), 96);
    }

    #[test]
    fn render_request_with_close() {
        let request = Request::new(KEY).with_close().render().unwrap();
        assert!(request.as_str().contains("Connection: close\r\n"));
        assert!(request.as_str().ends_with("\r\n\r\n"));
        assert_eq!(request.len(), 115);
    }

    #[test]
    fn body_after_framed_headers() {
        let raw = b"\r\n+IPD,0,78:HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n12:30:45 PM Sat";
        let body = locate_body(raw).unwrap();
        assert_eq!(&raw[body], b"12:30:45 PM Sat");
    }

    #[test]
    fn body_range_spans_to_end() {
        let raw = b"+IPD,0,60:HTTP/1.1 200 OK\r\n\r\nabc\r\nOK\r\n";
        let body = locate_body(raw).unwrap();
        assert_eq!(&raw[body], b"abc\r\nOK\r\n");
    }

    #[test]
    fn missing_status_line() {
        assert_eq!(
            locate_body(b"SEND OK\r\nnothing here"),
            Err(Error::MalformedResponse)
        );
    }

    #[test]
    fn truncated_headers() {
        assert_eq!(
            locate_body(b"HTTP/1.1 200 OK\r\nContent-Type: text/pl"),
            Err(Error::MalformedResponse)
        );
    }
}
