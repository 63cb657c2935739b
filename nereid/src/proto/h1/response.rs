use std::fmt;

use crate::common::transport::Transport;
use crate::proto::h1::state::{
    AbortHandler, DataHandler, ResponsePhase, ResponseState, WritableHandler,
};
use crate::proto::h1::writer::BackpressureWriter;
use crate::proto::h1::{HTTP_200_OK, HTTP_TIMEOUT_S};

/// Construction-time configuration for the response engine.
#[derive(Debug, Clone)]
pub struct ResponseConfig {
    /// Emit the identification header (`Nereid: <major version>`) once per
    /// response, right before the body framing is chosen.
    pub identification_header: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            identification_header: true,
        }
    }
}

/// The channel on which a reply is framed back onto the wire.
///
/// Presents an abuse-tolerant, append-only surface: writing a second status
/// or pushing bytes after completion is silently dropped rather than
/// escalated. Transport saturation is not an error either, only a
/// flow-control signal surfaced as a `false`/`failed` result.
pub struct HttpResponse<T> {
    pub(crate) writer: BackpressureWriter<T>,
    pub(crate) state: ResponseState,
    pub(crate) config: ResponseConfig,
}

impl<T> fmt::Debug for HttpResponse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("phase", &self.state.phase)
            .field("offset", &self.state.offset)
            .finish()
    }
}

impl<T: Transport> HttpResponse<T> {
    pub fn new(transport: T, config: ResponseConfig) -> Self {
        Self {
            writer: BackpressureWriter::new(transport),
            state: ResponseState::new(),
            config,
        }
    }

    /// Write `100 Continue`; can be done any amount of times.
    pub fn write_continue(&mut self) -> &mut Self {
        if self.state.pending() {
            self.writer.raw(b"HTTP/1.1 100 Continue\r\n\r\n");
        }
        self
    }

    /// Write the status line. Only the first call is honored; a response
    /// carries exactly one status and a later call cannot corrupt a
    /// half-sent line.
    pub fn write_status(&mut self, status: &str) -> &mut Self {
        if self.state.phase != ResponsePhase::AwaitingStatus {
            return self;
        }
        self.state.phase = ResponsePhase::StatusWritten;

        self.writer.raw(b"HTTP/1.1 ");
        self.writer.raw(status.as_bytes());
        self.writer.raw(b"\r\n");
        self
    }

    /// Write a header line. Forces the default status out first, and is
    /// dropped once body framing has begun.
    pub fn write_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.write_status(HTTP_200_OK);

        match self.state.phase {
            ResponsePhase::StatusWritten => {}
            _ => return self,
        }

        self.writer.raw(key.as_bytes());
        self.writer.raw(b": ");
        self.writer.raw(value.as_bytes());
        self.writer.raw(b"\r\n");
        self
    }

    /// Write a header line with an unsigned integer value.
    pub fn write_header_int(&mut self, key: &str, value: u64) -> &mut Self {
        let mut buf = itoa_buf();
        self.write_header(key, format_u64(value, &mut buf))
    }

    /// Write a part of the response body in chunked fashion. Returns whether
    /// it is feasible to write more data right now; on failure the stall
    /// timeout has been armed.
    ///
    /// Zero-length chunks mark the end of a response and are never emitted
    /// from here. Calling this after fixed-length framing has begun, or
    /// after completion, drops the bytes by design.
    pub fn write(&mut self, data: &[u8]) -> bool {
        self.write_status(HTTP_200_OK);

        if data.is_empty() {
            return true;
        }

        match self.state.phase {
            ResponsePhase::StatusWritten => {
                tracing::trace!("entering chunked transfer-encoding");
                self.write_mark();
                self.write_header("Transfer-Encoding", "chunked");
                self.state.phase = ResponsePhase::ChunkedBody;
            }
            ResponsePhase::ChunkedBody => {}
            _ => return true,
        }

        let mut buf = itoa_buf();
        let length = format_hex(data.len() as u64, &mut buf);
        self.writer.raw(b"\r\n");
        self.writer.raw(length.as_bytes());
        self.writer.raw(b"\r\n");

        let (_written, failed) = self.writer.attempt(data, false);
        if failed {
            tracing::trace!("chunk write stalled, arming timeout");
            self.writer.timeout(HTTP_TIMEOUT_S);
        }

        !failed
    }

    /// End the response with an optional final data chunk. Always arms the
    /// stall/drain timeout.
    pub fn end(&mut self, data: &[u8]) {
        self.internal_end(data, data.len() as u64, false, true);
    }

    /// Try to end the response, tolerating backpressure: the final bytes
    /// may be dropped and retried from the writable notification. Returns
    /// `(ok, has_responded)`.
    pub fn try_end(&mut self, data: &[u8], total_size: u64) -> (bool, bool) {
        let ok = self.internal_end(data, total_size, true, true);
        (ok, self.has_responded())
    }

    /// Corks the response if possible; an already corked or uncorkable
    /// transport just runs the handler as-is. Correctness never depends on
    /// the cork, only batching does.
    pub fn cork(&mut self, handler: impl FnOnce(&mut Self)) -> &mut Self {
        if !self.writer.is_corked() && self.writer.can_cork() {
            self.writer.cork();
            handler(self);

            // Most writes succeed while corked; the flush is where a stalled
            // peer shows up.
            let (_flushed, failed) = self.writer.uncork();
            if failed {
                self.writer.timeout(HTTP_TIMEOUT_S);
            }
        } else {
            handler(self);
        }
        self
    }

    /// Current body byte offset handed to the transport. Excludes the
    /// status line and headers.
    pub fn write_offset(&self) -> u64 {
        self.state.offset
    }

    /// Whether we have fully responded and are ready for another request.
    pub fn has_responded(&self) -> bool {
        self.state.phase == ResponsePhase::Done
    }

    pub fn phase(&self) -> ResponsePhase {
        self.state.phase
    }

    /// Attach a reaction to backpressure draining. Ignored once the
    /// response is over, since the slot would never fire again.
    pub fn on_writable(&mut self, handler: impl WritableHandler + 'static) -> &mut Self {
        if self.state.pending() {
            self.state.handlers.on_writable = Some(Box::new(handler));
        }
        self
    }

    /// Attach a reaction to the connection closing before completion.
    pub fn on_aborted(&mut self, handler: impl AbortHandler + 'static) -> &mut Self {
        if self.state.pending() {
            self.state.handlers.on_aborted = Some(Box::new(handler));
        }
        self
    }

    /// Attach a reaction to inbound request body segments.
    pub fn on_data(&mut self, handler: impl DataHandler + 'static) -> &mut Self {
        if self.state.pending() {
            self.state.handlers.on_data = Some(Box::new(handler));
        }
        self
    }

    /// Drain notification from the transport. Returns whether a handler ran
    /// and asked to be kept.
    pub fn notify_writable(&mut self, available: u64) -> bool {
        if !self.state.pending() {
            return false;
        }
        let mut handler = match self.state.handlers.on_writable.take() {
            Some(handler) => handler,
            None => return false,
        };

        let keep = handler.on_writable(available);

        // The handler may have finished the response or swapped the slot.
        if keep && self.state.pending() && self.state.handlers.on_writable.is_none() {
            self.state.handlers.on_writable = Some(handler);
        }
        keep
    }

    /// Inbound body segment from the parser. `last` is set on the final
    /// segment.
    pub fn notify_data(&mut self, chunk: &[u8], last: bool) {
        if !self.state.pending() {
            return;
        }
        if let Some(handler) = self.state.handlers.on_data.as_mut() {
            handler.on_data(chunk, last);
        }
    }

    /// The connection closed while this response was pending. Fires the
    /// abort handler exactly once; every slot is inert afterwards.
    pub fn abort(&mut self) {
        if !self.state.pending() {
            return;
        }
        tracing::trace!(offset = self.state.offset, "response aborted");
        if let Some(mut handler) = self.state.mark_aborted() {
            handler.on_aborted();
        }
    }

    /// Immediately terminate this response and its connection.
    pub fn close(&mut self) {
        self.writer.close();
        self.abort();
    }

    // Identification header; emitted once per response unless suppressed.
    // Propagates onto upgraded connections too.
    pub(crate) fn write_mark(&mut self) {
        if self.config.identification_header {
            // Major version only.
            self.write_header("Nereid", env!("CARGO_PKG_VERSION_MAJOR"));
        }
    }

    // Shared finalization path. Returns true on success, indicating that it
    // might be feasible to write more data. Arms the timeout when the
    // stream reaches its total size or a write fails; partial progress
    // below the total arms nothing, the drain notification covers it.
    pub(crate) fn internal_end(
        &mut self,
        data: &[u8],
        total_size: u64,
        optional: bool,
        allow_content_length: bool,
    ) -> bool {
        self.write_status(HTTP_200_OK);

        // With no total size given, this chunk is the entire body.
        let mut total = total_size;
        if total == 0 {
            total = data.len() as u64;
        }

        match self.state.phase {
            ResponsePhase::ChunkedBody => {
                // No best-effort variant in chunked mode; `optional` is
                // ignored on this path.
                if !data.is_empty() {
                    let mut buf = itoa_buf();
                    let length = format_hex(data.len() as u64, &mut buf);
                    self.writer.raw(b"\r\n");
                    self.writer.raw(length.as_bytes());
                    self.writer.raw(b"\r\n");
                    self.writer.raw(data);
                }

                // Terminating zero chunk.
                self.writer.raw(b"\r\n0\r\n\r\n");

                self.state.mark_done();
                self.writer.timeout(HTTP_TIMEOUT_S);
                true
            }

            // Finalizing twice is a no-op on the wire.
            ResponsePhase::Done | ResponsePhase::Aborted => true,

            phase => {
                let declared = match phase {
                    ResponsePhase::FixedBody { declared } => declared,
                    _ => {
                        // First finalization call chooses fixed framing.
                        self.write_mark();

                        if allow_content_length {
                            // Even zero is a valid content-length.
                            let mut buf = itoa_buf();
                            self.writer.raw(b"Content-Length: ");
                            self.writer.raw(format_u64(total, &mut buf).as_bytes());
                            self.writer.raw(b"\r\n\r\n");
                        } else {
                            // Upgrades carry no HTTP body.
                            self.writer.raw(b"\r\n");
                        }

                        self.state.phase = ResponsePhase::FixedBody { declared: total };
                        total
                    }
                };

                let (written, failed) = self.writer.attempt(data, optional);
                self.state.offset += written as u64;

                // Success is when we wrote the entire thing without any
                // failures.
                let success = written == data.len() && !failed;

                if !success || self.state.offset == declared {
                    self.writer.timeout(HTTP_TIMEOUT_S);
                }

                if self.state.offset == declared {
                    self.state.mark_done();
                }

                success
            }
        }
    }

    pub(crate) fn into_writer(self) -> BackpressureWriter<T> {
        self.writer
    }
}

// Small stack buffer for integer rendering on the write path.
fn itoa_buf() -> [u8; 20] {
    [0u8; 20]
}

fn format_u64(mut value: u64, buf: &mut [u8; 20]) -> &str {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    // Digits only, always valid UTF-8.
    std::str::from_utf8(&buf[pos..]).unwrap_or("0")
}

fn format_hex(mut value: u64, buf: &mut [u8; 20]) -> &str {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = DIGITS[(value & 0xf) as usize];
        value >>= 4;
        if value == 0 {
            break;
        }
    }
    std::str::from_utf8(&buf[pos..]).unwrap_or("0")
}
