use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::common::transport::Transport;
use crate::proto::h1::{HttpResponse, ParserSession};
use crate::proto::ws::extensions::{negotiate, CompressOptions, ExtensionOptions};
use crate::proto::ws::handshake;

/// Final per-connection compression decision after negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionMode {
    /// Whether permessage-deflate was negotiated at all.
    pub permessage_deflate: bool,
    /// Window/sharing mode actually applied to this socket. Stays at
    /// `Disabled` or `SharedCompressor` when the negotiation forbade a
    /// server-side sliding window, regardless of configuration.
    pub options: CompressOptions,
}

type OpenHandler<T, U> = Box<dyn FnMut(&mut WebSocketConnection<T, U>)>;

/// Per-context data for connections living as WebSockets: the compression
/// policy, the idle timeout, and the open reaction.
pub struct WebSocketContext<T, U> {
    compression: CompressOptions,
    idle_timeout_s: u32,
    open_handler: Option<OpenHandler<T, U>>,
}

impl<T, U> fmt::Debug for WebSocketContext<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketContext")
            .field("compression", &self.compression)
            .field("idle_timeout_s", &self.idle_timeout_s)
            .field("open_handler", &self.open_handler.is_some())
            .finish()
    }
}

impl<T, U> WebSocketContext<T, U> {
    pub fn new(compression: CompressOptions, idle_timeout_s: u32) -> Self {
        Self {
            compression,
            idle_timeout_s,
            open_handler: None,
        }
    }

    /// React to a connection opening under this context. Runs synchronously
    /// inside the upgrade, before the upgrade call returns.
    pub fn on_open(&mut self, handler: impl FnMut(&mut WebSocketConnection<T, U>) + 'static) {
        self.open_handler = Some(Box::new(handler));
    }

    pub fn compression(&self) -> CompressOptions {
        self.compression
    }

    pub fn idle_timeout_s(&self) -> u32 {
        self.idle_timeout_s
    }
}

/// A connection after the protocol transplant: the same physical transport,
/// now carrying WebSocket bookkeeping and the caller's payload.
pub struct WebSocketConnection<T, U> {
    transport: T,
    // Outbound bytes; leftover HTTP backpressure rides ahead of anything
    // the application queues after the upgrade.
    outbound: BytesMut,
    compression: CompressionMode,
    user_data: U,
}

impl<T, U> fmt::Debug for WebSocketConnection<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("outbound", &self.outbound.len())
            .field("compression", &self.compression)
            .finish()
    }
}

impl<T: Transport, U> WebSocketConnection<T, U> {
    fn new(transport: T, compression: CompressionMode, leftover: Bytes, user_data: U) -> Self {
        let mut outbound = BytesMut::with_capacity(leftover.len());
        outbound.extend_from_slice(&leftover);
        Self {
            transport,
            outbound,
            compression,
            user_data,
        }
    }

    /// Queue outbound bytes behind whatever is already waiting.
    pub fn queue(&mut self, data: &[u8]) {
        self.outbound.extend_from_slice(data);
    }

    /// Push queued bytes to the transport in order. Returns
    /// `(bytes_flushed, failed)`; unflushed bytes stay queued.
    pub fn flush(&mut self) -> (usize, bool) {
        let mut flushed = 0;
        let mut failed = false;
        while flushed < self.outbound.len() && !failed {
            let (accepted, write_failed) = self.transport.write(&self.outbound[flushed..], true);
            flushed += accepted;
            failed = write_failed;
        }
        let _ = self.outbound.split_to(flushed);
        (flushed, failed)
    }

    /// Bytes waiting to go out, oldest first.
    pub fn pending_bytes(&self) -> &[u8] {
        &self.outbound
    }

    pub fn compression(&self) -> CompressionMode {
        self.compression
    }

    pub fn user_data(&self) -> &U {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut U {
        &mut self.user_data
    }

    pub fn is_corked(&self) -> bool {
        self.transport.is_corked()
    }

    pub fn cork(&mut self) {
        self.transport.cork();
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    fn arm_idle_timeout(&mut self, seconds: u32) {
        self.transport.arm_timeout(seconds);
    }
}

impl<T: Transport> HttpResponse<T> {
    /// Upgrade this response's connection to a WebSocket. Typically called
    /// from an upgrade handler; the context's open reaction runs
    /// synchronously before this returns.
    ///
    /// Consumes the response: the returned connection owns the transport,
    /// any unsent backpressure bytes (scheduled ahead of new data) and the
    /// caller's payload. Body framing must not have begun on this response.
    pub fn upgrade<U>(
        mut self,
        user_data: U,
        sec_websocket_key: &str,
        sec_websocket_protocol: Option<&str>,
        sec_websocket_extensions: Option<&str>,
        context: &mut WebSocketContext<T, U>,
        session: Option<&mut ParserSession>,
    ) -> WebSocketConnection<T, U> {
        let accept = handshake::accept_key(sec_websocket_key);

        self.write_status("101 Switching Protocols")
            .write_header("Upgrade", "websocket")
            .write_header("Connection", "Upgrade")
            .write_header("Sec-WebSocket-Accept", &accept);

        // Select the first subprotocol if present, echoed back verbatim.
        if let Some(protocols) = sec_websocket_protocol {
            if !protocols.is_empty() {
                if let Some(first) = protocols.split(',').next() {
                    self.write_header("Sec-WebSocket-Protocol", first);
                }
            }
        }

        // Sharing a compressor is always allowed once permessage-deflate is
        // on; a per-socket window needs to survive negotiation below.
        let mut applied = match context.compression {
            CompressOptions::SharedCompressor => CompressOptions::SharedCompressor,
            _ => CompressOptions::Disabled,
        };
        let mut permessage_deflate = false;

        if context.compression != CompressOptions::Disabled {
            if let Some(offer) = sec_websocket_extensions.filter(|offer| !offer.is_empty()) {
                // The client never gets to compress with a sliding window.
                let wanted = ExtensionOptions {
                    permessage_deflate: true,
                    client_no_context_takeover: true,
                    server_no_context_takeover: context.compression
                        == CompressOptions::SharedCompressor,
                    ..Default::default()
                };

                let (negotiated, mut counter_offer) = negotiate(wanted, offer);

                if !counter_offer.is_empty() {
                    // We may use a smaller compression window than the
                    // protocol default; the dedicated sub-256KB tiers say so.
                    if let Some(bits) = context.compression.window_bits() {
                        counter_offer.push_str("; server_max_window_bits=");
                        counter_offer.push_str(&bits.to_string());
                    }
                    self.write_header("Sec-WebSocket-Extensions", &counter_offer);
                }

                permessage_deflate = negotiated.permessage_deflate;

                if !negotiated.server_no_context_takeover {
                    applied = context.compression;
                }
            }
        }

        tracing::debug!(
            permessage_deflate,
            options = ?applied,
            "websocket upgrade negotiated"
        );

        // Flush the status/header block with no body and no content-length
        // framing; upgraded connections carry no HTTP body.
        self.internal_end(&[], 0, false, false);

        // Extract everything the new connection inherits before the old
        // response goes away. The leftover buffer is moved, never copied,
        // so the bytes cannot be transmitted twice.
        let mut writer = self.into_writer();
        let leftover = writer.transport_mut().take_queued();
        let was_corked = writer.is_corked();
        let transport = writer.into_transport();

        let mut connection = WebSocketConnection::new(
            transport,
            CompressionMode {
                permessage_deflate,
                options: applied,
            },
            leftover,
            user_data,
        );

        // For whatever reason we were corked, carry the cork over.
        if was_corked && !connection.is_corked() {
            connection.cork();
        }

        // Only meaningful inside the parser; an "async" upgrade has no
        // dispatch to redirect.
        if let Some(session) = session {
            if session.is_parsing() {
                session.mark_upgraded();
            }
        }

        // The WebSocket idle timeout takes over from the HTTP one.
        connection.arm_idle_timeout(context.idle_timeout_s);

        if let Some(handler) = context.open_handler.as_mut() {
            handler(&mut connection);
        }

        connection
    }
}
