//! Per-connection HTTP/1.1 response engine for event-driven servers.
//!
//! A [`HttpResponse`] frames a reply onto a non-blocking transport under one
//! of three write disciplines (fixed content-length, chunked
//! transfer-encoding, backpressure-aware streaming) and is the point where a
//! connection upgrades from HTTP to WebSocket without losing buffered bytes
//! or application state.
//!
//! The engine never blocks: every write returns immediately with a
//! partial-success indication, and callers resume from the transport's drain
//! notification. The transport itself (sockets, TLS, the event loop) is
//! supplied by the caller through the [`Transport`] trait.

#![forbid(unsafe_code)]

pub mod common;
pub mod proto;

pub use crate::common::transport::Transport;
pub use crate::proto::h1::{
    HttpResponse, ParserSession, ResponseConfig, ResponsePhase,
};
pub use crate::proto::ws::{
    accept_key, CompressOptions, CompressionMode, WebSocketConnection, WebSocketContext,
};
