pub mod extensions;
pub mod handshake;
mod upgrade;

pub use extensions::{negotiate, CompressOptions, ExtensionOptions};
pub use handshake::{accept_key, validate_key, HandshakeError};
pub use upgrade::{CompressionMode, WebSocketConnection, WebSocketContext};
