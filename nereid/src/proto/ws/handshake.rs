use base64::Engine;
use sha1::{Digest, Sha1};

// RFC 6455 magic suffix appended to the client key before hashing.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the `Sec-WebSocket-Accept` token for a client key: SHA-1 over
/// the key plus the RFC 6455 suffix, base64-rendered. Pure function, always
/// 28 characters.
pub fn accept_key(sec_websocket_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(sec_websocket_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

#[derive(thiserror::Error, Debug)]
pub enum HandshakeError {
    #[error("invalid Sec-WebSocket-Key: {0:?}")]
    InvalidKey(String),
}

/// Check that a client key is the base64 rendering of a 16-byte nonce, as
/// required by RFC 6455. The upgrade itself does not insist on this; a
/// server that wants to reject malformed keys calls it up front.
pub fn validate_key(sec_websocket_key: &str) -> Result<(), HandshakeError> {
    match base64::engine::general_purpose::STANDARD.decode(sec_websocket_key) {
        Ok(nonce) if nonce.len() == 16 => Ok(()),
        _ => Err(HandshakeError::InvalidKey(sec_websocket_key.to_string())),
    }
}
