//! permessage-deflate parameter negotiation (server side).
//!
//! The offer grammar is deliberately kept behind [`negotiate`]: callers pass
//! the raw `Sec-WebSocket-Extensions` value and the options they are willing
//! to grant, and get back the agreed options plus the textual counter-offer.

/// Per-context compression policy: no compression, one compressor shared by
/// every socket, or a dedicated per-socket compressor in one of the size
/// tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressOptions {
    Disabled,
    SharedCompressor,
    DedicatedCompressor3Kb,
    DedicatedCompressor4Kb,
    DedicatedCompressor8Kb,
    DedicatedCompressor16Kb,
    DedicatedCompressor32Kb,
    DedicatedCompressor64Kb,
    DedicatedCompressor128Kb,
    DedicatedCompressor256Kb,
}

impl CompressOptions {
    pub fn is_dedicated(self) -> bool {
        !matches!(
            self,
            CompressOptions::Disabled | CompressOptions::SharedCompressor
        )
    }

    /// Deflate window bits advertised for the dedicated tiers. The 256KB
    /// tier is the protocol default (15 bits) and is never advertised
    /// explicitly; shared and disabled modes advertise nothing.
    pub fn window_bits(self) -> Option<u8> {
        match self {
            CompressOptions::DedicatedCompressor3Kb | CompressOptions::DedicatedCompressor4Kb => {
                Some(9)
            }
            CompressOptions::DedicatedCompressor8Kb => Some(10),
            CompressOptions::DedicatedCompressor16Kb => Some(11),
            CompressOptions::DedicatedCompressor32Kb => Some(12),
            CompressOptions::DedicatedCompressor64Kb => Some(13),
            CompressOptions::DedicatedCompressor128Kb => Some(14),
            _ => None,
        }
    }
}

/// Option flags exchanged during extension negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtensionOptions {
    pub permessage_deflate: bool,
    /// The server promises not to reuse its compression window across
    /// messages.
    pub server_no_context_takeover: bool,
    /// The client is forbidden to reuse its compression window across
    /// messages.
    pub client_no_context_takeover: bool,
    /// Window-bits cap offered by the client for the server's compressor.
    pub server_max_window_bits: Option<u8>,
    /// Window-bits cap the client is prepared to use itself.
    pub client_max_window_bits: Option<u8>,
}

/// Negotiate a client's `Sec-WebSocket-Extensions` offer against the
/// options the server wants to grant.
///
/// Only `permessage-deflate` is understood; the first such proposal in the
/// comma-separated offer wins. Returns the negotiated options and the
/// counter-offer to echo back, empty when nothing was agreed. Whatever the
/// client proposed, the counter-offer carries `client_no_context_takeover`
/// whenever `wanted` forbids it: the server never grants the client a
/// sliding window it is not prepared to track.
pub fn negotiate(wanted: ExtensionOptions, offer: &str) -> (ExtensionOptions, String) {
    let mut negotiated = ExtensionOptions::default();
    let mut counter_offer = String::new();

    if !wanted.permessage_deflate {
        return (negotiated, counter_offer);
    }

    for proposal in offer.split(',') {
        let mut params = proposal.split(';').map(str::trim);
        if params.next() != Some("permessage-deflate") {
            continue;
        }

        negotiated.permessage_deflate = true;
        counter_offer.push_str("permessage-deflate");

        for param in params {
            let (name, value) = match param.find('=') {
                Some(idx) => (param[..idx].trim_end(), Some(param[idx + 1..].trim())),
                None => (param, None),
            };
            match name {
                "client_no_context_takeover" => negotiated.client_no_context_takeover = true,
                "server_no_context_takeover" => negotiated.server_no_context_takeover = true,
                "server_max_window_bits" => {
                    negotiated.server_max_window_bits = value.and_then(|v| v.parse().ok());
                }
                "client_max_window_bits" => {
                    // Parameter may appear bare, meaning "pick for me".
                    negotiated.client_max_window_bits =
                        value.and_then(|v| v.parse().ok()).or(Some(15));
                }
                _ => {}
            }
        }

        if wanted.client_no_context_takeover {
            negotiated.client_no_context_takeover = true;
        }
        if negotiated.client_no_context_takeover {
            counter_offer.push_str("; client_no_context_takeover");
        }

        if wanted.server_no_context_takeover {
            negotiated.server_no_context_takeover = true;
        }
        if negotiated.server_no_context_takeover {
            counter_offer.push_str("; server_no_context_takeover");
        }

        break;
    }

    (negotiated, counter_offer)
}
