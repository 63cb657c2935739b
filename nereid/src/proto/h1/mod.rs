// Status used when none was written explicitly.
pub(crate) const HTTP_200_OK: &str = "200 OK";

// Stall/drain timeout for HTTP sockets, in seconds.
pub(crate) const HTTP_TIMEOUT_S: u32 = 10;

mod response;
mod state;
mod writer;

pub use response::{HttpResponse, ResponseConfig};
pub use state::{AbortHandler, DataHandler, ResponsePhase, WritableHandler};

/// Bookkeeping shared with the request parser driving this engine.
///
/// When an upgrade happens while a request is still being dispatched, the
/// parser must learn that the socket identity changed under it and redirect
/// any further actions to the new connection.
#[derive(Debug, Default)]
pub struct ParserSession {
    parsing: bool,
    upgraded: bool,
}

impl ParserSession {
    pub fn new() -> Self {
        Default::default()
    }

    /// The parser entered the dispatch of a request.
    pub fn begin_dispatch(&mut self) {
        self.parsing = true;
        self.upgraded = false;
    }

    /// The parser left the dispatch of a request.
    pub fn end_dispatch(&mut self) {
        self.parsing = false;
    }

    pub fn is_parsing(&self) -> bool {
        self.parsing
    }

    /// Whether the socket was upgraded mid-dispatch.
    pub fn took_upgrade(&self) -> bool {
        self.upgraded
    }

    pub(crate) fn mark_upgraded(&mut self) {
        self.upgraded = true;
    }
}
