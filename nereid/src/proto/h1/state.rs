use std::fmt;

/// Lifecycle of a single response on the wire.
///
/// The phase only moves forward. The body framing choice is made exactly
/// once, and chunked framing can never coexist with a declared length since
/// the two are separate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    /// Nothing has been emitted yet; an explicit status is still honored.
    AwaitingStatus,
    /// The status line is on the wire; headers may follow.
    StatusWritten,
    /// `Content-Length` has been sent; only the declared bytes may follow.
    FixedBody { declared: u64 },
    /// `Transfer-Encoding: chunked` has been sent.
    ChunkedBody,
    /// The response completed normally.
    Done,
    /// The connection closed while the response was pending.
    Aborted,
}

impl ResponsePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ResponsePhase::Done | ResponsePhase::Aborted)
    }
}

/// Reaction to the transport draining backpressure.
pub trait WritableHandler {
    /// `available` is the body byte offset that is now writable. Return
    /// `false` to drop the handler.
    fn on_writable(&mut self, available: u64) -> bool;
}

impl<F> WritableHandler for F
where
    F: FnMut(u64) -> bool,
{
    fn on_writable(&mut self, available: u64) -> bool {
        (self)(available)
    }
}

/// Reaction to the connection closing before the response completed.
pub trait AbortHandler {
    fn on_aborted(&mut self);
}

impl<F> AbortHandler for F
where
    F: FnMut(),
{
    fn on_aborted(&mut self) {
        (self)()
    }
}

/// Reaction to inbound body bytes associated with this response.
pub trait DataHandler {
    /// `last` is set on the final segment of the request body.
    fn on_data(&mut self, chunk: &[u8], last: bool);
}

impl<F> DataHandler for F
where
    F: FnMut(&[u8], bool),
{
    fn on_data(&mut self, chunk: &[u8], last: bool) {
        (self)(chunk, last)
    }
}

/// The three user-supplied reaction slots of a response.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    pub(crate) on_writable: Option<Box<dyn WritableHandler>>,
    pub(crate) on_aborted: Option<Box<dyn AbortHandler>>,
    pub(crate) on_data: Option<Box<dyn DataHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("on_writable", &self.on_writable.is_some())
            .field("on_aborted", &self.on_aborted.is_some())
            .field("on_data", &self.on_data.is_some())
            .finish()
    }
}

/// Per-response data, owned by the connection until the response completes
/// or the connection upgrades.
#[derive(Debug)]
pub(crate) struct ResponseState {
    pub(crate) phase: ResponsePhase,
    /// Body bytes handed to the transport so far; excludes the status line
    /// and headers. Monotonically non-decreasing.
    pub(crate) offset: u64,
    pub(crate) handlers: HandlerRegistry,
}

impl ResponseState {
    pub(crate) fn new() -> Self {
        Self {
            phase: ResponsePhase::AwaitingStatus,
            offset: 0,
            handlers: HandlerRegistry::default(),
        }
    }

    /// Whether the response still owns the connection.
    pub(crate) fn pending(&self) -> bool {
        !self.phase.is_terminal()
    }

    /// Normal completion. Drops the abort and writable slots: neither
    /// notification is meaningful once the response is over, even if the
    /// transport is still draining behind the scenes.
    pub(crate) fn mark_done(&mut self) {
        self.handlers.on_aborted = None;
        self.handlers.on_writable = None;
        self.phase = ResponsePhase::Done;
    }

    /// Transition to `Aborted` and hand out the abort handler so it can
    /// fire exactly once. All other slots become inert.
    pub(crate) fn mark_aborted(&mut self) -> Option<Box<dyn AbortHandler>> {
        let handler = self.handlers.on_aborted.take();
        self.handlers.on_writable = None;
        self.handlers.on_data = None;
        self.phase = ResponsePhase::Aborted;
        handler
    }
}
