#![allow(dead_code)]

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use bytes::Bytes;
use nereid::{HttpResponse, ResponseConfig, Transport};

/// Scripted in-memory transport. Accepts everything by default; a capacity
/// simulates a saturated socket, in which case non-optional overflow lands
/// in the internal queue exactly like the real socket layer would buffer it.
pub struct MockTransport {
    /// Bytes accepted, i.e. what went on the wire.
    pub wire: Vec<u8>,
    /// Buffered overflow awaiting drain.
    pub queued: Vec<u8>,
    /// Remaining acceptance budget; `None` accepts everything.
    pub capacity: Option<usize>,
    pub corked: bool,
    pub can_cork: bool,
    pub uncork_fails: bool,
    pub timeouts: Vec<u32>,
    pub closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            wire: Vec::new(),
            queued: Vec::new(),
            capacity: None,
            corked: false,
            can_cork: true,
            uncork_fails: false,
            timeouts: Vec::new(),
            closed: false,
        }
    }

    pub fn wire_str(&self) -> String {
        String::from_utf8_lossy(&self.wire).into_owned()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8], optional: bool) -> (usize, bool) {
        let budget = self.capacity.unwrap_or(usize::MAX);
        let accepted = data.len().min(budget);
        self.wire.extend_from_slice(&data[..accepted]);
        if let Some(capacity) = self.capacity.as_mut() {
            *capacity -= accepted;
        }

        if accepted < data.len() {
            if optional {
                (accepted, true)
            } else {
                self.queued.extend_from_slice(&data[accepted..]);
                (data.len(), true)
            }
        } else {
            (accepted, false)
        }
    }

    fn cork(&mut self) {
        self.corked = true;
    }

    fn uncork(&mut self) -> (usize, bool) {
        self.corked = false;
        (0, self.uncork_fails)
    }

    fn is_corked(&self) -> bool {
        self.corked
    }

    fn can_cork(&self) -> bool {
        self.can_cork
    }

    fn arm_timeout(&mut self, seconds: u32) {
        self.timeouts.push(seconds);
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn take_queued(&mut self) -> Bytes {
        Bytes::from(mem::take(&mut self.queued))
    }
}

/// Cloneable handle so tests can inspect the transport after the response
/// (or the upgraded connection) has taken ownership of it.
#[derive(Clone)]
pub struct SharedTransport(pub Rc<RefCell<MockTransport>>);

impl Transport for SharedTransport {
    fn write(&mut self, data: &[u8], optional: bool) -> (usize, bool) {
        self.0.borrow_mut().write(data, optional)
    }

    fn cork(&mut self) {
        self.0.borrow_mut().cork();
    }

    fn uncork(&mut self) -> (usize, bool) {
        self.0.borrow_mut().uncork()
    }

    fn is_corked(&self) -> bool {
        self.0.borrow().is_corked()
    }

    fn can_cork(&self) -> bool {
        self.0.borrow().can_cork()
    }

    fn arm_timeout(&mut self, seconds: u32) {
        self.0.borrow_mut().arm_timeout(seconds);
    }

    fn close(&mut self) {
        self.0.borrow_mut().close();
    }

    fn take_queued(&mut self) -> Bytes {
        self.0.borrow_mut().take_queued()
    }
}

pub type Handle = Rc<RefCell<MockTransport>>;

pub fn response() -> (HttpResponse<SharedTransport>, Handle) {
    response_with(ResponseConfig::default(), None)
}

pub fn response_plain() -> (HttpResponse<SharedTransport>, Handle) {
    response_with(
        ResponseConfig {
            identification_header: false,
        },
        None,
    )
}

pub fn response_with(
    config: ResponseConfig,
    capacity: Option<usize>,
) -> (HttpResponse<SharedTransport>, Handle) {
    let handle = Rc::new(RefCell::new(MockTransport::new()));
    handle.borrow_mut().capacity = capacity;
    let response = HttpResponse::new(SharedTransport(handle.clone()), config);
    (response, handle)
}
