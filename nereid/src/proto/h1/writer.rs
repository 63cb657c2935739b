use crate::common::transport::Transport;

// The socket layer only takes signed 32-bit sizes per call.
pub(crate) const MAX_WRITE_CHUNK: usize = i32::MAX as usize;

/// Wraps the raw transport write primitive and accounts for partial writes.
#[derive(Debug)]
pub struct BackpressureWriter<T> {
    transport: T,
}

impl<T: Transport> BackpressureWriter<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Queue bytes that must go out: status line, headers, chunk framing.
    /// The transport buffers whatever it cannot take immediately.
    pub(crate) fn raw(&mut self, data: &[u8]) {
        let _ = self.transport.write(data, false);
    }

    /// Push body bytes, issuing successive bounded writes until everything
    /// is accepted or a call reports failure. Returns `(accepted, failed)`.
    pub(crate) fn attempt(&mut self, data: &[u8], optional: bool) -> (usize, bool) {
        let mut written = 0;
        let mut failed = false;
        while written < data.len() && !failed {
            let end = data.len().min(written + MAX_WRITE_CHUNK);
            let (accepted, write_failed) = self.transport.write(&data[written..end], optional);
            written += accepted;
            failed = write_failed;
        }
        (written, failed)
    }

    pub(crate) fn timeout(&mut self, seconds: u32) {
        self.transport.arm_timeout(seconds);
    }

    pub(crate) fn is_corked(&self) -> bool {
        self.transport.is_corked()
    }

    pub(crate) fn can_cork(&self) -> bool {
        self.transport.can_cork()
    }

    pub(crate) fn cork(&mut self) {
        self.transport.cork();
    }

    pub(crate) fn uncork(&mut self) -> (usize, bool) {
        self.transport.uncork()
    }

    pub(crate) fn close(&mut self) {
        self.transport.close();
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    // Accepts one byte per call without ever failing; counts the calls.
    struct TrickleTransport {
        accepted: Vec<u8>,
        calls: usize,
    }

    impl Transport for TrickleTransport {
        fn write(&mut self, data: &[u8], _optional: bool) -> (usize, bool) {
            self.calls += 1;
            self.accepted.push(data[0]);
            (1, false)
        }

        fn cork(&mut self) {}

        fn uncork(&mut self) -> (usize, bool) {
            (0, false)
        }

        fn is_corked(&self) -> bool {
            false
        }

        fn can_cork(&self) -> bool {
            true
        }

        fn arm_timeout(&mut self, _seconds: u32) {}

        fn close(&mut self) {}

        fn take_queued(&mut self) -> Bytes {
            Bytes::new()
        }
    }

    #[test]
    fn attempt_loops_until_all_bytes_are_accepted() {
        let mut writer = BackpressureWriter::new(TrickleTransport {
            accepted: Vec::new(),
            calls: 0,
        });

        let (accepted, failed) = writer.attempt(b"hello", false);

        assert_eq!(accepted, 5);
        assert!(!failed);
        let transport = writer.into_transport();
        assert_eq!(transport.calls, 5);
        assert_eq!(transport.accepted, b"hello");
    }

    // Fails after accepting a prefix; the loop must stop immediately.
    struct SaturatedTransport {
        budget: usize,
    }

    impl Transport for SaturatedTransport {
        fn write(&mut self, data: &[u8], _optional: bool) -> (usize, bool) {
            let accepted = data.len().min(self.budget);
            self.budget -= accepted;
            (accepted, self.budget == 0)
        }

        fn cork(&mut self) {}

        fn uncork(&mut self) -> (usize, bool) {
            (0, false)
        }

        fn is_corked(&self) -> bool {
            false
        }

        fn can_cork(&self) -> bool {
            true
        }

        fn arm_timeout(&mut self, _seconds: u32) {}

        fn close(&mut self) {}

        fn take_queued(&mut self) -> Bytes {
            Bytes::new()
        }
    }

    #[test]
    fn attempt_reports_partial_acceptance_on_failure() {
        let mut writer = BackpressureWriter::new(SaturatedTransport { budget: 3 });

        let (accepted, failed) = writer.attempt(b"hello", true);

        assert_eq!(accepted, 3);
        assert!(failed);
    }
}
