use bytes::Bytes;

/// Contract against the owning non-blocking socket layer.
///
/// Every operation returns immediately. A write accepts what it can and
/// signals backpressure through its `failed` flag; non-optional bytes that
/// could not go out right away are queued by the transport itself and
/// drained behind the scenes. [`Transport::take_queued`] moves that queue
/// out, which is how an upgrade carries unsent bytes over to the new
/// connection.
pub trait Transport {
    /// Write up to a platform-bounded number of bytes.
    ///
    /// Returns `(bytes_accepted, failed)`. With `optional` set, bytes that
    /// do not fit are dropped rather than queued and the caller may retry
    /// later; without it, overflow is queued and `failed` merely reports
    /// that backpressure built up.
    fn write(&mut self, data: &[u8], optional: bool) -> (usize, bool);

    /// Engage corking; subsequent writes are batched until [`Transport::uncork`].
    fn cork(&mut self);

    /// Flush the corked batch. Returns `(bytes_flushed, failed)`.
    fn uncork(&mut self) -> (usize, bool);

    fn is_corked(&self) -> bool;

    /// Whether corking can be engaged at all right now.
    fn can_cork(&self) -> bool;

    /// Arm the connection timeout. Level-based: each call replaces any
    /// previous deadline.
    fn arm_timeout(&mut self, seconds: u32);

    /// Immediately terminate the connection.
    fn close(&mut self);

    /// Move out any bytes queued but not yet flushed.
    fn take_queued(&mut self) -> Bytes;
}
