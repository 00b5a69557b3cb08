use std::error::Error;

/// Result type shared by every [`LogSink`] operation.
pub type SinkResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Blocking destination for encoded log records.
///
/// A sink only moves bytes. Level gating, context fields and JSON encoding
/// live in [`Logger`](crate::logger::Logger), so a new transport only has to
/// implement `send`.
pub trait LogSink: Send + Sync {
    /// Write one encoded record (a JSON object terminated by `\n`).
    ///
    /// **Parameters**
    /// - `payload`: the complete record; implementations must write it
    ///   with a single `write_all` so concurrent callers never interleave.
    ///
    /// **Returns**
    /// - `Ok(())` if the transport accepted every byte.
    /// - `Err(..)` on any I/O failure. The logger counts the record as
    ///   dropped and does not retry.
    fn send(&self, payload: &[u8]) -> SinkResult;

    /// Flush bytes buffered by the transport, if any.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> SinkResult {
        Ok(())
    }

    /// Flush and release the underlying handle.
    ///
    /// Called once by [`LoggerGuard`](crate::logger::LoggerGuard). After
    /// `close`, `send` is expected to fail.
    fn close(&self) -> SinkResult {
        self.flush()
    }
}
