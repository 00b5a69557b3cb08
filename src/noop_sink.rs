use crate::sink::{LogSink, SinkResult};

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of gating and encoding without any
/// I/O, and for callers that want logging switched off entirely.
#[derive(Clone, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn send(&self, _payload: &[u8]) -> SinkResult {
        Ok(())
    }
}
