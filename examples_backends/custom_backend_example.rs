use std::io::Write;
use std::sync::Arc;

use observability_shim::sink::SinkResult;
use observability_shim::{Field, LogSink, Logger, LoggerConfig};

/// Example of integrating a completely custom transport by implementing
/// the `LogSink` trait directly. Imagine this hands records to some
/// proprietary agent for which this crate does not provide a built-in
/// sink.
struct StdoutSink;

impl LogSink for StdoutSink {
    fn send(&self, payload: &[u8]) -> SinkResult {
        let mut out = std::io::stdout().lock();
        out.write_all(b"[my-agent] ")?;
        out.write_all(payload)?;
        Ok(())
    }

    fn flush(&self) -> SinkResult {
        std::io::stdout().flush()?;
        Ok(())
    }
}

fn main() {
    let (logger, guard) =
        Logger::with_sink(Arc::new(StdoutSink), LoggerConfig::new("custom-backend"));

    logger.info("custom backend example started", []);
    logger.error("simulated error sent via custom backend", [Field::new("agent", "my-agent")]);

    if let Err(e) = guard.close() {
        eprintln!("close failed: {}", e);
    }
}
