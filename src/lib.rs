pub mod record;
pub mod sink;
pub mod logger;
pub mod layer;

pub mod tcp_sink;
pub mod file_sink;
pub mod noop_sink;

pub mod backend;
pub mod env;
pub mod init;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Target of the crate's own diagnostics; the `tracing` bridge never
/// forwards it back into a logger.
pub(crate) const INTERNAL_TARGET: &str = "observability_shim::internal";

pub use logger::{FatalHook, Logger, LoggerConfig, LoggerError, LoggerGuard};
pub use record::{Field, Level};
pub use sink::LogSink;
