use crate::backend::{make_sink_from_config, parse_dsn, DsnError};
use crate::env::{env_or, LOG_SINK_ENV_ENV, LOG_SINK_LEVEL_ENV, LOG_SINK_SERVICE_NAME_ENV};
use crate::file_sink::FileSink;
use crate::record::{Field, Level, LogRecord};
use crate::sink::{LogSink, SinkResult};
use crate::tcp_sink::TcpSink;
use std::fmt;
use std::io;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Environment label attached to every record unless configured otherwise.
pub const DEFAULT_ENV: &str = "dev";

/// What a [`Logger`] does once a `fatal` record has been written and the
/// transport flushed.
#[derive(Clone, Default)]
pub enum FatalHook {
    /// Terminate the process with exit code 1.
    #[default]
    Exit,
    /// Panic with the record's message.
    Panic,
    /// Return to the caller as for any other level.
    Noop,
    /// Call back with the record's message.
    Custom(Arc<dyn Fn(&str) + Send + Sync>),
}

impl FatalHook {
    pub fn custom(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        FatalHook::Custom(Arc::new(hook))
    }

    fn run(&self, message: &str) {
        match self {
            FatalHook::Exit => std::process::exit(1),
            FatalHook::Panic => panic!("fatal log record: {message}"),
            FatalHook::Noop => {}
            FatalHook::Custom(hook) => hook(message),
        }
    }
}

impl fmt::Debug for FatalHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalHook::Exit => f.write_str("Exit"),
            FatalHook::Panic => f.write_str("Panic"),
            FatalHook::Noop => f.write_str("Noop"),
            FatalHook::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Base context, level gate and fatal behaviour of a [`Logger`].
///
/// **Fields**
/// - `service_name`: written as `service` on every record.
/// - `env`: written as `env` on every record.
/// - `min_level`: records below this level are discarded before encoding.
/// - `fatal_hook`: runs after every `fatal` call; exits the process by
///   default.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub service_name: String,
    pub env: String,
    pub min_level: Level,
    pub fatal_hook: FatalHook,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            env: DEFAULT_ENV.to_string(),
            min_level: Level::Info,
            fatal_hook: FatalHook::default(),
        }
    }
}

impl LoggerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Build a config from `LOG_SINK_SERVICE_NAME`, `LOG_SINK_ENV` and
    /// `LOG_SINK_LEVEL`, falling back to [`LoggerConfig::default`] for
    /// anything unset. An unparsable level falls back to `info`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: env_or(LOG_SINK_SERVICE_NAME_ENV, &defaults.service_name),
            env: env_or(LOG_SINK_ENV_ENV, &defaults.env),
            min_level: env_or(LOG_SINK_LEVEL_ENV, defaults.min_level.as_str())
                .parse()
                .unwrap_or(defaults.min_level),
            fatal_hook: defaults.fatal_hook,
        }
    }
}

/// Error returned when a logger cannot be constructed.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("failed to connect to log collector at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {}: {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Dsn(#[from] DsnError),
}

struct Inner {
    sink: Arc<dyn LogSink>,
    context: Vec<Field>,
    min_level: Level,
    fatal_hook: FatalHook,
    closed: AtomicBool,
    dropped: AtomicU64,
}

/// Level-gated structured logger writing JSON lines to a [`LogSink`].
///
/// Cloning is cheap; every clone shares the same transport and state.
/// Each accepted call encodes one record and writes it synchronously, so a
/// stalled transport blocks the calling thread.
///
/// ```no_run
/// use observability_shim::logger::Logger;
/// use observability_shim::record::Field;
///
/// let (logger, guard) = Logger::open_file("/tmp/app.log", "auth")?;
/// logger.info("user signed in", [Field::new("user_id", 42)]);
/// logger.infof(format_args!("count={}", 5));
/// guard.close()?;
/// # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Connect to a TCP collector at `addr`.
    ///
    /// The level gate is fixed at `info`, the environment at `dev`, and
    /// `fatal` exits the process. A failed connect is returned as
    /// [`LoggerError::Connect`]; there is no retry and no reconnect once the
    /// connection drops.
    pub fn connect<A>(
        addr: A,
        service_name: impl Into<String>,
    ) -> Result<(Logger, LoggerGuard), LoggerError>
    where
        A: ToSocketAddrs + fmt::Display,
    {
        let sink = TcpSink::connect(&addr).map_err(|source| LoggerError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Logger::with_sink(Arc::new(sink), LoggerConfig::new(service_name)))
    }

    /// Open (or create) `path` for appending.
    ///
    /// Same fixed level gate, environment and fatal behaviour as
    /// [`Logger::connect`].
    pub fn open_file(
        path: impl AsRef<Path>,
        service_name: impl Into<String>,
    ) -> Result<(Logger, LoggerGuard), LoggerError> {
        let path = path.as_ref();
        let sink = FileSink::open(path).map_err(|source| LoggerError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Logger::with_sink(Arc::new(sink), LoggerConfig::new(service_name)))
    }

    /// Select the transport from a DSN such as `tcp://127.0.0.1:5170` or
    /// `file:///var/log/app.log`.
    pub fn from_dsn(
        dsn: &str,
        service_name: impl Into<String>,
    ) -> Result<(Logger, LoggerGuard), LoggerError> {
        let sink = make_sink_from_config(&parse_dsn(dsn)?)?;
        Ok(Logger::with_sink(sink, LoggerConfig::new(service_name)))
    }

    /// Wrap an arbitrary sink.
    ///
    /// **Returns**
    /// - the logger handle, and
    /// - the [`LoggerGuard`] that closes the sink. Keep the guard alive for
    ///   as long as the logger is used: binding it to `_` drops it, and
    ///   closes the logger, immediately.
    pub fn with_sink(sink: Arc<dyn LogSink>, config: LoggerConfig) -> (Logger, LoggerGuard) {
        let context = vec![
            Field::new("service", config.service_name),
            Field::new("env", config.env),
        ];
        let inner = Arc::new(Inner {
            sink,
            context,
            min_level: config.min_level,
            fatal_hook: config.fatal_hook,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });
        let guard = LoggerGuard {
            inner: Some(Arc::clone(&inner)),
        };
        (Logger { inner }, guard)
    }

    /// Whether a record at `level` passes the level gate.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.inner.min_level
    }

    pub fn min_level(&self) -> Level {
        self.inner.min_level
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Records that passed the level gate but never reached the transport,
    /// either because the write failed or because the logger was closed.
    pub fn dropped_records(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Emit `message` with structured `fields` at `level`.
    ///
    /// Below the gate this returns before `fields` is consumed.
    pub fn log<I>(&self, level: Level, message: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        if !self.enabled(level) {
            return;
        }
        let fields: Vec<Field> = fields.into_iter().collect();
        self.write(level, message, &fields);
        if level == Level::Fatal {
            self.finish_fatal(message);
        }
    }

    /// Emit a formatted message at `level`. Formatting only happens when the
    /// level gate admits the record.
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let message = args.to_string();
        self.write(level, &message, &[]);
        if level == Level::Fatal {
            self.finish_fatal(&message);
        }
    }

    pub fn trace<I: IntoIterator<Item = Field>>(&self, message: &str, fields: I) {
        self.log(Level::Trace, message, fields)
    }

    pub fn debug<I: IntoIterator<Item = Field>>(&self, message: &str, fields: I) {
        self.log(Level::Debug, message, fields)
    }

    pub fn info<I: IntoIterator<Item = Field>>(&self, message: &str, fields: I) {
        self.log(Level::Info, message, fields)
    }

    pub fn warn<I: IntoIterator<Item = Field>>(&self, message: &str, fields: I) {
        self.log(Level::Warn, message, fields)
    }

    pub fn error<I: IntoIterator<Item = Field>>(&self, message: &str, fields: I) {
        self.log(Level::Error, message, fields)
    }

    /// Emit at `fatal`, flush the transport, then run the configured
    /// [`FatalHook`] (process exit unless configured otherwise).
    pub fn fatal<I: IntoIterator<Item = Field>>(&self, message: &str, fields: I) {
        self.log(Level::Fatal, message, fields)
    }

    pub fn tracef(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Trace, args)
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Debug, args)
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Info, args)
    }

    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Warn, args)
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Error, args)
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Fatal, args)
    }

    fn write(&self, level: Level, message: &str, fields: &[Field]) {
        if self.is_closed() {
            self.record_dropped(level, "logger is closed");
            return;
        }

        let record = LogRecord::new(level, message, &self.inner.context, fields);
        let payload = match record.to_json_line() {
            Ok(payload) => payload,
            Err(e) => {
                self.record_dropped(level, &e.to_string());
                return;
            }
        };

        if let Err(e) = self.inner.sink.send(&payload) {
            self.record_dropped(level, &e.to_string());
        }
    }

    /// The hook runs even when the record itself was dropped.
    fn finish_fatal(&self, message: &str) {
        if !self.is_closed() {
            if let Err(e) = self.inner.sink.flush() {
                tracing::debug!(
                    target: crate::INTERNAL_TARGET,
                    error = %e,
                    "flush after fatal record failed"
                );
            }
        }
        self.inner.fatal_hook.run(message);
    }

    fn record_dropped(&self, level: Level, reason: &str) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: crate::INTERNAL_TARGET, %level, reason, "log record dropped");
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("context", &self.inner.context)
            .field("min_level", &self.inner.min_level)
            .field("closed", &self.is_closed())
            .field("dropped", &self.dropped_records())
            .finish()
    }
}

/// Cleanup handle returned with every [`Logger`].
///
/// Closing flushes and releases the transport and moves the logger from
/// open to closed for good. After that every logging call on any clone is a
/// silent no-op counted by [`Logger::dropped_records`]. `close` consumes
/// the guard, so the logger is closed at most once; dropping an unclosed
/// guard closes it as well and discards any error.
#[must_use = "dropping the guard closes the logger"]
pub struct LoggerGuard {
    inner: Option<Arc<Inner>>,
}

impl LoggerGuard {
    /// Flush and close the transport, reporting the sink's error if any.
    pub fn close(mut self) -> SinkResult {
        self.shutdown()
    }

    fn shutdown(&mut self) -> SinkResult {
        match self.inner.take() {
            Some(inner) => {
                inner.closed.store(true, Ordering::Release);
                inner.sink.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::debug!(target: crate::INTERNAL_TARGET, error = %e, "closing log sink failed");
        }
    }
}

impl fmt::Debug for LoggerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerGuard")
            .field("open", &self.inner.is_some())
            .finish()
    }
}
