use std::path::PathBuf;
use std::sync::Arc;

use crate::file_sink::FileSink;
use crate::logger::LoggerError;
use crate::sink::LogSink;
use crate::tcp_sink::TcpSink;

/// Supported transports that can be selected via DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Raw TCP connection to `host:port`.
    Tcp { addr: String },
    /// Append-only local file.
    File { path: PathBuf },
}

/// Transport configuration built from a DSN.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Selected transport and its target.
    pub kind: BackendKind,
    /// Raw DSN that was used to construct this config.
    pub dsn: String,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, dsn: impl Into<String>) -> Self {
        BackendConfig { kind, dsn: dsn.into() }
    }
}

/// Parse a DSN string and infer the transport from its scheme.
///
/// Examples:
/// - "tcp://127.0.0.1:5170"
/// - "file:///var/log/billing.log"
/// - "file://logs/billing.log" (relative to the working directory)
pub fn parse_dsn(dsn: &str) -> Result<BackendConfig, DsnError> {
    let trimmed = dsn.trim();
    let (scheme, rest) = trimmed.split_once("://").ok_or(DsnError::UnknownScheme)?;

    match scheme.to_ascii_lowercase().as_str() {
        "tcp" => {
            let addr = rest.trim_end_matches('/');
            if addr.is_empty() {
                return Err(DsnError::MissingTarget);
            }
            Ok(BackendConfig::new(BackendKind::Tcp { addr: addr.to_string() }, dsn))
        }
        "file" => {
            if rest.is_empty() {
                return Err(DsnError::MissingTarget);
            }
            Ok(BackendConfig::new(BackendKind::File { path: PathBuf::from(rest) }, dsn))
        }
        _ => Err(DsnError::UnknownScheme),
    }
}

/// Error type returned when parsing a DSN.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DsnError {
    #[error("unknown or unsupported DSN scheme")]
    UnknownScheme,

    #[error("DSN has no address or path after the scheme")]
    MissingTarget,
}

/// Open the transport described by a [`BackendConfig`].
///
/// This is the entry point for applications that pick a transport with a
/// single DSN string (for example from [`LOG_SINK_DSN`](crate::env::LOG_SINK_DSN_ENV))
/// instead of constructing sinks manually.
pub fn make_sink_from_config(cfg: &BackendConfig) -> Result<Arc<dyn LogSink>, LoggerError> {
    match &cfg.kind {
        BackendKind::Tcp { addr } => {
            let sink = TcpSink::connect(addr.as_str()).map_err(|source| LoggerError::Connect {
                addr: addr.clone(),
                source,
            })?;
            Ok(Arc::new(sink) as Arc<dyn LogSink>)
        }
        BackendKind::File { path } => {
            let sink = FileSink::open(path).map_err(|source| LoggerError::OpenFile {
                path: path.clone(),
                source,
            })?;
            Ok(Arc::new(sink) as Arc<dyn LogSink>)
        }
    }
}
