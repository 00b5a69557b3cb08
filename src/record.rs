use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log record, ordered from least to most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Lowercase name written into the `severity` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`Level`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            _ => Level::Error,
        }
    }
}

/// A structured key/value pair attached to a single log call.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: serde_json::Value,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Field {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Field whose value is the `Display` rendering of `value`.
    pub fn display(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Field::new(key, value.to_string())
    }

    /// Field whose value is the `Debug` rendering of `value`.
    pub fn debug(key: impl Into<String>, value: impl fmt::Debug) -> Self {
        Field::new(key, format!("{:?}", value))
    }
}

impl<K, V> From<(K, V)> for Field
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from((key, value): (K, V)) -> Self {
        Field::new(key, value)
    }
}

/// One log call, materialized right before it is encoded.
///
/// The record borrows everything it can from the logger and the call site;
/// it lives only for the duration of [`LogRecord::to_json_line`].
#[derive(Debug, Clone)]
pub struct LogRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: &'a str,
    /// Fields fixed at logger construction (`service`, `env`).
    pub context: &'a [Field],
    /// Fields supplied by the call site.
    pub fields: &'a [Field],
}

impl<'a> LogRecord<'a> {
    pub fn new(level: Level, message: &'a str, context: &'a [Field], fields: &'a [Field]) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            message,
            context,
            fields,
        }
    }

    /// Encode as a single JSON object followed by `\n`.
    pub fn to_json_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl Serialize for LogRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map =
            serializer.serialize_map(Some(3 + self.context.len() + self.fields.len()))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("severity", &self.level)?;
        map.serialize_entry("message", self.message)?;
        for field in self.context.iter().chain(self.fields) {
            map.serialize_entry(&field.key, &field.value)?;
        }
        map.end()
    }
}
