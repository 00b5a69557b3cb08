//! Environment variable names used by this crate for convenient
//! configuration of loggers from services.
//!
//! These are purely helpers; [`Logger`](crate::logger::Logger) and the sinks
//! never read the environment on their own.

/// Transport DSN, e.g. `tcp://127.0.0.1:5170` or `file:///var/log/app.log`.
pub const LOG_SINK_DSN_ENV: &str = "LOG_SINK_DSN";

/// Logical service name written as `service` on every record.
pub const LOG_SINK_SERVICE_NAME_ENV: &str = "LOG_SINK_SERVICE_NAME";

/// Environment label written as `env` on every record.
pub const LOG_SINK_ENV_ENV: &str = "LOG_SINK_ENV";

/// Minimum level (`trace`, `debug`, `info`, `warn`, `error`, `fatal`).
pub const LOG_SINK_LEVEL_ENV: &str = "LOG_SINK_LEVEL";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_uses_default() {
        assert_eq!(env_or("OBSERVABILITY_SHIM_TEST_UNSET_VARIABLE", "fallback"), "fallback");
    }
}
