use std::time::Duration;

use observability_shim::env::{env_or, LOG_SINK_DSN_ENV};
use observability_shim::init::init_tracing;
use observability_shim::metrics::{register_metrics, render, Metrics};
use observability_shim::{Field, Logger};
use prometheus::Registry;
use tracing::{error, info};

fn main() {
    // e.g. LOG_SINK_DSN=tcp://127.0.0.1:5170 to ship to a collector.
    let dsn = env_or(LOG_SINK_DSN_ENV, "file:///tmp/auth-service.log");
    let (logger, guard) = match Logger::from_dsn(&dsn, "auth-service") {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("cannot start logger: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(logger.clone()) {
        eprintln!("tracing bridge not installed: {}", e);
    }

    let registry = Registry::new();
    let metrics = register_metrics(&registry);

    info!("starting service");

    for attempt in 0..3 {
        let mut timer = metrics.start_timer("/login");
        std::thread::sleep(Duration::from_millis(5));
        if attempt == 2 {
            timer.fail();
            error!(user_id = 42, reason = "invalid password", "authentication failed");
        }
    }
    metrics.observe_latency("/health", 0.001);
    metrics.inc_request("/health");

    logger.warnf(format_args!("{} login attempts failed", metrics.error_count("/login")));
    logger.info("shutting down", [Field::new("requests", metrics.request_count("/login"))]);

    match render(&registry) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("cannot render metrics: {}", e),
    }

    if let Err(e) = guard.close() {
        eprintln!("close failed: {}", e);
    }
}
