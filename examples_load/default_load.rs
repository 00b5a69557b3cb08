use std::sync::Arc;
use std::time::Instant;

use observability_shim::noop_sink::NoopSink;
use observability_shim::{Field, Logger, LoggerConfig};

fn main() {
    let (logger, guard) = Logger::with_sink(Arc::new(NoopSink), LoggerConfig::new("load-test"));

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.error("default load test error", [Field::new("iteration", i)]);
    }

    let elapsed = start.elapsed();
    println!(
        "admitted: encoded {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let start = Instant::now();
    for i in 0..n {
        logger.debug("gated load test event", [Field::new("iteration", i)]);
    }
    println!("gated: skipped {} records in {:?}", n, start.elapsed());

    if let Err(e) = guard.close() {
        eprintln!("close failed: {}", e);
    }
}
