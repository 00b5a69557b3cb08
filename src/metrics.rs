//! Path-labelled request metrics backed by the `prometheus` crate.
//!
//! Collectors are registered into a caller-owned [`Registry`] rather than
//! the process-wide default one; construct the registry once at startup and
//! hand it to whatever renders `/metrics`.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by `path`
//! - `http_response_duration_seconds` (histogram): latency by `path`,
//!   default Prometheus buckets
//! - `http_errors_total` (counter): failed requests by `path`
//!
//! The `path` label accepts any string, so callers must keep the set of
//! values bounded (route templates, not raw URLs).

use std::string::FromUtf8Error;
use std::time::Instant;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const RESPONSE_DURATION_SECONDS: &str = "http_response_duration_seconds";
pub const ERRORS_TOTAL: &str = "http_errors_total";

/// The single label every collector is partitioned by.
pub const PATH_LABEL: &str = "path";

/// Request metrics as seen by application code.
///
/// None of the operations can fail from the caller's point of view.
pub trait Metrics: Send + Sync {
    /// Count one request for `path`.
    fn inc_request(&self, path: &str);

    /// Record one latency observation, in seconds, for `path`.
    fn observe_latency(&self, path: &str, seconds: f64);

    /// Count one failed request for `path`.
    fn inc_error(&self, path: &str);
}

/// Error type returned when metrics cannot be registered or rendered.
#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics output was not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// The three request collectors, registered in one [`Registry`].
#[derive(Clone)]
pub struct AppMetrics {
    request_counter: IntCounterVec,
    response_latency: HistogramVec,
    errors_total: IntCounterVec,
}

impl AppMetrics {
    /// Build the collectors and register them in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be registered, most notably
    /// when this registry already holds collectors with the same names.
    pub fn register(registry: &Registry) -> Result<Self, MetricsError> {
        let request_counter = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "Total number of HTTP requests"),
            &[PATH_LABEL],
        )?;
        let response_latency = HistogramVec::new(
            HistogramOpts::new(RESPONSE_DURATION_SECONDS, "Histogram of response latencies")
                .buckets(prometheus::DEFAULT_BUCKETS.to_vec()),
            &[PATH_LABEL],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new(ERRORS_TOTAL, "Total number of HTTP errors"),
            &[PATH_LABEL],
        )?;

        registry.register(Box::new(request_counter.clone()))?;
        registry.register(Box::new(response_latency.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        tracing::debug!(target: crate::INTERNAL_TARGET, "request metrics registered");

        Ok(Self {
            request_counter,
            response_latency,
            errors_total,
        })
    }

    /// Current request count for `path`.
    pub fn request_count(&self, path: &str) -> u64 {
        self.request_counter.with_label_values(&[path]).get()
    }

    /// Current error count for `path`.
    pub fn error_count(&self, path: &str) -> u64 {
        self.errors_total.with_label_values(&[path]).get()
    }

    /// Number of latency observations recorded for `path`.
    pub fn latency_sample_count(&self, path: &str) -> u64 {
        self.response_latency.with_label_values(&[path]).get_sample_count()
    }

    /// Count a request for `path` now and record its latency when the
    /// returned timer is dropped.
    pub fn start_timer(&self, path: &str) -> LatencyTimer<'_> {
        self.inc_request(path);
        LatencyTimer {
            metrics: self,
            path: path.to_string(),
            start: Instant::now(),
            failed: false,
        }
    }
}

impl Metrics for AppMetrics {
    fn inc_request(&self, path: &str) {
        self.request_counter.with_label_values(&[path]).inc();
    }

    fn observe_latency(&self, path: &str, seconds: f64) {
        self.response_latency.with_label_values(&[path]).observe(seconds);
    }

    fn inc_error(&self, path: &str) {
        self.errors_total.with_label_values(&[path]).inc();
    }
}

/// Register the request collectors, panicking on failure.
///
/// Registration is a once-per-registry startup step; calling this twice
/// with the same registry panics on the duplicate metric names.
pub fn register_metrics(registry: &Registry) -> AppMetrics {
    match AppMetrics::register(registry) {
        Ok(metrics) => metrics,
        Err(e) => panic!("failed to register request metrics: {e}"),
    }
}

/// Render everything in `registry` using the Prometheus text exposition
/// format.
pub fn render(registry: &Registry) -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Guard returned by [`AppMetrics::start_timer`].
///
/// On drop the elapsed time is observed into the latency histogram, and the
/// error counter is bumped if [`LatencyTimer::fail`] was called.
pub struct LatencyTimer<'a> {
    metrics: &'a AppMetrics,
    path: String,
    start: Instant,
    failed: bool,
}

impl LatencyTimer<'_> {
    /// Mark the request as failed.
    pub fn fail(&mut self) {
        self.failed = true;
    }
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .observe_latency(&self.path, self.start.elapsed().as_secs_f64());
        if self.failed {
            self.metrics.inc_error(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(metric: &prometheus::proto::Metric) -> &str {
        metric
            .get_label()
            .iter()
            .find(|l| l.get_name() == PATH_LABEL)
            .map(|l| l.get_value())
            .unwrap()
    }

    #[test]
    fn request_series_are_independent_per_path() {
        let registry = Registry::new();
        let metrics = register_metrics(&registry);

        for _ in 0..3 {
            metrics.inc_request("/foo");
        }
        metrics.inc_request("/bar");

        assert_eq!(metrics.request_count("/foo"), 3);
        assert_eq!(metrics.request_count("/bar"), 1);
        assert_eq!(metrics.error_count("/foo"), 0);

        let families = registry.gather();
        let requests = families.iter().find(|f| f.get_name() == REQUESTS_TOTAL).unwrap();
        let mut seen: Vec<(String, f64)> = requests
            .get_metric()
            .iter()
            .map(|m| (path_of(m).to_string(), m.get_counter().get_value()))
            .collect();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(seen, vec![("/bar".to_string(), 1.0), ("/foo".to_string(), 3.0)]);
    }

    #[test]
    fn latency_lands_in_every_bucket_at_or_above_it() {
        let registry = Registry::new();
        let metrics = register_metrics(&registry);

        metrics.observe_latency("/foo", 0.250);

        let families = registry.gather();
        let latency = families
            .iter()
            .find(|f| f.get_name() == RESPONSE_DURATION_SECONDS)
            .unwrap();
        let metric = &latency.get_metric()[0];
        assert_eq!(path_of(metric), "/foo");

        let histogram = metric.get_histogram();
        assert_eq!(histogram.get_sample_count(), 1);
        assert!((histogram.get_sample_sum() - 0.25).abs() < f64::EPSILON);

        let buckets = histogram.get_bucket();
        assert!(buckets.len() >= prometheus::DEFAULT_BUCKETS.len());
        for bucket in buckets {
            let expected = if bucket.get_upper_bound() >= 0.25 { 1 } else { 0 };
            assert_eq!(
                bucket.get_cumulative_count(),
                expected,
                "bucket le={}",
                bucket.get_upper_bound()
            );
        }
    }

    #[test]
    fn errors_are_counted_separately() {
        let registry = Registry::new();
        let metrics = register_metrics(&registry);

        metrics.inc_error("/foo");
        metrics.inc_error("/foo");

        assert_eq!(metrics.error_count("/foo"), 2);
        assert_eq!(metrics.request_count("/foo"), 0);
    }

    #[test]
    fn second_registration_is_rejected() {
        let registry = Registry::new();
        AppMetrics::register(&registry).unwrap();
        let err = AppMetrics::register(&registry).err().unwrap();
        assert!(matches!(err, MetricsError::Prometheus(prometheus::Error::AlreadyReg)));
    }

    #[test]
    #[should_panic(expected = "failed to register request metrics")]
    fn register_metrics_panics_on_duplicate() {
        let registry = Registry::new();
        let _first = register_metrics(&registry);
        let _second = register_metrics(&registry);
    }

    #[test]
    fn separate_registries_do_not_collide() {
        let a = Registry::new();
        let b = Registry::new();
        register_metrics(&a).inc_request("/foo");
        assert_eq!(register_metrics(&b).request_count("/foo"), 0);
    }

    #[test]
    fn timer_records_request_latency_and_failure() {
        let registry = Registry::new();
        let metrics = register_metrics(&registry);

        {
            let _ok = metrics.start_timer("/ok");
        }
        {
            let mut failed = metrics.start_timer("/boom");
            failed.fail();
        }

        assert_eq!(metrics.request_count("/ok"), 1);
        assert_eq!(metrics.latency_sample_count("/ok"), 1);
        assert_eq!(metrics.error_count("/ok"), 0);
        assert_eq!(metrics.request_count("/boom"), 1);
        assert_eq!(metrics.error_count("/boom"), 1);
    }

    #[test]
    fn render_exposes_all_three_families() {
        let registry = Registry::new();
        let metrics = register_metrics(&registry);
        metrics.inc_request("/foo");
        metrics.observe_latency("/foo", 0.1);
        metrics.inc_error("/foo");

        let text = render(&registry).unwrap();
        assert!(text.contains("http_requests_total{path=\"/foo\"} 1"));
        assert!(text.contains("http_errors_total{path=\"/foo\"} 1"));
        assert!(text.contains("http_response_duration_seconds_bucket{path=\"/foo\",le=\"0.1\"} 1"));
        assert!(text.contains("http_response_duration_seconds_count{path=\"/foo\"} 1"));
    }

    #[test]
    fn metrics_trait_is_object_safe() {
        let registry = Registry::new();
        let metrics: Box<dyn Metrics> = Box::new(register_metrics(&registry));
        metrics.inc_request("/dyn");
        metrics.observe_latency("/dyn", 0.01);
        metrics.inc_error("/dyn");
    }
}
