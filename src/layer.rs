use crate::logger::Logger;
use crate::record::{Field as LogField, Level};
use crate::INTERNAL_TARGET;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into records on a
/// [`Logger`].
///
/// The logger's own level gate applies: with the default `info` minimum,
/// `trace!` and `debug!` events are ignored. The event's `message` becomes
/// the record message and every other field becomes a call field.
pub struct FacadeLayer {
    logger: Logger,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events handed to the logger.
    pub forwarded_events: Arc<AtomicU64>,
}

impl FacadeLayer {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            total_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<S> Layer<S> for FacadeLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        // A failing sink must not feed its own diagnostics back into the logger.
        if meta.target() == INTERNAL_TARGET {
            return;
        }
        let level = Level::from(*meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut fields = Vec::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        self.logger
            .log(level, message.as_deref().unwrap_or_default(), fields);
        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Collects `tracing` fields into facade [`LogField`]s.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<LogField>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.push(LogField::new(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push(LogField::new(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push(LogField::new(field.name(), value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push(LogField::new(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push(LogField::new(field.name(), value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            *self.message = Some(rendered);
        } else {
            self.fields.push(LogField::new(field.name(), rendered));
        }
    }
}
