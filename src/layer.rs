use crate::handler::LogHandler;
use crate::record::{Level, LogRecord};
use crate::sanitize::sanitize_fields;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that observes events and forwards them
/// synchronously to a [`LogHandler`], typically the rotating file
/// handler.
///
/// Event fields are collected into a [`LogRecord`] and their names run
/// through the reserved-key sanitizer, so a `tracing` call site
/// carrying a field named `filename` or `message`-adjacent names can
/// never collide with the record's own attributes.
pub struct RotatingFileLayer {
    handler: Arc<dyn LogHandler>,
    min_level: Level,
    service_name: Option<String>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events that were turned into records and emitted.
    pub emitted_events: Arc<AtomicU64>,
}

impl RotatingFileLayer {
    /// Create a new layer in front of the given handler.
    ///
    /// **Parameters**
    /// - `handler`: destination for the records this layer produces.
    /// - `min_level`: events below this level are counted but not
    ///   forwarded.
    /// - `service_name`: service identity stamped on each record.
    pub fn new(
        handler: Arc<dyn LogHandler>,
        min_level: Level,
        service_name: Option<String>,
    ) -> Self {
        RotatingFileLayer {
            handler,
            min_level,
            service_name,
            total_events: Arc::new(AtomicU64::new(0)),
            emitted_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<S> Layer<S> for RotatingFileLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let level = Level::from(*event.metadata().level());
        if level < self.min_level {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let meta = event.metadata();
        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            message: message.unwrap_or_default(),
            fields: sanitize_fields(fields),
            service_name: self.service_name.clone(),
        };

        self.handler.emit(&record);
        self.emitted_events.fetch_add(1, Ordering::Relaxed);
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }
}
