//! In-memory capture of `tracing` events.
//!
//! [`LogCapture`] is a `tracing_subscriber` layer that records every event
//! with its level, message and structured fields, so tests can assert on
//! what was logged.
//!
//! ```ignore
//! let capture = LogCapture::new();
//! let _guard = capture.set_default();
//! tracing::debug!(role = "client", "connecting");
//! assert!(capture.contains_field("role", "client"));
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// A `tracing` layer that keeps every event in a shared list.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a registry with this layer as the thread's default subscriber.
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        tracing_subscriber::registry()
            .with(self.clone())
            .set_default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Whether any event carried `name = value`.
    pub fn contains_field(&self, name: &str, value: &str) -> bool {
        self.events()
            .iter()
            .any(|e| e.fields.get(name).is_some_and(|v| v == value))
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut events) = self.events.lock() {
            events.push(CapturedEvent {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_records_message_and_fields() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();

        tracing::debug!(role = "client", attempt = 1, "connecting");
        tracing::warn!("a warning");

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::DEBUG);
        assert_eq!(events[0].message, "connecting");
        assert_eq!(events[0].target, module_path!());
        assert_eq!(events[0].fields.get("attempt").map(String::as_str), Some("1"));
        assert!(capture.contains_field("role", "client"));
        assert_eq!(events[1].level, Level::WARN);
    }

    #[test]
    fn test_capture_starts_empty() {
        let capture = LogCapture::new();
        assert!(capture.events().is_empty());
        assert!(!capture.contains_field("role", "client"));
    }
}
