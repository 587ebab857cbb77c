#![forbid(unsafe_code)]

//! Tracing setup for tests.
//!
//! [`init_test_logging`] installs a global fmt subscriber honouring
//! `RUST_LOG`. [`capture`] runs a closure under a scoped subscriber and
//! returns the events it emitted, for asserting on diagnostics.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Install a test-writer fmt subscriber. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One captured tracing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    /// Non-message fields rendered as `name=value`.
    pub fields: Vec<String>,
}

impl CapturedEvent {
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        let prefix = format!("{name}=");
        self.fields.iter().any(|f| f.starts_with(&prefix))
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message,
                fields: visitor.fields,
            });
    }
}

/// Run `f` with a capturing subscriber and return its result plus every event
/// emitted on this thread meanwhile.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    let layer = CaptureLayer::default();
    let events = Arc::clone(&layer.events);
    let subscriber = tracing_subscriber::registry().with(layer);
    let out = tracing::subscriber::with_default(subscriber, f);
    let captured = std::mem::take(&mut *events.lock().unwrap_or_else(PoisonError::into_inner));
    (out, captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_records_level_message_and_fields() {
        let ((), events) = capture(|| {
            tracing::warn!(epoch = 3, "container lost");
            tracing::debug!("quiet");
        });
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].message, "container lost");
        assert!(events[0].has_field("epoch"));
        assert_eq!(events[1].level, Level::DEBUG);
    }
}
