#![forbid(unsafe_code)]

//! Diagnostics emitted for ignored or non-settling operations.

use std::sync::{Arc, Mutex};

use rform_core::Value;
use rform_forms::{AutoDisable, Form, FormUnit, MAX_PASSES};
use rform_runtime::Scheduler;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    message: String,
    fields: Vec<(String, String)>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

fn capture(run: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, run);
    let captured = events.lock().unwrap().clone();
    captured
}

fn warnings(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events.iter().filter(|e| e.level == Level::WARN).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn toggle_on_text_node_warns_and_keeps_value() {
    let s = Scheduler::new();
    let node = Form::text("keep").scheduler(&s).build();
    let events = capture(|| node.toggle());
    let warned = warnings(&events);
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0].message, "toggle ignored");
    assert!(warned[0].field("err").is_some_and(|e| e.contains("Bool")));
    assert_eq!(node.live_value(), Value::from("keep"));
    assert!(!node.touched());
}

#[test]
fn select_option_on_plain_builder_warns() {
    let events = capture(|| {
        let _ = Form::number(0).clearable(true);
    });
    let warned = warnings(&events);
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0].field("option"), Some("clearable"));
}

#[test]
fn runaway_rules_warn_once_per_run() {
    let s = Scheduler::new();
    let layer = Form::layer()
        .control("echo", Form::text("live").disabled_default("off").scheduler(&s))
        .build();
    let mut guard = None;
    let events = capture(|| {
        let watched = AutoDisable::for_layer(&layer)
            .rule("echo", |v: &Value| v.get("echo") == Some(&Value::from("live")))
            .watch();
        guard = Some(watched);
    });
    let warned = warnings(&events);
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0].message, "auto-disable rules did not settle");
    assert_eq!(warned[0].field("passes"), Some(MAX_PASSES.to_string().as_str()));
    assert!(guard.is_some());
}

#[test]
fn rejected_move_logs_at_debug() {
    let s = Scheduler::new();
    let list = Form::list(Form::layer().control("v", Form::text("").scheduler(&s)))
        .start_length(1)
        .build();
    let events = capture(|| {
        assert!(!list.move_element(0, 3));
    });
    assert!(
        events
            .iter()
            .any(|e| e.level == Level::DEBUG && e.message == "list move rejected")
    );
    assert!(warnings(&events).is_empty());
}
