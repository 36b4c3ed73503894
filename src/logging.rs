//! Noise suppression on the error logging path.
//!
//! A handful of failures are expected during normal operation (location permission denied,
//! the realtime socket not being up yet on a cold start, the sensor vendor not configured,
//! a map library method that is missing in older builds). They are dropped here so the
//! error output and the error panel only carry things worth looking at.

use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::errors::{FleetError, FleetResult};

pub const KNOWN_BENIGN: &[&str] = &[
    "User denied Geolocation",
    "User denied geolocation",
    "Geolocation permission denied",
    "GPS permission denied",
    "WebSocket connection to",
    "WebSocket is closed before the connection is established",
    "Findy not configured",
    "getLatLng is not a function",
];

#[derive(Debug, Clone)]
pub struct NoiseFilter {
    patterns: Vec<String>,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(KNOWN_BENIGN.iter().map(|s| s.to_string()).collect())
    }
}

impl NoiseFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn is_suppressed(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| message.contains(p.as_str()))
    }
}

/// One argument of a logged error, as a browser console or client error report delivers it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConsoleArg {
    Text(String),
    Error {
        message: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        stack: Option<String>,
    },
    Value(Value),
}

impl ConsoleArg {
    pub fn error(message: impl Into<String>) -> Self {
        ConsoleArg::Error {
            message: message.into(),
            name: None,
            stack: None,
        }
    }
}

impl fmt::Display for ConsoleArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleArg::Text(text) => f.write_str(text),
            // Error objects reduce to their message
            ConsoleArg::Error { message, .. } => f.write_str(message),
            ConsoleArg::Value(value) => write!(f, "{}", value),
        }
    }
}

pub fn normalize(args: &[ConsoleArg]) -> String {
    args.iter()
        .map(ConsoleArg::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub trait ErrorSink: Send + Sync {
    fn error(&self, message: &str);
}

impl<T: ErrorSink + ?Sized> ErrorSink for Arc<T> {
    fn error(&self, message: &str) {
        (**self).error(message)
    }
}

/// Wraps the sink that was in place when it was built and filters what reaches it.
pub struct ConsoleGuard<S: ErrorSink> {
    inner: S,
    filter: NoiseFilter,
}

impl<S: ErrorSink> ConsoleGuard<S> {
    pub fn new(inner: S) -> Self {
        Self::with_filter(inner, NoiseFilter::default())
    }

    pub fn with_filter(inner: S, filter: NoiseFilter) -> Self {
        Self { inner, filter }
    }

    /// Returns whether the message was forwarded.
    pub fn error(&self, args: &[ConsoleArg]) -> bool {
        let message = normalize(args);
        if self.filter.is_suppressed(&message) {
            return false;
        }
        // A panicking sink must not take the caller down with it.
        panic::catch_unwind(AssertUnwindSafe(|| self.inner.error(&message))).is_ok()
    }
}

impl<S: ErrorSink> ErrorSink for ConsoleGuard<S> {
    fn error(&self, message: &str) {
        ConsoleGuard::error(self, &[ConsoleArg::Text(message.to_string())]);
    }
}

/// Bounded buffer of the most recent forwarded errors, newest last.
pub struct RecentErrors {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl RecentErrors {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn entries(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl ErrorSink for RecentErrors {
    fn error(&self, message: &str) {
        if self.capacity == 0 {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(message.to_string());
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor::default();
    event.record(&mut visitor);
    visitor.message
}

/// Drops benign error and warn events before any other layer sees them.
pub struct NoiseLayer {
    filter: NoiseFilter,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl NoiseLayer {
    pub fn new(filter: NoiseFilter) -> Self {
        Self { filter, sink: None }
    }

    /// Also forward surviving error events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl<S: Subscriber> Layer<S> for NoiseLayer {
    fn event_enabled(&self, event: &Event<'_>, _ctx: Context<'_, S>) -> bool {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return true;
        }
        !self.filter.is_suppressed(&event_message(event))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.error(&event_message(event));
        }
    }
}

pub fn init_tracing(default_filter: &str, sink: Option<Arc<dyn ErrorSink>>) -> FleetResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let mut noise = NoiseLayer::new(NoiseFilter::default());
    if let Some(sink) = sink {
        noise = noise.with_sink(sink);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(noise)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| FleetError::InvalidConfiguration(format!("tracing already initialised: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl ErrorSink for Capture {
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    struct Exploding;

    impl ErrorSink for Exploding {
        fn error(&self, _message: &str) {
            panic!("sink failure");
        }
    }

    #[test]
    fn test_benign_message_dropped() {
        let capture = Arc::new(Capture::default());
        let guard = ConsoleGuard::new(capture.clone());

        assert!(!guard.error(&[ConsoleArg::Text("Findy not configured".into())]));
        assert!(!guard.error(&[ConsoleArg::error("TypeError: marker.getLatLng is not a function")]));
        assert!(capture.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_real_error_forwarded_unchanged() {
        let capture = Arc::new(Capture::default());
        let guard = ConsoleGuard::new(capture.clone());

        assert!(guard.error(&[ConsoleArg::error("Unexpected crash: X")]));
        assert_eq!(*capture.0.lock().unwrap(), vec!["Unexpected crash: X".to_string()]);
    }

    #[test]
    fn test_multiple_args_joined() {
        let args = vec![
            ConsoleArg::Text("Sync failed:".into()),
            ConsoleArg::error("timeout"),
            ConsoleArg::Value(serde_json::json!(3)),
        ];
        assert_eq!(normalize(&args), "Sync failed: timeout 3");
    }

    #[test]
    fn test_console_arg_deserialize() {
        let args: Vec<ConsoleArg> =
            serde_json::from_str(r#"["boom", {"message": "bad", "stack": "at x"}, 1]"#).unwrap();
        assert_eq!(normalize(&args), "boom bad 1");
    }

    #[test]
    fn test_panicking_sink_contained() {
        let guard = ConsoleGuard::new(Exploding);
        assert!(!guard.error(&[ConsoleArg::Text("real problem".into())]));
    }

    #[test]
    fn test_recent_errors_bounded() {
        let recent = RecentErrors::new(2);
        recent.error("a");
        recent.error("b");
        recent.error("c");
        assert_eq!(recent.entries(), vec!["b".to_string(), "c".to_string()]);
        recent.clear();
        assert!(recent.entries().is_empty());
    }

    #[test]
    fn test_layer_forwards_only_real_errors() {
        let recent = Arc::new(RecentErrors::new(10));
        let subscriber = tracing_subscriber::registry()
            .with(NoiseLayer::new(NoiseFilter::default()).with_sink(recent.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("Findy not configured");
            tracing::error!("Route persistence failed");
            tracing::info!("not an error");
        });

        assert_eq!(recent.entries(), vec!["Route persistence failed".to_string()]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let recent = RecentErrors::new(0);
        recent.error("a");
        recent.error("b");
        assert!(recent.entries().is_empty());
    }
}
