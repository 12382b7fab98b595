//! In-memory ring of recent log lines.
//!
//! [`RecentLogLayer`] is installed next to the console and file layers; the
//! status endpoint reads the lines back through [`RecentLogs`].

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Bounded buffer of formatted log lines, oldest first.
#[derive(Debug, Clone)]
pub struct RecentLogs {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl RecentLogs {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    pub fn push(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Copy of the buffered lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Layer feeding this buffer.
    pub fn layer(&self) -> RecentLogLayer {
        RecentLogLayer {
            logs: self.clone(),
        }
    }
}

impl Default for RecentLogs {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Tracing layer that formats each event into a single line.
pub struct RecentLogLayer {
    logs: RecentLogs,
}

impl<S> Layer<S> for RecentLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        let mut line = format!(
            "{} {:>5} {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            meta.level(),
            meta.target(),
            visitor.message
        );
        if !visitor.fields.is_empty() {
            line.push(' ');
            line.push_str(&visitor.fields);
        }
        self.logs.push(line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.field(field.name(), format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.field(field.name(), format_args!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[test]
    fn test_ring_drops_oldest() {
        let logs = RecentLogs::new(2);
        logs.push("a".to_string());
        logs.push("b".to_string());
        logs.push("c".to_string());
        assert_eq!(logs.lines(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let logs = RecentLogs::new(0);
        logs.push("a".to_string());
        assert!(logs.is_empty());
    }

    #[test]
    fn test_layer_formats_events() {
        let logs = RecentLogs::new(10);
        let subscriber = tracing_subscriber::registry().with(logs.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(step = 3, "Step passed");
            tracing::warn!("Frame skipped");
        });

        let lines = logs.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" INFO "));
        assert!(lines[0].contains("Step passed"));
        assert!(lines[0].ends_with("step=3"));
        assert!(lines[1].contains("WARN"));
    }
}
