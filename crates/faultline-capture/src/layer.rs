//! `tracing` bridge
//!
//! [`CaptureLayer`] forwards host `tracing` events to
//! [`Pipeline::on_log_message`]. Events emitted under `faultline*` targets
//! (the pipeline's own diagnostics and echoed structured logs) are never
//! forwarded, so capturing cannot feed itself.

use std::{fmt, sync::Arc};

use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

use crate::pipeline::Pipeline;

const OWN_TARGET_PREFIX: &str = "faultline";

pub struct CaptureLayer {
    pipeline: Arc<Pipeline>,
    max_level: Level,
}

impl CaptureLayer {
    /// Forwards events at `INFO` and above.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            max_level: Level::INFO,
        }
    }

    /// Most verbose level forwarded.
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET_PREFIX) || *metadata.level() > self.max_level {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let is_error = *metadata.level() == Level::ERROR;
        self.pipeline.on_log_message(&visitor.finish(), is_error);
    }
}

/// Collects the `message` field followed by the other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let mut out = self.message;
        for field in self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&field);
        }
        out
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tracing_subscriber::prelude::*;

    use super::*;

    /// Layer that only runs the visitor, to check message formatting.
    struct Collect(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Collect {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.finish());
        }
    }

    #[test]
    fn test_visitor_formats_message_and_fields() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Collect(seen.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(level = 3, name = "cave", "Level loaded");
            tracing::warn!("plain");
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], "Level loaded level=3 name=cave");
        assert_eq!(seen[1], "plain");
    }
}
