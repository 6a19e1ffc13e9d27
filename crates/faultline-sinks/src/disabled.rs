//! Disabled sink
//!
//! Active on platforms without a backend. Accepts every call and sends
//! nothing.

use faultline_core::{
    domain::{
        Attachment, Breadcrumb, ContextMap, DiagnosticEvent, EventId, Level, LogRecord, User,
    },
    ports::{Capabilities, CaptureSink, SinkOptions},
};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

impl DisabledSink {
    pub const NAME: &'static str = "disabled";
}

impl CaptureSink for DisabledSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn init(&self, _options: &SinkOptions) -> anyhow::Result<()> {
        debug!("Capture disabled on this platform");
        Ok(())
    }

    fn close(&self) {}

    fn is_enabled(&self) -> bool {
        false
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn set_tag(&self, _key: &str, _value: &str) {}
    fn remove_tag(&self, _key: &str) {}
    fn set_user(&self, _user: User) {}
    fn remove_user(&self) {}
    fn set_context(&self, _name: &str, _context: ContextMap) {}
    fn add_breadcrumb(&self, _breadcrumb: Breadcrumb) {}

    fn create_event(&self) -> DiagnosticEvent {
        DiagnosticEvent::new(Level::Error)
    }

    fn capture_event(&self, _event: DiagnosticEvent) -> EventId {
        EventId::nil()
    }

    fn log(&self, _record: LogRecord) {}
    fn add_attachment(&self, _attachment: Attachment) {}

    fn last_event_id(&self) -> EventId {
        EventId::nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_sink_accepts_and_drops() {
        let sink = DisabledSink;
        sink.init(&SinkOptions::default()).unwrap();
        assert!(!sink.is_enabled());
        sink.set_tag("a", "b");
        assert!(sink.capture_message("dropped", Level::Error).is_nil());
        assert!(sink.last_event_id().is_nil());
    }
}
