//! Web sink
//!
//! Browser builds talk to a script SDK that is only loaded once the page is
//! up, so initialization waits for host readiness.

use std::sync::Arc;

use faultline_core::ports::{Capabilities, Transport};

use crate::scope::{forward_capture_sink, ScopedSink};

pub struct WebSink(ScopedSink);

impl WebSink {
    pub const NAME: &'static str = "web";
    pub const CAPABILITIES: Capabilities = Capabilities::ALL.without(Capabilities::EARLY_INIT);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self(ScopedSink::new(Self::NAME, Self::CAPABILITIES, transport))
    }

    pub fn core(&self) -> &ScopedSink {
        &self.0
    }
}

forward_capture_sink!(WebSink);

#[cfg(test)]
mod tests {
    use faultline_core::ports::CaptureSink;

    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_web_sink_needs_deferred_init() {
        let sink = WebSink::new(Arc::new(MemoryTransport::new()));
        assert!(!sink.capabilities().contains(Capabilities::EARLY_INIT));
        assert!(sink.capabilities().contains(Capabilities::ENRICH_CRASHES));
    }
}
