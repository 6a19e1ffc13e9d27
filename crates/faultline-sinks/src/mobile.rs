//! Mobile sink
//!
//! Hands envelopes to the platform SDK bridge. Crashes on mobile are reported
//! by the platform SDK after a restart, so they must not be enriched with
//! data from the session that is reporting them.

use std::sync::Arc;

use faultline_core::ports::{Capabilities, Transport};

use crate::scope::{forward_capture_sink, ScopedSink};

pub struct MobileSink(ScopedSink);

impl MobileSink {
    pub const NAME: &'static str = "mobile";
    pub const CAPABILITIES: Capabilities = Capabilities::ALL.without(Capabilities::ENRICH_CRASHES);

    /// Sink forwarding to the platform bridge `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self(ScopedSink::new(Self::NAME, Self::CAPABILITIES, transport))
    }

    pub fn core(&self) -> &ScopedSink {
        &self.0
    }
}

forward_capture_sink!(MobileSink);
