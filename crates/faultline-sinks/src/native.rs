//! Native sink
//!
//! Used on desktop and server targets. Can start before the host is ready,
//! enriches crash events with the current session and forwards attachments.

use std::{path::PathBuf, sync::Arc};

use faultline_core::ports::{Capabilities, Transport};

use crate::{
    scope::{forward_capture_sink, ScopedSink},
    transport::OutboxTransport,
};

pub struct NativeSink(ScopedSink);

impl NativeSink {
    pub const NAME: &'static str = "native";
    pub const CAPABILITIES: Capabilities = Capabilities::ALL;

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self(ScopedSink::new(Self::NAME, Self::CAPABILITIES, transport))
    }

    /// Native sink writing envelopes into `dir`.
    pub fn with_outbox(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(OutboxTransport::new(dir)))
    }

    pub fn core(&self) -> &ScopedSink {
        &self.0
    }
}

forward_capture_sink!(NativeSink);
