//! Faultline Sinks - Backend adapters for the capture pipeline
//!
//! One sink is chosen per process by [`select_sink`] from the running
//! [`Platform`]:
//!
//! | Platform      | Sink             | Capabilities                |
//! |---------------|------------------|-----------------------------|
//! | `native`      | [`NativeSink`]   | all                         |
//! | `mobile`      | [`MobileSink`]   | all except `ENRICH_CRASHES` |
//! | `web`         | [`WebSink`]      | all except `EARLY_INIT`     |
//! | `unsupported` | [`DisabledSink`] | no-op                       |
//!
//! Sinks hand finished envelopes to a [`Transport`]: the
//! [`OutboxTransport`] writes them to disk, the [`MemoryTransport`] keeps
//! them for tests and dry runs.

use std::{fmt, str::FromStr, sync::Arc};

use faultline_core::{
    domain::{
        Attachment, Breadcrumb, ContextMap, DiagnosticEvent, EventId, LogRecord, User,
    },
    ports::{Capabilities, CaptureSink, SinkOptions, Transport},
};
use tracing::{info, warn};

pub mod disabled;
pub mod mobile;
pub mod native;
pub mod scope;
pub mod transport;
pub mod web;

pub use disabled::DisabledSink;
pub use mobile::MobileSink;
pub use native::NativeSink;
pub use scope::{Scope, ScopedSink};
pub use transport::{MemoryTransport, OutboxEntry, OutboxTransport, TransportError};
pub use web::WebSink;

// ============================================================================
// Platform
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Native,
    Mobile,
    Web,
    Unsupported,
}

impl Platform {
    /// Platform of the current build target.
    pub fn current() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Platform::Mobile
        } else if cfg!(target_arch = "wasm32") {
            Platform::Web
        } else if cfg!(any(target_os = "linux", target_os = "windows", target_os = "macos")) {
            Platform::Native
        } else {
            Platform::Unsupported
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Native => "native",
            Platform::Mobile => "mobile",
            Platform::Web => "web",
            Platform::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(Platform::Native),
            "mobile" | "android" | "ios" => Ok(Platform::Mobile),
            "web" => Ok(Platform::Web),
            "unsupported" | "none" => Ok(Platform::Unsupported),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

// ============================================================================
// Sink
// ============================================================================

/// The sink chosen for this process.
pub enum Sink {
    Native(NativeSink),
    Mobile(MobileSink),
    Web(WebSink),
    Disabled(DisabledSink),
}

macro_rules! with_sink {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            Sink::Native($s) => $body,
            Sink::Mobile($s) => $body,
            Sink::Web($s) => $body,
            Sink::Disabled($s) => $body,
        }
    };
}

impl Sink {
    /// Shared core of an active sink; `None` for [`Sink::Disabled`].
    pub fn core(&self) -> Option<&ScopedSink> {
        match self {
            Sink::Native(s) => Some(s.core()),
            Sink::Mobile(s) => Some(s.core()),
            Sink::Web(s) => Some(s.core()),
            Sink::Disabled(_) => None,
        }
    }
}

impl CaptureSink for Sink {
    fn name(&self) -> &'static str {
        with_sink!(self, s => s.name())
    }

    fn init(&self, options: &SinkOptions) -> anyhow::Result<()> {
        with_sink!(self, s => s.init(options))
    }

    fn close(&self) {
        with_sink!(self, s => s.close())
    }

    fn is_enabled(&self) -> bool {
        with_sink!(self, s => s.is_enabled())
    }

    fn capabilities(&self) -> Capabilities {
        with_sink!(self, s => s.capabilities())
    }

    fn set_tag(&self, key: &str, value: &str) {
        with_sink!(self, s => s.set_tag(key, value))
    }

    fn remove_tag(&self, key: &str) {
        with_sink!(self, s => s.remove_tag(key))
    }

    fn set_user(&self, user: User) {
        with_sink!(self, s => s.set_user(user))
    }

    fn remove_user(&self) {
        with_sink!(self, s => s.remove_user())
    }

    fn set_context(&self, name: &str, context: ContextMap) {
        with_sink!(self, s => s.set_context(name, context))
    }

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        with_sink!(self, s => s.add_breadcrumb(breadcrumb))
    }

    fn create_event(&self) -> DiagnosticEvent {
        with_sink!(self, s => s.create_event())
    }

    fn capture_event(&self, event: DiagnosticEvent) -> EventId {
        with_sink!(self, s => s.capture_event(event))
    }

    fn log(&self, record: LogRecord) {
        with_sink!(self, s => s.log(record))
    }

    fn add_attachment(&self, attachment: Attachment) {
        with_sink!(self, s => s.add_attachment(attachment))
    }

    fn last_event_id(&self) -> EventId {
        with_sink!(self, s => s.last_event_id())
    }
}

/// Picks the sink for `platform`.
///
/// Native and web sinks without an explicit `transport` write to the default
/// outbox directory. The mobile sink needs the platform bridge as its
/// transport; without one, capture is disabled.
pub fn select_sink(platform: Platform, transport: Option<Arc<dyn Transport>>) -> Sink {
    let outbox =
        || -> Arc<dyn Transport> { Arc::new(OutboxTransport::new(OutboxTransport::default_dir())) };

    let sink = match (platform, transport) {
        (Platform::Native, transport) => {
            Sink::Native(NativeSink::new(transport.unwrap_or_else(outbox)))
        }
        (Platform::Web, transport) => Sink::Web(WebSink::new(transport.unwrap_or_else(outbox))),
        (Platform::Mobile, Some(transport)) => Sink::Mobile(MobileSink::new(transport)),
        (Platform::Mobile, None) => {
            warn!("No platform bridge for the mobile sink, capture disabled");
            Sink::Disabled(DisabledSink)
        }
        (Platform::Unsupported, _) => Sink::Disabled(DisabledSink),
    };

    info!(platform = %platform, sink = sink.name(), "Capture sink selected");
    sink
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Option<Arc<dyn Transport>> {
        Some(Arc::new(MemoryTransport::new()))
    }

    #[test]
    fn test_select_sink_by_platform() {
        assert_eq!(select_sink(Platform::Native, memory()).name(), "native");
        assert_eq!(select_sink(Platform::Mobile, memory()).name(), "mobile");
        assert_eq!(select_sink(Platform::Web, memory()).name(), "web");
        assert_eq!(select_sink(Platform::Unsupported, memory()).name(), "disabled");
    }

    #[test]
    fn test_mobile_without_bridge_is_disabled() {
        let sink = select_sink(Platform::Mobile, None);
        assert_eq!(sink.name(), "disabled");
        assert!(sink.core().is_none());
    }

    #[test]
    fn test_capabilities_per_sink() {
        let web = select_sink(Platform::Web, memory());
        assert!(!web.capabilities().contains(Capabilities::EARLY_INIT));
        let mobile = select_sink(Platform::Mobile, memory());
        assert!(!mobile.capabilities().contains(Capabilities::ENRICH_CRASHES));
        let native = select_sink(Platform::Native, memory());
        assert_eq!(native.capabilities(), Capabilities::ALL);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("Native".parse::<Platform>().unwrap(), Platform::Native);
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Mobile);
        assert_eq!("web".parse::<Platform>().unwrap(), Platform::Web);
        assert!("toaster".parse::<Platform>().is_err());
        assert_eq!(Platform::Unsupported.to_string(), "unsupported");
    }

    #[test]
    fn test_current_platform_on_test_host() {
        if cfg!(any(target_os = "linux", target_os = "windows", target_os = "macos")) {
            assert_eq!(Platform::current(), Platform::Native);
        }
    }

    #[test]
    fn test_sink_enum_forwards_calls() {
        let transport = Arc::new(MemoryTransport::new());
        let sink = select_sink(Platform::Native, Some(transport.clone()));
        sink.init(&SinkOptions::default()).unwrap();
        sink.set_tag("map", "cave");
        let id = sink.capture_message("boom", faultline_core::domain::Level::Error);

        assert_eq!(sink.last_event_id(), id);
        assert_eq!(transport.events()[0].tags["map"], "cave");
        assert_eq!(sink.core().unwrap().scope().tags()["map"], "cave");
    }
}
