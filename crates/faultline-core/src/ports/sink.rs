//! Capture sink port (driven/secondary port)
//!
//! A capture sink is the backend that finally receives finished events,
//! breadcrumbs and log records. Exactly one sink is active per process; it is
//! chosen once at startup and never swapped.
//!
//! ## Design Notes
//!
//! - All methods take `&self`; implementations guard their scope state internally.
//! - Nothing here returns an error to the caller except `init`. Capture
//!   failures are logged by the sink and reported as [`EventId::nil`].
//! - [`Capabilities`] let upstream code adapt (deferred init, crash enrichment).

use std::fmt;
use std::ops::BitOr;

use crate::config::Config;
use crate::domain::{
    Attachment, Breadcrumb, ContextMap, DiagnosticEvent, EventId, Level, LogRecord, User,
};

// ============================================================================
// Capabilities
// ============================================================================

/// Feature bits advertised by a sink.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    /// The sink can be initialized before the host's subsystems are ready.
    pub const EARLY_INIT: Capabilities = Capabilities(1 << 0);
    /// Crash events may be enriched with current-session data.
    pub const ENRICH_CRASHES: Capabilities = Capabilities(1 << 1);
    /// The sink forwards file attachments.
    pub const ATTACHMENTS: Capabilities = Capabilities(1 << 2);
    pub const ALL: Capabilities = Capabilities(0b111);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 & !other.0)
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::EARLY_INIT) {
            names.push("EARLY_INIT");
        }
        if self.contains(Self::ENRICH_CRASHES) {
            names.push("ENRICH_CRASHES");
        }
        if self.contains(Self::ATTACHMENTS) {
            names.push("ATTACHMENTS");
        }
        write!(f, "Capabilities({})", names.join(" | "))
    }
}

// ============================================================================
// SinkOptions
// ============================================================================

/// Options a sink needs at init time, derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SinkOptions {
    pub dsn: Option<String>,
    pub release: Option<String>,
    pub dist: Option<String>,
    pub environment: String,
    pub max_breadcrumbs: usize,
    pub send_default_pii: bool,
    pub debug: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SinkOptions {
    fn from(config: &Config) -> Self {
        let dsn = if config.sdk.dsn.is_empty() {
            None
        } else {
            Some(config.sdk.dsn.clone())
        };
        Self {
            dsn,
            release: config.release(),
            dist: config.sdk.dist.clone(),
            environment: config.environment(),
            max_breadcrumbs: config.sdk.max_breadcrumbs,
            send_default_pii: config.sdk.send_default_pii,
            debug: config.sdk.debug,
        }
    }
}

// ============================================================================
// CaptureSink trait
// ============================================================================

/// Port trait for the active telemetry backend.
pub trait CaptureSink: Send + Sync {
    /// Short name used in logs (`native`, `web`, ...)
    fn name(&self) -> &'static str;

    /// Initializes the backend. Called once, possibly deferred until the host
    /// reports readiness when [`Capabilities::EARLY_INIT`] is missing.
    fn init(&self, options: &SinkOptions) -> anyhow::Result<()>;

    /// Flushes and shuts the backend down. Later captures are ignored.
    fn close(&self);

    /// True between a successful `init` and `close`.
    fn is_enabled(&self) -> bool;

    fn capabilities(&self) -> Capabilities;

    fn set_tag(&self, key: &str, value: &str);
    fn remove_tag(&self, key: &str);

    fn set_user(&self, user: User);
    fn remove_user(&self);

    /// Replaces the scope context named `name`.
    fn set_context(&self, name: &str, context: ContextMap);

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb);

    /// Captures a plain message event. Bypasses any processing done upstream.
    fn capture_message(&self, message: &str, level: Level) -> EventId {
        let mut event = self.create_event();
        event.level = level;
        event.message = Some(message.to_string());
        self.capture_event(event)
    }

    /// Creates an empty event pre-filled with release, dist and environment.
    fn create_event(&self) -> DiagnosticEvent;

    /// Sends a finished event. Returns its id, or the nil id when nothing was sent.
    fn capture_event(&self, event: DiagnosticEvent) -> EventId;

    /// Sends a structured log record.
    fn log(&self, record: LogRecord);

    /// Registers an attachment sent with every following event.
    fn add_attachment(&self, attachment: Attachment);

    /// Id of the last event sent, or the nil id.
    fn last_event_id(&self) -> EventId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_contains() {
        let caps = Capabilities::ALL.without(Capabilities::EARLY_INIT);
        assert!(!caps.contains(Capabilities::EARLY_INIT));
        assert!(caps.contains(Capabilities::ENRICH_CRASHES));
        assert!(caps.contains(Capabilities::ATTACHMENTS | Capabilities::ENRICH_CRASHES));
        assert!(Capabilities::NONE.contains(Capabilities::NONE));
    }

    #[test]
    fn test_capabilities_debug() {
        let caps = Capabilities::EARLY_INIT | Capabilities::ATTACHMENTS;
        assert_eq!(format!("{caps:?}"), "Capabilities(EARLY_INIT | ATTACHMENTS)");
    }

    #[test]
    fn test_sink_options_from_default_config() {
        let options = SinkOptions::default();
        assert!(options.dsn.is_none());
        assert_eq!(options.max_breadcrumbs, 100);
        assert_eq!(options.environment, "production");
    }
}
