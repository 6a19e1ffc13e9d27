//! Transport port
//!
//! A transport moves finished envelopes out of the process: to disk, over the
//! network, or into memory for tests. Sinks own exactly one transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Attachment, Breadcrumb, DiagnosticEvent, EventId, LogRecord, User};

/// Metadata sent with every envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    pub sent_at: DateTime<Utc>,
    /// Name of the sink that produced the envelope
    pub sink: String,
}

/// Payload of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeItem {
    Event {
        event: DiagnosticEvent,
        #[serde(default)]
        breadcrumbs: Vec<Breadcrumb>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<User>,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    Log {
        record: LogRecord,
    },
}

/// The unit a sink hands to its transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    pub item: EnvelopeItem,
}

impl Envelope {
    pub fn id(&self) -> EventId {
        self.header.id
    }

    /// `event` or `log`
    pub fn kind(&self) -> &'static str {
        match self.item {
            EnvelopeItem::Event { .. } => "event",
            EnvelopeItem::Log { .. } => "log",
        }
    }

    pub fn event(&self) -> Option<&DiagnosticEvent> {
        match &self.item {
            EnvelopeItem::Event { event, .. } => Some(event),
            EnvelopeItem::Log { .. } => None,
        }
    }

    pub fn log_record(&self) -> Option<&LogRecord> {
        match &self.item {
            EnvelopeItem::Log { record } => Some(record),
            EnvelopeItem::Event { .. } => None,
        }
    }
}

/// Port trait for envelope delivery.
///
/// Sending is synchronous and may block. Failures are transient from the
/// pipeline's point of view: the caller logs them and moves on.
pub trait Transport: Send + Sync {
    fn send(&self, envelope: &Envelope) -> anyhow::Result<()>;

    /// Called when the owning sink closes.
    fn shutdown(&self) {}
}
