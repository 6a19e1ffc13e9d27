//! Scope state and the shared sink core
//!
//! [`Scope`] holds what is attached to every event: tags, user, contexts,
//! breadcrumbs and attachments. [`ScopedSink`] combines a scope with a
//! [`Transport`] and implements everything the concrete sinks have in common.
//!
//! The scope mutex is never held while the transport sends, so a slow or
//! re-entrant transport cannot block tag or breadcrumb updates.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use faultline_core::{
    domain::{
        Attachment, AttachmentData, Breadcrumb, ContextMap, DiagnosticEvent, DomainError, EventId,
        Level, LogRecord, User,
    },
    ports::{Capabilities, Envelope, EnvelopeHeader, EnvelopeItem, SinkOptions, Transport},
};
use tracing::{debug, info, trace, warn};

/// Breadcrumb capacity before `init` supplies the configured one.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;

// ============================================================================
// Scope
// ============================================================================

#[derive(Debug, Clone)]
pub struct Scope {
    tags: BTreeMap<String, String>,
    user: Option<User>,
    contexts: BTreeMap<String, ContextMap>,
    breadcrumbs: VecDeque<Breadcrumb>,
    max_breadcrumbs: usize,
    attachments: Vec<Attachment>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BREADCRUMBS)
    }
}

impl Scope {
    pub fn new(max_breadcrumbs: usize) -> Self {
        Self {
            tags: BTreeMap::new(),
            user: None,
            contexts: BTreeMap::new(),
            breadcrumbs: VecDeque::new(),
            max_breadcrumbs,
            attachments: Vec::new(),
        }
    }

    /// Changes the ring capacity, dropping the oldest breadcrumbs if needed.
    pub fn set_max_breadcrumbs(&mut self, max: usize) {
        self.max_breadcrumbs = max;
        while self.breadcrumbs.len() > max {
            self.breadcrumbs.pop_front();
        }
    }

    pub fn set_tag(&mut self, key: &str, value: &str) -> Result<(), DomainError> {
        if key.is_empty() {
            return Err(DomainError::EmptyKey("tag"));
        }
        self.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_tag(&mut self, key: &str) {
        self.tags.remove(key);
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn remove_user(&mut self) {
        self.user = None;
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Replaces the context named `name`. An empty map removes it.
    pub fn set_context(&mut self, name: &str, context: ContextMap) -> Result<(), DomainError> {
        if name.is_empty() {
            return Err(DomainError::EmptyKey("context"));
        }
        if context.is_empty() {
            self.contexts.remove(name);
        } else {
            self.contexts.insert(name.to_string(), context);
        }
        Ok(())
    }

    pub fn context(&self, name: &str) -> Option<&ContextMap> {
        self.contexts.get(name)
    }

    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) {
        if self.max_breadcrumbs == 0 {
            return;
        }
        self.breadcrumbs.push_back(breadcrumb);
        while self.breadcrumbs.len() > self.max_breadcrumbs {
            self.breadcrumbs.pop_front();
        }
    }

    /// Breadcrumbs, oldest first.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.breadcrumbs.iter().cloned().collect()
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Copies tags and contexts into `event`. Values already on the event win.
    pub fn apply_to_event(&self, event: &mut DiagnosticEvent) {
        for (key, value) in &self.tags {
            event
                .tags
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        for (name, context) in &self.contexts {
            let target = event.contexts.entry(name.clone()).or_default();
            for (key, value) in context {
                target.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
}

/// Reads path attachments into memory. Files that do not exist right now are
/// skipped; they are optional per event (a screenshot is not always taken).
pub fn resolve_attachments(attachments: &[Attachment]) -> Vec<Attachment> {
    attachments
        .iter()
        .filter_map(|attachment| match &attachment.data {
            AttachmentData::Bytes(_) => Some(attachment.clone()),
            AttachmentData::Path(path) => match std::fs::read(path) {
                Ok(bytes) => Some(Attachment {
                    filename: attachment.filename.clone(),
                    content_type: attachment.content_type.clone(),
                    data: AttachmentData::Bytes(bytes),
                }),
                Err(e) => {
                    trace!(path = %path.display(), error = %e, "Skipping attachment");
                    None
                }
            },
        })
        .collect()
}

// ============================================================================
// ScopedSink
// ============================================================================

struct SinkState {
    options: Option<SinkOptions>,
    scope: Scope,
    last_event_id: EventId,
}

/// Sink core shared by the native, mobile and web sinks.
pub struct ScopedSink {
    name: &'static str,
    capabilities: Capabilities,
    transport: Arc<dyn Transport>,
    state: Mutex<SinkState>,
}

impl ScopedSink {
    pub fn new(
        name: &'static str,
        capabilities: Capabilities,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name,
            capabilities,
            transport,
            state: Mutex::new(SinkState {
                options: None,
                scope: Scope::default(),
                last_event_id: EventId::nil(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn init(&self, options: &SinkOptions) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state.options.is_some() {
            debug!(sink = self.name, "Sink already initialized");
            return Ok(());
        }
        state.scope.set_max_breadcrumbs(options.max_breadcrumbs);
        state.options = Some(options.clone());
        info!(
            sink = self.name,
            environment = %options.environment,
            release = options.release.as_deref().unwrap_or("-"),
            "Sink initialized"
        );
        Ok(())
    }

    pub fn close(&self) {
        let was_enabled = self.lock().options.take().is_some();
        if was_enabled {
            self.transport.shutdown();
            info!(sink = self.name, "Sink closed");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().options.is_some()
    }

    /// Options given to `init`, if the sink is enabled.
    pub fn options(&self) -> Option<SinkOptions> {
        self.lock().options.clone()
    }

    pub fn set_tag(&self, key: &str, value: &str) {
        if let Err(e) = self.lock().scope.set_tag(key, value) {
            warn!(sink = self.name, error = %e, "Ignoring tag");
        }
    }

    pub fn remove_tag(&self, key: &str) {
        self.lock().scope.remove_tag(key);
    }

    pub fn set_user(&self, user: User) {
        self.lock().scope.set_user(user);
    }

    pub fn remove_user(&self) {
        self.lock().scope.remove_user();
    }

    pub fn set_context(&self, name: &str, context: ContextMap) {
        if let Err(e) = self.lock().scope.set_context(name, context) {
            warn!(sink = self.name, error = %e, "Ignoring context");
        }
    }

    pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        self.lock().scope.add_breadcrumb(breadcrumb);
    }

    pub fn add_attachment(&self, attachment: Attachment) {
        if self.capabilities.contains(Capabilities::ATTACHMENTS) {
            self.lock().scope.add_attachment(attachment);
        } else {
            debug!(sink = self.name, filename = %attachment.filename, "Attachments not supported");
        }
    }

    pub fn create_event(&self) -> DiagnosticEvent {
        let mut event = DiagnosticEvent::new(Level::Error);
        if let Some(options) = &self.lock().options {
            event.release = options.release.clone();
            event.dist = options.dist.clone();
            event.environment = Some(options.environment.clone());
        }
        event
    }

    pub fn capture_event(&self, mut event: DiagnosticEvent) -> EventId {
        let (envelope, attachments) = {
            let state = self.lock();
            let Some(options) = &state.options else {
                debug!(sink = self.name, "Sink disabled, dropping event");
                return EventId::nil();
            };
            state.scope.apply_to_event(&mut event);
            if event.release.is_none() {
                event.release = options.release.clone();
            }
            if event.dist.is_none() {
                event.dist = options.dist.clone();
            }
            if event.environment.is_none() {
                event.environment = Some(options.environment.clone());
            }
            let envelope = Envelope {
                header: self.header(event.id, options),
                item: EnvelopeItem::Event {
                    event,
                    breadcrumbs: state.scope.breadcrumbs(),
                    user: state.scope.user().cloned(),
                    attachments: Vec::new(),
                },
            };
            (envelope, state.scope.attachments().to_vec())
        };

        let mut envelope = envelope;
        if let EnvelopeItem::Event {
            attachments: slot, ..
        } = &mut envelope.item
        {
            *slot = resolve_attachments(&attachments);
        }

        let id = envelope.id();
        match self.transport.send(&envelope) {
            Ok(()) => {
                self.lock().last_event_id = id;
                debug!(sink = self.name, event_id = %id, "Event sent");
                id
            }
            Err(e) => {
                warn!(sink = self.name, event_id = %id, error = %e, "Failed to send event");
                EventId::nil()
            }
        }
    }

    pub fn log(&self, record: LogRecord) {
        let envelope = {
            let state = self.lock();
            let Some(options) = &state.options else {
                return;
            };
            Envelope {
                header: self.header(EventId::new(), options),
                item: EnvelopeItem::Log { record },
            }
        };
        if let Err(e) = self.transport.send(&envelope) {
            warn!(sink = self.name, error = %e, "Failed to send log record");
        }
    }

    pub fn last_event_id(&self) -> EventId {
        self.lock().last_event_id
    }

    /// Snapshot of the scope, for inspection.
    pub fn scope(&self) -> Scope {
        self.lock().scope.clone()
    }

    fn header(&self, id: EventId, options: &SinkOptions) -> EnvelopeHeader {
        EnvelopeHeader {
            id,
            dsn: options.dsn.clone(),
            sent_at: Utc::now(),
            sink: self.name.to_string(),
        }
    }
}

/// Implements [`faultline_core::ports::CaptureSink`] for a newtype over
/// [`ScopedSink`] by forwarding every call to field `0`.
macro_rules! forward_capture_sink {
    ($sink:ty) => {
        impl faultline_core::ports::CaptureSink for $sink {
            fn name(&self) -> &'static str {
                self.0.name()
            }
            fn init(&self, options: &faultline_core::ports::SinkOptions) -> anyhow::Result<()> {
                self.0.init(options)
            }
            fn close(&self) {
                self.0.close()
            }
            fn is_enabled(&self) -> bool {
                self.0.is_enabled()
            }
            fn capabilities(&self) -> faultline_core::ports::Capabilities {
                self.0.capabilities()
            }
            fn set_tag(&self, key: &str, value: &str) {
                self.0.set_tag(key, value)
            }
            fn remove_tag(&self, key: &str) {
                self.0.remove_tag(key)
            }
            fn set_user(&self, user: faultline_core::domain::User) {
                self.0.set_user(user)
            }
            fn remove_user(&self) {
                self.0.remove_user()
            }
            fn set_context(&self, name: &str, context: faultline_core::domain::ContextMap) {
                self.0.set_context(name, context)
            }
            fn add_breadcrumb(&self, breadcrumb: faultline_core::domain::Breadcrumb) {
                self.0.add_breadcrumb(breadcrumb)
            }
            fn create_event(&self) -> faultline_core::domain::DiagnosticEvent {
                self.0.create_event()
            }
            fn capture_event(
                &self,
                event: faultline_core::domain::DiagnosticEvent,
            ) -> faultline_core::domain::EventId {
                self.0.capture_event(event)
            }
            fn log(&self, record: faultline_core::domain::LogRecord) {
                self.0.log(record)
            }
            fn add_attachment(&self, attachment: faultline_core::domain::Attachment) {
                self.0.add_attachment(attachment)
            }
            fn last_event_id(&self) -> faultline_core::domain::EventId {
                self.0.last_event_id()
            }
        }
    };
}

pub(crate) use forward_capture_sink;
