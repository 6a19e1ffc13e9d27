//! Context enrichment
//!
//! Merges named context dictionaries into events. Static contexts are read
//! once from every provider when the host marks itself ready; dynamic
//! contexts are read again for each event.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

use faultline_core::{
    domain::DiagnosticEvent,
    ports::{Capabilities, ContextProvider, Contexts},
};
use tracing::{debug, trace};

/// Merges provider contexts into events.
pub struct ContextEnricher {
    providers: Vec<Arc<dyn ContextProvider>>,
    static_contexts: OnceLock<Contexts>,
    ready: AtomicBool,
}

impl ContextEnricher {
    pub fn new(providers: Vec<Arc<dyn ContextProvider>>) -> Self {
        Self {
            providers,
            static_contexts: OnceLock::new(),
            ready: AtomicBool::new(false),
        }
    }

    pub fn add_provider(&mut self, provider: Arc<dyn ContextProvider>) {
        self.providers.push(provider);
    }

    /// Captures static contexts. Later calls are no-ops.
    ///
    /// Until this is called only dynamic contexts are merged, because static
    /// sources (display, GPU, locale) may not be initialized yet.
    pub fn mark_ready(&self) {
        let contexts = self.static_contexts.get_or_init(|| {
            let mut merged = Contexts::new();
            for provider in &self.providers {
                merge_into(&mut merged, provider.static_contexts());
            }
            merged
        });
        if !self.ready.swap(true, Ordering::AcqRel) {
            debug!(contexts = contexts.len(), "Static contexts captured");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Static contexts captured by [`mark_ready`](Self::mark_ready), if any.
    pub fn static_contexts(&self) -> Option<&Contexts> {
        self.static_contexts.get()
    }

    /// Merges all contexts into `event`.
    ///
    /// Crash events are left untouched when the sink lacks
    /// [`Capabilities::ENRICH_CRASHES`]: such sinks deliver crashes on the
    /// next launch, so current-session data would describe the wrong run.
    pub fn enrich(&self, event: &mut DiagnosticEvent, capabilities: Capabilities) {
        if event.is_crash && !capabilities.contains(Capabilities::ENRICH_CRASHES) {
            trace!(event_id = %event.id, "Skipping enrichment of crash event");
            return;
        }

        if let Some(contexts) = self.static_contexts.get() {
            for (name, values) in contexts {
                event.merge_context(name, values.clone());
            }
        }

        for provider in &self.providers {
            for (name, values) in provider.dynamic_contexts() {
                event.merge_context(&name, values);
            }
        }
    }
}

fn merge_into(target: &mut Contexts, source: Contexts) {
    for (name, values) in source {
        let entry = target.entry(name).or_default();
        for (key, value) in values {
            entry.insert(key, value);
        }
    }
}

impl Default for ContextEnricher {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
