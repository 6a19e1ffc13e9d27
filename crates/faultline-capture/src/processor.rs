//! Event processor chain
//!
//! Processors run in registration order on a single event. Each one mutates
//! the event in place and reports a [`Disposition`]:
//!
//! - [`Disposition::Keep`]: continue with the (possibly modified) event
//! - [`Disposition::Discard`]: drop the event; later processors do not run
//! - [`Disposition::Replace`]: hand back a different event. Only an event with
//!   the same id is accepted. A foreign event breaks the chain's identity
//!   contract: the first occurrence is logged, the replacement is ignored and
//!   processing continues with the event the chain already holds.
//!
//! The chain ends with an optional host-supplied before-send hook bound by the
//! same contract. Its discard decision is final.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use faultline_core::{
    domain::{DiagnosticEvent, LogRecord},
    ports::Capabilities,
};
use tracing::{debug, warn};

/// Result of one processing step.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition<T = DiagnosticEvent> {
    Keep,
    Discard,
    Replace(Box<T>),
}

/// Per-event information available to processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessContext {
    /// Capabilities of the active sink
    pub capabilities: Capabilities,
    /// Frames ticked so far
    pub frame: u64,
    /// Host subsystems (display, scene tree) are initialized
    pub host_ready: bool,
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::ALL,
            frame: 0,
            host_ready: true,
        }
    }
}

/// A step of the processing chain.
pub trait EventProcessor: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    fn process(&self, event: &mut DiagnosticEvent, ctx: &ProcessContext) -> Disposition;
}

/// Host hook run after all processors.
pub type BeforeSend = Arc<dyn Fn(&mut DiagnosticEvent) -> Disposition + Send + Sync>;

/// Host hook run on structured log records before they are sent.
pub type BeforeSendLog = Arc<dyn Fn(&mut LogRecord) -> Disposition<LogRecord> + Send + Sync>;

/// Final state of an event after the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Send(Box<DiagnosticEvent>),
    Discarded { by: String },
}

impl ChainOutcome {
    pub fn into_event(self) -> Option<DiagnosticEvent> {
        match self {
            ChainOutcome::Send(event) => Some(*event),
            ChainOutcome::Discarded { .. } => None,
        }
    }
}

/// Name reported when the before-send hook discards an event.
pub const BEFORE_SEND: &str = "before_send";

/// Ordered list of processors followed by the before-send hook.
#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Arc<dyn EventProcessor>>,
    before_send: Option<BeforeSend>,
    violation_reported: AtomicBool,
    violations: AtomicU64,
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("processors", &self.names())
            .field("before_send", &self.before_send.is_some())
            .field("violations", &self.violations())
            .finish()
    }
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, processor: Arc<dyn EventProcessor>) {
        self.processors.push(processor);
    }

    pub fn set_before_send(&mut self, hook: BeforeSend) {
        self.before_send = Some(hook);
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Contract violations seen so far (foreign events returned).
    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Runs every processor, then the before-send hook.
    pub fn run(&self, mut event: DiagnosticEvent, ctx: &ProcessContext) -> ChainOutcome {
        debug!(event_id = %event.id, processors = self.processors.len(), "Processing event");

        for processor in &self.processors {
            let disposition = processor.process(&mut event, ctx);
            if !self.apply(&mut event, disposition, processor.name()) {
                debug!(event_id = %event.id, processor = processor.name(), "Event discarded");
                return ChainOutcome::Discarded {
                    by: processor.name().to_string(),
                };
            }
        }

        if let Some(hook) = &self.before_send {
            let disposition = hook(&mut event);
            if !self.apply(&mut event, disposition, BEFORE_SEND) {
                debug!(event_id = %event.id, "before_send discarded event");
                return ChainOutcome::Discarded {
                    by: BEFORE_SEND.to_string(),
                };
            }
        }

        ChainOutcome::Send(Box::new(event))
    }

    /// Applies `disposition` to `event`. Returns false on discard.
    fn apply(&self, event: &mut DiagnosticEvent, disposition: Disposition, step: &str) -> bool {
        match disposition {
            Disposition::Keep => true,
            Disposition::Discard => false,
            Disposition::Replace(replacement) if replacement.id == event.id => {
                *event = *replacement;
                true
            }
            Disposition::Replace(replacement) => {
                self.report_violation(step, event, &replacement);
                true
            }
        }
    }

    fn report_violation(&self, step: &str, event: &DiagnosticEvent, foreign: &DiagnosticEvent) {
        self.violations.fetch_add(1, Ordering::Relaxed);
        if !self.violation_reported.swap(true, Ordering::AcqRel) {
            warn!(
                step,
                event_id = %event.id,
                returned_id = %foreign.id,
                "Event processor returned a different event; keeping the original"
            );
        } else {
            debug!(step, event_id = %event.id, "Ignored foreign event from processor");
        }
    }
}

/// Runs the before-send-log hook. Returns `None` when the record is dropped.
///
/// Replacements are ignored: the hook may edit the record in place but the
/// record sent is always the one passed in.
pub fn apply_log_hook(hook: Option<&BeforeSendLog>, mut record: LogRecord) -> Option<LogRecord> {
    let Some(hook) = hook else {
        return Some(record);
    };
    match hook(&mut record) {
        Disposition::Discard => None,
        Disposition::Keep | Disposition::Replace(_) => Some(record),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use faultline_core::domain::{Level, LogLevel};

    use super::*;

    struct Tagger {
        key: &'static str,
        calls: AtomicUsize,
    }

    impl Tagger {
        fn new(key: &'static str) -> Arc<Self> {
            Arc::new(Self {
                key,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl EventProcessor for Tagger {
        fn name(&self) -> &str {
            self.key
        }

        fn process(&self, event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
            self.calls.fetch_add(1, Ordering::SeqCst);
            event.set_tag(self.key, "yes");
            Disposition::Keep
        }
    }

    struct Dropper;

    impl EventProcessor for Dropper {
        fn name(&self) -> &str {
            "dropper"
        }

        fn process(&self, _event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
            Disposition::Discard
        }
    }

    struct Impostor;

    impl EventProcessor for Impostor {
        fn name(&self) -> &str {
            "impostor"
        }

        fn process(&self, _event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
            Disposition::Replace(Box::new(DiagnosticEvent::new(Level::Debug).with_message("fake")))
        }
    }

    struct SameIdRewriter;

    impl EventProcessor for SameIdRewriter {
        fn name(&self) -> &str {
            "rewriter"
        }

        fn process(&self, event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
            let mut copy = event.clone();
            copy.message = Some("rewritten".into());
            Disposition::Replace(Box::new(copy))
        }
    }

    fn run(chain: &ProcessorChain) -> ChainOutcome {
        chain.run(DiagnosticEvent::new(Level::Error), &ProcessContext::default())
    }

    #[test]
    fn test_processors_run_in_order() {
        let mut chain = ProcessorChain::new();
        chain.add(Tagger::new("first"));
        chain.add(Tagger::new("second"));
        assert_eq!(chain.names(), vec!["first", "second"]);

        let event = run(&chain).into_event().expect("kept");
        assert_eq!(event.tags["first"], "yes");
        assert_eq!(event.tags["second"], "yes");
    }

    #[test]
    fn test_discard_stops_chain() {
        let after = Tagger::new("after");
        let mut chain = ProcessorChain::new();
        chain.add(Tagger::new("before"));
        chain.add(Arc::new(Dropper));
        chain.add(after.clone());

        let outcome = run(&chain);
        assert_eq!(
            outcome,
            ChainOutcome::Discarded {
                by: "dropper".into()
            }
        );
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_foreign_event_is_ignored_and_reported_once() {
        let mut chain = ProcessorChain::new();
        chain.add(Arc::new(Impostor));
        chain.add(Tagger::new("after"));

        let original = DiagnosticEvent::new(Level::Error).with_message("real");
        let id = original.id;
        let event = chain
            .run(original, &ProcessContext::default())
            .into_event()
            .expect("kept");

        assert_eq!(event.id, id);
        assert_eq!(event.message.as_deref(), Some("real"));
        assert_eq!(event.tags["after"], "yes", "chain continues after violation");
        assert_eq!(chain.violations(), 1);

        run(&chain);
        assert_eq!(chain.violations(), 2);
        assert!(chain.violation_reported.load(Ordering::SeqCst));
    }

    /// Counts warn-level tracing events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_violation_warning_logged_once() {
        use tracing_subscriber::prelude::*;

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));

        let mut chain = ProcessorChain::new();
        chain.add(Arc::new(Impostor));

        tracing::subscriber::with_default(subscriber, || {
            run(&chain);
            run(&chain);
            run(&chain);
        });

        assert_eq!(chain.violations(), 3);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_id_replacement_is_accepted() {
        let mut chain = ProcessorChain::new();
        chain.add(Arc::new(SameIdRewriter));

        let event = run(&chain).into_event().unwrap();
        assert_eq!(event.message.as_deref(), Some("rewritten"));
        assert_eq!(chain.violations(), 0);
    }

    #[test]
    fn test_before_send_runs_last_and_may_discard() {
        let mut chain = ProcessorChain::new();
        chain.add(Tagger::new("proc"));
        chain.set_before_send(Arc::new(|event: &mut DiagnosticEvent| {
            if event.tags.contains_key("proc") {
                Disposition::Discard
            } else {
                Disposition::Keep
            }
        }));

        assert_eq!(
            run(&chain),
            ChainOutcome::Discarded {
                by: BEFORE_SEND.into()
            }
        );
    }

    #[test]
    fn test_before_send_foreign_event_returns_original() {
        let mut chain = ProcessorChain::new();
        chain.set_before_send(Arc::new(|event: &mut DiagnosticEvent| {
            event.set_tag("edited", "1");
            Disposition::Replace(Box::new(DiagnosticEvent::new(Level::Fatal)))
        }));

        let original = DiagnosticEvent::new(Level::Error);
        let id = original.id;
        let event = chain
            .run(original, &ProcessContext::default())
            .into_event()
            .unwrap();
        assert_eq!(event.id, id);
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.tags["edited"], "1", "in-place edits are kept");
        assert_eq!(chain.violations(), 1);
    }

    #[test]
    fn test_empty_chain_passes_event_through() {
        let chain = ProcessorChain::new();
        assert!(chain.is_empty());
        assert!(run(&chain).into_event().is_some());
    }

    #[test]
    fn test_log_hook() {
        let record = LogRecord::new(LogLevel::Info, "hello");
        assert!(apply_log_hook(None, record.clone()).is_some());

        let drop_all: BeforeSendLog = Arc::new(|_r: &mut LogRecord| Disposition::Discard);
        assert!(apply_log_hook(Some(&drop_all), record.clone()).is_none());

        let replace: BeforeSendLog = Arc::new(|r: &mut LogRecord| {
            r.set_attribute("seen", true);
            Disposition::Replace(Box::new(LogRecord::new(LogLevel::Fatal, "other")))
        });
        let kept = apply_log_hook(Some(&replace), record).unwrap();
        assert_eq!(kept.body, "hello");
        assert_eq!(kept.level, LogLevel::Info);
        assert_eq!(kept.attribute("seen").unwrap(), true);
    }
}
