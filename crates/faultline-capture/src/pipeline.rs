//! Capture pipeline
//!
//! Wires the rate limiter, triage, assembler, enricher and processor chain in
//! front of one [`CaptureSink`]. Host signals enter through
//! [`Pipeline::on_error`] and [`Pipeline::on_log_message`]; explicit captures
//! go through [`Pipeline::capture_event`] and share the same
//! enrich → chain → dispatch path.
//!
//! No method returns an error once the pipeline is built. Dropped signals are
//! only visible through debug traces and [`CaptureMetrics`].

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use faultline_core::{
    config::Config,
    domain::{
        Attachment, Breadcrumb, ContextMap, DiagnosticEvent, ErrorSignal, EventId, Level,
        LogRecord, User,
    },
    ports::{
        Capabilities, CaptureSink, ContextProvider, SceneCapture, SinkOptions, SourceProvider,
    },
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    assembler::{message_breadcrumb, message_log, AssemblerOptions, EventAssembler},
    context::SystemContextProvider,
    enricher::ContextEnricher,
    error::CaptureError,
    filter::{strip_invisible, PrefixFilter},
    guard::{EntryPoint, RecursionGuard},
    limiter::{RateLimiter, RateLimits, Verdict},
    logger::StructuredLogger,
    metrics::CaptureMetrics,
    processor::{
        apply_log_hook, BeforeSend, BeforeSendLog, ChainOutcome, EventProcessor, ProcessContext,
        ProcessorChain,
    },
    processors::{
        PiiScrubber, SampleRateProcessor, ScreenshotHook, ScreenshotProcessor,
        ViewHierarchyProcessor, SCREENSHOT_FILENAME, VIEW_HIERARCHY_FILENAME,
    },
    triage::{SignalKind, TriagePolicy},
};

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Pipeline`] from a configuration, a sink and host adapters.
pub struct PipelineBuilder {
    config: Config,
    sink: Arc<dyn CaptureSink>,
    providers: Vec<Arc<dyn ContextProvider>>,
    processors: Vec<Arc<dyn EventProcessor>>,
    scene: Option<Arc<dyn SceneCapture>>,
    source: Option<Arc<dyn SourceProvider>>,
    before_send: Option<BeforeSend>,
    before_send_log: Option<BeforeSendLog>,
    screenshot_hook: Option<ScreenshotHook>,
    system_context: bool,
    data_dir: Option<PathBuf>,
}

impl PipelineBuilder {
    pub fn new(config: Config, sink: Arc<dyn CaptureSink>) -> Self {
        Self {
            config,
            sink,
            providers: Vec::new(),
            processors: Vec::new(),
            scene: None,
            source: None,
            before_send: None,
            before_send_log: None,
            screenshot_hook: None,
            system_context: true,
            data_dir: dirs::data_local_dir().map(|d| d.join("faultline")),
        }
    }

    pub fn context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Registers a processor. Host processors run after the built-in ones.
    pub fn processor(mut self, processor: Arc<dyn EventProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn scene(mut self, scene: Arc<dyn SceneCapture>) -> Self {
        self.scene = Some(scene);
        self
    }

    pub fn source_provider(mut self, source: Arc<dyn SourceProvider>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn before_send(mut self, hook: BeforeSend) -> Self {
        self.before_send = Some(hook);
        self
    }

    pub fn before_send_log(mut self, hook: BeforeSendLog) -> Self {
        self.before_send_log = Some(hook);
        self
    }

    pub fn before_capture_screenshot(mut self, hook: ScreenshotHook) -> Self {
        self.screenshot_hook = Some(hook);
        self
    }

    /// Disables the built-in [`SystemContextProvider`].
    pub fn without_system_context(mut self) -> Self {
        self.system_context = false;
        self
    }

    /// Directory holding persistent pipeline state (the device id).
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Validates the configuration and builds the pipeline.
    ///
    /// Sinks with [`Capabilities::EARLY_INIT`] are initialized here when
    /// auto-init is enabled; others wait for [`Pipeline::mark_ready`].
    pub fn build(self) -> Result<Pipeline, CaptureError> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            for e in &errors {
                error!(field = %e.field, "Invalid configuration: {}", e.message);
            }
            return Err(CaptureError::InvalidConfig(errors));
        }

        let config = self.config;
        let capabilities = self.sink.capabilities();
        let frames = Arc::new(AtomicU64::new(0));

        let mut providers = Vec::with_capacity(self.providers.len() + 1);
        if self.system_context {
            let system = SystemContextProvider::new(&config, self.data_dir.as_deref())
                .with_frame_counter(frames.clone());
            providers.push(Arc::new(system) as Arc<dyn ContextProvider>);
        }
        providers.extend(self.providers);

        let chain = build_chain(
            &config,
            self.scene,
            self.screenshot_hook,
            self.processors,
            self.before_send,
        );
        debug!(processors = ?chain.names(), sink = self.sink.name(), ?capabilities, "Pipeline assembled");

        let pipeline = Pipeline {
            limiter: RateLimiter::new(RateLimits::from(&config.logger.limits)),
            policy: TriagePolicy::from(&config),
            assembler: EventAssembler::new(AssemblerOptions::from(&config), self.source),
            enricher: ContextEnricher::new(providers),
            chain,
            before_send_log: self.before_send_log,
            prefix_filter: PrefixFilter::new(config.logger.filtered_prefixes.iter().cloned()),
            metrics: CaptureMetrics::new()?,
            sink: self.sink,
            capabilities,
            frames,
            ready: AtomicBool::new(false),
            sink_initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            feedback_warned: [AtomicBool::new(false), AtomicBool::new(false)],
            config,
        };

        if pipeline.config.auto_init_enabled() && capabilities.contains(Capabilities::EARLY_INIT) {
            pipeline.init_sink()?;
        }

        Ok(pipeline)
    }
}

fn build_chain(
    config: &Config,
    scene: Option<Arc<dyn SceneCapture>>,
    screenshot_hook: Option<ScreenshotHook>,
    host_processors: Vec<Arc<dyn EventProcessor>>,
    before_send: Option<BeforeSend>,
) -> ProcessorChain {
    let mut chain = ProcessorChain::new();

    if config.sdk.sample_rate < 1.0 {
        chain.add(Arc::new(SampleRateProcessor::new(config.sdk.sample_rate)));
    }
    if !config.sdk.send_default_pii {
        chain.add(Arc::new(PiiScrubber::new(&config.sdk)));
    }

    let attachments = &config.attachments;
    match &scene {
        Some(scene) => {
            if attachments.attach_screenshot {
                let mut screenshot =
                    ScreenshotProcessor::new(scene.clone(), &attachments.dir, attachments.screenshot_level);
                if let Some(hook) = screenshot_hook {
                    screenshot = screenshot.with_hook(hook);
                }
                chain.add(Arc::new(screenshot));
            }
            if attachments.attach_scene_tree {
                chain.add(Arc::new(ViewHierarchyProcessor::new(scene.clone(), &attachments.dir)));
            }
        }
        None if attachments.attach_screenshot || attachments.attach_scene_tree => {
            warn!("Scene attachments enabled but no scene capture was provided");
        }
        None => {}
    }

    for processor in host_processors {
        chain.add(processor);
    }
    if let Some(hook) = before_send {
        chain.set_before_send(hook);
    }
    chain
}

// ============================================================================
// Pipeline
// ============================================================================

/// The capture pipeline in front of one sink.
pub struct Pipeline {
    config: Config,
    sink: Arc<dyn CaptureSink>,
    capabilities: Capabilities,
    limiter: RateLimiter,
    policy: TriagePolicy,
    assembler: EventAssembler,
    enricher: ContextEnricher,
    chain: ProcessorChain,
    before_send_log: Option<BeforeSendLog>,
    prefix_filter: PrefixFilter,
    metrics: CaptureMetrics,
    frames: Arc<AtomicU64>,
    ready: AtomicBool,
    sink_initialized: AtomicBool,
    closed: AtomicBool,
    feedback_warned: [AtomicBool; 2],
}

impl Pipeline {
    /// Builds a pipeline with default adapters.
    pub fn new(config: Config, sink: Arc<dyn CaptureSink>) -> Result<Self, CaptureError> {
        PipelineBuilder::new(config, sink).build()
    }

    pub fn builder(config: Config, sink: Arc<dyn CaptureSink>) -> PipelineBuilder {
        PipelineBuilder::new(config, sink)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Initializes the sink and registers the global attachments.
    ///
    /// Later calls are no-ops. On failure the sink stays uninitialized and a
    /// later call may retry.
    pub fn init_sink(&self) -> Result<(), CaptureError> {
        if self.sink_initialized.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Err(e) = self.sink.init(&SinkOptions::from(&self.config)) {
            self.sink_initialized.store(false, Ordering::Release);
            error!(sink = self.sink.name(), error = %e, "Failed to initialize sink");
            return Err(CaptureError::SinkInit(e));
        }

        if self.capabilities.contains(Capabilities::ATTACHMENTS) {
            self.add_global_attachments();
        }
        info!(sink = self.sink.name(), "Sink initialized");
        Ok(())
    }

    fn add_global_attachments(&self) {
        let attachments = &self.config.attachments;
        if attachments.attach_log {
            if let Some(path) = &attachments.log_path {
                self.sink
                    .add_attachment(Attachment::from_path(path.clone()).with_content_type("text/plain"));
            }
        }
        if attachments.attach_screenshot {
            self.sink.add_attachment(
                Attachment::from_path(attachments.dir.join(SCREENSHOT_FILENAME))
                    .with_content_type("image/jpeg"),
            );
        }
        if attachments.attach_scene_tree {
            self.sink.add_attachment(
                Attachment::from_path(attachments.dir.join(VIEW_HIERARCHY_FILENAME))
                    .with_content_type("application/json"),
            );
        }
    }

    /// Reports that host subsystems are initialized.
    ///
    /// Captures static contexts, and initializes sinks that could not be
    /// initialized early.
    pub fn mark_ready(&self) {
        if self.ready.swap(true, Ordering::AcqRel) {
            return;
        }
        self.enricher.mark_ready();
        if self.config.auto_init_enabled() {
            // Failure is already logged; the pipeline keeps running without a sink
            let _ = self.init_sink();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Starts a new frame. Call once per frame from the frame-owning thread.
    pub fn tick_frame(&self) {
        self.limiter.tick_frame(Instant::now());
        let frame = self.frames.fetch_add(1, Ordering::AcqRel) + 1;
        self.metrics.set_frames(frame);
    }

    /// Frames ticked so far.
    pub fn frame(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Closes the sink. Signals received afterwards are dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sink.close();
        info!(sink = self.sink.name(), "Pipeline closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Handles an error reported by the host runtime.
    pub fn on_error(&self, signal: &ErrorSignal) {
        let Some(_guard) = RecursionGuard::try_enter(EntryPoint::Error) else {
            self.warn_feedback_loop(EntryPoint::Error);
            return;
        };
        self.metrics.record_signal("error");
        if self.is_closed() {
            self.metrics.record_drop("closed");
            return;
        }

        let location = signal.location();
        let kind = SignalKind::Error(signal.error_type);
        let (_, decision) = self
            .limiter
            .admit_and_record(&location, Instant::now(), |verdict| {
                self.policy.decide(kind, verdict)
            });

        if decision.is_empty() {
            debug!(file = %signal.file, line = signal.line, "Error capture skipped due to limits");
            self.metrics.record_drop("limits");
            return;
        }

        debug!(
            message = signal.message(),
            function = %signal.function,
            file = %signal.file,
            line = signal.line,
            event = decision.as_event,
            breadcrumb = decision.as_breadcrumb,
            log = decision.as_log,
            "Capturing error"
        );

        let mut event_id = None;
        if decision.as_event {
            let event = self.assembler.assemble_event(signal, self.sink.create_event());
            let id = self.dispatch_event(event);
            if !id.is_nil() {
                event_id = Some(id);
            }
        }

        if decision.as_breadcrumb {
            self.sink.add_breadcrumb(self.assembler.assemble_breadcrumb(signal));
            self.metrics.record_capture("breadcrumb");
        }

        if decision.as_log {
            self.send_log(self.assembler.assemble_log(signal, event_id));
        }
    }

    /// Handles a message printed by the host.
    pub fn on_log_message(&self, message: &str, is_error: bool) {
        let decision = self.policy.decide(SignalKind::Message, &Verdict::UNCONSTRAINED);
        if decision.is_empty() {
            return;
        }

        let Some(_guard) = RecursionGuard::try_enter(EntryPoint::Message) else {
            self.warn_feedback_loop(EntryPoint::Message);
            return;
        };
        self.metrics.record_signal("message");
        if self.is_closed() {
            self.metrics.record_drop("closed");
            return;
        }

        let message = strip_invisible(message);
        if message.is_empty() {
            self.metrics.record_drop("empty");
            return;
        }
        if self.prefix_filter.is_filtered(&message) {
            trace!("Message dropped by prefix filter");
            self.metrics.record_drop("filtered");
            return;
        }

        if decision.as_log {
            self.send_log(message_log(&message, is_error));
        }
        if decision.as_breadcrumb {
            self.sink.add_breadcrumb(message_breadcrumb(&message, is_error));
            self.metrics.record_capture("breadcrumb");
        }
    }

    fn warn_feedback_loop(&self, entry: EntryPoint) {
        self.metrics.record_drop("recursion");
        let flag = match entry {
            EntryPoint::Error => &self.feedback_warned[0],
            EntryPoint::Message => &self.feedback_warned[1],
        };
        if !flag.swap(true, Ordering::AcqRel) {
            warn!(entry = entry.as_str(), "Feedback loop detected; dropping nested signal");
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn process_context(&self) -> ProcessContext {
        ProcessContext {
            capabilities: self.capabilities,
            frame: self.frame(),
            host_ready: self.is_ready(),
        }
    }

    /// Enriches `event`, runs the chain and hands the result to the sink.
    ///
    /// Returns the nil id when the event was discarded or not delivered.
    fn dispatch_event(&self, mut event: DiagnosticEvent) -> EventId {
        if !self.sink.is_enabled() {
            trace!(event_id = %event.id, "Sink not enabled; dropping event");
            self.metrics.record_drop("sink_disabled");
            return EventId::nil();
        }

        let ctx = self.process_context();
        self.enricher.enrich(&mut event, ctx.capabilities);

        match self.chain.run(event, &ctx) {
            ChainOutcome::Send(event) => {
                let id = self.sink.capture_event(*event);
                if id.is_nil() {
                    self.metrics.record_dispatch_failure("event");
                } else {
                    self.metrics.record_capture("event");
                }
                id
            }
            ChainOutcome::Discarded { by } => {
                self.metrics.record_discard(&by);
                EventId::nil()
            }
        }
    }

    /// Sends a structured log record through the before-send-log hook.
    pub(crate) fn send_log(&self, record: LogRecord) {
        if !self.config.logs.enabled {
            return;
        }
        match apply_log_hook(self.before_send_log.as_ref(), record) {
            Some(record) => {
                self.sink.log(record);
                self.metrics.record_capture("log");
            }
            None => {
                trace!("before_send_log discarded record");
                self.metrics.record_discard("before_send_log");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Host API
    // ------------------------------------------------------------------------

    /// Fresh event stamped by the sink (release, environment).
    pub fn create_event(&self) -> DiagnosticEvent {
        self.sink.create_event()
    }

    /// Captures a host-built event through the processor chain.
    pub fn capture_event(&self, event: DiagnosticEvent) -> EventId {
        if self.is_closed() {
            return EventId::nil();
        }
        self.dispatch_event(event)
    }

    pub fn capture_message(&self, message: &str, level: Level) -> EventId {
        let mut event = self.sink.create_event();
        event.level = level;
        event.message = Some(message.to_string());
        self.capture_event(event)
    }

    /// Captures a crash. Crash events are fatal and skip enrichment on sinks
    /// without [`Capabilities::ENRICH_CRASHES`].
    pub fn capture_crash(&self, mut event: DiagnosticEvent) -> EventId {
        event.is_crash = true;
        event.level = Level::Fatal;
        self.capture_event(event)
    }

    pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        self.sink.add_breadcrumb(breadcrumb);
    }

    pub fn set_tag(&self, key: &str, value: &str) {
        self.sink.set_tag(key, value);
    }

    pub fn remove_tag(&self, key: &str) {
        self.sink.remove_tag(key);
    }

    pub fn set_user(&self, user: User) {
        self.sink.set_user(user);
    }

    pub fn remove_user(&self) {
        self.sink.remove_user();
    }

    pub fn set_context(&self, name: &str, context: ContextMap) {
        self.sink.set_context(name, context);
    }

    pub fn add_attachment(&self, attachment: Attachment) {
        self.sink.add_attachment(attachment);
    }

    pub fn last_event_id(&self) -> EventId {
        self.sink.last_event_id()
    }

    /// Structured logger writing through this pipeline.
    pub fn logger(&self) -> StructuredLogger<'_> {
        StructuredLogger::new(self)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn sink(&self) -> &Arc<dyn CaptureSink> {
        &self.sink
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }

    pub fn metrics(&self) -> &CaptureMetrics {
        &self.metrics
    }

    /// Shared frame counter, for context providers that report it.
    pub fn frame_counter(&self) -> Arc<AtomicU64> {
        self.frames.clone()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}
