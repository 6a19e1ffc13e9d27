//! Faultline Capture - the diagnostic-event capture pipeline
//!
//! Turns host error and log signals into events, breadcrumbs and structured
//! log records:
//!
//! ```text
//! on_error ──→ RateLimiter ──→ TriagePolicy ──→ EventAssembler
//!                                                    │
//!   CaptureSink ←── ProcessorChain ←── ContextEnricher
//! ```
//!
//! - [`limiter`] - per-location dedup, frame budget and throttle window
//! - [`guard`] - per-thread recursion guard for the entry points
//! - [`triage`] - which artifact forms a signal becomes
//! - [`assembler`] - builds events, breadcrumbs and log records
//! - [`enricher`] - merges context dictionaries into events
//! - [`processor`] / [`processors`] - the processing chain and built-in steps
//! - [`pipeline`] - the orchestrator and host API
//! - [`layer`], [`panic`], [`ticker`] - host integrations

pub mod assembler;
pub mod context;
pub mod enricher;
pub mod error;
pub mod filter;
pub mod guard;
pub mod layer;
pub mod limiter;
pub mod logger;
pub mod metrics;
pub mod panic;
pub mod pipeline;
pub mod processor;
pub mod processors;
pub mod source;
pub mod ticker;
pub mod triage;

pub use context::SystemContextProvider;
pub use error::CaptureError;
pub use layer::CaptureLayer;
pub use limiter::{RateLimiter, RateLimits, Verdict};
pub use metrics::CaptureMetrics;
pub use panic::install_panic_hook;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use processor::{ChainOutcome, Disposition, EventProcessor, ProcessContext, ProcessorChain};
pub use source::FileSourceProvider;
pub use ticker::FrameTicker;
pub use triage::{CaptureDecision, TriagePolicy};
