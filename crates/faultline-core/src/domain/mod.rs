//! Domain types
//!
//! This module contains the data handled by the capture pipeline:
//! - Newtypes for identifiers
//! - Levels, error types and capture masks
//! - Raw error signals and backtraces as reported by the host
//! - Events, breadcrumbs and structured log records
//! - Domain-specific error types

pub mod breadcrumb;
pub mod errors;
pub mod event;
pub mod level;
pub mod log_record;
pub mod newtypes;
pub mod signal;

// Re-export commonly used types
pub use breadcrumb::Breadcrumb;
pub use errors::DomainError;
pub use event::{
    Attachment, AttachmentData, ContextMap, DiagnosticEvent, ExceptionInfo, StackFrame, User,
};
pub use level::{ErrorMask, ErrorType, Level, LogLevel};
pub use log_record::{
    LogRecord, ATTR_EVENT_ID, ATTR_ORIGIN, ATTR_PARAMETER_PREFIX, ATTR_TEMPLATE,
};
pub use newtypes::EventId;
pub use signal::{Backtrace, BacktraceFrame, ErrorSignal, SourceLocation, Variable};
