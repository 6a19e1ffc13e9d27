//! Panic capture
//!
//! [`install_panic_hook`] reports panics as fatal crash events through the
//! pipeline, then hands over to the previously installed hook so the default
//! behavior (stderr output) is preserved.

use std::{any::Any, sync::Arc};

use faultline_core::domain::{DiagnosticEvent, EventId, ExceptionInfo, Level, StackFrame};
use serde_json::json;

use crate::pipeline::Pipeline;

/// Exception type of panic events.
pub const PANIC_EXCEPTION_TYPE: &str = "panic";

/// Where a panic happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// Text carried by a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Fills `event` as a crash event for a panic.
pub fn crash_event(
    mut event: DiagnosticEvent,
    message: &str,
    location: Option<&PanicLocation>,
    thread: Option<&str>,
    backtrace: &str,
) -> DiagnosticEvent {
    event.is_crash = true;
    event.level = Level::Fatal;
    event.message = Some(message.to_string());

    let frames = location
        .map(|l| {
            vec![StackFrame {
                filename: l.file.clone(),
                function: thread.unwrap_or("<unnamed>").to_string(),
                lineno: l.line,
                in_app: true,
                platform: "rust".to_string(),
                ..Default::default()
            }]
        })
        .unwrap_or_default();
    event.add_exception(ExceptionInfo {
        kind: PANIC_EXCEPTION_TYPE.to_string(),
        value: message.to_string(),
        frames,
    });

    if let Some(thread) = thread {
        event.set_tag("thread", thread);
    }
    if !backtrace.is_empty() {
        let mut panic_ctx = serde_json::Map::new();
        panic_ctx.insert("backtrace".into(), json!(backtrace));
        if let Some(l) = location {
            panic_ctx.insert("column".into(), json!(l.column));
        }
        event.merge_context("panic", panic_ctx);
    }
    event
}

/// Captures a panic through `pipeline`.
pub fn capture_panic(
    pipeline: &Pipeline,
    message: &str,
    location: Option<&PanicLocation>,
    backtrace: &str,
) -> EventId {
    let current = std::thread::current();
    let event = crash_event(
        pipeline.create_event(),
        message,
        location,
        current.name(),
        backtrace,
    );
    pipeline.capture_crash(event)
}

/// Installs a process-wide panic hook reporting to `pipeline`.
///
/// Chains with the existing panic hook.
pub fn install_panic_hook(pipeline: Arc<Pipeline>) {
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = panic_message(panic_info.payload());
        let location = panic_info.location().map(|l| PanicLocation {
            file: l.file().to_string(),
            line: l.line(),
            column: l.column(),
        });
        let backtrace = std::backtrace::Backtrace::force_capture().to_string();

        capture_panic(&pipeline, &message, location.as_ref(), &backtrace);

        previous_hook(panic_info);
    }));
}
