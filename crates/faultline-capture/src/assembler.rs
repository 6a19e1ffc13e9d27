//! Event assembly
//!
//! Turns raw signals into the artifacts the sinks understand:
//! - [`EventAssembler::assemble_event`] builds a [`DiagnosticEvent`] with one
//!   exception and a stack trace taken from the best matching backtrace
//! - [`EventAssembler::assemble_breadcrumb`] / [`EventAssembler::assemble_log`]
//!   build the lightweight forms of the same error
//! - [`message_breadcrumb`] / [`message_log`] do the same for plain messages

use std::sync::Arc;

use faultline_core::{
    config::Config,
    domain::{
        log_record::{ATTR_EVENT_ID, ATTR_ORIGIN},
        Backtrace, Breadcrumb, DiagnosticEvent, ErrorSignal, ErrorType, EventId, ExceptionInfo,
        Level, LogLevel, LogRecord, StackFrame,
    },
    ports::SourceProvider,
};
use serde_json::Value;
use tracing::debug;

/// Lines of source context kept on each side of the failing line.
pub const CONTEXT_LINES: usize = 5;

/// Value of `sentry.origin` on logs produced from printed messages.
pub const MESSAGE_LOG_ORIGIN: &str = "auto.logger";

/// Assembly switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerOptions {
    pub include_source: bool,
    pub include_variables: bool,
    /// Value of the `logger` field on assembled events
    pub logger_name: String,
}

impl From<&Config> for AssemblerOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_source: config.logger.include_source,
            include_variables: config.logger.include_variables,
            logger_name: "faultline.logger".to_string(),
        }
    }
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Builds events, breadcrumbs and log records from error signals.
#[derive(Clone)]
pub struct EventAssembler {
    options: AssemblerOptions,
    source: Option<Arc<dyn SourceProvider>>,
}

impl std::fmt::Debug for EventAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventAssembler")
            .field("options", &self.options)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// Event level for an error type.
pub fn level_for(error_type: ErrorType) -> Level {
    if error_type == ErrorType::Warning {
        Level::Warning
    } else {
        Level::Error
    }
}

/// Log level for an error type.
pub fn log_level_for(error_type: ErrorType) -> LogLevel {
    if error_type == ErrorType::Warning {
        LogLevel::Warn
    } else {
        LogLevel::Error
    }
}

impl EventAssembler {
    pub fn new(options: AssemblerOptions, source: Option<Arc<dyn SourceProvider>>) -> Self {
        Self { options, source }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Picks the backtrace that best describes `signal`.
    ///
    /// A backtrace whose innermost frame is the reported `file:line` wins.
    /// Otherwise the one with the most frames; on ties the first one seen.
    pub fn select_backtrace(signal: &ErrorSignal) -> Option<&Backtrace> {
        let mut best: Option<&Backtrace> = None;
        for backtrace in &signal.backtraces {
            if backtrace.starts_at(&signal.file, signal.line) {
                return Some(backtrace);
            }
            if best.map_or(true, |b| backtrace.frames.len() > b.frames.len()) {
                best = Some(backtrace);
            }
        }
        best
    }

    /// Stack frames for `signal`, oldest call first.
    ///
    /// Native errors get a trailing synthetic frame for the reporting site so
    /// it stays visible as the origin of the error.
    pub fn build_frames(&self, signal: &ErrorSignal) -> Vec<StackFrame> {
        let mut frames = Vec::new();

        if let Some(backtrace) = Self::select_backtrace(signal) {
            let platform: String = backtrace
                .language
                .to_lowercase()
                .chars()
                .filter(|c| *c != ' ')
                .collect();

            for frame in backtrace.frames.iter().rev() {
                let mut stack_frame = StackFrame {
                    filename: frame.file.clone(),
                    function: frame.function.clone(),
                    lineno: frame.line,
                    in_app: true,
                    platform: platform.clone(),
                    ..Default::default()
                };

                if self.options.include_source {
                    self.attach_source_context(&mut stack_frame);
                }

                if self.options.include_variables {
                    stack_frame.vars = frame
                        .locals
                        .iter()
                        .chain(frame.members.iter())
                        .chain(backtrace.globals.iter())
                        .map(|v| (v.name.clone(), v.value.clone()))
                        .collect();
                }

                frames.push(stack_frame);
            }
        }

        if signal.error_type == ErrorType::Error {
            frames.push(StackFrame {
                filename: signal.file.clone(),
                function: signal.function.clone(),
                lineno: signal.line,
                in_app: false,
                platform: "native".to_string(),
                ..Default::default()
            });
        }

        frames
    }

    fn attach_source_context(&self, frame: &mut StackFrame) {
        let Some(source) = &self.source else {
            return;
        };
        let Some(lines) = source.source_lines(&frame.filename) else {
            debug!(file = %frame.filename, "Script source not available");
            return;
        };
        match source_context(&lines, frame.lineno) {
            Some((pre, line, post)) => {
                frame.pre_context = pre;
                frame.context_line = Some(line);
                frame.post_context = post;
            }
            None => debug!(
                file = %frame.filename,
                lineno = frame.lineno,
                lines = lines.len(),
                "Script source is smaller than the referenced line"
            ),
        }
    }

    /// Fills `event` (usually fresh from the sink) from `signal`.
    pub fn assemble_event(&self, signal: &ErrorSignal, mut event: DiagnosticEvent) -> DiagnosticEvent {
        event.level = level_for(signal.error_type);
        event.logger = Some(self.options.logger_name.clone());
        event.add_exception(ExceptionInfo {
            kind: signal.error_type.display_name().to_string(),
            value: signal.message().to_string(),
            frames: self.build_frames(signal),
        });
        event
    }

    /// Breadcrumb recording `signal` in the trail.
    pub fn assemble_breadcrumb(&self, signal: &ErrorSignal) -> Breadcrumb {
        Breadcrumb::new(signal.message(), level_for(signal.error_type))
            .with_kind("error")
            .with_category("error")
            .with_data("function", signal.function.as_str())
            .with_data("file", signal.file.as_str())
            .with_data("line", signal.line)
            .with_data("code", signal.code.as_str())
            .with_data("rationale", signal.rationale.as_str())
            .with_data("error_type", signal.error_type.display_name())
    }

    /// Structured log record for `signal`, linked to `event_id` when an
    /// event was captured for it.
    pub fn assemble_log(&self, signal: &ErrorSignal, event_id: Option<EventId>) -> LogRecord {
        let error_type = signal.error_type.display_name();
        let mut body = format!(
            "{}: {}\n   at: {} ({}:{})",
            error_type,
            signal.message(),
            signal.function,
            signal.file,
            signal.line
        );
        if let Some(id) = event_id {
            body.push_str(&format!("\n   event_id: {id}"));
        }

        let mut record = LogRecord::new(log_level_for(signal.error_type), body)
            .with_attribute("error.function", signal.function.as_str())
            .with_attribute("error.file", signal.file.as_str())
            .with_attribute("error.line", signal.line)
            .with_attribute("error.type", error_type);
        if let Some(id) = event_id {
            record.set_attribute(ATTR_EVENT_ID, id.to_string());
        }
        if !signal.code.is_empty() {
            record.set_attribute("error.code", signal.code.as_str());
        }
        if !signal.rationale.is_empty() {
            record.set_attribute("error.rationale", signal.rationale.as_str());
        }
        record
    }
}

/// `(pre_context, context_line, post_context)` around 1-based `line`.
pub fn source_context(lines: &[String], line: u32) -> Option<(Vec<String>, String, Vec<String>)> {
    let line = line as usize;
    if line == 0 || line > lines.len() {
        return None;
    }
    let idx = line - 1;
    let pre_start = idx.saturating_sub(CONTEXT_LINES);
    let post_end = (line + CONTEXT_LINES).min(lines.len());
    Some((
        lines[pre_start..idx].to_vec(),
        lines[idx].clone(),
        lines[line..post_end].to_vec(),
    ))
}

/// Breadcrumb for a printed message.
pub fn message_breadcrumb(message: &str, is_error: bool) -> Breadcrumb {
    let level = if is_error { Level::Error } else { Level::Info };
    Breadcrumb::new(message, level)
        .with_category("log")
        .with_kind("debug")
}

/// Structured log record for a printed message.
pub fn message_log(message: &str, is_error: bool) -> LogRecord {
    let level = if is_error {
        LogLevel::Error
    } else {
        LogLevel::Info
    };
    LogRecord::new(level, message).with_attribute(ATTR_ORIGIN, Value::from(MESSAGE_LOG_ORIGIN))
}
