//! Structured logging API
//!
//! Records are sent as structured logs and echoed to `tracing` under the
//! `faultline::log` target. The bridge layer ignores that target, so an echo
//! never comes back as a second record.

use faultline_core::domain::{
    ContextMap, LogLevel, LogRecord, ATTR_PARAMETER_PREFIX, ATTR_TEMPLATE,
};
use serde_json::Value;

use crate::pipeline::Pipeline;

/// Target of echoed structured logs.
pub const ECHO_TARGET: &str = "faultline::log";

/// Borrowed handle returned by [`Pipeline::logger`].
#[derive(Clone, Copy)]
pub struct StructuredLogger<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> StructuredLogger<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Logs `template` with `{}` placeholders filled from `params`.
    pub fn log(&self, level: LogLevel, template: &str, params: &[Value], attributes: ContextMap) {
        let record = build_record(level, template, params, attributes);
        echo(&record);
        self.pipeline.send_log(record);
    }

    pub fn trace(&self, template: &str, params: &[Value]) {
        self.log(LogLevel::Trace, template, params, ContextMap::new());
    }

    pub fn debug(&self, template: &str, params: &[Value]) {
        self.log(LogLevel::Debug, template, params, ContextMap::new());
    }

    pub fn info(&self, template: &str, params: &[Value]) {
        self.log(LogLevel::Info, template, params, ContextMap::new());
    }

    pub fn warn(&self, template: &str, params: &[Value]) {
        self.log(LogLevel::Warn, template, params, ContextMap::new());
    }

    pub fn error(&self, template: &str, params: &[Value]) {
        self.log(LogLevel::Error, template, params, ContextMap::new());
    }

    pub fn fatal(&self, template: &str, params: &[Value]) {
        self.log(LogLevel::Fatal, template, params, ContextMap::new());
    }
}

/// Builds the record for `template`.
///
/// With parameters, the template and each parameter are kept as attributes
/// next to the rendered body. Caller attributes are kept unless they collide
/// with those.
pub fn build_record(
    level: LogLevel,
    template: &str,
    params: &[Value],
    attributes: ContextMap,
) -> LogRecord {
    let mut record = LogRecord::new(level, template);
    for (key, value) in attributes {
        record.set_attribute(key, value);
    }
    if !params.is_empty() {
        record.body = render(template, params);
        record.set_attribute(ATTR_TEMPLATE, template);
        for (i, param) in params.iter().enumerate() {
            record.set_attribute(format!("{ATTR_PARAMETER_PREFIX}{i}"), param.clone());
        }
    }
    record
}

/// Replaces each `{}` in order. Missing parameters leave the placeholder;
/// extra parameters are ignored.
pub fn render(template: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut params = params.iter();

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match params.next() {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

fn echo(record: &LogRecord) {
    let body = record.body.as_str();
    match record.level {
        LogLevel::Trace => tracing::trace!(target: ECHO_TARGET, "{body}"),
        LogLevel::Debug => tracing::debug!(target: ECHO_TARGET, "{body}"),
        LogLevel::Info => tracing::info!(target: ECHO_TARGET, "{body}"),
        LogLevel::Warn => tracing::warn!(target: ECHO_TARGET, "{body}"),
        LogLevel::Error | LogLevel::Fatal => tracing::error!(target: ECHO_TARGET, "{body}"),
    }
}
