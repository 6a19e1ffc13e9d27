//! Structured log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::level::LogLevel;

/// Attribute key carrying the id of the event captured for the same signal.
pub const ATTR_EVENT_ID: &str = "sentry.event_id";
/// Attribute key naming the integration that produced a record.
pub const ATTR_ORIGIN: &str = "sentry.origin";
/// Attribute key holding the unformatted message template.
pub const ATTR_TEMPLATE: &str = "sentry.message.template";
/// Prefix of the attribute keys holding template parameters.
pub const ATTR_PARAMETER_PREFIX: &str = "sentry.message.parameter.";

/// A leveled log record with free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub body: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(level: LogLevel, body: impl Into<String>) -> Self {
        Self {
            level,
            body: body.into(),
            attributes: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_record_attributes() {
        let mut record = LogRecord::new(LogLevel::Info, "hello")
            .with_attribute(ATTR_ORIGIN, "auto.logger");
        record.set_attribute("count", 3);

        assert_eq!(record.attribute(ATTR_ORIGIN).unwrap(), "auto.logger");
        assert_eq!(record.attribute("count").unwrap(), 3);
        assert!(record.attribute("missing").is_none());
    }
}
