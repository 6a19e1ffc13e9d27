//! Breadcrumbs: lightweight trail entries recorded ahead of an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::level::Level;

/// A timestamped trail entry. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub level: Level,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

fn default_kind() -> String {
    "default".to_string()
}

impl Breadcrumb {
    pub fn new(message: impl Into<String>, level: Level) -> Self {
        Self {
            message: message.into(),
            category: String::new(),
            level,
            kind: default_kind(),
            data: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadcrumb_builder() {
        let crumb = Breadcrumb::new("loaded level", Level::Info)
            .with_category("log")
            .with_kind("debug")
            .with_data("line", 12);

        assert_eq!(crumb.category, "log");
        assert_eq!(crumb.kind, "debug");
        assert_eq!(crumb.data["line"], 12);
    }

    #[test]
    fn test_breadcrumb_default_kind() {
        let crumb = Breadcrumb::new("x", Level::Debug);
        assert_eq!(crumb.kind, "default");
        let json = serde_json::to_value(&crumb).unwrap();
        assert_eq!(json["type"], "default");
        assert!(json.get("category").is_none());
    }
}
