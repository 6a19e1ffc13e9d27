//! Diagnostic events
//!
//! A [`DiagnosticEvent`] is the fully structured record of an error or crash.
//! It is created by the assembler (or the sink), mutated in place by the
//! enricher and the processor chain, and finally handed to a sink.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::level::Level;
use super::newtypes::EventId;

/// A named context dictionary such as `device` or `app`.
pub type ContextMap = serde_json::Map<String, Value>;

// ============================================================================
// StackFrame / ExceptionInfo
// ============================================================================

/// One frame of an event stack trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub filename: String,
    pub function: String,
    pub lineno: u32,
    pub in_app: bool,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_line: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_context: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_context: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<(String, Value)>,
}

/// An exception with its stack trace.
///
/// Frames are stored oldest call first; the top of the stack is the last frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub frames: Vec<StackFrame>,
}

// ============================================================================
// User / Attachment
// ============================================================================

/// User associated with captured events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl User {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.ip_address.is_none()
    }
}

/// Payload of an attachment: either a file read at send time or inline bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentData {
    Path(std::path::PathBuf),
    Bytes(Vec<u8>),
}

/// A file sent along with every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub data: AttachmentData,
}

impl Attachment {
    /// Attachment read from `path` when the event is sent.
    pub fn from_path(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            filename,
            content_type: None,
            data: AttachmentData::Path(path),
        }
    }

    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data: AttachmentData::Bytes(bytes),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

// ============================================================================
// DiagnosticEvent
// ============================================================================

/// A fully structured error or crash record.
///
/// Identity is the `id`; two events with the same id are the same logical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub contexts: BTreeMap<String, ContextMap>,
    #[serde(default)]
    pub exceptions: Vec<ExceptionInfo>,
    #[serde(default)]
    pub is_crash: bool,
}

impl DiagnosticEvent {
    /// Create an empty event with a fresh id, stamped now.
    pub fn new(level: Level) -> Self {
        Self {
            id: EventId::new(),
            message: None,
            timestamp: Utc::now(),
            level,
            logger: None,
            release: None,
            dist: None,
            environment: None,
            tags: BTreeMap::new(),
            contexts: BTreeMap::new(),
            exceptions: Vec::new(),
            is_crash: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Merge `values` into the context named `name`.
    ///
    /// Keys already present are overwritten one by one; keys not mentioned in
    /// `values` are kept.
    pub fn merge_context(&mut self, name: &str, values: ContextMap) {
        let target = self.contexts.entry(name.to_string()).or_default();
        for (key, value) in values {
            target.insert(key, value);
        }
    }

    pub fn add_exception(&mut self, exception: ExceptionInfo) {
        self.exceptions.push(exception);
    }

    pub fn is_crash(&self) -> bool {
        self.is_crash
    }
}
