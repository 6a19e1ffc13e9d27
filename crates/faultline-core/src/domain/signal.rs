//! Raw signals reported by the host before any capture decision is made.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::level::ErrorType;

/// Identity of an error report for deduplication purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub message: String,
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
        }
    }
}

/// A named value captured from a stack frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: Value,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One frame of a host-language backtrace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktraceFrame {
    pub file: String,
    pub function: String,
    pub line: u32,
    #[serde(default)]
    pub locals: Vec<Variable>,
    #[serde(default)]
    pub members: Vec<Variable>,
}

/// A backtrace produced by one script language runtime.
///
/// Frames are ordered innermost (most recent call) first, the way language
/// runtimes report them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backtrace {
    pub language: String,
    pub frames: Vec<BacktraceFrame>,
    #[serde(default)]
    pub globals: Vec<Variable>,
}

impl Backtrace {
    /// Returns true when the innermost frame points at `file:line`.
    pub fn starts_at(&self, file: &str, line: u32) -> bool {
        self.frames
            .first()
            .is_some_and(|f| f.line == line && f.file == file)
    }
}

/// A runtime error reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSignal {
    pub function: String,
    pub file: String,
    pub line: u32,
    /// Short error code or expression that failed
    pub code: String,
    /// Human readable explanation, may be empty
    #[serde(default)]
    pub rationale: String,
    pub error_type: ErrorType,
    #[serde(default)]
    pub backtraces: Vec<Backtrace>,
}

impl ErrorSignal {
    pub fn new(
        function: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        code: impl Into<String>,
        error_type: ErrorType,
    ) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
            code: code.into(),
            rationale: String::new(),
            error_type,
            backtraces: Vec::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtraces.push(backtrace);
        self
    }

    /// The rationale when present, otherwise the error code.
    pub fn message(&self) -> &str {
        if self.rationale.is_empty() {
            &self.code
        } else {
            &self.rationale
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.message(), self.file.as_str(), self.line)
    }

    pub fn is_warning(&self) -> bool {
        self.error_type == ErrorType::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_rationale() {
        let signal = ErrorSignal::new("f", "a.gd", 3, "x != null", ErrorType::Script);
        assert_eq!(signal.message(), "x != null");

        let signal = signal.with_rationale("player is null");
        assert_eq!(signal.message(), "player is null");
    }

    #[test]
    fn test_location_identity() {
        let a = ErrorSignal::new("f", "a.gd", 3, "boom", ErrorType::Error).location();
        let b = ErrorSignal::new("g", "a.gd", 3, "boom", ErrorType::Script).location();
        let c = ErrorSignal::new("f", "a.gd", 4, "boom", ErrorType::Error).location();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_backtrace_starts_at() {
        let bt = Backtrace {
            language: "GDScript".into(),
            frames: vec![BacktraceFrame {
                file: "res://main.gd".into(),
                function: "_ready".into(),
                line: 12,
                ..Default::default()
            }],
            globals: Vec::new(),
        };
        assert!(bt.starts_at("res://main.gd", 12));
        assert!(!bt.starts_at("res://main.gd", 13));
        assert!(!Backtrace::default().starts_at("res://main.gd", 12));
    }
}
