//! Severity levels, error types and capture masks

use std::fmt::{self, Display, Formatter};
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Level
// ============================================================================

/// Severity of an event or breadcrumb.
///
/// Ordered from least to most severe so thresholds can be compared with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(DomainError::InvalidLevel(s.to_string())),
        }
    }
}

// ============================================================================
// LogLevel
// ============================================================================

/// Severity of a structured log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            _ => Err(DomainError::InvalidLevel(s.to_string())),
        }
    }
}

// ============================================================================
// ErrorType
// ============================================================================

/// Kind of runtime error reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Failure raised by native (engine-level) code
    Error,
    Warning,
    /// Failure raised by a script runtime
    Script,
    Shader,
}

impl ErrorType {
    pub const ALL: [ErrorType; 4] = [
        ErrorType::Error,
        ErrorType::Warning,
        ErrorType::Script,
        ErrorType::Shader,
    ];

    /// Name used in event exception types and log bodies.
    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorType::Error => "ERROR",
            ErrorType::Warning => "WARNING",
            ErrorType::Script => "SCRIPT ERROR",
            ErrorType::Shader => "SHADER ERROR",
        }
    }

    /// Bit of this type inside an [`ErrorMask`].
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ErrorType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(ErrorType::Error),
            "warning" => Ok(ErrorType::Warning),
            "script" | "script error" | "script_error" => Ok(ErrorType::Script),
            "shader" | "shader error" | "shader_error" => Ok(ErrorType::Shader),
            _ => Err(DomainError::InvalidErrorType(s.to_string())),
        }
    }
}

// ============================================================================
// ErrorMask
// ============================================================================

/// Set of error types allowed through a capture path.
///
/// Serialized as a list of error type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<ErrorType>", into = "Vec<ErrorType>")]
pub struct ErrorMask(u8);

impl ErrorMask {
    pub const NONE: ErrorMask = ErrorMask(0);
    pub const ALL: ErrorMask = ErrorMask(0b1111);
    pub const ALL_EXCEPT_WARNING: ErrorMask = ErrorMask(0b1111 & !ErrorType::Warning.bit());

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn allows(&self, error_type: ErrorType) -> bool {
        self.0 & error_type.bit() != 0
    }

    pub fn types(&self) -> Vec<ErrorType> {
        ErrorType::ALL
            .into_iter()
            .filter(|t| self.allows(*t))
            .collect()
    }
}

impl Default for ErrorMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr<ErrorType> for ErrorMask {
    type Output = ErrorMask;

    fn bitor(self, rhs: ErrorType) -> ErrorMask {
        ErrorMask(self.0 | rhs.bit())
    }
}

impl From<Vec<ErrorType>> for ErrorMask {
    fn from(types: Vec<ErrorType>) -> Self {
        types.into_iter().fold(ErrorMask::NONE, |mask, t| mask | t)
    }
}

impl From<ErrorMask> for Vec<ErrorType> {
    fn from(mask: ErrorMask) -> Self {
        mask.types()
    }
}

impl FromStr for ErrorMask {
    type Err = DomainError;

    /// Parse a comma separated list of error type names (`"error, script"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = ErrorMask::NONE;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            mask = mask | part.parse::<ErrorType>()?;
        }
        Ok(mask)
    }
}
