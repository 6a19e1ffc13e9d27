//! Source provider port
//!
//! Resolves a script path from a backtrace to its source lines so frames can
//! carry surrounding context.

pub trait SourceProvider: Send + Sync {
    /// All lines of `file`, or `None` if the source is unavailable.
    fn source_lines(&self, file: &str) -> Option<Vec<String>>;
}
