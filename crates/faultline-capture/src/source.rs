//! Filesystem-backed [`SourceProvider`].
//!
//! Script paths in backtraces are usually virtual (`res://player.gd`). The
//! provider strips a configurable scheme and resolves the rest against a root
//! directory. Files are read once and cached.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use faultline_core::ports::SourceProvider;
use tracing::debug;

/// Reads script sources from disk.
#[derive(Debug)]
pub struct FileSourceProvider {
    root: PathBuf,
    scheme: Option<String>,
    cache: Mutex<HashMap<String, Option<Arc<Vec<String>>>>>,
}

impl FileSourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scheme: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Strips `scheme` (e.g. `res://`) from paths before resolving them.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let relative = match &self.scheme {
            Some(scheme) => file.strip_prefix(scheme.as_str()).unwrap_or(file),
            None => file,
        };
        self.root.join(relative.trim_start_matches('/'))
    }

    fn load(&self, file: &str) -> Option<Arc<Vec<String>>> {
        let path = self.resolve(file);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(Arc::new(content.split('\n').map(String::from).collect())),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Script source not available");
                None
            }
        }
    }
}

impl SourceProvider for FileSourceProvider {
    fn source_lines(&self, file: &str) -> Option<Vec<String>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(file.to_string())
            .or_insert_with(|| self.load(file));
        entry.as_ref().map(|lines| lines.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_and_splits_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.gd"), "extends Node\n\nfunc _ready():\n").unwrap();

        let provider = FileSourceProvider::new(dir.path()).with_scheme("res://");
        let lines = provider.source_lines("res://main.gd").unwrap();
        assert_eq!(lines, vec!["extends Node", "", "func _ready():", ""]);
    }

    #[test]
    fn test_missing_file_is_none_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSourceProvider::new(dir.path());
        assert!(provider.source_lines("missing.gd").is_none());

        // Created after the first lookup: the miss stays cached
        std::fs::write(dir.path().join("missing.gd"), "x").unwrap();
        assert!(provider.source_lines("missing.gd").is_none());
    }
}
