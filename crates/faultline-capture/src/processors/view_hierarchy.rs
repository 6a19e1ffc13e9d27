//! Scene tree attachment

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use faultline_core::{domain::DiagnosticEvent, ports::SceneCapture};
use tracing::{debug, error, trace};

use crate::processor::{Disposition, EventProcessor, ProcessContext};

pub const VIEW_HIERARCHY_FILENAME: &str = "view-hierarchy.json";

/// Writes `view-hierarchy.json` for each event captured on the owner thread.
pub struct ViewHierarchyProcessor {
    scene: Arc<dyn SceneCapture>,
    path: PathBuf,
}

impl ViewHierarchyProcessor {
    pub fn new(scene: Arc<dyn SceneCapture>, dir: &Path) -> Self {
        Self {
            scene,
            path: dir.join(VIEW_HIERARCHY_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, tree: &serde_json::Value) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(tree)?)?;
        Ok(())
    }

    /// Removes the file left by the previous event. A missing file is fine.
    fn remove_stale(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                trace!(path = %self.path.display(), "Removed stale view hierarchy");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl EventProcessor for ViewHierarchyProcessor {
    fn name(&self) -> &str {
        "view_hierarchy"
    }

    fn process(&self, event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
        if let Err(e) = self.remove_stale() {
            debug!(path = %self.path.display(), error = %e, "Could not remove stale view hierarchy");
        }

        if std::thread::current().id() != self.scene.owner_thread() {
            trace!(event_id = %event.id, "Skipping view hierarchy: not on owner thread");
            return Disposition::Keep;
        }

        let written = self
            .scene
            .capture_view_hierarchy()
            .and_then(|tree| self.write(&tree));
        match written {
            Ok(()) => debug!(event_id = %event.id, "View hierarchy saved"),
            Err(e) => error!(path = %self.path.display(), error = %e, "Failed to save view hierarchy"),
        }

        Disposition::Keep
    }
}

#[cfg(test)]
mod tests {
    use std::thread::ThreadId;

    use faultline_core::domain::Level;
    use serde_json::json;

    use super::*;

    struct Tree {
        owner: ThreadId,
    }

    impl SceneCapture for Tree {
        fn owner_thread(&self) -> ThreadId {
            self.owner
        }

        fn is_headless(&self) -> bool {
            true
        }

        fn capture_screenshot(&self) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("no display")
        }

        fn capture_view_hierarchy(&self) -> anyhow::Result<serde_json::Value> {
            Ok(json!({"name": "root", "children": [{"name": "Player"}]}))
        }
    }

    #[test]
    fn test_writes_tree_on_owner_thread() {
        let dir = tempfile::tempdir().unwrap();
        let scene = Arc::new(Tree {
            owner: std::thread::current().id(),
        });
        let processor = ViewHierarchyProcessor::new(scene, dir.path());

        let mut event = DiagnosticEvent::new(Level::Error);
        processor.process(&mut event, &ProcessContext::default());

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(processor.path()).unwrap()).unwrap();
        assert_eq!(written["children"][0]["name"], "Player");
    }

    #[test]
    fn test_off_thread_removes_stale_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let other = std::thread::spawn(|| std::thread::current().id()).join().unwrap();
        let processor = ViewHierarchyProcessor::new(Arc::new(Tree { owner: other }), dir.path());
        std::fs::write(processor.path(), b"{}").unwrap();

        let mut event = DiagnosticEvent::new(Level::Error);
        processor.process(&mut event, &ProcessContext::default());
        assert!(!processor.path().exists());
    }

    #[test]
    fn test_remove_stale_reports_only_real_failures() {
        let dir = tempfile::tempdir().unwrap();
        let scene = Arc::new(Tree {
            owner: std::thread::current().id(),
        });
        let processor = ViewHierarchyProcessor::new(scene, dir.path());

        // Nothing there yet
        assert!(processor.remove_stale().is_ok());

        // A directory in the way cannot be removed as a file
        std::fs::create_dir(processor.path()).unwrap();
        assert!(processor.remove_stale().is_err());

        let mut event = DiagnosticEvent::new(Level::Error);
        assert_eq!(
            processor.process(&mut event, &ProcessContext::default()),
            Disposition::Keep
        );
        assert!(processor.path().is_dir());
    }
}
