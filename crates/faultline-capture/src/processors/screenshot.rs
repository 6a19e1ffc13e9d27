//! Screenshot attachment
//!
//! Writes `screenshot.jpg` into the attachments directory. The sink picks the
//! file up by path when it sends the event, so a stale file from an earlier
//! event is removed before anything else is decided.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use faultline_core::{
    domain::{DiagnosticEvent, Level},
    ports::{Capabilities, SceneCapture},
};
use tracing::{debug, error, trace};

use crate::processor::{Disposition, EventProcessor, ProcessContext};

pub const SCREENSHOT_FILENAME: &str = "screenshot.jpg";

/// Host hook consulted before a screenshot is taken. Returning `false` skips it.
pub type ScreenshotHook = Arc<dyn Fn(&DiagnosticEvent) -> bool + Send + Sync>;

const NO_FRAME: u64 = u64::MAX;

pub struct ScreenshotProcessor {
    scene: Arc<dyn SceneCapture>,
    path: PathBuf,
    min_level: Level,
    hook: Option<ScreenshotHook>,
    last_frame: AtomicU64,
}

impl ScreenshotProcessor {
    pub fn new(scene: Arc<dyn SceneCapture>, dir: &Path, min_level: Level) -> Self {
        Self {
            scene,
            path: dir.join(SCREENSHOT_FILENAME),
            min_level,
            hook: None,
            last_frame: AtomicU64::new(NO_FRAME),
        }
    }

    pub fn with_hook(mut self, hook: ScreenshotHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove_stale(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "Removed stale screenshot"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %self.path.display(), error = %e, "Could not remove stale screenshot"),
        }
    }

    fn skip_reason(&self, event: &DiagnosticEvent, ctx: &ProcessContext) -> Option<&'static str> {
        if std::thread::current().id() != self.scene.owner_thread() {
            return Some("not on owner thread");
        }
        if !ctx.host_ready {
            return Some("host not ready");
        }
        if event.is_crash && !ctx.capabilities.contains(Capabilities::ENRICH_CRASHES) {
            return Some("crash on sink without enrichment");
        }
        if self.scene.is_headless() {
            return Some("headless");
        }
        if event.level < self.min_level {
            return Some("level below threshold");
        }
        if let Some(hook) = &self.hook {
            if !hook(event) {
                return Some("declined by hook");
            }
        }
        None
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, bytes)
    }
}

impl EventProcessor for ScreenshotProcessor {
    fn name(&self) -> &str {
        "screenshot"
    }

    fn process(&self, event: &mut DiagnosticEvent, ctx: &ProcessContext) -> Disposition {
        // One screenshot per frame; the existing file still belongs to this frame
        if self.last_frame.load(Ordering::Acquire) == ctx.frame {
            trace!(frame = ctx.frame, "Screenshot already taken this frame");
            return Disposition::Keep;
        }

        self.remove_stale();

        if let Some(reason) = self.skip_reason(event, ctx) {
            trace!(event_id = %event.id, reason, "Skipping screenshot");
            return Disposition::Keep;
        }

        self.last_frame.store(ctx.frame, Ordering::Release);

        match self.scene.capture_screenshot() {
            Ok(bytes) => {
                if let Err(e) = self.write(&bytes) {
                    error!(path = %self.path.display(), error = %e, "Failed to save screenshot");
                } else {
                    debug!(event_id = %event.id, bytes = bytes.len(), "Screenshot saved");
                }
            }
            Err(e) => error!(error = %e, "Failed to capture screenshot"),
        }

        Disposition::Keep
    }
}
