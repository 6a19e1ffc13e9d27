//! Scene capture port
//!
//! Access to the host's rendering and scene graph, used to attach a
//! screenshot and a view-hierarchy dump to events. Every method except
//! [`SceneCapture::owner_thread`] and [`SceneCapture::is_headless`] must only
//! be called from the owner thread.

use std::thread::ThreadId;

pub trait SceneCapture: Send + Sync {
    /// Thread that owns the scene graph (usually the main thread).
    fn owner_thread(&self) -> ThreadId;

    /// True when no display is attached; screenshots are impossible.
    fn is_headless(&self) -> bool;

    /// Encoded image of the current frame (PNG or JPEG).
    fn capture_screenshot(&self) -> anyhow::Result<Vec<u8>>;

    /// JSON dump of the scene tree.
    fn capture_view_hierarchy(&self) -> anyhow::Result<serde_json::Value>;
}
