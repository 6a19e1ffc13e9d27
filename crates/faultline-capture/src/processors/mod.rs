//! Built-in event processors

mod pii;
mod sample_rate;
mod screenshot;
mod view_hierarchy;

pub use pii::PiiScrubber;
pub use sample_rate::SampleRateProcessor;
pub use screenshot::{ScreenshotHook, ScreenshotProcessor, SCREENSHOT_FILENAME};
pub use view_hierarchy::{ViewHierarchyProcessor, VIEW_HIERARCHY_FILENAME};
