//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the capture pipeline depends on. Their
//! implementations live in `faultline-sinks` or in the host application.
//!
//! ## Ports Overview
//!
//! - [`CaptureSink`] - The active telemetry backend
//! - [`Transport`] - Envelope delivery used by sinks
//! - [`ContextProvider`] - Device, app and performance context dictionaries
//! - [`SceneCapture`] - Screenshots and scene-tree dumps
//! - [`SourceProvider`] - Script source lines for frame context

pub mod context;
pub mod scene;
pub mod sink;
pub mod source;
pub mod transport;

pub use context::{ContextProvider, Contexts};
pub use scene::SceneCapture;
pub use sink::{Capabilities, CaptureSink, SinkOptions};
pub use source::SourceProvider;
pub use transport::{Envelope, EnvelopeHeader, EnvelopeItem, Transport};
