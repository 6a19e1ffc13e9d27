//! Context provider port
//!
//! Context providers supply named dictionaries (`device`, `app`, `culture`,
//! `performance`, ...) that the enricher merges into events. Static contexts
//! are read once after the host is ready; dynamic contexts on every event.

use std::collections::BTreeMap;

use crate::domain::ContextMap;

/// Named context dictionaries keyed by context name.
pub type Contexts = BTreeMap<String, ContextMap>;

pub trait ContextProvider: Send + Sync {
    /// Contexts that do not change for the lifetime of the process.
    fn static_contexts(&self) -> Contexts;

    /// Contexts that must be recomputed for every event.
    fn dynamic_contexts(&self) -> Contexts {
        Contexts::new()
    }
}
