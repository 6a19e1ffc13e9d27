//! Per-thread recursion guard for the ingestion entry points.
//!
//! Capturing an error can itself print or fail (a sink logging a transport
//! error, a processor hitting a host error). Those nested signals re-enter the
//! pipeline on the same thread. [`RecursionGuard`] bounds that nesting so a
//! feedback loop cannot recurse without limit. Each entry point keeps its own
//! count.

use std::cell::Cell;
use std::marker::PhantomData;

/// Maximum nesting depth per thread and entry point.
pub const MAX_DEPTH: u32 = 5;

/// Ingestion entry point a guard belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Error,
    Message,
}

impl EntryPoint {
    fn index(self) -> usize {
        match self {
            EntryPoint::Error => 0,
            EntryPoint::Message => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Error => "on_error",
            EntryPoint::Message => "on_log_message",
        }
    }
}

thread_local! {
    static DEPTH: [Cell<u32>; 2] = const { [Cell::new(0), Cell::new(0)] };
}

/// Proof that the current thread is inside an ingestion entry point.
///
/// Released on drop. Not `Send`: the count belongs to the thread that
/// acquired it.
#[derive(Debug)]
pub struct RecursionGuard {
    entry: EntryPoint,
    depth: u32,
    _not_send: PhantomData<*const ()>,
}

impl RecursionGuard {
    /// Enters `entry` one level deeper, or returns `None` if the thread is
    /// already [`MAX_DEPTH`] levels deep in it.
    pub fn try_enter(entry: EntryPoint) -> Option<RecursionGuard> {
        DEPTH.with(|depths| {
            let depth = &depths[entry.index()];
            let current = depth.get();
            if current >= MAX_DEPTH {
                None
            } else {
                depth.set(current + 1);
                Some(RecursionGuard {
                    entry,
                    depth: current + 1,
                    _not_send: PhantomData,
                })
            }
        })
    }

    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    /// Nesting depth of this guard (1 for the outermost entry).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// True when the guard sits inside another entry on the same thread.
    pub fn is_nested(&self) -> bool {
        self.depth > 1
    }

    /// Current nesting depth of the calling thread in `entry`.
    pub fn current_depth(entry: EntryPoint) -> u32 {
        DEPTH.with(|depths| depths[entry.index()].get())
    }
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        DEPTH.with(|depths| {
            let depth = &depths[self.entry.index()];
            depth.set(depth.get().saturating_sub(1));
        });
    }
}
