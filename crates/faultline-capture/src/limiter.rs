//! Rate limiting and deduplication of error signals
//!
//! Protects the host from log storms by bounding how many error signals turn
//! into events.
//!
//! ## Rules
//!
//! - **Repeated errors**: a signal whose [`SourceLocation`] was admitted less
//!   than `repeated_error_window` ago is spam and produces nothing.
//! - **Frame budget**: at most `events_per_frame` events between two calls to
//!   [`RateLimiter::tick_frame`].
//! - **Throttle window**: at most `throttle_events` events inside any sliding
//!   `throttle_window`. A zero window disables throttling.
//!
//! All state lives behind one `Mutex`, held only for the duration of a single
//! call. Callers pass `now` explicitly so decisions are linearizable with
//! respect to the timestamp observed under the lock.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use faultline_core::{config::LimitsConfig, domain::SourceLocation};
use tracing::{debug, trace};

use crate::triage::CaptureDecision;

/// Number of tracked locations above which the dedup map is cleared on tick.
pub const MAX_TRACKED_LOCATIONS: usize = 100;

// ============================================================================
// RateLimits
// ============================================================================

/// Immutable limits, loaded once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub events_per_frame: u32,
    pub repeated_error_window: Duration,
    pub throttle_events: u32,
    pub throttle_window: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for RateLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            events_per_frame: config.events_per_frame,
            repeated_error_window: Duration::from_millis(config.repeated_error_window_ms),
            throttle_events: config.throttle_events,
            throttle_window: Duration::from_millis(config.throttle_window_ms),
        }
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Outcome of checking one signal against the limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_spammy: bool,
    pub within_frame_budget: bool,
    pub within_throttle_budget: bool,
}

impl Verdict {
    /// Verdict for signals that are not rate limited.
    pub const UNCONSTRAINED: Verdict = Verdict {
        is_spammy: false,
        within_frame_budget: true,
        within_throttle_budget: true,
    };
}

// ============================================================================
// RateLimiter
// ============================================================================

/// Internal mutable state, protected by a Mutex.
#[derive(Debug, Default)]
struct LimiterState {
    /// Last admission time per source location
    last_seen: HashMap<SourceLocation, Instant>,
    /// Times of admitted events, oldest first
    recent_event_times: VecDeque<Instant>,
    /// Events admitted since the last frame tick
    frame_event_count: u32,
}

impl LimiterState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.recent_event_times.front() {
            if now.saturating_duration_since(*front) >= window {
                self.recent_event_times.pop_front();
            } else {
                break;
            }
        }
    }

    fn verdict(&self, location: &SourceLocation, now: Instant, limits: &RateLimits) -> Verdict {
        let is_spammy = self
            .last_seen
            .get(location)
            .is_some_and(|t| now.saturating_duration_since(*t) < limits.repeated_error_window);

        Verdict {
            is_spammy,
            within_frame_budget: self.frame_event_count < limits.events_per_frame,
            within_throttle_budget: self.recent_event_times.len()
                < limits.throttle_events as usize
                || limits.throttle_window.is_zero(),
        }
    }

    fn record(&mut self, location: &SourceLocation, now: Instant, decision: &CaptureDecision) {
        if decision.as_event {
            self.frame_event_count += 1;
            // Keep the deque sorted even if a caller passes a stale `now`
            let at = self
                .recent_event_times
                .back()
                .map_or(now, |last| now.max(*last));
            self.recent_event_times.push_back(at);
        }
        if decision.as_event || decision.as_breadcrumb {
            self.last_seen.insert(location.clone(), now);
        }
    }
}

/// Sliding-window deduplication and budget engine for error signals.
///
/// Thread safety is provided by an internal `Mutex<LimiterState>`.
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        debug!(
            events_per_frame = limits.events_per_frame,
            repeated_error_window_ms = limits.repeated_error_window.as_millis() as u64,
            throttle_events = limits.throttle_events,
            throttle_window_ms = limits.throttle_window.as_millis() as u64,
            "Created rate limiter"
        );
        Self {
            limits,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    // A panic while holding the lock leaves the state consistent (every
    // mutation is a single push/insert), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks `location` against the limits without recording anything.
    ///
    /// Expired entries of the throttle window are pruned first.
    pub fn admit(&self, location: &SourceLocation, now: Instant) -> Verdict {
        let mut state = self.lock();
        state.prune(now, self.limits.throttle_window);
        state.verdict(location, now, &self.limits)
    }

    /// Records what was actually emitted for `location`.
    ///
    /// Events count against the frame and throttle budgets; events and
    /// breadcrumbs both refresh the dedup timestamp.
    pub fn record_admission(
        &self,
        location: &SourceLocation,
        now: Instant,
        decision: &CaptureDecision,
    ) {
        self.lock().record(location, now, decision);
    }

    /// Checks, decides and records under a single lock acquisition.
    ///
    /// `decide` runs while the lock is held and must not call back into the
    /// limiter or block.
    pub fn admit_and_record<F>(
        &self,
        location: &SourceLocation,
        now: Instant,
        decide: F,
    ) -> (Verdict, CaptureDecision)
    where
        F: FnOnce(&Verdict) -> CaptureDecision,
    {
        let mut state = self.lock();
        state.prune(now, self.limits.throttle_window);
        let verdict = state.verdict(location, now, &self.limits);
        let decision = decide(&verdict);
        state.record(location, now, &decision);
        trace!(
            file = %location.file,
            line = location.line,
            ?verdict,
            ?decision,
            "Rate limiter decision"
        );
        (verdict, decision)
    }

    /// Starts a new frame: resets the frame budget and prunes old state.
    ///
    /// The dedup map is cleared entirely once it tracks more than
    /// [`MAX_TRACKED_LOCATIONS`] locations.
    pub fn tick_frame(&self, now: Instant) {
        let mut state = self.lock();
        state.frame_event_count = 0;
        state.prune(now, self.limits.throttle_window);
        if state.last_seen.len() > MAX_TRACKED_LOCATIONS {
            trace!(
                tracked = state.last_seen.len(),
                "Clearing repeated-error map"
            );
            state.last_seen.clear();
        }
    }

    /// Events admitted since the last frame tick.
    pub fn frame_event_count(&self) -> u32 {
        self.lock().frame_event_count
    }

    /// Events currently inside the throttle window.
    pub fn recent_event_count(&self) -> usize {
        self.lock().recent_event_times.len()
    }

    /// Number of locations tracked for repeated-error suppression.
    pub fn tracked_locations(&self) -> usize {
        self.lock().last_seen.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
