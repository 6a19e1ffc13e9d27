//! Triage: deciding which artifact forms a signal becomes.

use faultline_core::{
    config::Config,
    domain::{ErrorMask, ErrorType},
};

use crate::limiter::Verdict;

/// Which artifacts to emit for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureDecision {
    pub as_event: bool,
    pub as_breadcrumb: bool,
    pub as_log: bool,
}

impl CaptureDecision {
    pub const NONE: CaptureDecision = CaptureDecision {
        as_event: false,
        as_breadcrumb: false,
        as_log: false,
    };

    /// True when the signal should be dropped entirely.
    pub fn is_empty(&self) -> bool {
        !(self.as_event || self.as_breadcrumb || self.as_log)
    }
}

/// Kind of incoming signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Error(ErrorType),
    /// A plain printed message, optionally flagged as an error.
    Message,
}

/// Capture masks and switches that drive triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriagePolicy {
    /// Master switch of the logger integration
    pub logger_enabled: bool,
    pub event_mask: ErrorMask,
    pub breadcrumb_mask: ErrorMask,
    /// Structured logs enabled
    pub logs_enabled: bool,
    pub messages_as_breadcrumbs: bool,
}

impl From<&Config> for TriagePolicy {
    fn from(config: &Config) -> Self {
        Self {
            logger_enabled: config.logger.enabled,
            event_mask: config.logger.event_mask,
            breadcrumb_mask: config.logger.breadcrumb_mask,
            logs_enabled: config.logs.enabled,
            messages_as_breadcrumbs: config.logger.messages_as_breadcrumbs,
        }
    }
}

impl Default for TriagePolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl TriagePolicy {
    /// Decides the artifact forms of a signal.
    ///
    /// Plain messages are never rate limited, so `verdict` only matters for
    /// error signals.
    pub fn decide(&self, signal: SignalKind, verdict: &Verdict) -> CaptureDecision {
        if !self.logger_enabled {
            return CaptureDecision::NONE;
        }
        match signal {
            SignalKind::Error(error_type) => {
                let fresh = !verdict.is_spammy;
                CaptureDecision {
                    as_event: self.event_mask.allows(error_type)
                        && verdict.within_frame_budget
                        && verdict.within_throttle_budget
                        && fresh,
                    as_breadcrumb: self.breadcrumb_mask.allows(error_type) && fresh,
                    as_log: self.logs_enabled && fresh,
                }
            }
            SignalKind::Message => CaptureDecision {
                as_event: false,
                as_breadcrumb: self.messages_as_breadcrumbs,
                as_log: self.logs_enabled,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TriagePolicy {
        TriagePolicy {
            logger_enabled: true,
            event_mask: ErrorMask::ALL_EXCEPT_WARNING,
            breadcrumb_mask: ErrorMask::ALL,
            logs_enabled: true,
            messages_as_breadcrumbs: true,
        }
    }

    #[test]
    fn test_fresh_error_becomes_everything() {
        let d = policy().decide(SignalKind::Error(ErrorType::Script), &Verdict::UNCONSTRAINED);
        assert_eq!(
            d,
            CaptureDecision {
                as_event: true,
                as_breadcrumb: true,
                as_log: true
            }
        );
    }

    #[test]
    fn test_warning_is_not_an_event_by_default() {
        let d = policy().decide(SignalKind::Error(ErrorType::Warning), &Verdict::UNCONSTRAINED);
        assert!(!d.as_event);
        assert!(d.as_breadcrumb);
    }

    #[test]
    fn test_spam_produces_nothing() {
        let verdict = Verdict {
            is_spammy: true,
            ..Verdict::UNCONSTRAINED
        };
        let d = policy().decide(SignalKind::Error(ErrorType::Error), &verdict);
        assert!(d.is_empty());
    }

    #[test]
    fn test_budget_exhaustion_keeps_breadcrumb_and_log() {
        let verdict = Verdict {
            within_frame_budget: false,
            ..Verdict::UNCONSTRAINED
        };
        let d = policy().decide(SignalKind::Error(ErrorType::Error), &verdict);
        assert!(!d.as_event);
        assert!(d.as_breadcrumb);
        assert!(d.as_log);

        let verdict = Verdict {
            within_throttle_budget: false,
            ..Verdict::UNCONSTRAINED
        };
        let d = policy().decide(SignalKind::Error(ErrorType::Error), &verdict);
        assert!(!d.as_event);
        assert!(d.as_breadcrumb);
    }

    #[test]
    fn test_messages_ignore_verdict() {
        let verdict = Verdict {
            is_spammy: true,
            within_frame_budget: false,
            within_throttle_budget: false,
        };
        let d = policy().decide(SignalKind::Message, &verdict);
        assert!(!d.as_event);
        assert!(d.as_breadcrumb);
        assert!(d.as_log);

        let mut p = policy();
        p.logs_enabled = false;
        p.messages_as_breadcrumbs = false;
        assert!(p.decide(SignalKind::Message, &Verdict::UNCONSTRAINED).is_empty());
    }

    #[test]
    fn test_disabled_logger_drops_everything() {
        let mut p = policy();
        p.logger_enabled = false;
        assert!(p
            .decide(SignalKind::Error(ErrorType::Error), &Verdict::UNCONSTRAINED)
            .is_empty());
        assert!(p.decide(SignalKind::Message, &Verdict::UNCONSTRAINED).is_empty());
    }

    #[test]
    fn test_default_policy_has_logs_off() {
        let p = TriagePolicy::default();
        let d = p.decide(SignalKind::Error(ErrorType::Error), &Verdict::UNCONSTRAINED);
        assert!(d.as_event);
        assert!(!d.as_log);
    }
}
