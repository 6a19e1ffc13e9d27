//! Probabilistic event sampling

use std::sync::{Mutex, PoisonError};

use faultline_core::domain::DiagnosticEvent;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::trace;

use crate::processor::{Disposition, EventProcessor, ProcessContext};

/// Keeps each event with probability `sample_rate`.
pub struct SampleRateProcessor {
    sample_rate: f64,
    rng: Mutex<SmallRng>,
}

impl SampleRateProcessor {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_rng(sample_rate, SmallRng::from_entropy())
    }

    /// Deterministic sampler for tests and replays.
    pub fn with_seed(sample_rate: f64, seed: u64) -> Self {
        Self::with_rng(sample_rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: f64, rng: SmallRng) -> Self {
        Self {
            sample_rate: sample_rate.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl EventProcessor for SampleRateProcessor {
    fn name(&self) -> &str {
        "sample_rate"
    }

    fn process(&self, event: &mut DiagnosticEvent, _ctx: &ProcessContext) -> Disposition {
        let keep = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_bool(self.sample_rate);
        if keep {
            Disposition::Keep
        } else {
            trace!(event_id = %event.id, rate = self.sample_rate, "Event sampled out");
            Disposition::Discard
        }
    }
}

#[cfg(test)]
mod tests {
    use faultline_core::domain::Level;

    use super::*;

    fn kept(processor: &SampleRateProcessor, n: usize) -> usize {
        (0..n)
            .filter(|_| {
                let mut event = DiagnosticEvent::new(Level::Error);
                processor.process(&mut event, &ProcessContext::default()) == Disposition::Keep
            })
            .count()
    }

    #[test]
    fn test_full_rate_keeps_everything() {
        assert_eq!(kept(&SampleRateProcessor::with_seed(1.0, 7), 200), 200);
    }

    #[test]
    fn test_zero_rate_drops_everything() {
        assert_eq!(kept(&SampleRateProcessor::with_seed(0.0, 7), 200), 0);
    }

    #[test]
    fn test_partial_rate_is_roughly_proportional() {
        let n = kept(&SampleRateProcessor::with_seed(0.5, 42), 2000);
        assert!((800..1200).contains(&n), "kept {n} of 2000");
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(SampleRateProcessor::new(3.0).sample_rate(), 1.0);
        assert_eq!(SampleRateProcessor::new(-1.0).sample_rate(), 0.0);
    }
}
