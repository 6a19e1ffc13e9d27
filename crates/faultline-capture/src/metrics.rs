//! Prometheus counters for the capture pipeline
//!
//! Each pipeline owns its registry (prefix `faultline`), so several pipelines
//! in one process do not collide.

use std::collections::BTreeMap;

use prometheus::{core::Collector, Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct CaptureMetrics {
    registry: Registry,
    /// Counter: ingested signals by kind (error, message)
    pub signals_total: IntCounterVec,
    /// Counter: produced artifacts by form (event, breadcrumb, log)
    pub captures_total: IntCounterVec,
    /// Counter: signals dropped before assembly, by reason
    pub drops_total: IntCounterVec,
    /// Counter: events discarded by the processor chain, by step
    pub discards_total: IntCounterVec,
    /// Counter: artifacts a sink failed to deliver, by form
    pub dispatch_failures_total: IntCounterVec,
    /// Gauge: frames ticked
    pub frames: IntGauge,
}

impl CaptureMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("faultline".to_string()), None)?;

        let signals_total = IntCounterVec::new(
            Opts::new("signals_total", "Signals received by the pipeline"),
            &["kind"],
        )?;
        registry.register(Box::new(signals_total.clone()))?;

        let captures_total = IntCounterVec::new(
            Opts::new("captures_total", "Artifacts produced by form"),
            &["form"],
        )?;
        registry.register(Box::new(captures_total.clone()))?;

        let drops_total = IntCounterVec::new(
            Opts::new("drops_total", "Signals dropped before assembly"),
            &["reason"],
        )?;
        registry.register(Box::new(drops_total.clone()))?;

        let discards_total = IntCounterVec::new(
            Opts::new("discards_total", "Events discarded by the processor chain"),
            &["step"],
        )?;
        registry.register(Box::new(discards_total.clone()))?;

        let dispatch_failures_total = IntCounterVec::new(
            Opts::new("dispatch_failures_total", "Artifacts the sink failed to deliver"),
            &["form"],
        )?;
        registry.register(Box::new(dispatch_failures_total.clone()))?;

        let frames = IntGauge::new("frames", "Frames ticked")?;
        registry.register(Box::new(frames.clone()))?;

        Ok(Self {
            registry,
            signals_total,
            captures_total,
            drops_total,
            discards_total,
            dispatch_failures_total,
            frames,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    pub fn record_signal(&self, kind: &str) {
        self.signals_total.with_label_values(&[kind]).inc();
    }

    pub fn record_capture(&self, form: &str) {
        self.captures_total.with_label_values(&[form]).inc();
    }

    pub fn record_drop(&self, reason: &str) {
        self.drops_total.with_label_values(&[reason]).inc();
    }

    pub fn record_discard(&self, step: &str) {
        self.discards_total.with_label_values(&[step]).inc();
    }

    pub fn record_dispatch_failure(&self, form: &str) {
        self.dispatch_failures_total.with_label_values(&[form]).inc();
    }

    pub fn set_frames(&self, frames: u64) {
        self.frames.set(i64::try_from(frames).unwrap_or(i64::MAX));
    }

    /// Current value of a labeled counter, for assertions and CLI summaries.
    pub fn count(counter: &IntCounterVec, label: &str) -> u64 {
        counter.with_label_values(&[label]).get()
    }

    /// Every label seen on a counter with its value.
    pub fn by_label(counter: &IntCounterVec) -> BTreeMap<String, u64> {
        let mut values = BTreeMap::new();
        for family in counter.collect() {
            for metric in family.get_metric() {
                if let Some(label) = metric.get_label().first() {
                    values.insert(
                        label.get_value().to_string(),
                        metric.get_counter().get_value() as u64,
                    );
                }
            }
        }
        values
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let metrics = CaptureMetrics::new().expect("create registry");
        let output = metrics.encode().expect("encode");
        assert!(output.is_empty() || output.contains("faultline"));
    }

    #[test]
    fn test_counters_are_prefixed() {
        let metrics = CaptureMetrics::new().unwrap();
        metrics.record_signal("error");
        metrics.record_capture("event");
        metrics.record_drop("spam");
        metrics.record_discard("before_send");

        let output = metrics.encode().unwrap();
        assert!(output.contains("faultline_signals_total"));
        assert!(output.contains("faultline_captures_total"));
        assert!(output.contains("faultline_drops_total"));
        assert!(output.contains("faultline_discards_total"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_count_reads_label() {
        let metrics = CaptureMetrics::new().unwrap();
        metrics.record_capture("event");
        metrics.record_capture("event");
        metrics.record_capture("log");
        assert_eq!(CaptureMetrics::count(&metrics.captures_total, "event"), 2);
        assert_eq!(CaptureMetrics::count(&metrics.captures_total, "log"), 1);
        assert_eq!(CaptureMetrics::count(&metrics.captures_total, "breadcrumb"), 0);
    }

    #[test]
    fn test_by_label_lists_seen_labels() {
        let metrics = CaptureMetrics::new().unwrap();
        metrics.record_drop("limits");
        metrics.record_drop("limits");
        metrics.record_drop("recursion");

        let drops = CaptureMetrics::by_label(&metrics.drops_total);
        assert_eq!(drops.len(), 2);
        assert_eq!(drops["limits"], 2);
        assert_eq!(drops["recursion"], 1);
    }

    #[test]
    fn test_independent_registries() {
        let a = CaptureMetrics::new().unwrap();
        let b = CaptureMetrics::new().unwrap();
        a.record_drop("throttle");
        assert_eq!(CaptureMetrics::count(&b.drops_total, "throttle"), 0);
    }
}
