//! Frame ticker for hosts without a frame loop
//!
//! Calls [`Pipeline::tick_frame`] at a fixed interval until cancelled. Hosts
//! that own a frame loop call `tick_frame` themselves instead.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pipeline::Pipeline;

pub struct FrameTicker {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    cancel: CancellationToken,
}

impl FrameTicker {
    /// Ticker using the configured `frame.tick_interval_ms`.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let interval = Duration::from_millis(pipeline.config().frame.tick_interval_ms);
        Self::with_interval(pipeline, interval)
    }

    pub fn with_interval(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        Self {
            pipeline,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the ticker when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the ticker on the current runtime.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    /// Ticks until cancelled. Returns the number of frames ticked.
    pub async fn run(self) -> u64 {
        info!(interval_ms = self.interval.as_millis() as u64, "Frame ticker starting");

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        timer.tick().await;

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(ticks, "Frame ticker cancelled");
                    break;
                }
                _ = timer.tick() => {
                    self.pipeline.tick_frame();
                    ticks += 1;
                }
            }
        }

        info!(ticks, "Frame ticker stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use faultline_core::{
        config::Config,
        domain::{Attachment, Breadcrumb, ContextMap, DiagnosticEvent, EventId, Level, LogRecord, User},
        ports::{Capabilities, CaptureSink, SinkOptions},
    };

    use super::*;

    struct NullSink;

    impl CaptureSink for NullSink {
        fn name(&self) -> &'static str {
            "null"
        }
        fn init(&self, _options: &SinkOptions) -> anyhow::Result<()> {
            Ok(())
        }
        fn close(&self) {}
        fn is_enabled(&self) -> bool {
            false
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::NONE
        }
        fn set_tag(&self, _key: &str, _value: &str) {}
        fn remove_tag(&self, _key: &str) {}
        fn set_user(&self, _user: User) {}
        fn remove_user(&self) {}
        fn set_context(&self, _name: &str, _context: ContextMap) {}
        fn add_breadcrumb(&self, _breadcrumb: Breadcrumb) {}
        fn create_event(&self) -> DiagnosticEvent {
            DiagnosticEvent::new(Level::Error)
        }
        fn capture_event(&self, _event: DiagnosticEvent) -> EventId {
            EventId::nil()
        }
        fn log(&self, _record: LogRecord) {}
        fn add_attachment(&self, _attachment: Attachment) {}
        fn last_event_id(&self) -> EventId {
            EventId::nil()
        }
    }

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(
            Pipeline::builder(Config::default(), Arc::new(NullSink))
                .without_system_context()
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_ticker_ticks_until_cancelled() {
        let pipeline = pipeline();
        let ticker = FrameTicker::with_interval(pipeline.clone(), Duration::from_millis(1));
        let cancel = ticker.cancellation_token();
        let handle = ticker.spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        let ticks = handle.await.unwrap();

        assert!(ticks > 0);
        assert_eq!(pipeline.frame(), ticks);
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick() {
        let pipeline = pipeline();
        let ticker = FrameTicker::with_interval(pipeline.clone(), Duration::from_secs(60));
        ticker.cancellation_token().cancel();
        assert_eq!(ticker.run().await, 0);
        assert_eq!(pipeline.frame(), 0);
    }

    #[test]
    fn test_interval_from_config() {
        let ticker = FrameTicker::new(pipeline());
        assert_eq!(ticker.interval, Duration::from_millis(16));
    }
}
