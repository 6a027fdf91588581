//! Report scheduler.
//!
//! Fires one produce-and-publish cycle at start-up and another every
//! [`REPORT_GENERATION_INTERVAL`]. Each tick spawns its cycle as an
//! independent task; ticks never wait on, skip for, or cancel a cycle that
//! is still running. Overlapping cycles for the same epoch are made safe by
//! the sink's dedup check.

use std::sync::Arc;
use std::time::Duration;

use observer_core::{ReportInfo, ReportProducer, ReportSink};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

pub const REPORT_GENERATION_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Drives report production and publication.
#[derive(Clone)]
pub struct ReportScheduler {
    producer: Arc<dyn ReportProducer>,
    sink: Arc<dyn ReportSink>,
    interval: Duration,
}

impl ReportScheduler {
    pub fn new(producer: Arc<dyn ReportProducer>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            producer,
            sink,
            interval: REPORT_GENERATION_INTERVAL,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Produce the current report and publish it.
    ///
    /// Returns the published report info, or `None` if either step failed.
    pub async fn run_cycle(&self) -> Option<ReportInfo> {
        let report = match self.producer.current_report().await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Error generating report");
                return None;
            }
        };
        let epoch_start_height = report.epoch_start_height();
        info!(epoch_start_height, "Report generated");

        let saved = self.sink.save_report(ReportInfo::new(report)).await;
        match &saved {
            Some(info) => info!(
                epoch_start_height,
                report_tx_id = info.report_tx_id.as_deref().unwrap_or_default(),
                "Report cycle complete"
            ),
            None => warn!(epoch_start_height, "Report not saved, will retry next cycle"),
        }
        saved
    }

    /// Run forever. The first cycle starts immediately.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "report scheduler starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_cycle().await;
            });
        }
    }

    /// Run the scheduler loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use observer_core::{ObserverError, ObserverReport};
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProducer {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl ReportProducer for CountingProducer {
        async fn current_report(&self) -> Result<ObserverReport, ObserverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            Ok(ObserverReport::new(1000, Map::new()))
        }
    }

    struct FailingProducer;

    #[async_trait]
    impl ReportProducer for FailingProducer {
        async fn current_report(&self) -> Result<ObserverReport, ObserverError> {
            Err(ObserverError::NetworkError("gateway down".into()))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl ReportSink for CountingSink {
        async fn save_report(&self, report_info: ReportInfo) -> Option<ReportInfo> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Some(report_info.with_tx_id("tx"))
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_default_interval_is_two_hours() {
        let scheduler =
            ReportScheduler::new(Arc::new(FailingProducer), Arc::new(CountingSink::default()));
        assert_eq!(scheduler.interval(), Duration::from_secs(7200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_runs_immediately() {
        let producer = Arc::new(CountingProducer {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let sink = Arc::new(CountingSink::default());
        let handle = ReportScheduler::new(producer.clone(), sink.clone()).spawn();

        settle().await;
        assert_eq!(producer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.saves.load(Ordering::SeqCst), 1);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_repeat_every_interval() {
        let producer = Arc::new(CountingProducer {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let sink = Arc::new(CountingSink::default());
        let handle = ReportScheduler::new(producer.clone(), sink.clone()).spawn();

        time::sleep(REPORT_GENERATION_INTERVAL * 2 + Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(producer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.saves.load(Ordering::SeqCst), 3);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_do_not_wait_for_in_flight_cycles() {
        let producer = Arc::new(CountingProducer {
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(10),
        });
        let sink = Arc::new(CountingSink::default());
        let handle = ReportScheduler::new(producer.clone(), sink.clone())
            .with_interval(Duration::from_secs(3))
            .spawn();

        // Cycles started at t=0, 3, 6, 9; none has finished yet.
        time::sleep(Duration::from_secs(9) + Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(producer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(sink.saves.load(Ordering::SeqCst), 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_failure_keeps_scheduling() {
        let sink = Arc::new(CountingSink::default());
        let scheduler = ReportScheduler::new(Arc::new(FailingProducer), sink.clone())
            .with_interval(Duration::from_secs(1));
        assert!(scheduler.run_cycle().await.is_none());

        let handle = scheduler.spawn();
        time::sleep(Duration::from_millis(2500)).await;
        settle().await;
        assert!(!handle.is_finished());
        assert_eq!(sink.saves.load(Ordering::SeqCst), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_run_cycle_returns_saved_info() {
        let producer = Arc::new(CountingProducer {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let scheduler = ReportScheduler::new(producer, Arc::new(CountingSink::default()));
        let saved = scheduler.run_cycle().await.unwrap();
        assert_eq!(saved.report_tx_id.as_deref(), Some("tx"));
        assert_eq!(saved.epoch_start_height(), 1000);
    }
}
