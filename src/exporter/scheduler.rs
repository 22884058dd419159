use std::time::{Duration, Instant};

use prometheus::{Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tokio::select;
use tokio::sync::watch;
use tokio::time::sleep;

use super::{Collected, Collector, CollectorError, SnapshotStore, NAMESPACE, SUBSYSTEM};

/// Where the scheduler is in its refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Success,
    Failed,
}

/// Result of a single refresh cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Published {
        records: usize,
        warning: Option<CollectorError>,
    },
    Failed(CollectorError),
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }
}

/// Counters describing the health of the refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshStats {
    successes: IntCounter,
    failures: IntCounterVec,
    last_success: Gauge,
    last_duration: Gauge,
    records: IntGauge,
}

impl RefreshStats {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM)
        };

        let stats = RefreshStats {
            successes: IntCounter::with_opts(opts(
                "exporter_refresh_success_total",
                "Refresh cycles whose output was published",
            ))?,
            failures: IntCounterVec::new(
                opts(
                    "exporter_refresh_failures_total",
                    "Refresh cycles that left the previous snapshot in place",
                ),
                &["reason"],
            )?,
            last_success: Gauge::with_opts(opts(
                "exporter_last_success_timestamp_seconds",
                "Unix time of the last published refresh cycle",
            ))?,
            last_duration: Gauge::with_opts(opts(
                "exporter_last_refresh_duration_seconds",
                "Run time of the last refresh cycle",
            ))?,
            records: IntGauge::with_opts(opts(
                "exporter_records",
                "Records in the currently published snapshot",
            ))?,
        };

        registry.register(Box::new(stats.successes.clone()))?;
        registry.register(Box::new(stats.failures.clone()))?;
        registry.register(Box::new(stats.last_success.clone()))?;
        registry.register(Box::new(stats.last_duration.clone()))?;
        registry.register(Box::new(stats.records.clone()))?;
        Ok(stats)
    }

    fn record_success(&self, records: usize) {
        self.successes.inc();
        self.records.set(records as i64);
        self.last_success.set(chrono::Utc::now().timestamp() as f64);
    }

    fn record_failure(&self, error: &CollectorError) {
        self.failures.with_label_values(&[error.reason()]).inc();
    }

    fn record_duration(&self, elapsed: Duration) {
        self.last_duration.set(elapsed.as_secs_f64());
    }

    pub fn successes(&self) -> u64 {
        self.successes.get()
    }

    pub fn failures(&self, reason: &str) -> u64 {
        self.failures.with_label_values(&[reason]).get()
    }

    pub fn records(&self) -> i64 {
        self.records.get()
    }

    pub fn last_success(&self) -> f64 {
        self.last_success.get()
    }
}

/// Drives the collector on a fixed interval and publishes good cycles.
///
/// Cycles run back to back on one task, the interval is measured from the end
/// of a cycle, so two runs of the command never overlap.
pub struct RefreshScheduler {
    collector: Collector,
    store: SnapshotStore,
    interval: Duration,
    stats: RefreshStats,
    phase: Phase,
    cycles: u64,
}

impl RefreshScheduler {
    pub fn new(
        collector: Collector,
        store: SnapshotStore,
        interval: Duration,
        stats: RefreshStats,
    ) -> Self {
        RefreshScheduler {
            collector,
            store,
            interval,
            stats,
            phase: Phase::Idle,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs the command once and publishes its records if the cycle succeeded.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.phase = Phase::Running;
        self.cycles += 1;
        let started = Instant::now();
        let result = self.collector.collect().await;
        self.stats.record_duration(started.elapsed());

        match result {
            Ok(Collected { records, warning }) => {
                if let Some(warning) = &warning {
                    log::warn!(
                        "{} reported an error but printed valid output: {warning}",
                        self.collector.command()
                    );
                }
                let count = records.len();
                self.store.replace(records);
                self.stats.record_success(count);
                self.phase = Phase::Success;
                log::debug!(
                    "Cycle {} published {count} records in {:?}",
                    self.cycles,
                    started.elapsed()
                );
                CycleOutcome::Published {
                    records: count,
                    warning,
                }
            }
            Err(e) => {
                self.stats.record_failure(&e);
                self.phase = Phase::Failed;
                log::error!(
                    "Cycle {} of {} failed, keeping the previous snapshot: {e}",
                    self.cycles,
                    self.collector.command()
                );
                CycleOutcome::Failed(e)
            }
        }
    }

    /// Runs the first cycle and turns its failure into an error.
    ///
    /// Used for strict startup: the caller exits when this fails, and the
    /// following [`run`](Self::run) starts with the sleep.
    pub async fn require_first_cycle(&mut self) -> Result<usize, CollectorError> {
        match self.run_cycle().await {
            CycleOutcome::Published { records, .. } => Ok(records),
            CycleOutcome::Failed(e) => Err(e),
        }
    }

    pub fn stats(&self) -> &RefreshStats {
        &self.stats
    }

    /// Loops until `shutdown` changes or its sender goes away.
    ///
    /// If a cycle already ran (strict startup), the loop starts with the sleep.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Refreshing from {} every {:?}",
            self.collector.command(),
            self.interval
        );

        if self.cycles == 0 {
            select! {
                _ = self.run_cycle() => {},
                _ = shutdown.changed() => return self.stopped(),
            }
        }

        loop {
            self.phase = Phase::Idle;
            select! {
                _ = sleep(self.interval) => {},
                _ = shutdown.changed() => break,
            }
            select! {
                _ = self.run_cycle() => {},
                _ = shutdown.changed() => break,
            }
        }
        self.stopped();
    }

    fn stopped(&mut self) {
        self.phase = Phase::Idle;
        log::info!("Refresh loop stopped after {} cycles", self.cycles);
    }
}
