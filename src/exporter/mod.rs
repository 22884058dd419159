mod error;
pub use self::error::CollectorError;
pub use self::error::ParseError;

mod record;
pub use self::record::parse_line;
pub use self::record::MetricRecord;
pub use self::record::RecordKey;
pub use self::record::RecordSet;

mod collector;
pub use self::collector::Collected;
pub use self::collector::Collector;
pub use self::collector::MAX_LINE_BYTES;

mod snapshot;
pub use self::snapshot::SnapshotStore;

mod scheduler;
pub use self::scheduler::CycleOutcome;
pub use self::scheduler::Phase;
pub use self::scheduler::RefreshScheduler;
pub use self::scheduler::RefreshStats;

mod publisher;
pub use self::publisher::SnapshotPublisher;

#[cfg(test)]
mod test_data;

/// Namespace, subsystem and name of the exported gauge family.
pub const NAMESPACE: &str = "prom";
pub const SUBSYSTEM: &str = "custom";
pub const NAME: &str = "exporter";

pub const LABELS: [&str; 3] = ["system", "subsystem", "metric"];
