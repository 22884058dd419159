use prometheus::core::{Collector as RegistryCollector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use super::{SnapshotStore, LABELS, NAME, NAMESPACE, SUBSYSTEM};

const HELP: &str = "Prometheus Gauge Metrics from Custom script/command exporter";

/// Renders the current snapshot as one gauge family at every gather.
///
/// A fresh vector is built per gather, series missing from the latest
/// snapshot disappear from the scrape instead of lingering.
pub struct SnapshotPublisher {
    store: SnapshotStore,
    opts: Opts,
    template: GaugeVec,
}

impl SnapshotPublisher {
    pub fn new(store: SnapshotStore) -> prometheus::Result<Self> {
        let opts = Opts::new(NAME, HELP)
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM);
        let template = GaugeVec::new(opts.clone(), &LABELS)?;
        Ok(SnapshotPublisher {
            store,
            opts,
            template,
        })
    }
}

impl RegistryCollector for SnapshotPublisher {
    fn desc(&self) -> Vec<&Desc> {
        self.template.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.store.current();
        if snapshot.is_empty() {
            return Vec::new();
        }

        let gauges = match GaugeVec::new(self.opts.clone(), &LABELS) {
            Ok(gauges) => gauges,
            Err(e) => {
                log::error!("Unable to build the gauge family: {e}");
                return Vec::new();
            }
        };
        for (key, value) in snapshot.iter() {
            gauges.with_label_values(&key.label_values()).set(*value);
        }
        gauges.collect()
    }
}

#[cfg(test)]
mod tests {
    use prometheus::{Encoder, Registry, TextEncoder};

    use super::*;
    use crate::exporter::{parse_line, test_data, RecordSet};

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn records(output: &str) -> RecordSet {
        output.lines().map(|l| parse_line(l).unwrap()).collect()
    }

    fn registry_with(store: &SnapshotStore) -> Registry {
        let registry = Registry::new();
        registry
            .register(Box::new(SnapshotPublisher::new(store.clone()).unwrap()))
            .unwrap();
        registry
    }

    #[test]
    fn empty_snapshot_renders_nothing() {
        let registry = registry_with(&SnapshotStore::new());
        assert!(registry.gather().is_empty());
        assert_eq!(render(&registry), "");
    }

    #[test]
    fn renders_one_sample_per_record() {
        let store = SnapshotStore::new();
        let registry = registry_with(&store);
        store.replace(records(test_data::GOOD_OUTPUT));

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "prom_custom_exporter");
        assert_eq!(families[0].get_metric().len(), 3);

        let text = render(&registry);
        assert!(text.contains(
            "prom_custom_exporter{metric=\"load\",subsystem=\"cpu\",system=\"hostA\"} 0.75"
        ));
        assert!(text.contains(
            "prom_custom_exporter{metric=\"rx_bytes\",subsystem=\"net\",system=\"hostB\"} 1024"
        ));
    }

    #[test]
    fn vanished_series_are_dropped() {
        let store = SnapshotStore::new();
        let registry = registry_with(&store);
        store.replace(records(test_data::GOOD_OUTPUT));
        store.replace(records("hostC, disk, free, 10"));

        let text = render(&registry);
        assert!(!text.contains("hostA"));
        assert!(text.contains("system=\"hostC\"} 10"));
    }
}
