use std::sync::{Arc, PoisonError, RwLock};

use super::RecordSet;

/// Holds the record set currently visible to scrapes.
///
/// The lock only guards the swap of an `Arc`, readers get the complete set
/// that was current when they asked and never a set under construction.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<RecordSet>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore::default()
    }

    /// Swaps in `records` and returns the set it replaced.
    ///
    /// The previous set is released after the write lock, so freeing it never
    /// stalls readers.
    pub fn replace(&self, records: RecordSet) -> Arc<RecordSet> {
        let records = Arc::new(records);
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *slot, records);
        drop(slot);
        previous
    }

    pub fn current(&self) -> Arc<RecordSet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;
    use crate::exporter::MetricRecord;

    fn generation(id: usize, size: usize) -> RecordSet {
        (0..size)
            .map(|i| MetricRecord {
                system: "host".to_string(),
                subsystem: "gen".to_string(),
                metric: format!("m{i}"),
                value: id as f64,
            })
            .collect()
    }

    #[test]
    fn starts_empty() {
        assert!(SnapshotStore::new().current().is_empty());
    }

    #[test]
    fn replace_is_visible_to_clones() {
        let store = SnapshotStore::new();
        let reader = store.clone();
        store.replace(generation(1, 3));
        assert_eq!(reader.current().len(), 3);
        assert_eq!(reader.current().get("host", "gen", "m2"), Some(1.0));
    }

    #[test]
    fn replace_hands_back_previous_set_unlocked() {
        let store = SnapshotStore::new();
        store.replace(generation(1, 4));
        let previous = store.replace(generation(2, 2));
        assert_eq!(previous.len(), 4);
        assert!(previous.iter().all(|(_, v)| *v == 1.0));
        // the lock is free again while the old set is still alive
        assert!(store.current.try_write().is_ok());
        assert_eq!(store.current().len(), 2);
    }

    #[test]
    fn held_snapshot_survives_replace() {
        let store = SnapshotStore::new();
        store.replace(generation(1, 2));
        let held = store.current();
        store.replace(generation(2, 5));
        assert_eq!(held.len(), 2);
        assert!(held.iter().all(|(_, v)| *v == 1.0));
        assert_eq!(store.current().len(), 5);
    }

    #[test]
    fn readers_never_see_mixed_generations() {
        let store = SnapshotStore::new();
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut observed = 0usize;
                    while !done.load(Ordering::Relaxed) {
                        let snapshot = store.current();
                        let mut values = snapshot.iter().map(|(_, v)| *v);
                        if let Some(first) = values.next() {
                            assert!(values.all(|v| v == first), "torn snapshot observed");
                            assert_eq!(snapshot.len(), 10 + first as usize % 7);
                            observed += 1;
                        }
                    }
                    observed
                })
            })
            .collect();

        for id in 1..=2000 {
            store.replace(generation(id, 10 + id % 7));
        }
        done.store(true, Ordering::Relaxed);

        for reader in readers {
            reader.join().expect("reader thread panicked");
        }
    }
}
