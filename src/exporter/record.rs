use std::collections::btree_map::{self, BTreeMap};

use super::ParseError;

/// One measurement, parsed from a single line of command output.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub system: String,
    pub subsystem: String,
    pub metric: String,
    pub value: f64,
}

/// Identity of a record within a [`RecordSet`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub system: String,
    pub subsystem: String,
    pub metric: String,
}

impl RecordKey {
    pub fn new(system: &str, subsystem: &str, metric: &str) -> Self {
        RecordKey {
            system: system.to_string(),
            subsystem: subsystem.to_string(),
            metric: metric.to_string(),
        }
    }

    pub fn label_values(&self) -> [&str; 3] {
        [&self.system, &self.subsystem, &self.metric]
    }
}

/// Parses `system, subsystem, metric, value`.
///
/// Fields are trimmed, the value must be a finite number. Field content is
/// otherwise taken as free text.
pub fn parse_line(line: &str) -> Result<MetricRecord, ParseError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [system, subsystem, metric, value] = fields[..] else {
        return Err(ParseError::FieldCountMismatch(fields.len()));
    };

    let value = match value.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return Err(ParseError::InvalidValue(value.to_string())),
    };

    Ok(MetricRecord {
        system: system.to_string(),
        subsystem: subsystem.to_string(),
        metric: metric.to_string(),
        value,
    })
}

/// All records of one refresh cycle, keyed by identity.
///
/// Inserting a record whose identity already exists replaces the old value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    values: BTreeMap<RecordKey, f64>,
}

impl RecordSet {
    pub fn new() -> Self {
        RecordSet::default()
    }

    pub fn insert(&mut self, record: MetricRecord) -> Option<f64> {
        let key = RecordKey {
            system: record.system,
            subsystem: record.subsystem,
            metric: record.metric,
        };
        self.values.insert(key, record.value)
    }

    pub fn get(&self, system: &str, subsystem: &str, metric: &str) -> Option<f64> {
        self.values
            .get(&RecordKey::new(system, subsystem, metric))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, RecordKey, f64> {
        self.values.iter()
    }
}

impl FromIterator<MetricRecord> for RecordSet {
    fn from_iter<T: IntoIterator<Item = MetricRecord>>(iter: T) -> Self {
        let mut set = RecordSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = (&'a RecordKey, &'a f64);
    type IntoIter = btree_map::Iter<'a, RecordKey, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
