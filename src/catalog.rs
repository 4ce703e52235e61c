use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::record::Record;

#[derive(Debug, Clone)]
struct SourceEntry {
    records: Vec<Record>,
    fetched_at: DateTime<Utc>,
}

/// Session-lifetime cache of fetched sources. Inserting the same key again
/// replaces the previous records; there is no eviction (catalog sizes are
/// bounded in the hundreds to low thousands).
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    order: Vec<String>,
    entries: HashMap<String, SourceEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_key: &str, records: Vec<Record>) {
        if !self.entries.contains_key(source_key) {
            self.order.push(source_key.to_owned());
        }
        self.entries.insert(
            source_key.to_owned(),
            SourceEntry {
                records,
                fetched_at: Utc::now(),
            },
        );
    }

    pub fn contains(&self, source_key: &str) -> bool {
        self.entries.contains_key(source_key)
    }

    pub fn records(&self, source_key: &str) -> &[Record] {
        self.entries
            .get(source_key)
            .map(|entry| entry.records.as_slice())
            .unwrap_or_default()
    }

    pub fn fetched_at(&self, source_key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(source_key).map(|entry| entry.fetched_at)
    }

    /// Source keys in insertion order.
    pub fn source_keys(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|entry| entry.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cross-source aggregate used by global search: sources in insertion
    /// order, de-duplicated by record identifier so a re-inserted source can
    /// never contribute duplicates. Records without an identifier are kept
    /// as-is (they cannot collide with a favorites entry anyway).
    pub fn all_records(&self) -> Vec<&Record> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut all = Vec::new();
        for key in &self.order {
            for record in self.records(key) {
                match record.id() {
                    Some(id) => {
                        if seen.insert(id) {
                            all.push(record);
                        }
                    }
                    None => all.push(record),
                }
            }
        }
        all
    }
}
