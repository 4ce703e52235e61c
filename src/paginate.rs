use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::record::Record;

/// Per-source pagination state. `offset` only increases; once `exhausted`
/// flips true it stays true until the cursor is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub offset: usize,
    pub exhausted: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Paginator {
    cursors: HashMap<String, Cursor>,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self, source_key: &str) -> Cursor {
        self.cursors.get(source_key).copied().unwrap_or_default()
    }

    /// Returns the next fixed-size slice of the cached source sequence and
    /// advances the cursor. An empty result marks the source exhausted. Safe
    /// to call before the cursor exists; it initializes to `{0, false}`.
    pub fn next_batch<'a>(
        &mut self,
        catalog: &'a Catalog,
        source_key: &str,
        batch_size: usize,
    ) -> &'a [Record] {
        let records = catalog.records(source_key);
        let cursor = self.cursors.entry(source_key.to_owned()).or_default();

        let start = cursor.offset.min(records.len());
        let end = cursor.offset.saturating_add(batch_size).min(records.len());
        let batch = &records[start..end];

        cursor.offset += batch.len();
        if batch.is_empty() {
            cursor.exhausted = true;
        }
        batch
    }

    /// Back to `{0, false}`; called when the active filter/sort changes.
    pub fn reset(&mut self, source_key: &str) {
        self.cursors.remove(source_key);
    }

    pub fn reset_all(&mut self) {
        self.cursors.clear();
    }
}
