//! Source table lifecycle.
//!
//! A session owns the loaded tables and caches the most recent merge.
//! Any mutation of the table list invalidates the cache; the next merge
//! request recomputes from scratch.

use crate::merge::reconcile::reconcile;
use crate::merge::table::{MergedRowSet, SourceTable};

/// Owns loaded source tables and the cached merged row set.
#[derive(Debug, Default)]
pub struct MergeSession {
    tables: Vec<SourceTable>,
    cache: Option<(String, MergedRowSet)>,
}

impl MergeSession {
    /// Create a session with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loaded table at the end of the visit order.
    pub fn add_table(&mut self, table: SourceTable) {
        self.tables.push(table);
        self.cache = None;
    }

    /// Remove the table at `index`, if it exists.
    pub fn remove_table(&mut self, index: usize) -> Option<SourceTable> {
        if index >= self.tables.len() {
            return None;
        }
        self.cache = None;
        Some(self.tables.remove(index))
    }

    /// Drop every table and the cached merge.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.cache = None;
    }

    /// The loaded tables in visit order.
    pub fn tables(&self) -> &[SourceTable] {
        &self.tables
    }

    /// Headers present in every loaded table.
    ///
    /// The natural candidates for a key column; empty when no tables are
    /// loaded.
    pub fn common_headers(&self) -> Vec<String> {
        let Some((first, rest)) = self.tables.split_first() else {
            return Vec::new();
        };
        first
            .headers()
            .iter()
            .filter(|h| rest.iter().all(|t| t.headers().contains(h)))
            .cloned()
            .collect()
    }

    /// Merge the loaded tables by `key`, reusing the cache when neither
    /// the tables nor the key changed since the last call.
    pub fn merged(&mut self, key: &str) -> &MergedRowSet {
        let stale = !matches!(&self.cache, Some((cached_key, _)) if cached_key == key);
        if stale {
            self.cache = None;
        }
        let tables = &self.tables;
        let (_, merged) = self
            .cache
            .get_or_insert_with(|| (key.to_string(), reconcile(tables, key)));
        merged
    }
}
