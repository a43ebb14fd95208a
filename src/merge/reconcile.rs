//! Multi-source row reconciliation.
//!
//! Folds the rows of several source tables into one record per key value.
//! The resolution rule is last-non-empty-wins: tables are visited in
//! order, and within each column a later non-empty value overwrites, while
//! a later empty value never clobbers an earlier non-empty one.

use crate::merge::table::{MergedRowSet, SourceTable};
use std::collections::HashMap;

/// Reconcile `tables` into one row set keyed by the `key` column.
///
/// Quietly returns an empty set when `key` is empty or no tables are
/// given; those are states the caller can reach through normal use, not
/// errors. Rows without the key column, or with an empty key value, are
/// skipped entirely. The key's presence in every table is the caller's
/// concern (checked via [`MergedRowSet::common_headers`]); the merge
/// itself trusts whatever key it is handed.
///
/// The result is recomputed from scratch on every call.
///
/// # Example
///
/// ```rust
/// use rambutan::merge::{SourceTable, reconcile};
///
/// let roster = SourceTable::new(
///     "roster",
///     vec!["id".into(), "name".into()],
///     vec![vec!["7".into(), "Ada".into()]],
/// );
/// let grades = SourceTable::new(
///     "grades",
///     vec!["id".into(), "grade".into()],
///     vec![vec!["7".into(), "A".into()]],
/// );
///
/// let merged = reconcile(&[roster, grades], "id");
/// let record = merged.get("7").unwrap();
/// assert_eq!(record["name"], "Ada");
/// assert_eq!(record["grade"], "A");
/// ```
pub fn reconcile(tables: &[SourceTable], key: &str) -> MergedRowSet {
    if key.is_empty() || tables.is_empty() {
        return MergedRowSet::default();
    }

    let mut records: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut all_headers: Vec<String> = Vec::new();
    let mut common_headers: Vec<String> = tables[0].headers().to_vec();
    let mut total_row_count = 0;

    for table in tables {
        for header in table.headers() {
            if !all_headers.contains(header) {
                all_headers.push(header.clone());
            }
        }
        common_headers.retain(|h| table.header_index(h).is_some());
        total_row_count += table.row_count();

        let Some(key_index) = table.header_index(key) else {
            // Every row of this table lacks the key; all are skipped.
            continue;
        };

        for row in table.rows() {
            let key_value = row.get(key_index).map(String::as_str).unwrap_or("");
            if key_value.is_empty() {
                continue;
            }
            let record = records.entry(key_value.to_string()).or_default();
            for (column, value) in table.headers().iter().zip(row) {
                if !value.is_empty() {
                    record.insert(column.clone(), value.clone());
                } else {
                    record.entry(column.clone()).or_default();
                }
            }
        }
    }

    MergedRowSet {
        records,
        all_headers,
        common_headers,
        total_row_count,
    }
}
