//! Tabular source data.
//!
//! A `SourceTable` is one loaded sheet or file: a label, ordered unique
//! headers, and rows of string cells aligned with the headers. The merged
//! row set produced from several sources lives in this module too.

use std::collections::HashMap;

/// One tabular data source.
#[derive(Debug, Clone)]
pub struct SourceTable {
    label: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Create a table from raw headers and rows.
    ///
    /// Duplicate headers are dropped, keeping the first occurrence; the
    /// cells of every row stay aligned with the surviving headers. Rows
    /// shorter than the header list read as empty in the missing columns.
    pub fn new(
        label: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let mut kept_indices = Vec::with_capacity(headers.len());
        let mut kept_headers = Vec::with_capacity(headers.len());
        for (index, header) in headers.into_iter().enumerate() {
            if !kept_headers.contains(&header) {
                kept_headers.push(header);
                kept_indices.push(index);
            }
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                kept_indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            label: label.into(),
            headers: kept_headers,
            rows,
        }
    }

    /// Human-readable source name (file name, sheet name).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Column headers in source order, deduplicated.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows as cell vectors aligned with [`Self::headers`].
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a header, if present.
    pub(crate) fn header_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// The outcome of reconciling several tables by a key column.
///
/// One record per distinct non-empty key value; record order is not
/// guaranteed. Header sets are computed over the participating tables:
/// `all_headers` is the union in first-seen order, `common_headers` the
/// intersection in first-table order.
#[derive(Debug, Clone, Default)]
pub struct MergedRowSet {
    pub(crate) records: HashMap<String, HashMap<String, String>>,
    pub(crate) all_headers: Vec<String>,
    pub(crate) common_headers: Vec<String>,
    pub(crate) total_row_count: usize,
}

impl MergedRowSet {
    /// Record for a key value, if any row carried it.
    pub fn get(&self, key_value: &str) -> Option<&HashMap<String, String>> {
        self.records.get(key_value)
    }

    /// Iterate over `(key value, record)` pairs in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &HashMap<String, String>)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of merged records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether reconciliation produced no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of all participating tables' headers, first-seen order.
    pub fn all_headers(&self) -> &[String] {
        &self.all_headers
    }

    /// Headers present in every participating table.
    pub fn common_headers(&self) -> &[String] {
        &self.common_headers
    }

    /// Raw row count across sources, before key grouping.
    pub fn total_row_count(&self) -> usize {
        self.total_row_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_headers_keep_first_column() {
        let table = SourceTable::new(
            "a.xlsx",
            vec!["id".into(), "name".into(), "id".into()],
            vec![vec!["1".into(), "Ada".into(), "9".into()]],
        );
        assert_eq!(table.headers(), ["id", "name"]);
        assert_eq!(table.rows()[0], ["1", "Ada"]);
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let table = SourceTable::new(
            "a.xlsx",
            vec!["id".into(), "name".into()],
            vec![vec!["1".into()]],
        );
        assert_eq!(table.rows()[0], ["1", ""]);
    }
}
