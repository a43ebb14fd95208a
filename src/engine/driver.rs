//! Whole-document substitution driver.
//!
//! Applies one substitution table to every paragraph of a document, in
//! the fixed part order body → headers → footers, reporting progress as
//! an integer percentage.

use crate::doc::tree::DocumentTree;
use crate::engine::substitute::{SubstitutionTable, substitute_paragraph};

/// Outcome of one document pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Paragraphs visited, table cells included.
    pub paragraphs_processed: usize,
    /// Paragraphs whose content changed.
    pub paragraphs_changed: usize,
}

/// Substitute placeholders throughout a document.
///
/// Paragraphs are counted up front; after each one, progress is reported
/// as `processed * 100 / total`. Reports are monotone non-decreasing and
/// 100 is always the final report, including for documents with no
/// paragraphs at all. Formatting anomalies inside a paragraph never abort
/// the pass.
///
/// # Example
///
/// ```rust
/// use rambutan::doc::{BodyElement, DocumentTree, Paragraph, Run};
/// use rambutan::engine::{SubstitutionTable, process_document};
///
/// let mut tree = DocumentTree::new();
/// let mut para = Paragraph::new();
/// para.add_run(Run::new("Hello {name}", None));
/// tree.body.push(BodyElement::Paragraph(para));
///
/// let table = SubstitutionTable::from_pairs([("name", "Ada")]);
/// let report = process_document(&mut tree, &table, |_pct| {});
/// assert_eq!(report.paragraphs_changed, 1);
/// ```
pub fn process_document<F>(
    tree: &mut DocumentTree,
    table: &SubstitutionTable,
    mut progress: F,
) -> PassReport
where
    F: FnMut(u8),
{
    // An empty document still completes: treat it as one unit of work.
    let total = tree.paragraph_count().max(1);
    let mut report = PassReport::default();
    let mut last_reported = 0u8;

    for part in tree.parts_mut() {
        for paragraph in part.paragraphs_mut() {
            if substitute_paragraph(paragraph, table) {
                report.paragraphs_changed += 1;
            }
            report.paragraphs_processed += 1;

            let pct = (report.paragraphs_processed * 100 / total) as u8;
            if pct > last_reported {
                last_reported = pct;
                progress(pct);
            }
        }
    }

    if last_reported < 100 {
        progress(100);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::paragraph::{Paragraph, Run};
    use crate::doc::tree::{BodyElement, PartContent, PartKind};

    fn para(text: &str) -> Paragraph {
        let mut p = Paragraph::new();
        p.add_run(Run::new(text, None));
        p
    }

    #[test]
    fn test_all_parts_are_processed_in_order() {
        let mut tree = DocumentTree::new();
        tree.body.push(BodyElement::Paragraph(para("{v}")));
        let mut header = PartContent::new(PartKind::Header);
        header.push(BodyElement::Paragraph(para("{v}")));
        tree.headers.push(header);
        let mut footer = PartContent::new(PartKind::Footer);
        footer.push(BodyElement::Paragraph(para("{v}")));
        tree.footers.push(footer);

        let table = SubstitutionTable::from_pairs([("v", "x")]);
        let report = process_document(&mut tree, &table, |_| {});
        assert_eq!(report.paragraphs_processed, 3);
        assert_eq!(report.paragraphs_changed, 3);
        for part in tree.parts() {
            assert_eq!(part.paragraphs()[0].text(), "x");
        }
    }

    #[test]
    fn test_progress_is_monotone_and_ends_at_100() {
        let mut tree = DocumentTree::new();
        for i in 0..7 {
            tree.body
                .push(BodyElement::Paragraph(para(&format!("p{i} {{v}}"))));
        }

        let table = SubstitutionTable::from_pairs([("v", "x")]);
        let mut reports = Vec::new();
        process_document(&mut tree, &table, |pct| reports.push(pct));

        assert!(reports.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(reports.last().copied(), Some(100));
    }

    #[test]
    fn test_empty_document_still_reports_100() {
        let mut tree = DocumentTree::new();
        let table = SubstitutionTable::from_pairs([("v", "x")]);
        let mut reports = Vec::new();
        let report = process_document(&mut tree, &table, |pct| reports.push(pct));
        assert_eq!(report.paragraphs_processed, 0);
        assert_eq!(reports, [100]);
    }

    #[test]
    fn test_table_cell_paragraphs_are_included() {
        use crate::doc::tree::{Table, TableCell, TableRow};

        let mut tree = DocumentTree::new();
        tree.body.push(BodyElement::Table(Table {
            rows: vec![TableRow {
                cells: vec![TableCell {
                    elements: vec![BodyElement::Paragraph(para("cell {v}"))],
                    raw_props: Vec::new(),
                }],
                raw_props: Vec::new(),
            }],
            raw_props: Vec::new(),
        }));

        let table = SubstitutionTable::from_pairs([("v", "x")]);
        let report = process_document(&mut tree, &table, |_| {});
        assert_eq!(report.paragraphs_changed, 1);
        assert_eq!(tree.body.paragraphs()[0].text(), "cell x");
    }
}
