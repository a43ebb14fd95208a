//! Placeholder substitution over run-aware paragraph text.
//!
//! The engine replaces `{key}` tokens in a paragraph's flattened run text
//! with values from a [`SubstitutionTable`], then regroups the result into
//! the fewest runs whose formatting is homogeneous. Tokens split across
//! run boundaries flow through the same path as same-run tokens; there is
//! no special cross-run case.
//!
//! Inserted text is never re-scanned, so a value containing `{other}`
//! comes out literally. Matching is case-sensitive and brace-exact.

use crate::doc::formatting::formats_equal;
use crate::doc::paragraph::{Paragraph, ParagraphChild, Run};
use crate::engine::text_model::TextModel;
use aho_corasick::AhoCorasick;
use memchr::memmem;
use once_cell::sync::OnceCell;

/// An ordered column → value map driving one substitution pass.
///
/// Keys are stored without braces; the token searched for is `{key}`.
/// Insertion order is preserved and keys are unique (re-inserting a key
/// overwrites its value in place). A missing or `None`-like value is the
/// empty string, which erases the token.
///
/// # Example
///
/// ```rust
/// use rambutan::engine::SubstitutionTable;
///
/// let mut table = SubstitutionTable::new();
/// table.insert("name", "Ada");
/// table.insert("name", "Grace");
/// assert_eq!(table.get("name"), Some("Grace"));
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    entries: Vec<(String, String)>,
    // Multi-pattern automaton over the brace tokens, built on first use.
    matcher: OnceCell<AhoCorasick>,
}

impl SubstitutionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(column, value)` pairs in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (key, value) in pairs {
            table.insert(key, value);
        }
        table
    }

    /// Set a column's value, preserving its original position when the
    /// column already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
        self.matcher = OnceCell::new();
    }

    /// Value of a column, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Columns in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Fast presence check: does `text` contain any of this table's tokens?
    fn any_token_in(&self, text: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let built = self.matcher.get_or_try_init(|| {
            let tokens: Vec<String> =
                self.entries.iter().map(|(k, _)| format!("{{{}}}", k)).collect();
            AhoCorasick::new(&tokens)
        });
        match built {
            Ok(matcher) => matcher.is_match(text),
            // Automaton unavailable; let the literal scan decide.
            Err(_) => true,
        }
    }
}

/// One accepted token occurrence in the flattened text.
#[derive(Debug, Clone, Copy)]
struct Occurrence<'a> {
    start: usize,
    end: usize,
    value: &'a str,
}

/// Find every non-overlapping occurrence of every token, left to right per
/// key, then resolve cross-key overlaps. Replacements are applied at
/// decreasing start positions, so acceptance walks from the highest start
/// down and drops any occurrence overlapping one already accepted.
fn collect_occurrences<'a>(text: &str, table: &'a SubstitutionTable) -> Vec<Occurrence<'a>> {
    let mut found: Vec<Occurrence<'a>> = Vec::new();
    for (key, value) in table.entries() {
        let token = format!("{{{}}}", key);
        for start in memmem::find_iter(text.as_bytes(), token.as_bytes()) {
            found.push(Occurrence {
                start,
                end: start + token.len(),
                value,
            });
        }
    }
    found.sort_by_key(|occ| occ.start);

    let mut accepted: Vec<Occurrence<'a>> = Vec::with_capacity(found.len());
    let mut lowest_kept_start = usize::MAX;
    for occ in found.into_iter().rev() {
        if occ.end <= lowest_kept_start {
            lowest_kept_start = occ.start;
            accepted.push(occ);
        }
    }
    accepted.reverse();
    accepted
}

/// Apply the accepted occurrences, producing the new text and, for every
/// byte of it, the paragraph child index whose formatting it inherits.
///
/// Kept bytes carry their own run's format; inserted bytes carry the
/// format at the occurrence's start byte. Walking in ascending order here
/// is equivalent to the remove-then-insert at decreasing start positions:
/// each occurrence's byte offsets refer to the original text only.
fn apply_occurrences(
    text: &str,
    occurrences: &[Occurrence<'_>],
    model: &TextModel,
) -> (String, Vec<usize>) {
    let mut new_text = String::with_capacity(text.len());
    let mut byte_sources = Vec::with_capacity(text.len());
    let mut cursor = 0;

    let push_span = |span: &str, child: usize, out: &mut String, map: &mut Vec<usize>| {
        out.push_str(span);
        map.extend(std::iter::repeat(child).take(span.len()));
    };

    for occ in occurrences {
        let mut pos = cursor;
        while pos < occ.start {
            let child = model.child_at(pos).unwrap_or(0);
            let slice_end = model
                .slices()
                .iter()
                .find(|s| s.start <= pos && pos < s.end)
                .map(|s| s.end.min(occ.start))
                .unwrap_or(occ.start);
            push_span(&text[pos..slice_end], child, &mut new_text, &mut byte_sources);
            pos = slice_end;
        }
        let source = model.child_at(occ.start).unwrap_or(0);
        push_span(occ.value, source, &mut new_text, &mut byte_sources);
        cursor = occ.end;
    }

    let mut pos = cursor;
    while pos < text.len() {
        let child = model.child_at(pos).unwrap_or(0);
        let slice_end = model
            .slices()
            .iter()
            .find(|s| s.start <= pos && pos < s.end)
            .map(|s| s.end)
            .unwrap_or(text.len());
        push_span(&text[pos..slice_end], child, &mut new_text, &mut byte_sources);
        pos = slice_end;
    }

    (new_text, byte_sources)
}

/// Group the substituted text into maximal spans of equal formatting and
/// build the replacement run list.
fn group_runs(text: &str, byte_sources: &[usize], paragraph: &Paragraph) -> Vec<Run> {
    let mut runs = Vec::new();
    if text.is_empty() {
        return runs;
    }

    let mut span_start = 0;
    let mut span_child = byte_sources[0];
    for (pos, &child) in byte_sources.iter().enumerate().skip(1) {
        if child == span_child {
            continue;
        }
        let same = formats_equal(
            paragraph.run_format_at(span_child),
            paragraph.run_format_at(child),
        );
        if !same {
            runs.push(Run::new(
                &text[span_start..pos],
                paragraph.run_format_at(span_child).cloned(),
            ));
            span_start = pos;
        }
        span_child = child;
    }
    runs.push(Run::new(
        &text[span_start..],
        paragraph.run_format_at(span_child).cloned(),
    ));
    runs
}

/// Replace tokens in plain text, with the same ordering and overlap rules
/// as the run-aware path but no formatting involved.
///
/// Returns `None` when nothing matched.
pub(crate) fn substitute_plain(text: &str, table: &SubstitutionTable) -> Option<String> {
    if !table.any_token_in(text) {
        return None;
    }
    let occurrences = collect_occurrences(text, table);
    if occurrences.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for occ in occurrences {
        out.push_str(&text[cursor..occ.start]);
        out.push_str(occ.value);
        cursor = occ.end;
    }
    out.push_str(&text[cursor..]);
    if out == text { None } else { Some(out) }
}

/// Substitute every token occurrence in one paragraph.
///
/// Returns whether the paragraph changed. The original run children are
/// detached and replaced by freshly grouped runs; field nodes get the
/// reduced flattened-text treatment (their inner formatting is not
/// preserved, which is accepted for fields); non-text children are left in
/// place.
///
/// # Example
///
/// ```rust
/// use rambutan::doc::{Paragraph, Run};
/// use rambutan::engine::{SubstitutionTable, substitute_paragraph};
///
/// let mut para = Paragraph::new();
/// para.add_run(Run::new("Dear {na", None));
/// para.add_run(Run::new("me}!", None));
///
/// let table = SubstitutionTable::from_pairs([("name", "Ada")]);
/// assert!(substitute_paragraph(&mut para, &table));
/// assert_eq!(para.text(), "Dear Ada!");
/// ```
pub fn substitute_paragraph(paragraph: &mut Paragraph, table: &SubstitutionTable) -> bool {
    if table.is_empty() {
        return false;
    }

    let mut changed = false;

    // Field nodes first: plain text in, plain text out.
    for child in paragraph.children.iter_mut() {
        if let ParagraphChild::Field(field) = child
            && let Some(replaced) = substitute_plain(&field.text, table)
        {
            field.text = replaced;
            changed = true;
        }
    }

    let model = TextModel::build(paragraph);
    if model.text().is_empty() || !table.any_token_in(model.text()) {
        return changed;
    }

    let occurrences = collect_occurrences(model.text(), table);
    if occurrences.is_empty() {
        return changed;
    }

    let (new_text, byte_sources) = apply_occurrences(model.text(), &occurrences, &model);
    if new_text == model.text() {
        // Every accepted occurrence replaced a token with itself; the
        // paragraph is observably unchanged, keep its runs as they are.
        return changed;
    }

    let new_runs = group_runs(&new_text, &byte_sources, paragraph);
    paragraph.replace_runs(new_runs);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::formatting::RunFormat;
    use crate::doc::paragraph::Field;

    fn bold() -> RunFormat {
        RunFormat {
            bold: Some(true),
            ..Default::default()
        }
    }

    fn italic() -> RunFormat {
        RunFormat {
            italic: Some(true),
            ..Default::default()
        }
    }

    fn table(pairs: &[(&str, &str)]) -> SubstitutionTable {
        SubstitutionTable::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_same_run_token_keeps_surrounding_formatting() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("Dear {name}, welcome", Some(bold())));

        assert!(substitute_paragraph(&mut para, &table(&[("name", "Ada")])));
        assert_eq!(para.text(), "Dear Ada, welcome");
        assert_eq!(para.run_count(), 1);
        assert_eq!(para.runs().next().unwrap().format.as_ref().unwrap().bold, Some(true));
    }

    #[test]
    fn test_cross_run_token_takes_format_at_token_start() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("Dear {na", Some(bold())));
        para.add_run(Run::new("me}!", Some(italic())));

        assert!(substitute_paragraph(&mut para, &table(&[("name", "Ada")])));
        assert_eq!(para.text(), "Dear Ada!");

        let runs: Vec<&Run> = para.runs().collect();
        assert_eq!(runs.len(), 2);
        // "Dear Ada" inherits the bold format the token started in.
        assert_eq!(runs[0].text, "Dear Ada");
        assert_eq!(runs[0].format.as_ref().unwrap().bold, Some(true));
        assert_eq!(runs[1].text, "!");
        assert_eq!(runs[1].format.as_ref().unwrap().italic, Some(true));
    }

    #[test]
    fn test_token_in_its_own_run_keeps_that_runs_formatting() {
        let red = RunFormat {
            color: Some("FF0000".to_string()),
            ..Default::default()
        };
        let mut para = Paragraph::new();
        para.add_run(Run::new("Hello ", Some(bold())));
        para.add_run(Run::new("{name}", Some(red.clone())));
        para.add_run(Run::new(" !", Some(italic())));

        assert!(substitute_paragraph(&mut para, &table(&[("name", "World")])));
        assert_eq!(para.text(), "Hello World !");

        let runs: Vec<&Run> = para.runs().collect();
        assert_eq!(runs.len(), 3);
        // The inserted text carries the middle run's formatting, not its
        // neighbors'.
        assert_eq!(runs[1].text, "World");
        assert!(runs[1].format.as_ref().unwrap().same_appearance(&red));
        assert_eq!(runs[0].format.as_ref().unwrap().bold, Some(true));
        assert_eq!(runs[2].format.as_ref().unwrap().italic, Some(true));
    }

    #[test]
    fn test_adjacent_equal_formats_coalesce() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("your balance is ", Some(bold())));
        para.add_run(Run::new("{balance}", Some(bold())));
        para.add_run(Run::new(".", Some(bold())));

        assert!(substitute_paragraph(&mut para, &table(&[("balance", "100.50")])));
        assert_eq!(para.text(), "your balance is 100.50.");
        // All three zones share one appearance, so one run comes out.
        assert_eq!(para.run_count(), 1);
    }

    #[test]
    fn test_two_tokens_in_one_paragraph() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("Dear {customer}, your balance is {balance}.", None));

        let t = table(&[("customer", "Li Wei"), ("balance", "100.50")]);
        assert!(substitute_paragraph(&mut para, &t));
        assert_eq!(para.text(), "Dear Li Wei, your balance is 100.50.");
        assert_eq!(para.run_count(), 1);
    }

    #[test]
    fn test_unknown_token_is_untouched() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("keep {unknown} intact", None));

        assert!(!substitute_paragraph(&mut para, &table(&[("name", "Ada")])));
        assert_eq!(para.text(), "keep {unknown} intact");
        assert_eq!(para.run_count(), 1);
    }

    #[test]
    fn test_empty_value_erases_token_and_merges_runs() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("a{gone}", None));
        para.add_run(Run::new("b", None));

        assert!(substitute_paragraph(&mut para, &table(&[("gone", "")])));
        assert_eq!(para.text(), "ab");
        // Both halves are unformatted, so they regroup into one run.
        assert_eq!(para.run_count(), 1);
    }

    #[test]
    fn test_all_occurrences_replaced() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("{x} and {x} and {x}", None));

        assert!(substitute_paragraph(&mut para, &table(&[("x", "1")])));
        assert_eq!(para.text(), "1 and 1 and 1");
    }

    #[test]
    fn test_no_recursive_expansion_of_inserted_text() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("{a}", None));

        let t = table(&[("a", "{b}"), ("b", "nope")]);
        assert!(substitute_paragraph(&mut para, &t));
        assert_eq!(para.text(), "{b}");

        // A second pass would expand it; a single pass must not.
        assert!(substitute_paragraph(&mut para, &t));
        assert_eq!(para.text(), "nope");
    }

    #[test]
    fn test_overlapping_occurrences_keep_higher_start() {
        // Token "{y}" starts at 2, token "{x{y}" (key "x{y") at 0; the two
        // overlap. Replacement runs at decreasing starts, so "{y}" is
        // applied and the overlapping lower-start occurrence is dropped.
        let mut para = Paragraph::new();
        para.add_run(Run::new("{x{y}", None));

        let t = table(&[("y", "Y"), ("x{y", "X")]);
        assert!(substitute_paragraph(&mut para, &t));
        assert_eq!(para.text(), "{xY");
    }

    #[test]
    fn test_case_sensitive_matching() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("{Name}", None));
        assert!(!substitute_paragraph(&mut para, &table(&[("name", "Ada")])));
        assert_eq!(para.text(), "{Name}");
    }

    #[test]
    fn test_field_text_is_substituted_plainly() {
        let mut para = Paragraph::new();
        para.add_field(Field {
            instruction: Some("MERGEFIELD name".to_string()),
            text: "{name}".to_string(),
        });

        assert!(substitute_paragraph(&mut para, &table(&[("name", "Ada")])));
        assert_eq!(para.text(), "Ada");
    }

    #[test]
    fn test_value_identical_to_token_leaves_runs_alone() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("{same}", Some(bold())));
        para.add_run(Run::new(" tail", None));

        let changed = substitute_paragraph(&mut para, &table(&[("same", "{same}")]));
        assert!(!changed);
        assert_eq!(para.run_count(), 2);
    }

    #[test]
    fn test_multibyte_text_around_tokens() {
        let mut para = Paragraph::new();
        para.add_run(Run::new("héllo {name} wörld", None));
        assert!(substitute_paragraph(&mut para, &table(&[("name", "Åda")])));
        assert_eq!(para.text(), "héllo Åda wörld");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn ident() -> impl Strategy<Value = String> {
            "[a-z]{1,6}"
        }

        fn plain_text() -> impl Strategy<Value = String> {
            "[a-zA-Z0-9 .,]{0,20}"
        }

        proptest! {
            // Text outside token occurrences survives byte-for-byte.
            #[test]
            fn prop_non_token_text_is_preserved(
                prefix in plain_text(),
                suffix in plain_text(),
                key in ident(),
                value in plain_text(),
            ) {
                let mut para = Paragraph::new();
                para.add_run(Run::new(format!("{prefix}{{{key}}}{suffix}"), None));
                let t = SubstitutionTable::from_pairs([(key.clone(), value.clone())]);
                substitute_paragraph(&mut para, &t);
                prop_assert_eq!(para.text(), format!("{prefix}{value}{suffix}"));
            }

            // Splitting the same text across arbitrary run boundaries never
            // changes the substitution result.
            #[test]
            fn prop_run_boundaries_do_not_change_result(
                prefix in plain_text(),
                suffix in plain_text(),
                key in ident(),
                value in plain_text(),
                split in 0usize..40,
            ) {
                let full = format!("{prefix}{{{key}}}{suffix}");
                let t = SubstitutionTable::from_pairs([(key.clone(), value.clone())]);

                let mut whole = Paragraph::new();
                whole.add_run(Run::new(full.clone(), None));
                substitute_paragraph(&mut whole, &t);

                let cut = full
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain([full.len()])
                    .filter(|&i| i <= full.len())
                    .nth(split.min(full.chars().count()))
                    .unwrap_or(full.len());
                let mut split_para = Paragraph::new();
                split_para.add_run(Run::new(&full[..cut], None));
                split_para.add_run(Run::new(&full[cut..], None));
                substitute_paragraph(&mut split_para, &t);

                prop_assert_eq!(whole.text(), split_para.text());
            }
        }
    }
}
