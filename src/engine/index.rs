//! Placeholder index.
//!
//! Scans every text-bearing node of a document for `{identifier}` tokens
//! and reports the distinct full tokens in first-seen order. Read-only;
//! nothing here mutates the tree.
//!
//! Granularity note: the scan runs over each node's own text, so a token
//! split across run boundaries is not visible here even though the
//! substitution engine (which works on whole-paragraph text) would replace
//! it. Callers using the index to decide "does this template use
//! placeholders at all" get a conservative answer.

use crate::doc::paragraph::ParagraphChild;
use crate::doc::tree::DocumentTree;
use memchr::memchr2;
use std::collections::HashSet;

/// Scan one node's text for brace tokens, appending unseen ones to `out`.
///
/// A token is `{` + one or more non-brace bytes + `}`. An opening brace
/// followed by another opening brace restarts the scan at the second one,
/// so `{{name}` yields `{name}`.
fn scan_tokens(text: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    let bytes = text.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let Some(open) = memchr::memchr(b'{', &bytes[pos..]).map(|i| pos + i) else {
            break;
        };
        let Some(stop) = memchr2(b'{', b'}', &bytes[open + 1..]).map(|i| open + 1 + i) else {
            break;
        };
        if bytes[stop] == b'{' {
            // Nested opener: restart from it.
            pos = stop;
            continue;
        }
        if stop == open + 1 {
            // `{}` has an empty identifier, not a token.
            pos = stop + 1;
            continue;
        }
        let token = &text[open..=stop];
        if seen.insert(token.to_string()) {
            out.push(token.to_string());
        }
        pos = stop + 1;
    }
}

/// Collect the distinct placeholder tokens of a document.
///
/// Walks runs and field nodes in body, header, and footer parts, in that
/// order, and returns full tokens (braces included) deduplicated in
/// first-seen order.
///
/// # Example
///
/// ```rust
/// use rambutan::doc::{DocumentTree, BodyElement, Paragraph, Run};
/// use rambutan::engine::extract_placeholders;
///
/// let mut tree = DocumentTree::new();
/// let mut para = Paragraph::new();
/// para.add_run(Run::new("Dear {name}, ref {case_id} / {name}", None));
/// tree.body.push(BodyElement::Paragraph(para));
///
/// let tokens = extract_placeholders(&tree);
/// assert_eq!(tokens, ["{name}", "{case_id}"]);
/// ```
pub fn extract_placeholders(tree: &DocumentTree) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for part in tree.parts() {
        for paragraph in part.paragraphs() {
            for child in paragraph.children() {
                match child {
                    ParagraphChild::Run(run) => scan_tokens(&run.text, &mut seen, &mut out),
                    ParagraphChild::Field(field) => scan_tokens(&field.text, &mut seen, &mut out),
                    ParagraphChild::Raw(_) => {},
                }
            }
        }
    }
    out
}
