//! Run-aware text model.
//!
//! Flattens a paragraph's run children into one string plus an ordered
//! list of byte slices, each slice remembering which child it came from.
//! The model is rebuilt for every substitution pass and discarded after;
//! it never outlives a mutation of the paragraph it was built from.

use crate::doc::formatting::RunFormat;
use crate::doc::paragraph::{Paragraph, ParagraphChild};

/// One run's span within the flattened text.
#[derive(Debug, Clone, Copy)]
pub struct TextSlice {
    /// Start byte offset, inclusive.
    pub start: usize,
    /// End byte offset, exclusive. Equal to `start` for empty runs.
    pub end: usize,
    /// Index of the owning child in the paragraph's child list.
    pub child_index: usize,
}

/// Flattened view of a paragraph's run text.
///
/// Slices tile `[0, text.len())` exactly, in document order; zero-length
/// runs contribute zero-length slices and are skipped when resolving the
/// format of a byte position.
#[derive(Debug)]
pub struct TextModel {
    text: String,
    slices: Vec<TextSlice>,
}

impl TextModel {
    /// Build the model from a paragraph's run children.
    ///
    /// Field and raw children are not part of the run text; they are
    /// handled separately by the substitution engine.
    pub fn build(paragraph: &Paragraph) -> Self {
        let mut text = String::new();
        let mut slices = Vec::with_capacity(paragraph.children().len());
        for (child_index, child) in paragraph.children().iter().enumerate() {
            if let ParagraphChild::Run(run) = child {
                let start = text.len();
                text.push_str(&run.text);
                slices.push(TextSlice {
                    start,
                    end: text.len(),
                    child_index,
                });
            }
        }
        Self { text, slices }
    }

    /// The flattened run text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The run slices in document order.
    pub fn slices(&self) -> &[TextSlice] {
        &self.slices
    }

    /// Child index of the run covering byte position `pos`.
    ///
    /// Zero-length slices never cover anything. `None` only when `pos` is
    /// out of range.
    pub fn child_at(&self, pos: usize) -> Option<usize> {
        self.slices
            .iter()
            .find(|s| s.start <= pos && pos < s.end)
            .map(|s| s.child_index)
    }

    /// Formatting in effect at byte position `pos`.
    pub fn format_at<'a>(&self, paragraph: &'a Paragraph, pos: usize) -> Option<&'a RunFormat> {
        self.child_at(pos)
            .and_then(|index| paragraph.run_format_at(index))
    }
}
