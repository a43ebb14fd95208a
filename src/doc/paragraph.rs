//! Mutable paragraph and run nodes.
//!
//! Paragraphs hold an ordered list of children: text runs, field nodes
//! (which expose only flattened text), and raw XML fragments preserved
//! verbatim for anything we do not model (bookmarks, hyperlinks, complex
//! fields). Substitution detaches the run children and appends freshly
//! grouped ones; non-run children are kept in place untouched.

use crate::doc::formatting::RunFormat;
use smallvec::SmallVec;

/// A text run: a contiguous span of paragraph text sharing one formatting
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct Run {
    /// Text content. Tabs and line breaks appear as `\t` and `\n`.
    pub text: String,
    /// Formatting snapshot; `None` means paragraph/document default.
    pub format: Option<RunFormat>,
}

impl Run {
    /// Create a new run with the given text and formatting.
    pub fn new(text: impl Into<String>, format: Option<RunFormat>) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// A simple field node (`<w:fldSimple>`).
///
/// Fields expose only their concatenated inner text; substitution on them
/// re-emits a single plain-text result with no sub-range formatting.
#[derive(Debug, Clone)]
pub struct Field {
    /// Field instruction (the `w:instr` attribute), preserved on output.
    pub instruction: Option<String>,
    /// Flattened inner text.
    pub text: String,
}

/// A child node of a paragraph.
#[derive(Debug, Clone)]
pub enum ParagraphChild {
    /// A text run
    Run(Run),
    /// A simple field exposing only flattened text
    Field(Field),
    /// Unmodeled content carried through verbatim
    Raw(Vec<u8>),
}

/// A mutable paragraph.
///
/// The concatenation of the run children's text, in order, is the
/// paragraph's run text; the run-aware text model and the substitution
/// engine operate on that view.
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Ordered children (runs, fields, raw fragments)
    pub(crate) children: SmallVec<[ParagraphChild; 8]>,
    /// Original `<w:pPr>` bytes, cloned verbatim on serialization
    pub(crate) raw_ppr: Option<Vec<u8>>,
}

impl Paragraph {
    /// Create an empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a run.
    pub fn add_run(&mut self, run: Run) {
        self.children.push(ParagraphChild::Run(run));
    }

    /// Append a field node.
    pub fn add_field(&mut self, field: Field) {
        self.children.push(ParagraphChild::Field(field));
    }

    /// The ordered children of this paragraph.
    pub fn children(&self) -> &[ParagraphChild] {
        &self.children
    }

    /// Iterate over the run children in document order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.children.iter().filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
    }

    /// Number of run children.
    pub fn run_count(&self) -> usize {
        self.runs().count()
    }

    /// Full visible text: run text and field text concatenated in child
    /// order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                ParagraphChild::Run(run) => out.push_str(&run.text),
                ParagraphChild::Field(field) => out.push_str(&field.text),
                ParagraphChild::Raw(_) => {},
            }
        }
        out
    }

    /// Formatting of the child at `index`, when it is a run.
    pub(crate) fn run_format_at(&self, index: usize) -> Option<&RunFormat> {
        match self.children.get(index) {
            Some(ParagraphChild::Run(run)) => run.format.as_ref(),
            _ => None,
        }
    }

    /// Detach every run child and append `new_runs` in order.
    ///
    /// Non-run children keep their relative order and end up ahead of the
    /// appended runs.
    pub(crate) fn replace_runs(&mut self, new_runs: Vec<Run>) {
        let old = std::mem::take(&mut self.children);
        self.children = old
            .into_iter()
            .filter(|child| !matches!(child, ParagraphChild::Run(_)))
            .collect();
        self.children
            .extend(new_runs.into_iter().map(ParagraphChild::Run));
    }
}
