//! # Rambutan
//!
//! A mail-merge engine for word-processing documents: maps rows of
//! tabular data onto document templates by substituting `{placeholder}`
//! tokens with per-row values, preserving the original formatting even
//! when a token is split across differently formatted runs.
//!
//! ## Features
//!
//! - **Run-aware substitution**: paragraphs are flattened into a single
//!   text view with byte-precise run slices, so tokens broken across run
//!   boundaries are found and replaced without corrupting the formatting
//!   on either side. Inserted text inherits the formatting at the token's
//!   start, and the result regroups into the fewest homogeneous runs.
//! - **Formatting fidelity**: run, paragraph, and table properties are
//!   captured as raw XML at parse time and emitted verbatim, so
//!   attributes outside the modeled set (language, styles, shading)
//!   survive a round trip untouched.
//! - **Table reconciliation**: any number of tabular sources merge into
//!   one row set keyed by a join column, with last-non-empty-wins
//!   conflict resolution and union/intersection header views.
//! - **Parallel batch generation**: one independent copy-then-mutate job
//!   per output document on a rayon pool, with per-document progress and
//!   failure reporting.
//!
//! ## Quick start
//!
//! ```rust
//! use rambutan::doc::{BodyElement, DocumentTree, Paragraph, Run};
//! use rambutan::engine::{SubstitutionTable, extract_placeholders, process_document};
//!
//! let mut tree = DocumentTree::new();
//! let mut para = Paragraph::new();
//! para.add_run(Run::new("Dear {name}, your grade is {grade}.", None));
//! tree.body.push(BodyElement::Paragraph(para));
//!
//! assert_eq!(extract_placeholders(&tree), ["{name}", "{grade}"]);
//!
//! let row = SubstitutionTable::from_pairs([("name", "Ada"), ("grade", "A")]);
//! process_document(&mut tree, &row, |_pct| {});
//! assert_eq!(tree.body.paragraphs()[0].text(), "Dear Ada, your grade is A.");
//! ```
//!
//! ## Scope
//!
//! The crate works on in-memory document trees and individual XML parts;
//! opening and saving the surrounding container (the ZIP package of a
//! `.docx` file) is the caller's concern, as is reading tabular sources
//! into [`merge::SourceTable`] values.

pub mod batch;
pub mod common;
pub mod config;
pub mod doc;
pub mod engine;
pub mod merge;

pub use common::{Error, Result};
pub use doc::{DocumentTree, Paragraph, Run, RunFormat};
pub use engine::{SubstitutionTable, extract_placeholders, process_document, substitute_paragraph};
pub use merge::{MergeSession, MergedRowSet, SourceTable, reconcile};
