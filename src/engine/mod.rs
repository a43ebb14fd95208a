//! Placeholder discovery and substitution.
//!
//! Three layers: [`index`] finds the tokens a template uses, [`text_model`]
//! flattens a paragraph's runs for matching, and [`substitute`] performs
//! the actual replacement. [`driver`] ties them together for a whole
//! document with progress reporting.

pub mod driver;
pub mod index;
pub mod substitute;
pub mod text_model;

pub use driver::{PassReport, process_document};
pub use index::extract_placeholders;
pub use substitute::{SubstitutionTable, substitute_paragraph};
pub use text_model::{TextModel, TextSlice};
