//! Word-processing document model.
//!
//! This module owns the mutable tree (parts, paragraphs, runs, tables),
//! the formatting snapshots attached to runs, and the XML layer that
//! converts part bytes to and from that tree.

pub mod formatting;
pub mod paragraph;
pub mod tree;
pub mod xml;

pub use formatting::{RunFormat, UnderlineStyle};
pub use paragraph::{Field, Paragraph, ParagraphChild, Run};
pub use tree::{BodyElement, DocumentTree, PartContent, PartKind, Table, TableCell, TableRow};
