//! The in-memory document tree.
//!
//! A `DocumentTree` groups one body part with any number of header and
//! footer parts. Each part is a flat list of block elements: paragraphs
//! and tables, with anything else preserved as raw XML. Paragraph
//! enumeration is depth-first, so paragraphs nested inside table cells are
//! visited too.

use crate::doc::paragraph::Paragraph;

/// A table cell containing block content.
#[derive(Debug, Clone, Default)]
pub struct TableCell {
    /// Block elements inside the cell (paragraphs, nested tables)
    pub elements: Vec<BodyElement>,
    /// Original `<w:tcPr>` bytes, cloned verbatim on serialization
    pub(crate) raw_props: Vec<Vec<u8>>,
}

/// A table row.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Original `<w:trPr>` bytes
    pub(crate) raw_props: Vec<Vec<u8>>,
}

/// A table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<TableRow>,
    /// Original `<w:tblPr>`/`<w:tblGrid>` bytes, in document order
    pub(crate) raw_props: Vec<Vec<u8>>,
}

/// A block element within a part or a table cell.
#[derive(Debug, Clone)]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
    /// Unmodeled block content (e.g., `<w:sectPr>`) carried through verbatim
    Raw(Vec<u8>),
}

/// The role a part plays in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Body,
    Header,
    Footer,
}

/// One XML part of the document: the body, a header, or a footer.
#[derive(Debug, Clone)]
pub struct PartContent {
    kind: PartKind,
    pub(crate) elements: Vec<BodyElement>,
}

impl PartContent {
    /// Create an empty part.
    pub fn new(kind: PartKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
        }
    }

    /// The role of this part.
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    /// The block elements of this part.
    pub fn elements(&self) -> &[BodyElement] {
        &self.elements
    }

    /// Append a block element.
    pub fn push(&mut self, element: BodyElement) {
        self.elements.push(element);
    }

    /// All paragraphs in this part, depth-first (table cells included).
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        collect_paragraphs(&self.elements, &mut out);
        out
    }

    /// Mutable depth-first paragraph enumeration.
    pub fn paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        let mut out = Vec::new();
        collect_paragraphs_mut(&mut self.elements, &mut out);
        out
    }

    /// Number of paragraphs, depth-first.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().len()
    }
}

fn collect_paragraphs<'a>(elements: &'a [BodyElement], out: &mut Vec<&'a Paragraph>) {
    for element in elements {
        match element {
            BodyElement::Paragraph(para) => out.push(para),
            BodyElement::Table(table) => {
                for row in &table.rows {
                    for cell in &row.cells {
                        collect_paragraphs(&cell.elements, out);
                    }
                }
            },
            BodyElement::Raw(_) => {},
        }
    }
}

fn collect_paragraphs_mut<'a>(elements: &'a mut [BodyElement], out: &mut Vec<&'a mut Paragraph>) {
    for element in elements {
        match element {
            BodyElement::Paragraph(para) => out.push(para),
            BodyElement::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        collect_paragraphs_mut(&mut cell.elements, out);
                    }
                }
            },
            BodyElement::Raw(_) => {},
        }
    }
}

/// An open, mutable document: body plus headers and footers.
///
/// Persistence of the surrounding container is the caller's concern; this
/// tree only knows about its parts. Parts are always visited in a fixed
/// order: body first, then headers, then footers.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    pub body: PartContent,
    pub headers: Vec<PartContent>,
    pub footers: Vec<PartContent>,
}

impl DocumentTree {
    /// Create a document with an empty body and no header/footer parts.
    pub fn new() -> Self {
        Self {
            body: PartContent::new(PartKind::Body),
            headers: Vec::new(),
            footers: Vec::new(),
        }
    }

    /// All parts in processing order: body, headers, footers.
    pub fn parts(&self) -> Vec<&PartContent> {
        let mut parts = Vec::with_capacity(1 + self.headers.len() + self.footers.len());
        parts.push(&self.body);
        parts.extend(self.headers.iter());
        parts.extend(self.footers.iter());
        parts
    }

    /// Mutable parts in processing order.
    pub fn parts_mut(&mut self) -> Vec<&mut PartContent> {
        let mut parts = Vec::with_capacity(1 + self.headers.len() + self.footers.len());
        parts.push(&mut self.body);
        parts.extend(self.headers.iter_mut());
        parts.extend(self.footers.iter_mut());
        parts
    }

    /// Total paragraph count across every part, depth-first.
    pub fn paragraph_count(&self) -> usize {
        self.parts().iter().map(|p| p.paragraph_count()).sum()
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::paragraph::Run;

    fn para(text: &str) -> Paragraph {
        let mut p = Paragraph::new();
        p.add_run(Run::new(text, None));
        p
    }

    #[test]
    fn test_paragraphs_are_collected_depth_first() {
        let mut part = PartContent::new(PartKind::Body);
        part.push(BodyElement::Paragraph(para("first")));
        part.push(BodyElement::Table(Table {
            rows: vec![TableRow {
                cells: vec![TableCell {
                    elements: vec![BodyElement::Paragraph(para("in cell"))],
                    raw_props: Vec::new(),
                }],
                raw_props: Vec::new(),
            }],
            raw_props: Vec::new(),
        }));
        part.push(BodyElement::Paragraph(para("last")));

        let texts: Vec<String> = part.paragraphs().iter().map(|p| p.text()).collect();
        assert_eq!(texts, ["first", "in cell", "last"]);
    }

    #[test]
    fn test_parts_visit_body_then_headers_then_footers() {
        let mut tree = DocumentTree::new();
        tree.body.push(BodyElement::Paragraph(para("body")));
        let mut header = PartContent::new(PartKind::Header);
        header.push(BodyElement::Paragraph(para("header")));
        tree.headers.push(header);
        let mut footer = PartContent::new(PartKind::Footer);
        footer.push(BodyElement::Paragraph(para("footer")));
        tree.footers.push(footer);

        let kinds: Vec<PartKind> = tree.parts().iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, [PartKind::Body, PartKind::Header, PartKind::Footer]);
        assert_eq!(tree.paragraph_count(), 3);
    }
}
