//! WordprocessingML part parsing and serialization.
//!
//! Converts the XML of a single part (`document.xml`, `header*.xml`,
//! `footer*.xml`) into the mutable tree and back. The surrounding ZIP
//! container is never touched here; callers hand in part bytes and get
//! part bytes back.
//!
//! Formatting fidelity rule: property blocks (`w:rPr`, `w:pPr`, `w:tblPr`,
//! ...) and any element we do not model are captured as raw bytes during
//! parsing and emitted verbatim during serialization. Only run text is
//! decoded into the tree.

use crate::common::{Error, Result};
use crate::doc::formatting::{RunFormat, UnderlineStyle};
use crate::doc::paragraph::{Field, Paragraph, ParagraphChild, Run};
use crate::doc::tree::{BodyElement, PartContent, PartKind, Table, TableCell, TableRow};
use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::borrow::Cow;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape_text(raw: &[u8]) -> Result<String> {
    let s = std::str::from_utf8(raw)
        .map_err(|_| Error::Xml("invalid UTF-8 in text content".to_string()))?;
    match quick_xml::escape::unescape(s) {
        Ok(cow) => Ok(cow.into_owned()),
        Err(_) => Ok(s.to_string()),
    }
}

/// Rebuild the raw bytes of a start tag from its event.
fn write_start_tag(e: &BytesStart, out: &mut Vec<u8>, self_closing: bool) {
    out.push(b'<');
    out.extend_from_slice(e.name().as_ref());
    for attr in e.attributes().flatten() {
        out.push(b' ');
        out.extend_from_slice(attr.key.as_ref());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(&attr.value);
        out.push(b'"');
    }
    if self_closing {
        out.extend_from_slice(b"/>");
    } else {
        out.push(b'>');
    }
}

fn write_end_tag(e: &BytesEnd, out: &mut Vec<u8>) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(e.name().as_ref());
    out.push(b'>');
}

/// Capture an element subtree verbatim, starting from its already-read
/// start tag and consuming through the matching end tag.
fn capture_raw<R: std::io::BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(256);
    write_start_tag(start, &mut raw, false);

    let mut depth = 1usize;
    let mut buf = Vec::with_capacity(512);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                write_start_tag(&e, &mut raw, false);
            },
            Ok(Event::Empty(e)) => {
                write_start_tag(&e, &mut raw, true);
            },
            Ok(Event::Text(e)) => {
                raw.extend_from_slice(e.as_ref());
            },
            Ok(Event::CData(e)) => {
                raw.extend_from_slice(b"<![CDATA[");
                raw.extend_from_slice(e.as_ref());
                raw.extend_from_slice(b"]]>");
            },
            Ok(Event::End(e)) => {
                write_end_tag(&e, &mut raw);
                depth -= 1;
                if depth == 0 {
                    return Ok(raw);
                }
            },
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside element".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }
}

/// Read a boolean toggle property (`w:b`, `w:i`, `w:strike`).
///
/// Element present without `w:val` means true; otherwise "true"/"1".
fn bool_property(e: &BytesStart) -> Option<bool> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"val" {
            let value = attr.value.as_ref();
            return Some(value == b"true" || value == b"1");
        }
    }
    Some(true)
}

fn val_attribute(e: &BytesStart) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"val" {
            let value = attr.unescape_value().unwrap_or(Cow::Borrowed(""));
            return Some(value.into_owned());
        }
    }
    None
}

/// Pull the visual snapshot fields out of a property element.
fn extract_format_property(e: &BytesStart, fmt: &mut RunFormat) {
    match e.local_name().as_ref() {
        b"b" => fmt.bold = bool_property(e),
        b"i" => fmt.italic = bool_property(e),
        b"strike" => fmt.strikethrough = bool_property(e),
        b"u" => {
            if let Some(value) = val_attribute(e) {
                fmt.underline = UnderlineStyle::parse(&value);
            } else {
                fmt.underline = Some(UnderlineStyle::Single);
            }
        },
        b"sz" => {
            if let Some(value) = val_attribute(e)
                && let Ok(size) = value.parse::<u32>()
            {
                fmt.font_size = Some(size);
            }
        },
        b"color" => fmt.color = val_attribute(e),
        b"rFonts" => {
            for attr in e.attributes().flatten() {
                if attr.key.local_name().as_ref() == b"ascii" {
                    let value = attr.unescape_value().unwrap_or(Cow::Borrowed(""));
                    fmt.font_name = Some(value.into_owned());
                    break;
                }
            }
        },
        _ => {},
    }
}

/// Parse a `<w:rPr>` block: extract the visual snapshot and keep the raw
/// bytes for verbatim re-emission.
fn parse_rpr<R: std::io::BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<RunFormat> {
    let mut raw = Vec::with_capacity(128);
    write_start_tag(start, &mut raw, false);

    let mut fmt = RunFormat::default();
    let mut depth = 1usize;
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                write_start_tag(&e, &mut raw, false);
                if depth == 2 {
                    extract_format_property(&e, &mut fmt);
                }
            },
            Ok(Event::Empty(e)) => {
                write_start_tag(&e, &mut raw, true);
                if depth == 1 {
                    extract_format_property(&e, &mut fmt);
                }
            },
            Ok(Event::Text(e)) => raw.extend_from_slice(e.as_ref()),
            Ok(Event::End(e)) => {
                write_end_tag(&e, &mut raw);
                depth -= 1;
                if depth == 0 {
                    break;
                }
            },
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside run properties".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }

    fmt.raw_rpr = Some(raw);
    Ok(fmt)
}

/// Parse a `<w:r>` element.
///
/// Text content is decoded (with `w:tab` → `\t` and `w:br` → `\n`); a run
/// that carries anything we do not model (drawings, complex field chars,
/// math) is preserved whole as a raw child instead, invisible to
/// substitution.
fn parse_run<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
) -> Result<ParagraphChild> {
    let mut raw = Vec::with_capacity(256);
    write_start_tag(start, &mut raw, false);

    let mut text = String::new();
    let mut format: Option<RunFormat> = None;
    let mut unmodeled = false;
    let mut in_text = false;
    let mut depth = 1usize;
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"rPr" if depth == 1 => {
                    let fmt = parse_rpr(reader, &e)?;
                    if let Some(ref rpr_raw) = fmt.raw_rpr {
                        raw.extend_from_slice(rpr_raw);
                    }
                    format = Some(fmt);
                },
                b"t" => {
                    depth += 1;
                    in_text = true;
                    write_start_tag(&e, &mut raw, false);
                },
                _ => {
                    depth += 1;
                    unmodeled = true;
                    write_start_tag(&e, &mut raw, false);
                },
            },
            Ok(Event::Empty(e)) => {
                write_start_tag(&e, &mut raw, true);
                match e.local_name().as_ref() {
                    b"tab" => text.push('\t'),
                    b"br" | b"cr" => text.push('\n'),
                    b"t" | b"rPr" => {},
                    _ => unmodeled = true,
                }
            },
            Ok(Event::Text(e)) => {
                raw.extend_from_slice(e.as_ref());
                if in_text {
                    text.push_str(&unescape_text(e.as_ref())?);
                }
            },
            Ok(Event::CData(e)) => {
                raw.extend_from_slice(b"<![CDATA[");
                raw.extend_from_slice(e.as_ref());
                raw.extend_from_slice(b"]]>");
                if in_text {
                    text.push_str(
                        std::str::from_utf8(e.as_ref())
                            .map_err(|_| Error::Xml("invalid UTF-8 in CDATA".to_string()))?,
                    );
                }
            },
            Ok(Event::End(e)) => {
                write_end_tag(&e, &mut raw);
                if e.local_name().as_ref() == b"t" {
                    in_text = false;
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
            },
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside run".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }

    if unmodeled {
        Ok(ParagraphChild::Raw(raw))
    } else {
        Ok(ParagraphChild::Run(Run { text, format }))
    }
}

/// Parse a `<w:fldSimple>` element into a field node with flattened text.
fn parse_field<R: std::io::BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Field> {
    let mut instruction = None;
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"instr" {
            let value = attr.unescape_value().unwrap_or(Cow::Borrowed(""));
            instruction = Some(value.into_owned());
        }
    }

    let mut text = String::new();
    let mut in_text = false;
    let mut depth = 1usize;
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {},
            },
            Ok(Event::Text(e)) if in_text => {
                text.push_str(&unescape_text(e.as_ref())?);
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = false;
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
            },
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside field".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }

    Ok(Field { instruction, text })
}

/// Parse a `<w:p>` element.
fn parse_paragraph<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    _start: &BytesStart,
) -> Result<Paragraph> {
    let mut para = Paragraph::new();
    let mut buf = Vec::with_capacity(512);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"pPr" => para.raw_ppr = Some(capture_raw(reader, &e)?),
                b"r" => {
                    let child = parse_run(reader, &e)?;
                    para.children.push(child);
                },
                b"fldSimple" => {
                    let field = parse_field(reader, &e)?;
                    para.add_field(field);
                },
                _ => {
                    let raw = capture_raw(reader, &e)?;
                    para.children.push(ParagraphChild::Raw(raw));
                },
            },
            Ok(Event::Empty(e)) => {
                let mut raw = Vec::with_capacity(64);
                write_start_tag(&e, &mut raw, true);
                match e.local_name().as_ref() {
                    b"pPr" => para.raw_ppr = Some(raw),
                    _ => para.children.push(ParagraphChild::Raw(raw)),
                }
            },
            // Only the closing </w:p> can reach here; nested elements are
            // consumed by the child parsers above.
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside paragraph".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }
    Ok(para)
}

fn parse_table_cell<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    _start: &BytesStart,
) -> Result<TableCell> {
    let mut cell = TableCell::default();
    let mut buf = Vec::with_capacity(512);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    let para = parse_paragraph(reader, &e)?;
                    cell.elements.push(BodyElement::Paragraph(para));
                },
                b"tbl" => {
                    let table = parse_table(reader, &e)?;
                    cell.elements.push(BodyElement::Table(table));
                },
                b"tcPr" => cell.raw_props.push(capture_raw(reader, &e)?),
                _ => cell.elements.push(BodyElement::Raw(capture_raw(reader, &e)?)),
            },
            Ok(Event::Empty(e)) => {
                let mut raw = Vec::with_capacity(64);
                write_start_tag(&e, &mut raw, true);
                cell.elements.push(BodyElement::Raw(raw));
            },
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside table cell".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }
    Ok(cell)
}

fn parse_table_row<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    _start: &BytesStart,
) -> Result<TableRow> {
    let mut row = TableRow::default();
    let mut buf = Vec::with_capacity(512);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tc" => row.cells.push(parse_table_cell(reader, &e)?),
                _ => row.raw_props.push(capture_raw(reader, &e)?),
            },
            Ok(Event::Empty(e)) => {
                let mut raw = Vec::with_capacity(64);
                write_start_tag(&e, &mut raw, true);
                row.raw_props.push(raw);
            },
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside table row".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }
    Ok(row)
}

fn parse_table<R: std::io::BufRead>(reader: &mut Reader<R>, _start: &BytesStart) -> Result<Table> {
    let mut table = Table::default();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tr" => table.rows.push(parse_table_row(reader, &e)?),
                _ => table.raw_props.push(capture_raw(reader, &e)?),
            },
            Ok(Event::Empty(e)) => {
                let mut raw = Vec::with_capacity(64);
                write_start_tag(&e, &mut raw, true);
                table.raw_props.push(raw);
            },
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(Error::Xml("unexpected EOF inside table".to_string()));
            },
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }
    Ok(table)
}

/// Parse one WordprocessingML part into a `PartContent`.
///
/// Root containers (`w:document`, `w:body`, `w:hdr`, `w:ftr`) are
/// descended into; everything else at part level becomes a block element.
pub fn parse_part(xml: &[u8], kind: PartKind) -> Result<PartContent> {
    let mut reader = Reader::from_reader(xml);
    let mut part = PartContent::new(kind);
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"document" | b"body" | b"hdr" | b"ftr" => {},
                b"p" => {
                    let para = parse_paragraph(&mut reader, &e)?;
                    part.push(BodyElement::Paragraph(para));
                },
                b"tbl" => {
                    let table = parse_table(&mut reader, &e)?;
                    part.push(BodyElement::Table(table));
                },
                _ => {
                    let raw = capture_raw(&mut reader, &e)?;
                    part.push(BodyElement::Raw(raw));
                },
            },
            Ok(Event::Empty(e)) => {
                let mut raw = Vec::with_capacity(64);
                write_start_tag(&e, &mut raw, true);
                part.push(BodyElement::Raw(raw));
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {},
        }
    }
    Ok(part)
}

/// Build a `<w:rPr>` block from snapshot fields.
///
/// Used only for programmatically constructed formats; parsed formats
/// carry their original bytes instead.
fn build_rpr(fmt: &RunFormat, xml: &mut String) {
    xml.push_str("<w:rPr>");
    if let Some(bold) = fmt.bold {
        if bold {
            xml.push_str("<w:b/>");
        } else {
            xml.push_str("<w:b w:val=\"0\"/>");
        }
    }
    if let Some(italic) = fmt.italic {
        if italic {
            xml.push_str("<w:i/>");
        } else {
            xml.push_str("<w:i w:val=\"0\"/>");
        }
    }
    if let Some(strike) = fmt.strikethrough {
        if strike {
            xml.push_str("<w:strike/>");
        } else {
            xml.push_str("<w:strike w:val=\"0\"/>");
        }
    }
    if let Some(underline) = fmt.underline {
        xml.push_str(&format!("<w:u w:val=\"{}\"/>", underline.as_str()));
    }
    if let Some(size) = fmt.font_size {
        xml.push_str(&format!("<w:sz w:val=\"{}\"/>", size));
    }
    if let Some(ref font_name) = fmt.font_name {
        let name = escape_xml(font_name);
        xml.push_str(&format!("<w:rFonts w:ascii=\"{name}\" w:hAnsi=\"{name}\"/>"));
    }
    if let Some(ref color) = fmt.color {
        xml.push_str(&format!("<w:color w:val=\"{}\"/>", escape_xml(color)));
    }
    xml.push_str("</w:rPr>");
}

/// Write run text, mapping `\t` back to `<w:tab/>` and `\n` to `<w:br/>`.
fn write_run_text(text: &str, xml: &mut String) {
    let mut segment = String::new();
    let flush = |segment: &mut String, xml: &mut String| {
        if !segment.is_empty() {
            xml.push_str("<w:t xml:space=\"preserve\">");
            xml.push_str(&escape_xml(segment));
            xml.push_str("</w:t>");
            segment.clear();
        }
    };
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut segment, xml);
                xml.push_str("<w:tab/>");
            },
            '\n' => {
                flush(&mut segment, xml);
                xml.push_str("<w:br/>");
            },
            _ => segment.push(ch),
        }
    }
    flush(&mut segment, xml);
}

fn write_run(run: &Run, xml: &mut String) -> Result<()> {
    xml.push_str("<w:r>");
    if let Some(ref fmt) = run.format {
        if let Some(ref raw) = fmt.raw_rpr {
            xml.push_str(
                std::str::from_utf8(raw)
                    .map_err(|_| Error::Xml("invalid UTF-8 in run properties".to_string()))?,
            );
        } else if fmt.has_properties() {
            build_rpr(fmt, xml);
        }
    }
    write_run_text(&run.text, xml);
    xml.push_str("</w:r>");
    Ok(())
}

fn write_field(field: &Field, xml: &mut String) {
    xml.push_str("<w:fldSimple");
    if let Some(ref instruction) = field.instruction {
        xml.push_str(&format!(" w:instr=\"{}\"", escape_xml(instruction)));
    }
    xml.push('>');
    // Reduced form: a single plain run, no sub-range formatting.
    xml.push_str("<w:r>");
    write_run_text(&field.text, xml);
    xml.push_str("</w:r>");
    xml.push_str("</w:fldSimple>");
}

fn push_raw(raw: &[u8], xml: &mut String) -> Result<()> {
    xml.push_str(
        std::str::from_utf8(raw)
            .map_err(|_| Error::Xml("invalid UTF-8 in raw fragment".to_string()))?,
    );
    Ok(())
}

fn write_paragraph(para: &Paragraph, xml: &mut String) -> Result<()> {
    xml.push_str("<w:p>");
    if let Some(ref raw) = para.raw_ppr {
        push_raw(raw, xml)?;
    }
    for child in para.children() {
        match child {
            ParagraphChild::Run(run) => write_run(run, xml)?,
            ParagraphChild::Field(field) => write_field(field, xml),
            ParagraphChild::Raw(raw) => push_raw(raw, xml)?,
        }
    }
    xml.push_str("</w:p>");
    Ok(())
}

fn write_table(table: &Table, xml: &mut String) -> Result<()> {
    xml.push_str("<w:tbl>");
    for raw in &table.raw_props {
        push_raw(raw, xml)?;
    }
    for row in &table.rows {
        xml.push_str("<w:tr>");
        for raw in &row.raw_props {
            push_raw(raw, xml)?;
        }
        for cell in &row.cells {
            xml.push_str("<w:tc>");
            for raw in &cell.raw_props {
                push_raw(raw, xml)?;
            }
            write_elements(&cell.elements, xml)?;
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    Ok(())
}

fn write_elements(elements: &[BodyElement], xml: &mut String) -> Result<()> {
    for element in elements {
        match element {
            BodyElement::Paragraph(para) => write_paragraph(para, xml)?,
            BodyElement::Table(table) => write_table(table, xml)?,
            BodyElement::Raw(raw) => push_raw(raw, xml)?,
        }
    }
    Ok(())
}

/// Serialize a part back to WordprocessingML bytes.
pub fn serialize_part(part: &PartContent) -> Result<Vec<u8>> {
    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>");
    match part.kind() {
        PartKind::Body => {
            xml.push_str(&format!("<w:document xmlns:w=\"{W_NS}\"><w:body>"));
            write_elements(part.elements(), &mut xml)?;
            xml.push_str("</w:body></w:document>");
        },
        PartKind::Header => {
            xml.push_str(&format!("<w:hdr xmlns:w=\"{W_NS}\">"));
            write_elements(part.elements(), &mut xml)?;
            xml.push_str("</w:hdr>");
        },
        PartKind::Footer => {
            xml.push_str(&format!("<w:ftr xmlns:w=\"{W_NS}\">"));
            write_elements(part.elements(), &mut xml)?;
            xml.push_str("</w:ftr>");
        },
    }
    Ok(xml.into_bytes())
}
