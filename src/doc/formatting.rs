//! Character formatting snapshots for runs.
//!
//! A `RunFormat` carries two things: the visual fields used to decide
//! whether two runs may merge, and the raw `<w:rPr>` bytes captured at
//! parse time. Serialization clones the raw bytes verbatim, so attributes
//! outside the visual snapshot (language, style id, shading, ...) survive
//! untouched. The field-wise equality below governs run-merge boundaries
//! only, never what gets written out.

/// Underline styles for text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderlineStyle {
    Single,
    Double,
    Thick,
    Dotted,
    Dashed,
    DotDash,
    DotDotDash,
    Wave,
}

impl UnderlineStyle {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Thick => "thick",
            Self::Dotted => "dotted",
            Self::Dashed => "dash",
            Self::DotDash => "dotDash",
            Self::DotDotDash => "dotDotDash",
            Self::Wave => "wave",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            "thick" => Some(Self::Thick),
            "dotted" => Some(Self::Dotted),
            "dash" => Some(Self::Dashed),
            "dotDash" => Some(Self::DotDash),
            "dotDotDash" => Some(Self::DotDotDash),
            "wave" => Some(Self::Wave),
            _ => None,
        }
    }
}

/// Character formatting attached to a run.
///
/// `None` in any field means "not specified, inherit from the paragraph or
/// document default" and compares equal only to `None` — an absent value is
/// its own distinct value, never a wildcard.
#[derive(Debug, Clone, Default)]
pub struct RunFormat {
    /// Whether the run is bold
    pub bold: Option<bool>,
    /// Whether the run is italic
    pub italic: Option<bool>,
    /// Underline style, if underlined
    pub underline: Option<UnderlineStyle>,
    /// Whether the run is struck through
    pub strikethrough: Option<bool>,
    /// Typeface name
    pub font_name: Option<String>,
    /// Font size in half-points (Word convention: 24 = 12pt)
    pub font_size: Option<u32>,
    /// Text color as hex RGB (e.g., "FF0000")
    pub color: Option<String>,
    /// Original `<w:rPr>` bytes, cloned verbatim on serialization.
    ///
    /// When present this wins over the individual fields above, so
    /// properties we do not model round-trip unchanged.
    pub(crate) raw_rpr: Option<Vec<u8>>,
}

impl RunFormat {
    /// Compare the visual snapshot fields only.
    ///
    /// This is the equality used to decide run-merge boundaries. The raw
    /// property bytes deliberately do not participate: two runs whose
    /// visible formatting matches may still carry byte-wise different
    /// property XML.
    pub fn same_appearance(&self, other: &Self) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.strikethrough == other.strikethrough
            && self.font_name == other.font_name
            && self.font_size == other.font_size
            && self.color == other.color
    }

    pub(crate) fn has_properties(&self) -> bool {
        self.bold.is_some()
            || self.italic.is_some()
            || self.underline.is_some()
            || self.strikethrough.is_some()
            || self.font_name.is_some()
            || self.font_size.is_some()
            || self.color.is_some()
    }
}

/// Equality over optional formats: absent formatting is its own value,
/// equal to itself and nothing else. Never fails, so run grouping always
/// terminates even on anomalous paragraphs.
pub(crate) fn formats_equal(a: Option<&RunFormat>, b: Option<&RunFormat>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_appearance(b),
        _ => false,
    }
}
