//! Fonts: the host font interface, glyph subsets and their PDF encoders.
//!
//! Text reaches the writer as positioned glyph ids of a [`FontFace`]. The
//! [`GlyphRegistry`] maps each `(face, glyph)` pair to a one-byte code in a
//! subset font object. At emission time every subset is encoded as
//!
//! - an embedded TrueType/CFF simple font when the face can produce a subset
//!   program,
//! - a Type 3 font otherwise, and always for color, bitmap and variable
//!   glyphs.
//!
//! Widget text uses a separate standalone font, see [`standard`].

pub mod registry;
mod sfnt;
pub mod standard;
pub mod tounicode;
pub mod truetype;
pub mod type3;

mod emit;

pub use emit::emit_subset;
pub use registry::{GlyphEntry, GlyphMapping, GlyphRegistry, Subset, SubsetKind, MAX_SUBSET_GLYPHS};
pub use truetype::TrueTypeFace;

use super::content::Color;
use crate::geometry::Path;
use bitflags::bitflags;

/// Index of a face registered with the writer.
pub type FaceId = usize;

/// A font selection in the graphics state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    /// Registered face
    pub face: FaceId,
    /// Em size in logical units
    pub size: f64,
    /// Embolden by stroking the glyph outline
    pub artificial_bold: bool,
    /// Slant glyphs by skewing the text matrix
    pub artificial_italic: bool,
    /// Vertical writing
    pub vertical: bool,
}

impl Font {
    /// Plain font of the given size.
    pub fn new(face: FaceId, size: f64) -> Self {
        Self {
            face,
            size,
            artificial_bold: false,
            artificial_italic: false,
            vertical: false,
        }
    }

    /// Enable artificial bold.
    pub fn bold(mut self) -> Self {
        self.artificial_bold = true;
        self
    }

    /// Enable artificial italic.
    pub fn italic(mut self) -> Self {
        self.artificial_italic = true;
        self
    }

    /// Enable vertical writing.
    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }

    /// Whether glyphs must be placed one at a time.
    pub fn needs_per_glyph_matrix(&self) -> bool {
        self.vertical || self.artificial_italic
    }
}

bitflags! {
    /// FontDescriptor `/Flags` (ISO 32000-1 Table 123).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontFlags: u32 {
        /// All glyphs have the same width
        const FIXED_PITCH = 1 << 0;
        /// Glyphs have serifs
        const SERIF = 1 << 1;
        /// Glyphs outside the standard Latin set
        const SYMBOLIC = 1 << 2;
        /// Cursive glyphs
        const SCRIPT = 1 << 3;
        /// Standard Latin glyph set
        const NONSYMBOLIC = 1 << 5;
        /// Slanted glyphs
        const ITALIC = 1 << 6;
        /// Embolden at small sizes
        const FORCE_BOLD = 1 << 18;
    }
}

/// Face-wide metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Ascender above the baseline
    pub ascent: i32,
    /// Descender (negative)
    pub descent: i32,
    /// Capital height
    pub cap_height: i32,
    /// Italic angle in degrees, counter-clockwise from vertical
    pub italic_angle: f64,
    /// Dominant vertical stem width
    pub stem_v: i32,
    /// Bounding box `[llx lly urx ury]`
    pub bbox: [i32; 4],
    /// Descriptor flags
    pub flags: FontFlags,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            ascent: 800,
            descent: -200,
            cap_height: 700,
            italic_angle: 0.0,
            stem_v: 80,
            bbox: [0, -200, 1000, 800],
            flags: FontFlags::NONSYMBOLIC,
        }
    }
}

/// How a glyph has to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphKind {
    /// Static outline, fits a subset font program
    Outline,
    /// Layers of colored outlines
    ColorLayers,
    /// Embedded raster image
    Bitmap,
    /// Outline of a variable font instance
    VariableOutline,
}

impl GlyphKind {
    /// Whether the glyph goes into a Type 3 subset regardless of the face.
    pub fn needs_type3(self) -> bool {
        !matches!(self, GlyphKind::Outline)
    }
}

/// One colored layer of a color glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLayer {
    /// Outline of the layer, in font units
    pub outline: Path,
    /// Fill color
    pub color: Color,
}

/// A bitmap glyph as PNG data.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    /// Horizontal offset of the image from the glyph origin, in pixels
    pub x: i16,
    /// Vertical offset of the image bottom from the baseline, in pixels
    pub y: i16,
    /// Image width in pixels
    pub width: u16,
    /// Image height in pixels
    pub height: u16,
    /// Strike size the image was drawn for
    pub pixels_per_em: u16,
    /// PNG-encoded image
    pub png: Vec<u8>,
}

/// Binary flavor of an embeddable font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontProgramKind {
    /// `glyf`-based sfnt, embedded as `/FontFile2`
    TrueType,
    /// Bare CFF, embedded as `/FontFile3 /Subtype /Type1C`
    Cff,
    /// CFF-flavored sfnt, embedded as `/FontFile3 /Subtype /OpenType`
    OpenType,
}

/// An embeddable font program.
#[derive(Debug, Clone, PartialEq)]
pub struct FontProgram {
    /// Binary flavor
    pub kind: FontProgramKind,
    /// Program bytes
    pub data: Vec<u8>,
}

/// Host font service for one face.
///
/// Glyph metrics and outlines are in font units with y pointing up.
pub trait FontFace: std::fmt::Debug {
    /// PostScript name used for `/BaseFont`.
    fn postscript_name(&self) -> String;

    /// Font units per em.
    fn units_per_em(&self) -> u16;

    /// Face-wide metrics.
    fn metrics(&self) -> FontMetrics;

    /// Horizontal advance of a glyph.
    fn glyph_advance(&self, glyph: u16) -> u16;

    /// Glyph for a character, if the face maps it.
    fn char_to_glyph(&self, ch: char) -> Option<u16>;

    /// How the glyph must be encoded.
    fn glyph_kind(&self, _glyph: u16) -> GlyphKind {
        GlyphKind::Outline
    }

    /// Outline of a glyph.
    fn glyph_outline(&self, glyph: u16) -> Option<Path>;

    /// Color layers of a [`GlyphKind::ColorLayers`] glyph.
    fn color_layers(&self, _glyph: u16) -> Vec<ColorLayer> {
        Vec::new()
    }

    /// Raster image of a [`GlyphKind::Bitmap`] glyph.
    fn raster_glyph(&self, _glyph: u16) -> Option<RasterGlyph> {
        None
    }

    /// Build a subset program in which the glyph at index `i` of `glyphs`
    /// is reachable through one-byte code `i` (index 0 is `.notdef`).
    fn subset_program(&self, _glyphs: &[u16]) -> Option<FontProgram> {
        None
    }

    /// The complete font program, for unsubsetted embedding.
    fn font_program(&self) -> Option<FontProgram> {
        None
    }

    /// Advance in 1/1000 em.
    fn advance_1000(&self, glyph: u16) -> i32 {
        scale_to_1000(i32::from(self.glyph_advance(glyph)), self.units_per_em())
    }
}

/// Convert font units to 1/1000 em, rounding to nearest.
pub fn scale_to_1000(value: i32, units_per_em: u16) -> i32 {
    let upem = f64::from(units_per_em.max(1));
    (f64::from(value) * 1000.0 / upem).round() as i32
}

/// Six-letter subset tag derived from the subset's glyphs and object id.
pub fn subset_tag(font_id: u32, glyphs: &[u16]) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(font_id.to_le_bytes());
    for glyph in glyphs {
        hasher.update(glyph.to_le_bytes());
    }
    let hash = hasher.finalize();
    hash.iter().take(6).map(|b| char::from(b'A' + b % 26)).collect()
}
