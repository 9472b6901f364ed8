//! [`FontFace`] over TrueType/OpenType data, backed by `ttf-parser`.
//!
//! The face keeps the raw font bytes and re-parses the table directory on
//! each query; `ttf-parser` does no allocation while parsing so this stays
//! cheap and avoids a self-referential struct.

use super::sfnt;
use super::{FontFace, FontFlags, FontMetrics, FontProgram, FontProgramKind, GlyphKind, RasterGlyph};
use crate::error::{Error, Result};
use crate::geometry::{Path, Point};
use std::sync::Arc;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// Strike size requested for bitmap glyphs.
const RASTER_PPEM: u16 = 128;

/// A TrueType or OpenType face loaded from memory.
#[derive(Clone)]
pub struct TrueTypeFace {
    data: Arc<Vec<u8>>,
    index: u32,
    name: String,
}

impl std::fmt::Debug for TrueTypeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFace")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("len", &self.data.len())
            .finish()
    }
}

impl TrueTypeFace {
    /// Parse a face from font bytes.
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        Self::from_collection(data, 0)
    }

    /// Parse face `index` of a font collection.
    pub fn from_collection(data: Vec<u8>, index: u32) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Font("font file is empty".into()));
        }
        let name = {
            let face = Face::parse(&data, index).map_err(|e| Error::Font(format!("failed to parse font: {}", e)))?;
            face.names()
                .into_iter()
                .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
                .and_then(|name| name.to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        };
        Ok(Self {
            data: Arc::new(data),
            index,
            name: sanitize_postscript_name(&name),
        })
    }

    /// Load a face from a file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_data(std::fs::read(path.as_ref())?)
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }

    /// Raw font bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }
}

impl FontFace for TrueTypeFace {
    fn postscript_name(&self) -> String {
        self.name.clone()
    }

    fn units_per_em(&self) -> u16 {
        self.face().map(|f| f.units_per_em()).unwrap_or(1000)
    }

    fn metrics(&self) -> FontMetrics {
        let Some(face) = self.face() else {
            return FontMetrics::default();
        };
        let bbox = face.global_bounding_box();
        let mut flags = FontFlags::NONSYMBOLIC;
        if face.is_monospaced() {
            flags |= FontFlags::FIXED_PITCH;
        }
        if face.is_italic() {
            flags |= FontFlags::ITALIC;
        }
        FontMetrics {
            ascent: i32::from(face.ascender()),
            descent: i32::from(face.descender()),
            cap_height: i32::from(face.capital_height().unwrap_or(face.ascender())),
            italic_angle: if face.is_italic() { -12.0 } else { 0.0 },
            stem_v: if face.is_bold() { 140 } else { 80 },
            bbox: [
                i32::from(bbox.x_min),
                i32::from(bbox.y_min),
                i32::from(bbox.x_max),
                i32::from(bbox.y_max),
            ],
            flags,
        }
    }

    fn glyph_advance(&self, glyph: u16) -> u16 {
        self.face()
            .and_then(|f| f.glyph_hor_advance(GlyphId(glyph)))
            .unwrap_or(0)
    }

    fn char_to_glyph(&self, ch: char) -> Option<u16> {
        self.face()?.glyph_index(ch).map(|g| g.0)
    }

    fn glyph_kind(&self, glyph: u16) -> GlyphKind {
        let Some(face) = self.face() else {
            return GlyphKind::Outline;
        };
        if face.glyph_raster_image(GlyphId(glyph), RASTER_PPEM).is_some() {
            GlyphKind::Bitmap
        } else if face.is_variable() {
            GlyphKind::VariableOutline
        } else {
            GlyphKind::Outline
        }
    }

    fn glyph_outline(&self, glyph: u16) -> Option<Path> {
        let face = self.face()?;
        let mut builder = PathCollector::default();
        face.outline_glyph(GlyphId(glyph), &mut builder)?;
        Some(builder.path)
    }

    fn raster_glyph(&self, glyph: u16) -> Option<RasterGlyph> {
        let face = self.face()?;
        let image = face.glyph_raster_image(GlyphId(glyph), RASTER_PPEM)?;
        if image.format != ttf_parser::RasterImageFormat::PNG {
            log::debug!("raster glyph {} of {} is not PNG", glyph, self.name);
            return None;
        }
        Some(RasterGlyph {
            x: image.x,
            y: image.y,
            width: image.width,
            height: image.height,
            pixels_per_em: image.pixels_per_em,
            png: image.data.to_vec(),
        })
    }

    fn subset_program(&self, glyphs: &[u16]) -> Option<FontProgram> {
        let face = self.face()?;
        if face.tables().glyf.is_none() {
            log::debug!("{} has no 'glyf' table; subset drawn as Type 3", self.name);
            return None;
        }
        match sfnt::subset_glyf(face.raw_face(), glyphs) {
            Ok(data) => Some(FontProgram {
                kind: FontProgramKind::TrueType,
                data,
            }),
            Err(e) => {
                log::warn!("subsetting {} failed: {}", self.name, e);
                None
            },
        }
    }

    fn font_program(&self) -> Option<FontProgram> {
        let face = self.face()?;
        let kind = if face.tables().glyf.is_some() {
            FontProgramKind::TrueType
        } else if face.tables().cff.is_some() {
            FontProgramKind::OpenType
        } else {
            return None;
        };
        Some(FontProgram {
            kind,
            data: self.data.to_vec(),
        })
    }
}

/// Collects `ttf-parser` outline callbacks into a cubic [`Path`].
#[derive(Default)]
struct PathCollector {
    path: Path,
    current: Point,
}

impl OutlineBuilder for PathCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.current = Point::new(f64::from(x), f64::from(y));
        self.path = std::mem::take(&mut self.path).move_to(self.current.x, self.current.y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.current = Point::new(f64::from(x), f64::from(y));
        self.path = std::mem::take(&mut self.path).line_to(self.current.x, self.current.y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.current;
        let q = Point::new(f64::from(x1), f64::from(y1));
        let end = Point::new(f64::from(x), f64::from(y));
        let c1 = Point::new(p0.x + (q.x - p0.x) * 2.0 / 3.0, p0.y + (q.y - p0.y) * 2.0 / 3.0);
        let c2 = Point::new(end.x + (q.x - end.x) * 2.0 / 3.0, end.y + (q.y - end.y) * 2.0 / 3.0);
        self.current = end;
        self.path = std::mem::take(&mut self.path).curve_to(c1, c2, end);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let c1 = Point::new(f64::from(x1), f64::from(y1));
        let c2 = Point::new(f64::from(x2), f64::from(y2));
        self.current = Point::new(f64::from(x), f64::from(y));
        self.path = std::mem::take(&mut self.path).curve_to(c1, c2, self.current);
    }

    fn close(&mut self) {
        self.path = std::mem::take(&mut self.path).close();
    }
}

/// Drop characters that are not allowed in a PDF font name.
fn sanitize_postscript_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"[](){}<>/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PathSegment;

    #[test]
    fn test_rejects_invalid_data() {
        assert!(matches!(TrueTypeFace::from_data(Vec::new()), Err(Error::Font(_))));
        assert!(matches!(TrueTypeFace::from_data(b"not a font".to_vec()), Err(Error::Font(_))));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_postscript_name("Noto Sans (Bold)"), "NotoSansBold");
        assert_eq!(sanitize_postscript_name("  "), "Unknown");
        assert_eq!(sanitize_postscript_name("DejaVuSans-Bold"), "DejaVuSans-Bold");
    }

    #[test]
    fn test_subset_program_embeds_requested_glyphs() {
        let face = TrueTypeFace::from_data(crate::writer::fonts::sfnt::tests::sample_font()).unwrap();
        assert_eq!(face.char_to_glyph('A'), Some(1));
        let program = face.subset_program(&[0, 3, 1]).unwrap();
        assert_eq!(program.kind, FontProgramKind::TrueType);

        let subset = Face::parse(&program.data, 0).unwrap();
        assert_eq!(subset.number_of_glyphs(), 3);
        assert_eq!(subset.glyph_hor_advance(GlyphId(2)), Some(600));
    }

    #[test]
    fn test_quadratic_becomes_cubic() {
        let mut collector = PathCollector::default();
        collector.move_to(0.0, 0.0);
        collector.quad_to(30.0, 60.0, 60.0, 0.0);
        collector.close();
        assert_eq!(collector.path.segments.len(), 3);
        match collector.path.segments[1] {
            PathSegment::CurveTo(c1, c2, end) => {
                assert_eq!(c1, Point::new(20.0, 40.0));
                assert_eq!(c2, Point::new(40.0, 40.0));
                assert_eq!(end, Point::new(60.0, 0.0));
            },
            ref other => panic!("expected curve, got {:?}", other),
        }
    }
}
