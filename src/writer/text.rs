//! Glyph runs.
//!
//! Consecutive glyphs that share a subset font and a baseline are written
//! as one `Tj`. A `TJ` array is used only when some glyph's natural
//! advance differs from the requested position by a nonzero amount after
//! rounding to 1/1000 em. Vertical text and artificially slanted glyphs
//! are placed one at a time with their own text matrix.

use super::content::{ContentStreamBuilder, ContentStreamOp, TextArrayItem, TextRenderMode};
use super::fonts::Font;
use super::resources::{resource_name, ResourceKind};
use crate::geometry::Matrix;

/// Baseline positions closer than this share a run.
const BASELINE_EPSILON: f64 = 1e-3;

/// Slant of artificial italics (tan 12°).
const ITALIC_SKEW: f64 = 0.212_556_56;

/// A glyph placed by the host's layout, in logical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    /// Glyph id in the font face
    pub glyph: u16,
    /// Pen position on the baseline
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Text this glyph represents
    pub text: String,
}

impl PositionedGlyph {
    /// Glyph at `(x, y)` standing for `text`.
    pub fn new(glyph: u16, x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            glyph,
            x,
            y,
            text: text.into(),
        }
    }
}

/// Glyphs drawn with the current font and text color.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRun {
    /// Glyphs in drawing order
    pub glyphs: Vec<PositionedGlyph>,
}

impl TextRun {
    /// Run from positioned glyphs.
    pub fn new(glyphs: Vec<PositionedGlyph>) -> Self {
        Self { glyphs }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// A glyph after registration, in PDF space.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedGlyph {
    /// Subset font object
    pub font_id: u32,
    /// One-byte code in that subset
    pub code: u8,
    /// Pen position
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Natural advance in 1/1000 em
    pub width: i32,
    /// Replacement text when ToUnicode cannot express the glyph's text
    pub actual_text: Option<String>,
}

/// Glyphs written with one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    /// Subset font object
    pub font_id: u32,
    /// Start of the run
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Strings and kerning adjustments
    pub items: Vec<TextArrayItem>,
    /// ActualText span around the run
    pub actual_text: Option<String>,
}

impl GlyphRun {
    /// Whether the run fits a plain `Tj`.
    pub fn is_simple(&self) -> bool {
        self.items.len() == 1 && matches!(self.items[0], TextArrayItem::Text(_))
    }
}

/// Group glyphs into runs and compute kerning adjustments.
///
/// `size` is the font size in PDF units.
pub fn batch_runs(glyphs: &[MappedGlyph], size: f64) -> Vec<GlyphRun> {
    let mut runs: Vec<GlyphRun> = Vec::new();
    let mut pen_x = 0.0;

    for glyph in glyphs {
        let current = runs.last_mut().filter(|run| {
            run.font_id == glyph.font_id
                && (run.y - glyph.y).abs() < BASELINE_EPSILON
                && run.actual_text.is_none()
                && glyph.actual_text.is_none()
        });

        if let Some(run) = current {
            let adjustment = if size > 0.0 {
                ((pen_x - glyph.x) * 1000.0 / size).round() as i64
            } else {
                0
            };
            if adjustment != 0 {
                run.items.push(TextArrayItem::Adjustment(adjustment));
                run.items.push(TextArrayItem::Text(vec![glyph.code]));
            } else if let Some(TextArrayItem::Text(codes)) = run.items.last_mut() {
                codes.push(glyph.code);
            }
        } else {
            runs.push(GlyphRun {
                font_id: glyph.font_id,
                x: glyph.x,
                y: glyph.y,
                items: vec![TextArrayItem::Text(vec![glyph.code])],
                actual_text: glyph.actual_text.clone(),
            });
        }

        pen_x = glyph.x + f64::from(glyph.width) * size / 1000.0;
    }
    runs
}

fn begin_actual_text(out: &mut ContentStreamBuilder, text: Option<&str>) {
    if let Some(text) = text {
        out.begin_marked_content("Span", None, Some(text));
    }
}

fn end_actual_text(out: &mut ContentStreamBuilder, text: Option<&str>) {
    if text.is_some() {
        out.end_marked_content();
    }
}

/// Write glyphs inside one text object.
///
/// Artificial bold strokes the glyph outlines with the fill color set by
/// the caller as stroke color. Its line width stays inside a `q`/`Q` pair.
pub fn write_glyphs(out: &mut ContentStreamBuilder, glyphs: &[MappedGlyph], font: &Font, size: f64) {
    if glyphs.is_empty() {
        return;
    }
    if font.artificial_bold {
        out.save_state().set_line_width(size / 30.0);
    }
    out.begin_text();
    if font.artificial_bold {
        out.op(ContentStreamOp::SetTextRenderMode(TextRenderMode::FillStroke));
    }

    if font.needs_per_glyph_matrix() {
        write_single_glyphs(out, glyphs, font, size);
    } else {
        let mut current_font = None;
        for run in batch_runs(glyphs, size) {
            if current_font != Some(run.font_id) {
                out.set_font(&resource_name(ResourceKind::Font, run.font_id), size);
                current_font = Some(run.font_id);
            }
            begin_actual_text(out, run.actual_text.as_deref());
            out.op(ContentStreamOp::SetTextMatrix(Matrix::translation(run.x, run.y)));
            if run.is_simple() {
                if let Some(TextArrayItem::Text(codes)) = run.items.into_iter().next() {
                    out.op(ContentStreamOp::ShowText(codes));
                }
            } else {
                out.op(ContentStreamOp::ShowTextArray(run.items));
            }
            end_actual_text(out, run.actual_text.as_deref());
        }
    }

    if font.artificial_bold {
        out.op(ContentStreamOp::SetTextRenderMode(TextRenderMode::Fill));
    }
    out.end_text();
    if font.artificial_bold {
        out.restore_state();
    }
}

fn write_single_glyphs(out: &mut ContentStreamBuilder, glyphs: &[MappedGlyph], font: &Font, size: f64) {
    let mut current_font = None;
    for glyph in glyphs {
        if current_font != Some(glyph.font_id) {
            out.set_font(&resource_name(ResourceKind::Font, glyph.font_id), size);
            current_font = Some(glyph.font_id);
        }
        let mut m = Matrix::translation(glyph.x, glyph.y);
        if font.vertical {
            // glyph turned clockwise, advancing down the column
            m = Matrix {
                a: 0.0,
                b: -1.0,
                c: 1.0,
                d: 0.0,
                e: glyph.x,
                f: glyph.y,
            };
        }
        if font.artificial_italic {
            let skew = Matrix {
                c: ITALIC_SKEW,
                ..Matrix::identity()
            };
            m = skew.concat(&m);
        }
        begin_actual_text(out, glyph.actual_text.as_deref());
        out.op(ContentStreamOp::SetTextMatrix(m));
        out.op(ContentStreamOp::ShowText(vec![glyph.code]));
        end_actual_text(out, glyph.actual_text.as_deref());
    }
}

/// Lines drawn along text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextDecoration {
    /// Below the baseline
    Underline,
    /// Through the middle of lowercase letters
    Strikeout,
    /// Above the ascender
    Overline,
}

impl TextDecoration {
    /// Rectangle `(x, y, width, height)` in PDF space for a decoration of
    /// `width` starting at baseline point `(x, y)`.
    pub fn rect(self, x: f64, y: f64, width: f64, size: f64) -> (f64, f64, f64, f64) {
        let thickness = (size / 20.0).max(0.1);
        let offset = match self {
            TextDecoration::Underline => -size * 0.12,
            TextDecoration::Strikeout => size * 0.28,
            TextDecoration::Overline => size * 0.8,
        };
        (x, y + offset - thickness / 2.0, width, thickness)
    }
}
