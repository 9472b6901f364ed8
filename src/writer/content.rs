//! PDF content stream operators.
//!
//! Writes graphics and text operators according to ISO 32000-1:2008
//! Sections 8 and 9. All coordinates handed to the builder are already in
//! PDF user space (origin bottom-left, y up, points); numbers are formatted
//! with [`primitives::append_fixed`] so no exponent ever reaches the output.

use super::primitives::{self, COORD_PRECISION};
use crate::geometry::{Matrix, Path, PathSegment, Polygon, PolyPolygon};

/// Bézier approximation constant for quarter circles: 4/3 * (sqrt(2) - 1).
pub const KAPPA: f64 = 0.552_284_749_8;

/// RGB color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f64,
    /// Green channel
    pub g: f64,
    /// Blue channel
    pub b: f64,
}

impl Color {
    /// Create a new color.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(f64::from(r) / 255.0, f64::from(g) / 255.0, f64::from(b) / 255.0)
    }

    /// Black.
    pub fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// White.
    pub fn white() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Linear interpolation towards `other`.
    pub fn mix(&self, other: &Color, t: f64) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Channels as an array, for shading functions.
    pub fn components(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate matrix (cm)
    Transform(Matrix),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f64),
    /// Move text position (Td)
    MoveText(f64, f64),
    /// Set text matrix (Tm)
    SetTextMatrix(Matrix),
    /// Show a string of one-byte codes (Tj)
    ShowText(Vec<u8>),
    /// Show text with positioning (TJ)
    ShowTextArray(Vec<TextArrayItem>),
    /// Set text rendering mode (Tr)
    SetTextRenderMode(TextRenderMode),
    /// Set horizontal scaling in percent (Tz)
    SetHorizontalScaling(f64),
    /// Set fill color RGB (rg)
    SetFillColor(Color),
    /// Set stroke color RGB (RG)
    SetStrokeColor(Color),
    /// Set line width (w)
    SetLineWidth(f64),
    /// Move to (m)
    MoveTo(f64, f64),
    /// Line to (l)
    LineTo(f64, f64),
    /// Curve to (c)
    CurveTo(f64, f64, f64, f64, f64, f64),
    /// Rectangle (re)
    Rectangle(f64, f64, f64, f64),
    /// Close path (h)
    ClosePath,
    /// Stroke (S)
    Stroke,
    /// Fill (f)
    Fill,
    /// Fill using even-odd rule (f*)
    FillEvenOdd,
    /// Fill and stroke (B)
    FillStroke,
    /// Fill and stroke using even-odd rule (B*)
    FillStrokeEvenOdd,
    /// End path without filling/stroking (n)
    EndPath,
    /// Clip using non-zero winding rule (W)
    Clip,
    /// Clip using even-odd rule (W*)
    ClipEvenOdd,
    /// Paint XObject (Do)
    PaintXObject(String),
    /// Set graphics state from ExtGState dictionary (gs)
    SetExtGState(String),
    /// Select a pattern as fill color (/Pattern cs /name scn)
    SetFillPattern(String),
    /// Select a pattern as stroke color (/Pattern CS /name SCN)
    SetStrokePattern(String),
    /// Paint shading (sh)
    PaintShading(String),
    /// Set line cap style (J)
    SetLineCap(LineCap),
    /// Set line join style (j)
    SetLineJoin(LineJoin),
    /// Set miter limit (M)
    SetMiterLimit(f64),
    /// Set dash pattern (d)
    SetDashPattern(Vec<f64>, f64),
    /// Begin marked content without properties (BMC)
    BeginMarkedContent(String),
    /// Begin marked content with an inline property list (BDC)
    BeginMarkedContentDict {
        /// Structure tag or `Span`
        tag: String,
        /// Marked content id linking to the structure tree
        mcid: Option<u32>,
        /// Replacement text for extraction
        actual_text: Option<String>,
    },
    /// End marked content (EMC)
    EndMarkedContent,
    /// Already formatted operator text
    Raw(Vec<u8>),
}

/// Line cap styles for path stroking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineCap {
    /// Square butt cap (default)
    #[default]
    Butt = 0,
    /// Round cap
    Round = 1,
    /// Projecting square cap
    Square = 2,
}

/// Line join styles for path stroking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineJoin {
    /// Miter join (default)
    #[default]
    Miter = 0,
    /// Round join
    Round = 1,
    /// Bevel join
    Bevel = 2,
}

/// Text rendering modes used by the writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextRenderMode {
    /// Fill glyphs
    #[default]
    Fill = 0,
    /// Fill then stroke glyphs (artificial bold)
    FillStroke = 2,
    /// Invisible text
    Invisible = 3,
}

/// Item in a TJ array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextArrayItem {
    /// One-byte codes
    Text(Vec<u8>),
    /// Positioning adjustment in 1/1000 em (positive moves left)
    Adjustment(i64),
}

/// Builder for PDF content streams.
///
/// Operators are formatted immediately into an internal buffer; [`finish`]
/// hands the bytes to whichever stream is the current target.
///
/// [`finish`]: ContentStreamBuilder::finish
#[derive(Debug, Default)]
pub struct ContentStreamBuilder {
    buf: Vec<u8>,
    /// Whether we're in a text object
    in_text_object: bool,
    /// Open marked content sequences
    marked_depth: usize,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the stream.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        match &op {
            ContentStreamOp::BeginText => self.in_text_object = true,
            ContentStreamOp::EndText => self.in_text_object = false,
            ContentStreamOp::BeginMarkedContent(_) | ContentStreamOp::BeginMarkedContentDict { .. } => {
                self.marked_depth += 1
            },
            ContentStreamOp::EndMarkedContent => self.marked_depth = self.marked_depth.saturating_sub(1),
            _ => {},
        }
        write_op(&mut self.buf, &op);
        self.buf.push(b'\n');
        self
    }

    /// Add multiple operations.
    pub fn ops(&mut self, ops: impl IntoIterator<Item = ContentStreamOp>) -> &mut Self {
        for op in ops {
            self.op(op);
        }
        self
    }

    /// Whether a text object is open.
    pub fn in_text_object(&self) -> bool {
        self.in_text_object
    }

    /// Number of open marked content sequences.
    pub fn marked_depth(&self) -> usize {
        self.marked_depth
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the finished operator bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Begin a text object.
    pub fn begin_text(&mut self) -> &mut Self {
        if !self.in_text_object {
            self.op(ContentStreamOp::BeginText);
        }
        self
    }

    /// End a text object.
    pub fn end_text(&mut self) -> &mut Self {
        if self.in_text_object {
            self.op(ContentStreamOp::EndText);
        }
        self
    }

    /// Set font for text operations.
    pub fn set_font(&mut self, resource: &str, size: f64) -> &mut Self {
        self.op(ContentStreamOp::SetFont(resource.to_string(), size))
    }

    /// Set fill color.
    pub fn fill_color(&mut self, color: Color) -> &mut Self {
        self.op(ContentStreamOp::SetFillColor(color))
    }

    /// Set stroke color.
    pub fn stroke_color(&mut self, color: Color) -> &mut Self {
        self.op(ContentStreamOp::SetStrokeColor(color))
    }

    /// Set line width.
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Move to a point.
    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.op(ContentStreamOp::MoveTo(x, y))
    }

    /// Draw a line to a point.
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.op(ContentStreamOp::LineTo(x, y))
    }

    /// Draw a cubic Bézier curve.
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        self.op(ContentStreamOp::CurveTo(x1, y1, x2, y2, x3, y3))
    }

    /// Append a rectangle with lower-left corner `(x, y)`.
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.op(ContentStreamOp::Rectangle(x, y, width, height))
    }

    /// Close the current subpath.
    pub fn close_path(&mut self) -> &mut Self {
        self.op(ContentStreamOp::ClosePath)
    }

    /// Stroke the path.
    pub fn stroke(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Stroke)
    }

    /// Fill the path (non-zero winding).
    pub fn fill(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Fill)
    }

    /// Fill the path (even-odd).
    pub fn fill_even_odd(&mut self) -> &mut Self {
        self.op(ContentStreamOp::FillEvenOdd)
    }

    /// Fill and stroke the path.
    pub fn fill_stroke(&mut self) -> &mut Self {
        self.op(ContentStreamOp::FillStroke)
    }

    /// Fill (even-odd) and stroke the path.
    pub fn fill_stroke_even_odd(&mut self) -> &mut Self {
        self.op(ContentStreamOp::FillStrokeEvenOdd)
    }

    /// End the path without painting.
    pub fn end_path(&mut self) -> &mut Self {
        self.op(ContentStreamOp::EndPath)
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::RestoreState)
    }

    /// Concatenate a matrix with the CTM.
    pub fn transform(&mut self, m: Matrix) -> &mut Self {
        self.op(ContentStreamOp::Transform(m))
    }

    /// Apply an ExtGState resource.
    pub fn set_ext_gstate(&mut self, name: &str) -> &mut Self {
        self.op(ContentStreamOp::SetExtGState(name.to_string()))
    }

    /// Paint an XObject resource.
    pub fn paint_xobject(&mut self, name: &str) -> &mut Self {
        self.op(ContentStreamOp::PaintXObject(name.to_string()))
    }

    /// Append a polygon as a subpath.
    pub fn polygon(&mut self, polygon: &Polygon, close: bool) -> &mut Self {
        let mut points = polygon.points.iter();
        if let Some(first) = points.next() {
            self.move_to(first.x, first.y);
            for p in points {
                self.line_to(p.x, p.y);
            }
            if close {
                self.close_path();
            }
        }
        self
    }

    /// Append every polygon as a closed subpath.
    pub fn poly_polygon(&mut self, poly: &PolyPolygon) -> &mut Self {
        for polygon in &poly.polygons {
            self.polygon(polygon, true);
        }
        self
    }

    /// Append a path with Bézier segments.
    pub fn path(&mut self, path: &Path) -> &mut Self {
        for segment in &path.segments {
            match segment {
                PathSegment::MoveTo(p) => self.move_to(p.x, p.y),
                PathSegment::LineTo(p) => self.line_to(p.x, p.y),
                PathSegment::CurveTo(c1, c2, end) => self.curve_to(c1.x, c1.y, c2.x, c2.y, end.x, end.y),
                PathSegment::Close => self.close_path(),
            };
        }
        self
    }

    /// Append an ellipse centered at `(cx, cy)`.
    pub fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> &mut Self {
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;

        self.move_to(cx + rx, cy)
            .curve_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry)
            .curve_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy)
            .curve_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry)
            .curve_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy)
            .close_path()
    }

    /// Append a rounded rectangle with lower-left corner `(x, y)`.
    pub fn rounded_rect(&mut self, x: f64, y: f64, width: f64, height: f64, rx: f64, ry: f64) -> &mut Self {
        let rx = rx.min(width / 2.0).max(0.0);
        let ry = ry.min(height / 2.0).max(0.0);
        if rx == 0.0 || ry == 0.0 {
            return self.rect(x, y, width, height);
        }
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;
        let (r, t) = (x + width, y + height);

        self.move_to(x + rx, y)
            .line_to(r - rx, y)
            .curve_to(r - rx + kx, y, r, y + ry - ky, r, y + ry)
            .line_to(r, t - ry)
            .curve_to(r, t - ry + ky, r - rx + kx, t, r - rx, t)
            .line_to(x + rx, t)
            .curve_to(x + rx - kx, t, x, t - ry + ky, x, t - ry)
            .line_to(x, y + ry)
            .curve_to(x, y + ry - ky, x + rx - kx, y, x + rx, y)
            .close_path()
    }

    /// Open a tagged marked content sequence.
    pub fn begin_marked_content(&mut self, tag: &str, mcid: Option<u32>, actual_text: Option<&str>) -> &mut Self {
        if mcid.is_none() && actual_text.is_none() {
            return self.op(ContentStreamOp::BeginMarkedContent(tag.to_string()));
        }
        self.op(ContentStreamOp::BeginMarkedContentDict {
            tag: tag.to_string(),
            mcid,
            actual_text: actual_text.map(str::to_string),
        })
    }

    /// Close the innermost marked content sequence.
    pub fn end_marked_content(&mut self) -> &mut Self {
        self.op(ContentStreamOp::EndMarkedContent)
    }
}

fn num(w: &mut Vec<u8>, v: f64) {
    primitives::append_fixed(v, COORD_PRECISION, w);
    w.push(b' ');
}

fn matrix(w: &mut Vec<u8>, m: &Matrix) {
    for v in [m.a, m.b, m.c, m.d] {
        primitives::append_fixed(v, primitives::REAL_PRECISION, w);
        w.push(b' ');
    }
    num(w, m.e);
    num(w, m.f);
}

fn color(w: &mut Vec<u8>, c: &Color) {
    for v in c.components() {
        primitives::append_fixed(v.clamp(0.0, 1.0), COORD_PRECISION, w);
        w.push(b' ');
    }
}

fn name_op(w: &mut Vec<u8>, name: &str, op: &[u8]) {
    primitives::append_name(name, w);
    w.push(b' ');
    w.extend_from_slice(op);
}

/// Format a single operation into `w`.
pub fn write_op(w: &mut Vec<u8>, op: &ContentStreamOp) {
    match op {
        ContentStreamOp::SaveState => w.push(b'q'),
        ContentStreamOp::RestoreState => w.push(b'Q'),
        ContentStreamOp::Transform(m) => {
            matrix(w, m);
            w.extend_from_slice(b"cm");
        },
        ContentStreamOp::BeginText => w.extend_from_slice(b"BT"),
        ContentStreamOp::EndText => w.extend_from_slice(b"ET"),
        ContentStreamOp::SetFont(name, size) => {
            primitives::append_name(name, w);
            w.push(b' ');
            num(w, *size);
            w.extend_from_slice(b"Tf");
        },
        ContentStreamOp::MoveText(tx, ty) => {
            num(w, *tx);
            num(w, *ty);
            w.extend_from_slice(b"Td");
        },
        ContentStreamOp::SetTextMatrix(m) => {
            matrix(w, m);
            w.extend_from_slice(b"Tm");
        },
        ContentStreamOp::ShowText(codes) => {
            primitives::append_literal_string(codes, w);
            w.extend_from_slice(b" Tj");
        },
        ContentStreamOp::ShowTextArray(items) => {
            w.push(b'[');
            for item in items {
                match item {
                    TextArrayItem::Text(codes) => primitives::append_literal_string(codes, w),
                    TextArrayItem::Adjustment(adj) => w.extend_from_slice(adj.to_string().as_bytes()),
                }
            }
            w.extend_from_slice(b"] TJ");
        },
        ContentStreamOp::SetTextRenderMode(mode) => {
            w.extend_from_slice(format!("{} Tr", *mode as u8).as_bytes());
        },
        ContentStreamOp::SetHorizontalScaling(scale) => {
            num(w, *scale);
            w.extend_from_slice(b"Tz");
        },
        ContentStreamOp::SetFillColor(c) => {
            color(w, c);
            w.extend_from_slice(b"rg");
        },
        ContentStreamOp::SetStrokeColor(c) => {
            color(w, c);
            w.extend_from_slice(b"RG");
        },
        ContentStreamOp::SetLineWidth(width) => {
            num(w, *width);
            w.push(b'w');
        },
        ContentStreamOp::MoveTo(x, y) => {
            num(w, *x);
            num(w, *y);
            w.push(b'm');
        },
        ContentStreamOp::LineTo(x, y) => {
            num(w, *x);
            num(w, *y);
            w.push(b'l');
        },
        ContentStreamOp::CurveTo(x1, y1, x2, y2, x3, y3) => {
            for v in [x1, y1, x2, y2, x3, y3] {
                num(w, *v);
            }
            w.push(b'c');
        },
        ContentStreamOp::Rectangle(x, y, width, height) => {
            for v in [x, y, width, height] {
                num(w, *v);
            }
            w.extend_from_slice(b"re");
        },
        ContentStreamOp::ClosePath => w.push(b'h'),
        ContentStreamOp::Stroke => w.push(b'S'),
        ContentStreamOp::Fill => w.push(b'f'),
        ContentStreamOp::FillEvenOdd => w.extend_from_slice(b"f*"),
        ContentStreamOp::FillStroke => w.push(b'B'),
        ContentStreamOp::FillStrokeEvenOdd => w.extend_from_slice(b"B*"),
        ContentStreamOp::EndPath => w.push(b'n'),
        ContentStreamOp::Clip => w.push(b'W'),
        ContentStreamOp::ClipEvenOdd => w.extend_from_slice(b"W*"),
        ContentStreamOp::PaintXObject(name) => name_op(w, name, b"Do"),
        ContentStreamOp::SetExtGState(name) => name_op(w, name, b"gs"),
        ContentStreamOp::SetFillPattern(name) => {
            w.extend_from_slice(b"/Pattern cs ");
            name_op(w, name, b"scn");
        },
        ContentStreamOp::SetStrokePattern(name) => {
            w.extend_from_slice(b"/Pattern CS ");
            name_op(w, name, b"SCN");
        },
        ContentStreamOp::PaintShading(name) => name_op(w, name, b"sh"),
        ContentStreamOp::SetLineCap(cap) => w.extend_from_slice(format!("{} J", *cap as u8).as_bytes()),
        ContentStreamOp::SetLineJoin(join) => w.extend_from_slice(format!("{} j", *join as u8).as_bytes()),
        ContentStreamOp::SetMiterLimit(limit) => {
            num(w, *limit);
            w.push(b'M');
        },
        ContentStreamOp::SetDashPattern(pattern, phase) => {
            w.push(b'[');
            for (i, p) in pattern.iter().enumerate() {
                if i > 0 {
                    w.push(b' ');
                }
                primitives::append_fixed(*p, COORD_PRECISION, w);
            }
            w.extend_from_slice(b"] ");
            num(w, *phase);
            w.push(b'd');
        },
        ContentStreamOp::BeginMarkedContent(tag) => name_op(w, tag, b"BMC"),
        ContentStreamOp::BeginMarkedContentDict { tag, mcid, actual_text } => {
            primitives::append_name(tag, w);
            w.extend_from_slice(b"<<");
            if let Some(mcid) = mcid {
                w.extend_from_slice(format!("/MCID {}", mcid).as_bytes());
            }
            if let Some(text) = actual_text {
                w.extend_from_slice(b"/ActualText");
                primitives::append_text_string(text, w);
            }
            w.extend_from_slice(b">>BDC");
        },
        ContentStreamOp::EndMarkedContent => w.extend_from_slice(b"EMC"),
        ContentStreamOp::Raw(raw) => w.extend_from_slice(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn text(builder: ContentStreamBuilder) -> String {
        String::from_utf8(builder.finish()).unwrap()
    }

    #[test]
    fn test_simple_text() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .begin_text()
            .set_font("F12", 12.0)
            .op(ContentStreamOp::MoveText(72.0, 720.5))
            .op(ContentStreamOp::ShowText(b"Hello".to_vec()))
            .end_text();

        assert_eq!(text(builder), "BT\n/F12 12 Tf\n72 720.5 Td\n(Hello) Tj\nET\n");
    }

    #[test]
    fn test_text_object_tracking() {
        let mut builder = ContentStreamBuilder::new();
        builder.begin_text().begin_text();
        assert!(builder.in_text_object());
        builder.end_text().end_text();
        assert!(!builder.in_text_object());
        assert_eq!(text(builder), "BT\nET\n");
    }

    #[test]
    fn test_path_operations() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .stroke_color(Color::new(1.0, 0.0, 0.0))
            .set_line_width(0.25)
            .move_to(0.0, 0.0)
            .line_to(100.123456, 100.0)
            .stroke();

        assert_eq!(text(builder), "1 0 0 RG\n0.25 w\n0 0 m\n100.123 100 l\nS\n");
    }

    #[test]
    fn test_text_array() {
        let mut builder = ContentStreamBuilder::new();
        builder.op(ContentStreamOp::ShowTextArray(vec![
            TextArrayItem::Text(vec![1, 2]),
            TextArrayItem::Adjustment(-120),
            TextArrayItem::Text(vec![3]),
        ]));
        assert_eq!(text(builder), "[(\\001\\002)-120(\\003)] TJ\n");
    }

    #[test]
    fn test_marked_content_operators() {
        let mut builder = ContentStreamBuilder::new();
        builder.begin_marked_content("P", Some(3), None);
        assert_eq!(builder.marked_depth(), 1);
        builder.end_marked_content();
        builder.begin_marked_content("Artifact", None, None).end_marked_content();
        builder.begin_marked_content("Span", None, Some("ﬁ")).end_marked_content();
        assert_eq!(builder.marked_depth(), 0);
        assert_eq!(
            text(builder),
            "/P<</MCID 3>>BDC\nEMC\n/Artifact BMC\nEMC\n/Span<</ActualText<FEFFFB01>>>BDC\nEMC\n"
        );
    }

    #[test]
    fn test_polygon_and_rect() {
        let mut builder = ContentStreamBuilder::new();
        let poly = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
        builder.polygon(&poly, true).rect(1.0, 2.0, 3.0, 4.0).fill();
        assert_eq!(text(builder), "0 0 m\n10 0 l\n10 10 l\nh\n1 2 3 4 re\nf\n");
    }

    #[test]
    fn test_rounded_rect_degenerates_to_rect() {
        let mut builder = ContentStreamBuilder::new();
        builder.rounded_rect(0.0, 0.0, 10.0, 10.0, 0.0, 2.0);
        assert_eq!(text(builder), "0 0 10 10 re\n");
    }

    #[test]
    fn test_ellipse_uses_four_curves() {
        let mut builder = ContentStreamBuilder::new();
        builder.ellipse(50.0, 50.0, 20.0, 10.0);
        let out = text(builder);
        assert_eq!(out.matches(" c\n").count(), 4);
        assert!(out.starts_with("70 50 m\n"));
    }

    #[test]
    fn test_pattern_and_dash() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .op(ContentStreamOp::SetFillPattern("P7".into()))
            .op(ContentStreamOp::SetDashPattern(vec![3.0, 1.5], 0.0))
            .op(ContentStreamOp::Transform(Matrix::translation(10.0, -5.0)));
        assert_eq!(text(builder), "/Pattern cs /P7 scn\n[3 1.5] 0 d\n1 0 0 1 10 -5 cm\n");
    }
}
