//! Drawing API of [`PdfWriter`].
//!
//! All coordinates are logical and go through the current map mode. Each
//! operation first brings the stream's graphics state in line with the
//! writer's (clip, then the colors it paints with) and then appends its
//! operators to the current stream, which is either the page or a
//! redirection.

use super::content::{Color, ContentStreamOp};
use super::document::PdfWriter;
use super::fonts::Font;
use super::gradient::{hatch_lines, tiling_pattern_object, Gradient, Hatch};
use super::graphics_state::{ClipRegion, ExtGStateBuilder, LineInfo, PushFlags, UpdateFlags};
use super::image::{Bitmap, ForeignPage, JpegImage};
use super::resources::ResourceKind;
use super::stream_object;
use super::text::{write_glyphs, MappedGlyph, TextDecoration, TextRun};
use crate::config::ForeignPdfPolicy;
use crate::error::{Error, Result, Warning};
use crate::geometry::{MapMode, Matrix, Path, Point, PolyPolygon, Polygon, Rect};
use crate::object::{Dict, Object};

/// Kind of an open redirection started by the drawing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum GroupFrame {
    /// Content of a transparency group form
    Transparency,
    /// Cell of a tiling pattern
    Pattern,
}

/// How a closed shape is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaintMode {
    Fill,
    Stroke,
    FillStroke,
}

impl PdfWriter {
    // ---- state ----

    /// Stroke color; `None` disables stroking.
    pub fn set_line_color(&mut self, color: Option<Color>) {
        self.state.current_mut().line_color = color;
        self.state.mark_dirty(UpdateFlags::LINE_COLOR);
    }

    /// Fill color; `None` disables filling.
    pub fn set_fill_color(&mut self, color: Option<Color>) {
        self.state.current_mut().fill_color = color;
        self.state.mark_dirty(UpdateFlags::FILL_COLOR);
    }

    /// Color of text drawn with [`draw_glyphs`](PdfWriter::draw_glyphs).
    pub fn set_text_color(&mut self, color: Color) {
        self.state.current_mut().text_color = color;
    }

    /// Underline and strikeout color; `None` follows the text color.
    pub fn set_text_line_color(&mut self, color: Option<Color>) {
        self.state.current_mut().text_line_color = color;
    }

    /// Overline color; `None` follows the text color.
    pub fn set_overline_color(&mut self, color: Option<Color>) {
        self.state.current_mut().overline_color = color;
    }

    /// Select the font for following text.
    pub fn set_font(&mut self, font: Font) -> Result<()> {
        if font.face >= self.faces.len() {
            return Err(Error::InvalidArgument(format!("unknown font face {}", font.face)));
        }
        self.state.current_mut().font = Some(font);
        Ok(())
    }

    /// Logical coordinate system for following operations.
    pub fn set_map_mode(&mut self, map_mode: MapMode) {
        self.state.current_mut().map_mode = map_mode;
    }

    /// Replace the clip region.
    pub fn set_clip_region(&mut self, region: &PolyPolygon) -> Result<()> {
        let clip = self.poly_polygon_to_pdf(region)?;
        self.set_pdf_clip(Some(ClipRegion::new(clip)));
        Ok(())
    }

    /// Intersect the clip region with `region`.
    pub fn intersect_clip_region(&mut self, region: &PolyPolygon) -> Result<()> {
        let region = self.poly_polygon_to_pdf(region)?;
        let clip = match &self.state.current().clip {
            Some(current) => current.intersect(region),
            None => ClipRegion::new(region),
        };
        self.set_pdf_clip(Some(clip));
        Ok(())
    }

    /// Intersect the clip region with a rectangle.
    pub fn intersect_clip_rect(&mut self, rect: &Rect) -> Result<()> {
        self.intersect_clip_region(&PolyPolygon::from_rect(rect))
    }

    /// Shift the clip region by a logical offset.
    pub fn move_clip_region(&mut self, dx: f64, dy: f64) -> Result<()> {
        let Some(clip) = self.state.current().clip.clone() else {
            return Ok(());
        };
        let a = self.point_to_pdf(&Point::new(0.0, 0.0))?;
        let b = self.point_to_pdf(&Point::new(dx, dy))?;
        self.set_pdf_clip(Some(clip.translate(b.x - a.x, b.y - a.y)));
        Ok(())
    }

    /// Remove the clip region.
    pub fn clear_clip_region(&mut self) {
        self.set_pdf_clip(None);
    }

    fn set_pdf_clip(&mut self, clip: Option<ClipRegion>) {
        self.state.current_mut().clip = clip;
        self.state.mark_dirty(UpdateFlags::CLIP);
    }

    /// Save the parts of the graphics state selected by `flags`.
    pub fn push(&mut self, flags: PushFlags) {
        self.state.push(flags);
    }

    /// Restore the state saved by the matching [`push`](PdfWriter::push).
    pub fn pop(&mut self) -> bool {
        self.state.pop()
    }

    // ---- helpers ----

    /// Open the current structure sequence and sync clip and colors.
    fn prepare(&mut self, stroke: bool, fill: bool) -> Result<()> {
        self.page_index()?;
        self.begin_marked_sequence();
        self.state.sync(&mut self.content, stroke, fill);
        Ok(())
    }

    fn paint_mode(&self) -> Option<PaintMode> {
        let state = self.state.current();
        match (state.fill_color.is_some(), state.line_color.is_some()) {
            (true, true) => Some(PaintMode::FillStroke),
            (true, false) => Some(PaintMode::Fill),
            (false, true) => Some(PaintMode::Stroke),
            (false, false) => None,
        }
    }

    /// Paint the path built by `build` with the current colors.
    fn paint_shape(&mut self, even_odd: bool, build: impl FnOnce(&mut super::ContentStreamBuilder)) -> Result<()> {
        let Some(mode) = self.paint_mode() else {
            return Ok(());
        };
        self.prepare(mode != PaintMode::Fill, mode != PaintMode::Stroke)?;
        build(&mut self.content);
        match (mode, even_odd) {
            (PaintMode::Fill, false) => self.content.fill(),
            (PaintMode::Fill, true) => self.content.fill_even_odd(),
            (PaintMode::Stroke, _) => self.content.stroke(),
            (PaintMode::FillStroke, false) => self.content.fill_stroke(),
            (PaintMode::FillStroke, true) => self.content.fill_stroke_even_odd(),
        };
        Ok(())
    }

    /// Stroke an open path with `info`, or a hairline without one.
    fn stroke_with(&mut self, info: Option<&LineInfo>, build: impl FnOnce(&mut super::ContentStreamBuilder)) -> Result<()> {
        if self.state.current().line_color.is_none() {
            return Ok(());
        }
        self.prepare(true, false)?;
        let Some(info) = info else {
            build(&mut self.content);
            self.content.stroke();
            return Ok(());
        };

        let width = self.length_to_pdf(info.width)?;
        let mut dashes = Vec::new();
        if info.dash_too_long() {
            log::warn!("dash pattern of {} entries drawn solid", info.dash_array().len());
            self.warnings.insert(Warning::DashPatternSimplified);
        } else {
            for len in info.dash_array() {
                dashes.push(self.length_to_pdf(len)?);
            }
        }

        self.content.save_state();
        self.content.set_line_width(width);
        if !dashes.is_empty() {
            self.content.op(ContentStreamOp::SetDashPattern(dashes, 0.0));
        }
        self.content.op(ContentStreamOp::SetLineCap(info.cap));
        self.content.op(ContentStreamOp::SetLineJoin(info.join));
        build(&mut self.content);
        self.content.stroke().restore_state();
        Ok(())
    }

    /// Place an XObject so that its unit square covers `rect` (PDF space).
    fn paint_xobject_in(&mut self, id: u32, rect: &Rect) {
        let name = self.resources.register(ResourceKind::XObject, id);
        self.content
            .save_state()
            .transform(Matrix {
                a: rect.width,
                b: 0.0,
                c: 0.0,
                d: rect.height,
                e: rect.x,
                f: rect.y,
            })
            .paint_xobject(&name)
            .restore_state();
    }

    // ---- shapes ----

    /// Fill one logical unit at `p` with `color`.
    pub fn draw_pixel(&mut self, p: &Point, color: Color) -> Result<()> {
        let rect = self.rect_to_pdf(&Rect::new(p.x, p.y, 1.0, 1.0))?;
        self.prepare(false, false)?;
        self.state.sync_fill_color(&mut self.content, color);
        self.content.rect(rect.x, rect.y, rect.width, rect.height).fill();
        self.state.mark_dirty(UpdateFlags::FILL_COLOR);
        Ok(())
    }

    /// Hairline from `from` to `to` in the line color.
    pub fn draw_line(&mut self, from: &Point, to: &Point) -> Result<()> {
        let (a, b) = (self.point_to_pdf(from)?, self.point_to_pdf(to)?);
        self.stroke_with(None, |out| {
            out.move_to(a.x, a.y).line_to(b.x, b.y);
        })
    }

    /// Line with width, dashes, cap and join.
    pub fn draw_line_with(&mut self, from: &Point, to: &Point, info: &LineInfo) -> Result<()> {
        let (a, b) = (self.point_to_pdf(from)?, self.point_to_pdf(to)?);
        self.stroke_with(Some(info), |out| {
            out.move_to(a.x, a.y).line_to(b.x, b.y);
        })
    }

    /// Open polyline as a hairline.
    pub fn draw_polyline(&mut self, polyline: &Polygon) -> Result<()> {
        if polyline.len() < 2 {
            return Ok(());
        }
        let poly = self.polygon_to_pdf(polyline)?;
        self.stroke_with(None, |out| {
            out.polygon(&poly, false);
        })
    }

    /// Open polyline with line attributes.
    pub fn draw_polyline_with(&mut self, polyline: &Polygon, info: &LineInfo) -> Result<()> {
        if polyline.len() < 2 {
            return Ok(());
        }
        let poly = self.polygon_to_pdf(polyline)?;
        self.stroke_with(Some(info), |out| {
            out.polygon(&poly, false);
        })
    }

    /// Rectangle in the current colors.
    pub fn draw_rect(&mut self, rect: &Rect) -> Result<()> {
        let r = self.rect_to_pdf(rect)?;
        self.paint_shape(false, |out| {
            out.rect(r.x, r.y, r.width, r.height);
        })
    }

    /// Rectangle with elliptic corners of radii `rx` and `ry`.
    pub fn draw_rounded_rect(&mut self, rect: &Rect, rx: f64, ry: f64) -> Result<()> {
        let r = self.rect_to_pdf(rect)?;
        let (rx, ry) = (self.length_to_pdf(rx)?, self.length_to_pdf(ry)?);
        self.paint_shape(false, |out| {
            out.rounded_rect(r.x, r.y, r.width, r.height, rx, ry);
        })
    }

    /// Ellipse inscribed in `rect`.
    pub fn draw_ellipse(&mut self, rect: &Rect) -> Result<()> {
        let r = self.rect_to_pdf(rect)?;
        let c = r.center();
        self.paint_shape(false, |out| {
            out.ellipse(c.x, c.y, r.width / 2.0, r.height / 2.0);
        })
    }

    /// Closed polygon.
    pub fn draw_polygon(&mut self, polygon: &Polygon) -> Result<()> {
        if polygon.is_empty() {
            return Ok(());
        }
        let poly = self.polygon_to_pdf(polygon)?;
        self.paint_shape(false, |out| {
            out.polygon(&poly, true);
        })
    }

    /// Polygon set filled with the even-odd rule.
    pub fn draw_poly_polygon(&mut self, poly: &PolyPolygon) -> Result<()> {
        if poly.is_empty() {
            return Ok(());
        }
        let poly = self.poly_polygon_to_pdf(poly)?;
        self.paint_shape(true, |out| {
            out.poly_polygon(&poly);
        })
    }

    /// Bezier path; closed subpaths are filled, all are stroked.
    pub fn draw_path(&mut self, path: &Path) -> Result<()> {
        if path.is_empty() {
            return Ok(());
        }
        let path = self.path_to_pdf(path)?;
        self.paint_shape(true, |out| {
            out.path(&path);
        })
    }

    // ---- images ----

    /// Scale `bitmap` into `rect`. An alpha channel becomes a soft mask
    /// where the output version allows transparency.
    pub fn draw_bitmap(&mut self, rect: &Rect, bitmap: &Bitmap) -> Result<()> {
        let target = self.rect_to_pdf(rect)?;
        self.prepare(false, false)?;
        let id = if bitmap.alpha.is_some() && !self.config.version.allows_transparency() {
            log::warn!("alpha channel dropped for {:?}", self.config.version);
            self.warnings.insert(Warning::TransparencyOmitted);
            let opaque = Bitmap {
                alpha: None,
                ..bitmap.clone()
            };
            self.images.register_bitmap(&mut self.allocator, &opaque)
        } else {
            self.images.register_bitmap(&mut self.allocator, bitmap)
        };
        self.paint_xobject_in(id, &target);
        Ok(())
    }

    /// [`draw_bitmap`](PdfWriter::draw_bitmap) with a separate 8-bit alpha channel.
    pub fn draw_bitmap_with_alpha(&mut self, rect: &Rect, bitmap: &Bitmap, alpha: Vec<u8>) -> Result<()> {
        let bitmap = bitmap.clone().with_alpha(alpha)?;
        self.draw_bitmap(rect, &bitmap)
    }

    /// JPEG data passed through unchanged. Its alpha channel is dropped
    /// like a bitmap's where the version forbids transparency.
    pub fn draw_jpeg(&mut self, rect: &Rect, jpeg: &JpegImage) -> Result<()> {
        let target = self.rect_to_pdf(rect)?;
        self.prepare(false, false)?;
        let id = if jpeg.alpha.is_some() && !self.config.version.allows_transparency() {
            log::warn!("JPEG alpha channel dropped for {:?}", self.config.version);
            self.warnings.insert(Warning::TransparencyOmitted);
            let opaque = JpegImage {
                alpha: None,
                ..jpeg.clone()
            };
            self.images.register_jpeg(&mut self.allocator, &opaque)
        } else {
            self.images.register_jpeg(&mut self.allocator, jpeg)
        };
        self.paint_xobject_in(id, &target);
        Ok(())
    }

    /// Page of another PDF scaled into `rect`, embedded or referenced
    /// according to the configured policy. A page without its source file
    /// is always embedded.
    pub fn draw_foreign_page(&mut self, rect: &Rect, page: ForeignPage) -> Result<()> {
        let target = self.rect_to_pdf(rect)?;
        let media = page.media_box;
        if !(media.width > 0.0 && media.height > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "foreign media box {} x {}",
                media.width, media.height
            )));
        }
        let mut policy = self.config.foreign_pdf;
        if policy == ForeignPdfPolicy::Reference && page.source_pdf.is_none() {
            log::warn!("no source PDF for {}; embedding the page instead of referencing it", page.source_name);
            policy = ForeignPdfPolicy::Embed;
        }
        if policy == ForeignPdfPolicy::Reference {
            let (w, h) = page.fallback_pixels(self.config.reference_dpi);
            match &page.fallback {
                Some(fallback) if fallback.width < w || fallback.height < h => log::debug!(
                    "fallback of {}x{} pixels below {} dpi ({}x{})",
                    fallback.width,
                    fallback.height,
                    self.config.reference_dpi,
                    w,
                    h
                ),
                None => log::debug!("reference XObject for {} without fallback", page.source_name),
                _ => {},
            }
        }
        self.prepare(false, false)?;
        let id = self
            .images
            .register_foreign_page(&mut self.allocator, page, policy);
        let name = self.resources.register(ResourceKind::XObject, id);
        let (sx, sy) = (target.width / media.width, target.height / media.height);
        self.content
            .save_state()
            .transform(Matrix {
                a: sx,
                b: 0.0,
                c: 0.0,
                d: sy,
                e: target.x - media.x * sx,
                f: target.y - media.y * sy,
            })
            .paint_xobject(&name)
            .restore_state();
        Ok(())
    }

    // ---- fills ----

    /// Fill `region` with a shading.
    pub fn draw_gradient(&mut self, region: &PolyPolygon, gradient: &Gradient) -> Result<()> {
        if region.is_empty() {
            return Ok(());
        }
        let region = self.poly_polygon_to_pdf(region)?;
        let bounds = region.bounds();
        self.prepare(false, false)?;
        let id = self.gradients.register(&mut self.allocator, gradient, bounds);
        let name = self.resources.register(ResourceKind::Shading, id);
        self.content.save_state().poly_polygon(&region);
        self.content.op(ContentStreamOp::ClipEvenOdd).end_path();
        self.content.op(ContentStreamOp::PaintShading(name));
        self.content.restore_state();
        Ok(())
    }

    /// Cover `region` with hatch lines.
    pub fn draw_hatch(&mut self, region: &PolyPolygon, hatch: &Hatch) -> Result<()> {
        if region.is_empty() {
            return Ok(());
        }
        let region = self.poly_polygon_to_pdf(region)?;
        let distance = self.length_to_pdf(hatch.distance)?;
        let lines = hatch_lines(hatch, &region.bounds(), distance);
        if lines.is_empty() {
            return Ok(());
        }
        self.prepare(false, false)?;
        self.content.save_state().poly_polygon(&region);
        self.content.op(ContentStreamOp::ClipEvenOdd).end_path();
        self.content.stroke_color(hatch.color);
        for (a, b) in &lines {
            self.content.move_to(a.x, a.y).line_to(b.x, b.y);
        }
        self.content.stroke().restore_state();
        Ok(())
    }

    /// Tile `bitmap` over `rect`, each tile `tile_width` x `tile_height`
    /// logical units, starting at the rectangle's top-left corner.
    pub fn draw_wallpaper(&mut self, rect: &Rect, bitmap: &Bitmap, tile_width: f64, tile_height: f64) -> Result<()> {
        if !(tile_width > 0.0 && tile_height > 0.0) {
            return Err(Error::DegenerateGeometry(format!("tile {} x {}", tile_width, tile_height)));
        }
        let cell = Rect::new(rect.x, rect.y, tile_width, tile_height);
        self.begin_pattern(&cell)?;
        self.draw_bitmap(&cell, bitmap)?;
        let pattern = self.end_pattern()?;
        self.fill_with_pattern(&PolyPolygon::from_rect(rect), pattern)
    }

    /// Fill `region` with a pattern made by [`end_pattern`](PdfWriter::end_pattern).
    pub fn fill_with_pattern(&mut self, region: &PolyPolygon, pattern: u32) -> Result<()> {
        if region.is_empty() {
            return Ok(());
        }
        let region = self.poly_polygon_to_pdf(region)?;
        self.prepare(false, false)?;
        let name = self.resources.register(ResourceKind::Pattern, pattern);
        self.content.op(ContentStreamOp::SetFillPattern(name));
        self.content.poly_polygon(&region).fill_even_odd();
        self.state.invalidate_colors();
        Ok(())
    }

    /// Fill `region` with the fill color at `percent` transparency.
    ///
    /// Where the output version forbids transparency the region is filled
    /// opaque and a warning is recorded.
    pub fn draw_transparent(&mut self, region: &PolyPolygon, percent: u32) -> Result<()> {
        if region.is_empty() || self.state.current().fill_color.is_none() {
            return Ok(());
        }
        if !self.config.version.allows_transparency() {
            log::warn!("transparency omitted for {:?}", self.config.version);
            self.warnings.insert(Warning::TransparencyOmitted);
            return self.draw_poly_polygon(region);
        }
        let region = self.poly_polygon_to_pdf(region)?;
        self.prepare(false, true)?;
        let state_id = self
            .ext_gstates
            .register(&mut self.allocator, &ExtGStateBuilder::transparent_percent(percent));
        let name = self.resources.register(ResourceKind::ExtGState, state_id);
        self.content.save_state().set_ext_gstate(&name);
        self.content.poly_polygon(&region).fill_even_odd();
        self.content.restore_state();
        Ok(())
    }

    // ---- redirection ----

    fn begin_frame(&mut self, target: Rect, frame: GroupFrame) {
        self.end_marked_sequence();
        self.resources
            .begin_redirect(&mut self.content, &mut self.state, target);
        // the enclosing clip is in the enclosing stream's coordinates
        self.state.current_mut().clip = None;
        self.state.mark_dirty(UpdateFlags::CLIP);
        self.frames.push(frame);
    }

    fn end_frame(&mut self, expected: GroupFrame) -> Result<super::resources::RedirectedStream> {
        if self.frames.last() != Some(&expected) {
            return Err(Error::UnbalancedStream(format!(
                "end of {:?} while {:?} is open",
                expected,
                self.frames.last()
            )));
        }
        self.frames.pop();
        self.resources
            .end_redirect(&mut self.content, &mut self.state)
            .ok_or_else(|| Error::UnbalancedStream("no redirection to end".into()))
    }

    /// Start collecting drawing operations for a transparency group.
    pub fn begin_transparency_group(&mut self) -> Result<()> {
        let index = self.page_index()?;
        let page = &self.pages[index];
        let target = Rect::new(0.0, 0.0, page.pdf_width(), page.pdf_height());
        self.begin_frame(target, GroupFrame::Transparency);
        Ok(())
    }

    /// Paint the group collected since
    /// [`begin_transparency_group`](PdfWriter::begin_transparency_group),
    /// clipped to `bounds`, at `percent` transparency.
    pub fn end_transparency_group(&mut self, bounds: &Rect, percent: u32) -> Result<()> {
        let group = self.end_frame(GroupFrame::Transparency)?;
        let bbox = self.rect_to_pdf(bounds)?;
        let allowed = self.config.version.allows_transparency();

        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("XObject".into()));
        dict.insert("Subtype".into(), Object::Name("Form".into()));
        dict.insert(
            "BBox".into(),
            Object::Array(
                [bbox.x, bbox.y, bbox.x + bbox.width, bbox.y + bbox.height]
                    .into_iter()
                    .map(Object::Real)
                    .collect(),
            ),
        );
        dict.insert("Resources".into(), group.resources.to_object());
        if allowed {
            let mut group_dict = Dict::new();
            group_dict.insert("S".into(), Object::Name("Transparency".into()));
            dict.insert("Group".into(), Object::Dictionary(group_dict));
        }
        let form_id = self.allocator.create_object();
        self.pending
            .push((form_id, stream_object(dict, group.content, self.config.compress)?));

        self.prepare(false, false)?;
        let form = self.resources.register(ResourceKind::XObject, form_id);
        self.content.save_state();
        if allowed {
            let state_id = self
                .ext_gstates
                .register(&mut self.allocator, &ExtGStateBuilder::transparent_percent(percent));
            let name = self.resources.register(ResourceKind::ExtGState, state_id);
            self.content.set_ext_gstate(&name);
        } else {
            log::warn!("transparency group painted opaque for {:?}", self.config.version);
            self.warnings.insert(Warning::TransparencyDowngraded);
        }
        self.content.paint_xobject(&form).restore_state();
        Ok(())
    }

    /// Start drawing the cell of a tiling pattern covering `cell`.
    pub fn begin_pattern(&mut self, cell: &Rect) -> Result<()> {
        let target = self.rect_to_pdf(cell)?;
        if target.is_empty() {
            return Err(Error::DegenerateGeometry("empty pattern cell".into()));
        }
        self.begin_frame(target, GroupFrame::Pattern);
        Ok(())
    }

    /// Finish the pattern cell and return the pattern object id.
    pub fn end_pattern(&mut self) -> Result<u32> {
        let cell = self.end_frame(GroupFrame::Pattern)?;
        let step = (cell.target.width, cell.target.height);
        let origin = self.resources.origin();
        let matrix = Matrix::translation(cell.target.x + origin.x, cell.target.y + origin.y);
        let object = tiling_pattern_object(cell, step, matrix, self.config.compress)?;
        let id = self.allocator.create_object();
        self.pending.push((id, object));
        Ok(id)
    }

    // ---- text ----

    /// Draw positioned glyphs with the current font and text color.
    pub fn draw_glyphs(&mut self, run: &TextRun) -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        let font = self
            .state
            .current()
            .font
            .ok_or_else(|| Error::InvalidArgument("no font selected".into()))?;
        let size = self.length_to_pdf(font.size)?;

        let mut positions = Vec::with_capacity(run.glyphs.len());
        for glyph in &run.glyphs {
            positions.push(self.point_to_pdf(&Point::new(glyph.x, glyph.y))?);
        }

        let face = self
            .faces
            .get(font.face)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown font face {}", font.face)))?;
        let mut mapped = Vec::with_capacity(run.glyphs.len());
        for (glyph, pos) in run.glyphs.iter().zip(positions) {
            let chars: Vec<char> = glyph.text.chars().collect();
            let width = face.advance_1000(glyph.glyph);
            let mapping = self.glyphs.register(
                &mut self.allocator,
                font.face,
                glyph.glyph,
                face.glyph_kind(glyph.glyph),
                &chars,
                width,
            );
            mapped.push(MappedGlyph {
                font_id: mapping.font_id,
                code: mapping.code,
                x: pos.x,
                y: pos.y,
                width,
                actual_text: mapping.needs_actual_text.then(|| glyph.text.clone()),
            });
        }

        let mut registered = Vec::new();
        for glyph in &mapped {
            if !registered.contains(&glyph.font_id) {
                registered.push(glyph.font_id);
                self.resources.register(ResourceKind::Font, glyph.font_id);
            }
        }

        self.prepare(false, false)?;
        let color = self.state.current().text_color;
        self.state.sync_fill_color(&mut self.content, color);
        if font.artificial_bold {
            self.state.sync_stroke_color(&mut self.content, color);
        }
        self.state.mark_dirty(UpdateFlags::LINE_COLOR | UpdateFlags::FILL_COLOR);
        write_glyphs(&mut self.content, &mapped, &font, size);
        Ok(())
    }

    /// Underline, strike out or overline `width` logical units of text
    /// starting at baseline point `start`.
    pub fn draw_text_line(&mut self, start: &Point, width: f64, decoration: TextDecoration) -> Result<()> {
        let font = self
            .state
            .current()
            .font
            .ok_or_else(|| Error::InvalidArgument("no font selected".into()))?;
        let state = self.state.current();
        let color = match decoration {
            TextDecoration::Overline => state.overline_color,
            TextDecoration::Underline | TextDecoration::Strikeout => state.text_line_color,
        }
        .unwrap_or(state.text_color);

        let origin = self.point_to_pdf(start)?;
        let end = self.point_to_pdf(&Point::new(start.x + width, start.y))?;
        let size = self.length_to_pdf(font.size)?;
        let (x, y, w, h) = decoration.rect(origin.x, origin.y, end.x - origin.x, size);

        self.prepare(false, false)?;
        self.state.sync_fill_color(&mut self.content, color);
        self.state.mark_dirty(UpdateFlags::FILL_COLOR);
        self.content.rect(x, y, w, h).fill();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{PdfVersion, PdfWriterConfig};
    use crate::error::Warning;
    use crate::geometry::{Point, PolyPolygon, Polygon, Rect};
    use crate::writer::content::Color;
    use crate::writer::gradient::{Gradient, GradientStyle, Hatch, HatchStyle};
    use crate::writer::graphics_state::{LineInfo, PushFlags};
    use crate::writer::image::Bitmap;
    use crate::writer::PdfWriter;

    fn writer(version: PdfVersion) -> PdfWriter {
        let config = PdfWriterConfig::default().with_version(version).with_compress(false);
        let mut writer = PdfWriter::in_memory(config).unwrap();
        writer.new_page(200.0, 100.0).unwrap();
        writer
    }

    fn output(writer: PdfWriter) -> String {
        String::from_utf8_lossy(&writer.finish().unwrap()).into_owned()
    }

    #[test]
    fn test_rect_is_flipped_into_pdf_space() {
        let mut w = writer(PdfVersion::V1_7);
        w.set_line_color(None);
        w.set_fill_color(Some(Color::new(1.0, 0.0, 0.0)));
        w.draw_rect(&Rect::new(10.0, 10.0, 30.0, 20.0)).unwrap();
        let out = output(w);
        assert!(out.contains("1 0 0 rg\n10 70 30 20 re\nf\n"));
    }

    #[test]
    fn test_colors_are_not_repeated() {
        let mut w = writer(PdfVersion::V1_7);
        w.set_line_color(None);
        w.set_fill_color(Some(Color::black()));
        w.draw_rect(&Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        w.draw_rect(&Rect::new(20.0, 0.0, 10.0, 10.0)).unwrap();
        let out = output(w);
        assert_eq!(out.matches("0 0 0 rg").count(), 1);
    }

    #[test]
    fn test_clip_wraps_in_saved_state() {
        let mut w = writer(PdfVersion::V1_7);
        w.set_clip_region(&PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        w.draw_line(&Point::new(0.0, 0.0), &Point::new(100.0, 100.0)).unwrap();
        let out = output(w);
        let clip = out.find("W*\nn\n").unwrap();
        let stroke = out.find("\nS\n").unwrap();
        assert!(clip < stroke);
        assert!(out[stroke..].contains("Q"));
    }

    #[test]
    fn test_concave_clip_excludes_notch() {
        let mut w = writer(PdfVersion::V1_7);
        w.set_clip_region(&PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let ell = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 100.0),
        ]);
        w.intersect_clip_region(&PolyPolygon::new(vec![ell])).unwrap();
        w.draw_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let out = output(w);
        // square then the L shape, each narrowing the clip
        assert_eq!(out.matches("W*\nn\n").count(), 2);
        assert!(out.contains("50 50 l\n"));
    }

    #[test]
    fn test_long_dash_pattern_falls_back() {
        let mut w = writer(PdfVersion::V1_7);
        let info = LineInfo::dashed(1.0, 4, 3.0, 1.0).with_dots(3, 1.0);
        w.draw_line_with(&Point::new(0.0, 0.0), &Point::new(100.0, 0.0), &info)
            .unwrap();
        assert!(w.warnings().contains(Warning::DashPatternSimplified));
        let out = output(w);
        assert!(!out.contains(" d\n"));
    }

    #[test]
    fn test_dash_pattern_written() {
        let mut w = writer(PdfVersion::V1_7);
        let info = LineInfo::dashed(2.0, 1, 3.0, 1.0);
        w.draw_line_with(&Point::new(0.0, 0.0), &Point::new(100.0, 0.0), &info)
            .unwrap();
        let out = output(w);
        assert!(out.contains("[3 1] 0 d"));
        assert!(out.contains("2 w"));
    }

    #[test]
    fn test_transparency_downgrade() {
        let mut w = writer(PdfVersion::A1);
        w.set_fill_color(Some(Color::black()));
        let square = PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 10.0, 10.0));
        w.draw_transparent(&square, 50).unwrap();
        w.begin_transparency_group().unwrap();
        w.draw_rect(&Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        w.end_transparency_group(&Rect::new(0.0, 0.0, 10.0, 10.0), 50).unwrap();
        assert!(w.warnings().contains(Warning::TransparencyOmitted));
        assert!(w.warnings().contains(Warning::TransparencyDowngraded));
        let out = output(w);
        assert!(!out.contains("/ExtGState"));
        assert!(!out.contains("/Group"));
    }

    #[test]
    fn test_transparent_fill_uses_ext_gstate() {
        let mut w = writer(PdfVersion::V1_7);
        w.set_fill_color(Some(Color::black()));
        let square = PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 10.0, 10.0));
        w.draw_transparent(&square, 25).unwrap();
        let out = output(w);
        assert!(out.contains("/ca 0.75"));
        assert!(out.contains(" gs\n"));
    }

    #[test]
    fn test_transparency_group_form() {
        let mut w = writer(PdfVersion::V1_7);
        w.begin_transparency_group().unwrap();
        w.set_fill_color(Some(Color::white()));
        w.draw_rect(&Rect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        w.end_transparency_group(&Rect::new(0.0, 0.0, 20.0, 20.0), 40).unwrap();
        let out = output(w);
        assert!(out.contains("/Group <</S /Transparency>>"));
        assert!(out.contains("/BBox [0 80 20 100]"));
        assert!(out.contains("Do\nQ"));
    }

    #[test]
    fn test_gradient_and_hatch() {
        let mut w = writer(PdfVersion::V1_7);
        let region = PolyPolygon::new(vec![Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(25.0, 40.0),
        ])]);
        let gradient = Gradient::new(GradientStyle::Linear, Color::black(), Color::white());
        w.draw_gradient(&region, &gradient).unwrap();
        w.draw_hatch(&region, &Hatch::new(HatchStyle::Double, Color::black(), 5.0, 45.0))
            .unwrap();
        let out = output(w);
        assert!(out.contains(" sh\n"));
        assert!(out.contains("/Shading <<"));
        assert_eq!(out.matches("W* n").count(), 2);
    }

    #[test]
    fn test_wallpaper_pattern() {
        let mut w = writer(PdfVersion::V1_7);
        let tile = Bitmap::rgb(1, 1, vec![255, 0, 0]).unwrap();
        w.draw_wallpaper(&Rect::new(0.0, 0.0, 100.0, 50.0), &tile, 10.0, 10.0)
            .unwrap();
        let out = output(w);
        assert!(out.contains("/PatternType 1"));
        assert!(out.contains("/Pattern cs"));
        assert!(out.contains("/XStep 10"));
    }

    #[test]
    fn test_unbalanced_pattern_end() {
        let mut w = writer(PdfVersion::V1_7);
        w.begin_transparency_group().unwrap();
        assert!(w.end_pattern().is_err());
    }

    #[test]
    fn test_pop_restores_fill() {
        let mut w = writer(PdfVersion::V1_7);
        w.set_fill_color(Some(Color::black()));
        w.push(PushFlags::FILL_COLOR);
        w.set_fill_color(None);
        assert!(w.pop());
        assert!(!w.pop());
    }

    #[test]
    fn test_text_without_font_fails() {
        let mut w = writer(PdfVersion::V1_7);
        let run = crate::writer::TextRun::new(vec![crate::writer::PositionedGlyph::new(1, 0.0, 0.0, "a")]);
        assert!(w.draw_glyphs(&run).is_err());
    }
}
