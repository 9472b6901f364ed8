//! Graphics state tracking.
//!
//! The writer keeps its own copy of the graphics state and only emits the
//! operators needed to bring the PDF state in line with it before each
//! drawing operation. Clipping cannot be widened in PDF, so a clip change
//! closes the saved state with `Q`, reopens it with `q` and sets the new
//! clip; colors have to be re-emitted afterwards.
//!
//! This module also carries [`ExtGStateBuilder`] for the `/ExtGState`
//! resources used by transparency.

use super::content::{Color, ContentStreamBuilder, ContentStreamOp, LineCap, LineJoin};
use super::fonts::Font;
use crate::geometry::{MapMode, PolyPolygon};
use crate::object::{Dict, Object};
use bitflags::bitflags;

/// Dash arrays longer than this are replaced by a solid line.
pub const MAX_DASH_ARRAY_LEN: usize = 10;

bitflags! {
    /// Which parts of the state [`GraphicsStateStack::pop`] restores.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PushFlags: u16 {
        /// Stroke color
        const LINE_COLOR = 1 << 0;
        /// Fill color
        const FILL_COLOR = 1 << 1;
        /// Current font
        const FONT = 1 << 2;
        /// Text color
        const TEXT_COLOR = 1 << 3;
        /// Logical coordinate system
        const MAP_MODE = 1 << 4;
        /// Clip region
        const CLIP_REGION = 1 << 5;
        /// Underline and strikeout color
        const TEXT_LINE_COLOR = 1 << 6;
        /// Overline color
        const OVERLINE_COLOR = 1 << 7;
        /// Everything
        const ALL = Self::LINE_COLOR.bits()
            | Self::FILL_COLOR.bits()
            | Self::FONT.bits()
            | Self::TEXT_COLOR.bits()
            | Self::MAP_MODE.bits()
            | Self::CLIP_REGION.bits()
            | Self::TEXT_LINE_COLOR.bits()
            | Self::OVERLINE_COLOR.bits();
    }
}

bitflags! {
    /// Parts of the emitted PDF state that no longer match the writer state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UpdateFlags: u8 {
        /// Stroke color must be re-emitted
        const LINE_COLOR = 1 << 0;
        /// Fill color must be re-emitted
        const FILL_COLOR = 1 << 1;
        /// Clip must be re-emitted
        const CLIP = 1 << 2;
    }
}

/// Clip in PDF user space: the area inside every layer.
///
/// Convex regions are intersected exactly into the last layer; anything
/// else becomes a layer of its own and is written as a separate `W* n`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipRegion {
    /// Regions in the order they were applied
    pub layers: Vec<PolyPolygon>,
}

impl ClipRegion {
    /// Clip to a single region.
    pub fn new(region: PolyPolygon) -> Self {
        Self { layers: vec![region] }
    }

    /// Narrow the clip by `region`.
    pub fn intersect(&self, region: PolyPolygon) -> Self {
        let mut layers = self.layers.clone();
        match layers.last().and_then(|last| last.intersect(&region)) {
            Some(cut) => {
                if let Some(last) = layers.last_mut() {
                    *last = cut;
                }
            },
            None => layers.push(region),
        }
        Self { layers }
    }

    /// Offset every layer.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            layers: self.layers.iter().map(|l| l.translate(dx, dy)).collect(),
        }
    }
}

/// One entry of the graphics state stack.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    /// Stroke color, `None` for no stroking
    pub line_color: Option<Color>,
    /// Fill color, `None` for no filling
    pub fill_color: Option<Color>,
    /// Text color
    pub text_color: Color,
    /// Underline/strikeout color, `None` follows the text color
    pub text_line_color: Option<Color>,
    /// Overline color, `None` follows the text color
    pub overline_color: Option<Color>,
    /// Selected font
    pub font: Option<Font>,
    /// Logical coordinate system
    pub map_mode: MapMode,
    /// Clip in PDF user space, `None` for no clip
    pub clip: Option<ClipRegion>,
    /// Flags this entry was pushed with
    pub push_flags: PushFlags,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            line_color: Some(Color::black()),
            fill_color: Some(Color::white()),
            text_color: Color::black(),
            text_line_color: None,
            overline_color: None,
            font: None,
            map_mode: MapMode::default(),
            clip: None,
            push_flags: PushFlags::ALL,
        }
    }
}

/// What has actually been written to the current stream.
#[derive(Debug, Clone, Default)]
struct EmittedState {
    line_color: Option<Color>,
    fill_color: Option<Color>,
    clip: Option<ClipRegion>,
    /// A `q` for the clip is open
    clip_open: bool,
}

/// LIFO stack of graphics states plus the emitted-state shadow.
#[derive(Debug, Clone)]
pub struct GraphicsStateStack {
    /// Never empty; the last entry is the current state
    states: Vec<GraphicsState>,
    emitted: EmittedState,
    dirty: UpdateFlags,
}

impl Default for GraphicsStateStack {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsStateStack {
    /// Stack holding one default state.
    pub fn new() -> Self {
        Self {
            states: vec![GraphicsState::default()],
            emitted: EmittedState::default(),
            dirty: UpdateFlags::all(),
        }
    }

    /// The current state.
    pub fn current(&self) -> &GraphicsState {
        // the stack always holds the base state
        &self.states[self.states.len() - 1]
    }

    /// The current state, for modification.
    ///
    /// Callers that change colors or the clip must also call [`mark_dirty`].
    ///
    /// [`mark_dirty`]: GraphicsStateStack::mark_dirty
    pub fn current_mut(&mut self) -> &mut GraphicsState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// Number of pushed states above the base state.
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }

    /// Flag parts of the state for re-emission.
    pub fn mark_dirty(&mut self, flags: UpdateFlags) {
        self.dirty |= flags;
    }

    /// Pending updates.
    pub fn dirty(&self) -> UpdateFlags {
        self.dirty
    }

    /// Save the current state; `flags` selects what [`pop`] restores.
    ///
    /// [`pop`]: GraphicsStateStack::pop
    pub fn push(&mut self, flags: PushFlags) {
        let mut saved = self.current().clone();
        saved.push_flags = flags;
        self.states.push(saved);
    }

    /// Restore the saved state. Returns `false` when nothing was pushed.
    pub fn pop(&mut self) -> bool {
        if self.states.len() <= 1 {
            log::warn!("graphics state pop without matching push");
            return false;
        }
        let Some(saved) = self.states.pop() else {
            return false;
        };
        let flags = saved.push_flags;
        let current = self.current_mut();
        let mut dirty = UpdateFlags::empty();

        if flags.contains(PushFlags::LINE_COLOR) {
            current.line_color = saved.line_color;
            dirty |= UpdateFlags::LINE_COLOR;
        }
        if flags.contains(PushFlags::FILL_COLOR) {
            current.fill_color = saved.fill_color;
            dirty |= UpdateFlags::FILL_COLOR;
        }
        if flags.contains(PushFlags::FONT) {
            current.font = saved.font;
        }
        if flags.contains(PushFlags::TEXT_COLOR) {
            current.text_color = saved.text_color;
        }
        if flags.contains(PushFlags::MAP_MODE) {
            current.map_mode = saved.map_mode;
        }
        if flags.contains(PushFlags::CLIP_REGION) {
            current.clip = saved.clip;
            dirty |= UpdateFlags::CLIP;
        }
        if flags.contains(PushFlags::TEXT_LINE_COLOR) {
            current.text_line_color = saved.text_line_color;
        }
        if flags.contains(PushFlags::OVERLINE_COLOR) {
            current.overline_color = saved.overline_color;
        }
        self.dirty |= dirty;
        true
    }

    /// Forget what was emitted; used when a new stream starts.
    pub fn reset_emitted(&mut self) {
        self.emitted = EmittedState::default();
        self.dirty = UpdateFlags::all();
    }

    /// Emit the operators that make the stream state match the current state.
    ///
    /// `stroke` and `fill` select which colors the next operation uses.
    pub fn sync(&mut self, out: &mut ContentStreamBuilder, stroke: bool, fill: bool) {
        if self.dirty.contains(UpdateFlags::CLIP) {
            let wanted = self.current().clip.clone();
            if wanted != self.emitted.clip || (wanted.is_some() != self.emitted.clip_open) {
                if self.emitted.clip_open {
                    out.restore_state();
                    self.emitted.clip_open = false;
                    // Q resets colors to the stream defaults
                    self.emitted.line_color = None;
                    self.emitted.fill_color = None;
                }
                if let Some(clip) = &wanted {
                    out.save_state();
                    for layer in &clip.layers {
                        if layer.is_empty() {
                            out.rect(0.0, 0.0, 0.0, 0.0);
                        } else {
                            out.poly_polygon(layer);
                        }
                        out.op(ContentStreamOp::ClipEvenOdd).end_path();
                    }
                    self.emitted.clip_open = true;
                }
                self.emitted.clip = wanted;
            }
            self.dirty.remove(UpdateFlags::CLIP);
        }

        if stroke {
            if let Some(color) = self.current().line_color {
                if self.emitted.line_color != Some(color) {
                    out.stroke_color(color);
                    self.emitted.line_color = Some(color);
                }
            }
            self.dirty.remove(UpdateFlags::LINE_COLOR);
        }
        if fill {
            if let Some(color) = self.current().fill_color {
                if self.emitted.fill_color != Some(color) {
                    out.fill_color(color);
                    self.emitted.fill_color = Some(color);
                }
            }
            self.dirty.remove(UpdateFlags::FILL_COLOR);
        }
    }

    /// Emit an explicit fill color (text, hatches) and remember it.
    pub fn sync_fill_color(&mut self, out: &mut ContentStreamBuilder, color: Color) {
        if self.emitted.fill_color != Some(color) {
            out.fill_color(color);
            self.emitted.fill_color = Some(color);
        }
    }

    /// Emit an explicit stroke color and remember it.
    pub fn sync_stroke_color(&mut self, out: &mut ContentStreamBuilder, color: Color) {
        if self.emitted.line_color != Some(color) {
            out.stroke_color(color);
            self.emitted.line_color = Some(color);
        }
    }

    /// Forget the emitted colors after operators that may have changed them.
    pub fn invalidate_colors(&mut self) {
        self.emitted.line_color = None;
        self.emitted.fill_color = None;
        self.dirty |= UpdateFlags::LINE_COLOR | UpdateFlags::FILL_COLOR;
    }

    /// Close an open clip before the stream ends.
    pub fn finish_stream(&mut self, out: &mut ContentStreamBuilder) {
        if self.emitted.clip_open {
            out.restore_state();
        }
        self.reset_emitted();
    }
}

/// Line style for [`LineInfo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineStyle {
    /// Continuous line
    #[default]
    Solid,
    /// Dashes and dots
    Dash,
}

/// Stroke parameters for lines and polylines, in logical units.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineInfo {
    /// Line width, 0 for hairline
    pub width: f64,
    /// Solid or dashed
    pub style: LineStyle,
    /// Number of dashes per period
    pub dash_count: u16,
    /// Dash length
    pub dash_len: f64,
    /// Number of dots per period
    pub dot_count: u16,
    /// Dot length
    pub dot_len: f64,
    /// Gap between dashes and dots
    pub distance: f64,
    /// Line join
    pub join: LineJoin,
    /// Line cap
    pub cap: LineCap,
}

impl Default for LineInfo {
    fn default() -> Self {
        Self {
            width: 0.0,
            style: LineStyle::Solid,
            dash_count: 0,
            dash_len: 0.0,
            dot_count: 0,
            dot_len: 0.0,
            distance: 0.0,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
        }
    }
}

impl LineInfo {
    /// A solid line of the given width.
    pub fn solid(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// A dashed line.
    pub fn dashed(width: f64, dash_count: u16, dash_len: f64, distance: f64) -> Self {
        Self {
            width,
            style: LineStyle::Dash,
            dash_count,
            dash_len,
            distance,
            ..Self::default()
        }
    }

    /// Add dots to a dashed line.
    pub fn with_dots(mut self, dot_count: u16, dot_len: f64) -> Self {
        self.style = LineStyle::Dash;
        self.dot_count = dot_count;
        self.dot_len = dot_len;
        self
    }

    /// Set the join style.
    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// Set the cap style.
    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    /// Dash array in logical units; empty for a solid line.
    pub fn dash_array(&self) -> Vec<f64> {
        if self.style == LineStyle::Solid {
            return Vec::new();
        }
        let mut dashes = Vec::new();
        for _ in 0..self.dash_count {
            dashes.push(self.dash_len);
            dashes.push(self.distance);
        }
        for _ in 0..self.dot_count {
            dashes.push(self.dot_len);
            dashes.push(self.distance);
        }
        dashes
    }

    /// Whether the dash array exceeds what readers accept.
    pub fn dash_too_long(&self) -> bool {
        self.dash_array().len() > MAX_DASH_ARRAY_LEN
    }
}

/// Blend modes for transparency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Normal blend (default)
    #[default]
    Normal,
    /// Multiply
    Multiply,
    /// Screen
    Screen,
}

impl BlendMode {
    /// Get the PDF name for this blend mode.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
        }
    }
}

/// Builder for Extended Graphics State dictionaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtGStateBuilder {
    /// Fill alpha (ca) - 0.0 to 1.0
    fill_alpha: Option<f64>,
    /// Stroke alpha (CA) - 0.0 to 1.0
    stroke_alpha: Option<f64>,
    /// Blend mode (BM)
    blend_mode: Option<BlendMode>,
    /// Luminosity soft mask from a transparency group object
    soft_mask_group: Option<u32>,
}

impl ExtGStateBuilder {
    /// Create a new ExtGState builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fill alpha (opacity for fill operations).
    pub fn fill_alpha(mut self, alpha: f64) -> Self {
        self.fill_alpha = Some(alpha.clamp(0.0, 1.0));
        self
    }

    /// Set stroke alpha (opacity for stroke operations).
    pub fn stroke_alpha(mut self, alpha: f64) -> Self {
        self.stroke_alpha = Some(alpha.clamp(0.0, 1.0));
        self
    }

    /// Set both fill and stroke alpha to the same value.
    pub fn alpha(self, alpha: f64) -> Self {
        self.fill_alpha(alpha).stroke_alpha(alpha)
    }

    /// Alpha for a transparency percentage (0 opaque, 100 invisible).
    pub fn transparent_percent(percent: u32) -> Self {
        Self::new().alpha(1.0 - f64::from(percent.min(100)) / 100.0)
    }

    /// Set blend mode.
    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = Some(mode);
        self
    }

    /// Use the luminosity of a transparency group object as soft mask.
    pub fn luminosity_mask(mut self, group_id: u32) -> Self {
        self.soft_mask_group = Some(group_id);
        self
    }

    /// Key used to share identical states.
    pub fn dedup_key(&self) -> String {
        format!(
            "{:?}/{:?}/{:?}/{:?}",
            self.fill_alpha.map(f64::to_bits),
            self.stroke_alpha.map(f64::to_bits),
            self.blend_mode,
            self.soft_mask_group
        )
    }

    /// Build the ExtGState dictionary as a PDF Object.
    pub fn build(&self) -> Object {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("ExtGState".into()));
        if let Some(alpha) = self.fill_alpha {
            dict.insert("ca".into(), Object::Real(alpha));
        }
        if let Some(alpha) = self.stroke_alpha {
            dict.insert("CA".into(), Object::Real(alpha));
        }
        if let Some(mode) = self.blend_mode {
            dict.insert("BM".into(), Object::Name(mode.as_pdf_name().into()));
        }
        if let Some(group) = self.soft_mask_group {
            let mut smask = Dict::new();
            smask.insert("Type".into(), Object::Name("Mask".into()));
            smask.insert("S".into(), Object::Name("Luminosity".into()));
            smask.insert("G".into(), Object::Reference(group.into()));
            dict.insert("SMask".into(), Object::Dictionary(smask));
        }
        Object::Dictionary(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn emitted(stack: &mut GraphicsStateStack, stroke: bool, fill: bool) -> String {
        let mut out = ContentStreamBuilder::new();
        stack.sync(&mut out, stroke, fill);
        String::from_utf8(out.finish()).unwrap()
    }

    #[test]
    fn test_colors_emitted_once() {
        let mut stack = GraphicsStateStack::new();
        stack.current_mut().fill_color = Some(Color::new(1.0, 0.0, 0.0));
        assert_eq!(emitted(&mut stack, false, true), "1 0 0 rg\n");
        assert_eq!(emitted(&mut stack, false, true), "");
        assert_eq!(emitted(&mut stack, true, false), "0 0 0 RG\n");
    }

    #[test]
    fn test_pop_restores_only_flagged_fields() {
        let mut stack = GraphicsStateStack::new();
        stack.push(PushFlags::LINE_COLOR);
        stack.current_mut().line_color = Some(Color::new(0.0, 0.0, 1.0));
        stack.current_mut().fill_color = Some(Color::new(0.0, 1.0, 0.0));
        assert!(stack.pop());
        assert_eq!(stack.current().line_color, Some(Color::black()));
        assert_eq!(stack.current().fill_color, Some(Color::new(0.0, 1.0, 0.0)));
        assert!(!stack.pop());
    }

    #[test]
    fn test_clip_change_reopens_state_and_forces_colors() {
        let mut stack = GraphicsStateStack::new();
        emitted(&mut stack, true, true);

        stack.current_mut().clip = Some(ClipRegion::new(PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 10.0, 10.0))));
        stack.mark_dirty(UpdateFlags::CLIP);
        let first = emitted(&mut stack, false, true);
        assert!(first.starts_with("q\n0 0 m\n"));
        assert!(first.contains("W*\nn\n"));
        assert!(!first.contains("rg"));

        stack.current_mut().clip = Some(ClipRegion::new(PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 5.0, 5.0))));
        stack.mark_dirty(UpdateFlags::CLIP);
        let second = emitted(&mut stack, false, true);
        assert!(second.starts_with("Q\nq\n"));
        assert!(second.ends_with("1 1 1 rg\n"));

        stack.current_mut().clip = None;
        stack.mark_dirty(UpdateFlags::CLIP);
        assert_eq!(emitted(&mut stack, false, false), "Q\n");
    }

    #[test]
    fn test_concave_clip_kept_as_own_layer() {
        use crate::geometry::{Point, Polygon};
        let square = PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 100.0, 100.0));
        let ell = PolyPolygon::new(vec![Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 100.0),
        ])]);
        let clip = ClipRegion::new(square.clone()).intersect(ell.clone());
        assert_eq!(clip.layers, vec![square, ell]);

        // a convex cut folds into the last layer
        let narrowed = clip.intersect(PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(narrowed.layers.len(), 2);
        assert!(!narrowed.layers[1].bounds().contains_point(&Point::new(75.0, 75.0)));

        let mut stack = GraphicsStateStack::new();
        stack.current_mut().clip = Some(clip);
        stack.mark_dirty(UpdateFlags::CLIP);
        let out = emitted(&mut stack, false, false);
        assert_eq!(out.matches("W*\nn\n").count(), 2);
        assert!(out.contains("50 50 l\n"));
    }

    #[test]
    fn test_dash_array() {
        let line = LineInfo::dashed(1.0, 2, 4.0, 1.0).with_dots(1, 0.5);
        assert_eq!(line.dash_array(), vec![4.0, 1.0, 4.0, 1.0, 0.5, 1.0]);
        assert!(!line.dash_too_long());
        assert!(LineInfo::dashed(1.0, 6, 4.0, 1.0).dash_too_long());
        assert!(LineInfo::solid(2.0).dash_array().is_empty());
    }

    #[test]
    fn test_ext_gstate_builder() {
        let gs = ExtGStateBuilder::transparent_percent(25).build();
        let dict = gs.as_dict().unwrap();
        assert_eq!(dict["ca"].as_number(), Some(0.75));
        assert_eq!(dict["CA"].as_number(), Some(0.75));
        assert_eq!(dict["Type"].as_name(), Some("ExtGState"));

        let a = ExtGStateBuilder::new().alpha(0.5).dedup_key();
        let b = ExtGStateBuilder::new().fill_alpha(0.5).stroke_alpha(0.5).dedup_key();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ext_gstate_soft_mask() {
        let gs = ExtGStateBuilder::new().luminosity_mask(12).blend_mode(BlendMode::Multiply).build();
        let dict = gs.as_dict().unwrap();
        assert_eq!(dict["BM"].as_name(), Some("Multiply"));
        let smask = dict["SMask"].as_dict().unwrap();
        assert_eq!(smask["S"].as_name(), Some("Luminosity"));
        assert_eq!(smask["G"].as_reference().map(|r| r.id), Some(12));
    }
}
