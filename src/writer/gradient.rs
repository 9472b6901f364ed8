//! Gradients, hatches and tiling patterns.
//!
//! Gradients become axial (type 2) or radial (type 3) shadings sized to the
//! bounds of the filled area and painted with `sh` inside a clip. Equal
//! gradients over equal bounds share one shading object. Hatches are plain
//! line sets. Tiling patterns wrap a redirected cell stream.

use super::content::Color;
use super::resources::RedirectedStream;
use super::{stream_object, IndirectObject};
use crate::error::Result;
use crate::geometry::{Matrix, Point, Rect};
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use std::collections::HashMap;

/// How colors run across the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GradientStyle {
    /// Start color at one edge, end color at the opposite edge
    Linear,
    /// Start color at both edges, end color along the middle
    Axial,
    /// End color at the center, start color at the outer circle
    Radial,
}

/// A two-color gradient.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gradient {
    /// Color arrangement
    pub style: GradientStyle,
    /// Outer or first color
    pub start_color: Color,
    /// Inner or last color
    pub end_color: Color,
    /// Counter-clockwise rotation in degrees; 0 runs top to bottom
    pub angle: f64,
    /// Radial center relative to the bounds, `0.0..=1.0` on each axis
    pub center: (f64, f64),
}

impl Gradient {
    /// Gradient of `style` from `start_color` to `end_color`.
    pub fn new(style: GradientStyle, start_color: Color, end_color: Color) -> Self {
        Self {
            style,
            start_color,
            end_color,
            angle: 0.0,
            center: (0.5, 0.5),
        }
    }

    /// Rotate the gradient axis.
    pub fn with_angle(mut self, degrees: f64) -> Self {
        self.angle = degrees;
        self
    }

    /// Move the radial center.
    pub fn with_center(mut self, x: f64, y: f64) -> Self {
        self.center = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
        self
    }

    fn key(&self, bounds: &Rect) -> String {
        format!(
            "{:?}|{:?}|{:?}|{}|{:?}|{},{},{},{}",
            self.style,
            self.start_color.components(),
            self.end_color.components(),
            self.angle,
            self.center,
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height
        )
    }
}

fn reals(values: impl IntoIterator<Item = f64>) -> Object {
    Object::Array(values.into_iter().map(Object::Real).collect())
}

fn interpolation(c0: &Color, c1: &Color) -> Object {
    let mut dict = Dict::new();
    dict.insert("FunctionType".into(), Object::Integer(2));
    dict.insert("Domain".into(), reals([0.0, 1.0]));
    dict.insert("C0".into(), reals(c0.components()));
    dict.insert("C1".into(), reals(c1.components()));
    dict.insert("N".into(), Object::Integer(1));
    Object::Dictionary(dict)
}

fn stitched(c0: &Color, c1: &Color) -> Object {
    let mut dict = Dict::new();
    dict.insert("FunctionType".into(), Object::Integer(3));
    dict.insert("Domain".into(), reals([0.0, 1.0]));
    dict.insert(
        "Functions".into(),
        Object::Array(vec![interpolation(c0, c1), interpolation(c1, c0)]),
    );
    dict.insert("Bounds".into(), reals([0.5]));
    dict.insert("Encode".into(), reals([0.0, 1.0, 0.0, 1.0]));
    Object::Dictionary(dict)
}

/// Shading dictionary of `gradient` covering `bounds` (PDF space).
pub fn shading_object(gradient: &Gradient, bounds: &Rect) -> Object {
    let cx = bounds.x + bounds.width / 2.0;
    let cy = bounds.y + bounds.height / 2.0;
    let mut dict = Dict::new();
    dict.insert("ColorSpace".into(), Object::Name("DeviceRGB".into()));

    match gradient.style {
        GradientStyle::Linear | GradientStyle::Axial => {
            let (sin, cos) = gradient.angle.to_radians().sin_cos();
            let (dx, dy) = (-sin, -cos);
            let half = (dx.abs() * bounds.width + dy.abs() * bounds.height) / 2.0;
            dict.insert("ShadingType".into(), Object::Integer(2));
            dict.insert(
                "Coords".into(),
                reals([cx - dx * half, cy - dy * half, cx + dx * half, cy + dy * half]),
            );
            let function = if gradient.style == GradientStyle::Axial {
                stitched(&gradient.start_color, &gradient.end_color)
            } else {
                interpolation(&gradient.start_color, &gradient.end_color)
            };
            dict.insert("Function".into(), function);
        },
        GradientStyle::Radial => {
            let x = bounds.x + bounds.width * gradient.center.0;
            // center is measured from the top edge
            let y = bounds.y + bounds.height * (1.0 - gradient.center.1);
            let radius = [
                (bounds.x, bounds.y),
                (bounds.x + bounds.width, bounds.y),
                (bounds.x, bounds.y + bounds.height),
                (bounds.x + bounds.width, bounds.y + bounds.height),
            ]
            .iter()
            .map(|(px, py)| ((px - x).powi(2) + (py - y).powi(2)).sqrt())
            .fold(0.0, f64::max);
            dict.insert("ShadingType".into(), Object::Integer(3));
            dict.insert("Coords".into(), reals([x, y, 0.0, x, y, radius]));
            dict.insert(
                "Function".into(),
                interpolation(&gradient.end_color, &gradient.start_color),
            );
        },
    }
    dict.insert("Extend".into(), Object::Array(vec![Object::Boolean(true), Object::Boolean(true)]));
    Object::Dictionary(dict)
}

/// Deduplicating registry of gradient shadings.
#[derive(Debug, Default)]
pub struct GradientRegistry {
    by_key: HashMap<String, u32>,
    pending: Vec<(u32, Gradient, Rect)>,
}

impl GradientRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shading object id for `gradient` over `bounds`.
    pub fn register(&mut self, allocator: &mut ObjectAllocator, gradient: &Gradient, bounds: Rect) -> u32 {
        let key = gradient.key(&bounds);
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = allocator.create_object();
        self.by_key.insert(key, id);
        self.pending.push((id, *gradient, bounds));
        id
    }

    /// Number of distinct shadings.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether no gradient was registered.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Shading objects not yet written.
    pub fn take_pending(&mut self) -> Vec<IndirectObject> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(id, gradient, bounds)| (id, shading_object(&gradient, &bounds)))
            .collect()
    }
}

/// Number of line families in a hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HatchStyle {
    /// Parallel lines
    Single,
    /// Two perpendicular families
    Double,
    /// Double plus a diagonal family
    Triple,
}

/// Line hatch.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Hatch {
    /// Line families
    pub style: HatchStyle,
    /// Line color
    pub color: Color,
    /// Distance between lines in logical units
    pub distance: f64,
    /// Counter-clockwise rotation in degrees
    pub angle: f64,
}

impl Hatch {
    /// A hatch with lines `distance` apart.
    pub fn new(style: HatchStyle, color: Color, distance: f64, angle: f64) -> Self {
        Self {
            style,
            color,
            distance,
            angle,
        }
    }

    fn angles(&self) -> Vec<f64> {
        match self.style {
            HatchStyle::Single => vec![self.angle],
            HatchStyle::Double => vec![self.angle, self.angle + 90.0],
            HatchStyle::Triple => vec![self.angle, self.angle + 90.0, self.angle + 45.0],
        }
    }
}

/// Line segments of `hatch` covering `bounds` with lines `distance` apart
/// (both in PDF space). The caller clips them to the filled shape.
pub fn hatch_lines(hatch: &Hatch, bounds: &Rect, distance: f64) -> Vec<(Point, Point)> {
    if !(distance > 0.0) || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Vec::new();
    }
    let center = bounds.center();
    let reach = (bounds.width.powi(2) + bounds.height.powi(2)).sqrt() / 2.0;
    let steps = (reach / distance).ceil() as i64;

    let mut lines = Vec::new();
    for angle in hatch.angles() {
        let (sin, cos) = angle.to_radians().sin_cos();
        for k in -steps..=steps {
            let offset = k as f64 * distance;
            let px = center.x - sin * offset;
            let py = center.y + cos * offset;
            lines.push((
                Point::new(px - cos * reach, py - sin * reach),
                Point::new(px + cos * reach, py + sin * reach),
            ));
        }
    }
    lines
}

/// Colored tiling pattern painting `cell` every `step`.
///
/// `matrix` maps pattern space to the default coordinate space of the page
/// the pattern is used on.
pub fn tiling_pattern_object(
    cell: RedirectedStream,
    step: (f64, f64),
    matrix: Matrix,
    compress: bool,
) -> Result<Object> {
    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("Pattern".into()));
    dict.insert("PatternType".into(), Object::Integer(1));
    dict.insert("PaintType".into(), Object::Integer(1));
    dict.insert("TilingType".into(), Object::Integer(1));
    dict.insert(
        "BBox".into(),
        reals([0.0, 0.0, cell.target.width, cell.target.height]),
    );
    dict.insert("XStep".into(), Object::Real(step.0));
    dict.insert("YStep".into(), Object::Real(step.1));
    dict.insert("Resources".into(), cell.resources.to_object());
    if !matrix.is_identity() {
        dict.insert(
            "Matrix".into(),
            reals([matrix.a, matrix.b, matrix.c, matrix.d, matrix.e, matrix.f]),
        );
    }
    stream_object(dict, cell.content, compress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::resources::{ResourceDict, ResourceKind};
    use crate::writer::serializer::ObjectSerializer;

    fn red_blue(style: GradientStyle) -> Gradient {
        Gradient::new(style, Color::new(1.0, 0.0, 0.0), Color::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn test_linear_shading_runs_top_to_bottom() {
        let obj = shading_object(&red_blue(GradientStyle::Linear), &Rect::new(0.0, 0.0, 100.0, 50.0));
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict["ShadingType"].as_integer(), Some(2));
        let coords: Vec<f64> = dict["Coords"].as_array().unwrap().iter().filter_map(Object::as_number).collect();
        assert!((coords[0] - 50.0).abs() < 1e-9);
        assert!((coords[1] - 50.0).abs() < 1e-9);
        assert!((coords[3] - 0.0).abs() < 1e-9);
        let function = dict["Function"].as_dict().unwrap();
        assert_eq!(function["FunctionType"].as_integer(), Some(2));
    }

    #[test]
    fn test_axial_uses_stitching() {
        let obj = shading_object(&red_blue(GradientStyle::Axial), &Rect::new(0.0, 0.0, 10.0, 10.0));
        let function = obj.as_dict().unwrap()["Function"].as_dict().unwrap().clone();
        assert_eq!(function["FunctionType"].as_integer(), Some(3));
        assert_eq!(function["Functions"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_radial_shading() {
        let obj = shading_object(&red_blue(GradientStyle::Radial), &Rect::new(0.0, 0.0, 6.0, 8.0));
        let s = ObjectSerializer::new().serialize_to_string(&obj);
        assert!(s.contains("/ShadingType 3"));
        assert!(s.contains("/Coords [3 4 0 3 4 5]"));
        assert!(s.contains("/C0 [0 0 1]"));
    }

    #[test]
    fn test_registry_dedup() {
        let mut alloc = ObjectAllocator::new();
        let mut registry = GradientRegistry::new();
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let a = registry.register(&mut alloc, &red_blue(GradientStyle::Linear), bounds);
        let b = registry.register(&mut alloc, &red_blue(GradientStyle::Linear), bounds);
        let c = registry.register(&mut alloc, &red_blue(GradientStyle::Radial), bounds);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.take_pending().len(), 2);
        assert!(registry.take_pending().is_empty());
    }

    #[test]
    fn test_hatch_line_families() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let single = Hatch::new(HatchStyle::Single, Color::black(), 2.0, 0.0);
        let triple = Hatch { style: HatchStyle::Triple, ..single };
        let n = hatch_lines(&single, &bounds, 2.0).len();
        assert!(n > 0);
        assert_eq!(hatch_lines(&triple, &bounds, 2.0).len(), 3 * n);
        assert!(hatch_lines(&single, &bounds, 0.0).is_empty());

        let (a, b) = hatch_lines(&single, &bounds, 2.0)[0];
        assert!((a.y - b.y).abs() < 1e-9);
    }

    #[test]
    fn test_tiling_pattern() {
        let mut resources = ResourceDict::new();
        resources.add(ResourceKind::XObject, 8);
        let cell = RedirectedStream {
            content: b"/Im8 Do\n".to_vec(),
            resources,
            target: Rect::new(0.0, 0.0, 20.0, 10.0),
        };
        let obj = tiling_pattern_object(cell, (20.0, 10.0), Matrix::translation(5.0, 5.0), false).unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict["PatternType"].as_integer(), Some(1));
        assert_eq!(dict["XStep"].as_number(), Some(20.0));
        assert!(dict.contains_key("Matrix"));
        assert!(dict["Resources"].as_dict().unwrap().contains_key("XObject"));
    }
}
