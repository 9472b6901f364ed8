//! Pages: geometry, logical to PDF coordinate mapping and per-page
//! bookkeeping (content streams, annotations, marked-content parents).

use crate::error::{Error, Result};
use crate::geometry::{MapMode, Path, PathSegment, Point, PolyPolygon, Polygon, Rect};
use crate::object::{Dict, Object};

/// Largest page dimension PDF allows in default user space units.
pub const MAX_PAGE_DIMENSION: f64 = 14400.0;

/// Page orientation as requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Keep the page as given
    #[default]
    Portrait,
    /// Show the page rotated by 90 degrees
    Landscape,
}

/// Page transition shown in presentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Dissolve
    Dissolve,
    /// Horizontal split from the center
    SplitHorizontal,
    /// Wipe from left to right
    Wipe,
    /// Fade through the background
    Fade,
}

impl Transition {
    fn pdf_name(self) -> &'static str {
        match self {
            Transition::Dissolve => "Dissolve",
            Transition::SplitHorizontal => "Split",
            Transition::Wipe => "Wipe",
            Transition::Fade => "Fade",
        }
    }
}

/// One page of the document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page object id
    pub id: u32,
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
    /// `/UserUnit` keeping PDF dimensions within [`MAX_PAGE_DIMENSION`]
    pub user_unit: f64,
    /// Orientation
    pub orientation: Orientation,
    /// Content stream objects, in painting order
    pub content_ids: Vec<u32>,
    /// Annotation objects in `/Annots` order
    pub annotations: Vec<u32>,
    /// Structure element object per MCID (index = MCID)
    pub mcid_parents: Vec<u32>,
    /// Display duration in seconds for presentations
    pub duration: Option<f64>,
    /// Transition effect and its duration in seconds
    pub transition: Option<(Transition, f64)>,
    /// Page holds widgets, so `/Tabs` is written
    pub has_widgets: bool,
}

impl Page {
    /// Create a page of `width` x `height` points.
    pub fn new(id: u32, width: f64, height: f64) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(Error::DegenerateGeometry(format!("page size {} x {}", width, height)));
        }
        let largest = width.max(height);
        let user_unit = if largest > MAX_PAGE_DIMENSION {
            (largest / MAX_PAGE_DIMENSION).ceil()
        } else {
            1.0
        };
        Ok(Self {
            id,
            width,
            height,
            user_unit,
            orientation: Orientation::Portrait,
            content_ids: Vec::new(),
            annotations: Vec::new(),
            mcid_parents: Vec::new(),
            duration: None,
            transition: None,
            has_widgets: false,
        })
    }

    /// Width in PDF units (points divided by the user unit).
    pub fn pdf_width(&self) -> f64 {
        self.width / self.user_unit
    }

    /// Height in PDF units.
    pub fn pdf_height(&self) -> f64 {
        self.height / self.user_unit
    }

    /// Map a logical point to PDF user space (bottom-left origin, y up).
    pub fn point_to_pdf(&self, map: &MapMode, p: &Point) -> Point {
        let pt = map.to_points(p);
        Point::new(pt.x / self.user_unit, (self.height - pt.y) / self.user_unit)
    }

    /// Map a logical length to PDF units.
    pub fn length_to_pdf(&self, map: &MapMode, len: f64) -> f64 {
        map.length_to_points(len) / self.user_unit
    }

    /// Map a logical rectangle; the result has `y` at its lower edge.
    pub fn rect_to_pdf(&self, map: &MapMode, r: &Rect) -> Rect {
        let a = self.point_to_pdf(map, &Point::new(r.left(), r.top()));
        let b = self.point_to_pdf(map, &Point::new(r.right(), r.bottom()));
        Rect::from_points(a.x, a.y, b.x, b.y)
    }

    /// Map a polygon.
    pub fn polygon_to_pdf(&self, map: &MapMode, poly: &Polygon) -> Polygon {
        Polygon::new(poly.points.iter().map(|p| self.point_to_pdf(map, p)).collect())
    }

    /// Map a polygon set.
    pub fn poly_polygon_to_pdf(&self, map: &MapMode, poly: &PolyPolygon) -> PolyPolygon {
        PolyPolygon::new(poly.polygons.iter().map(|p| self.polygon_to_pdf(map, p)).collect())
    }

    /// Map a bezier path.
    pub fn path_to_pdf(&self, map: &MapMode, path: &Path) -> Path {
        let p = |pt: &Point| self.point_to_pdf(map, pt);
        Path {
            segments: path
                .segments
                .iter()
                .map(|seg| match seg {
                    PathSegment::MoveTo(pt) => PathSegment::MoveTo(p(pt)),
                    PathSegment::LineTo(pt) => PathSegment::LineTo(p(pt)),
                    PathSegment::CurveTo(c1, c2, end) => PathSegment::CurveTo(p(c1), p(c2), p(end)),
                    PathSegment::Close => PathSegment::Close,
                })
                .collect(),
        }
    }

    /// `/MediaBox` array.
    pub fn media_box(&self) -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.pdf_width()),
            Object::Real(self.pdf_height()),
        ])
    }

    /// The page dictionary.
    ///
    /// `struct_parents` is the page's key in the parent tree when the page
    /// carries marked content.
    pub fn to_object(&self, parent: u32, resources: u32, struct_parents: Option<usize>) -> Object {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("Page".into()));
        dict.insert("Parent".into(), Object::Reference(parent.into()));
        dict.insert("MediaBox".into(), self.media_box());
        if self.user_unit != 1.0 {
            dict.insert("UserUnit".into(), Object::Real(self.user_unit));
        }
        if self.orientation == Orientation::Landscape && self.width < self.height {
            dict.insert("Rotate".into(), Object::Integer(90));
        }
        dict.insert("Resources".into(), Object::Reference(resources.into()));
        match self.content_ids.as_slice() {
            [] => {},
            [single] => {
                dict.insert("Contents".into(), Object::Reference((*single).into()));
            },
            many => {
                dict.insert(
                    "Contents".into(),
                    Object::Array(many.iter().map(|&id| Object::Reference(id.into())).collect()),
                );
            },
        }
        if !self.annotations.is_empty() {
            dict.insert(
                "Annots".into(),
                Object::Array(self.annotations.iter().map(|&id| Object::Reference(id.into())).collect()),
            );
        }
        if self.has_widgets {
            dict.insert("Tabs".into(), Object::Name("S".into()));
        }
        if let Some(key) = struct_parents {
            dict.insert("StructParents".into(), Object::Integer(key as i64));
        }
        if let Some(duration) = self.duration {
            dict.insert("Dur".into(), Object::Real(duration));
        }
        if let Some((transition, seconds)) = self.transition {
            let mut trans = Dict::new();
            trans.insert("Type".into(), Object::Name("Trans".into()));
            trans.insert("S".into(), Object::Name(transition.pdf_name().into()));
            trans.insert("D".into(), Object::Real(seconds));
            if transition == Transition::SplitHorizontal {
                trans.insert("Dm".into(), Object::Name("H".into()));
                trans.insert("M".into(), Object::Name("O".into()));
            }
            dict.insert("Trans".into(), Object::Dictionary(trans));
        }
        Object::Dictionary(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MapUnit;
    use crate::writer::serializer::ObjectSerializer;

    #[test]
    fn test_a4_media_box() {
        let page = Page::new(3, 595.0, 842.0).unwrap();
        assert_eq!(page.user_unit, 1.0);
        let s = ObjectSerializer::new().serialize_to_string(&page.media_box());
        assert_eq!(s, "[0 0 595 842]");
    }

    #[test]
    fn test_large_page_uses_user_unit() {
        let page = Page::new(3, 30000.0, 1000.0).unwrap();
        assert_eq!(page.user_unit, 3.0);
        assert!(page.pdf_width() <= MAX_PAGE_DIMENSION);
        let obj = page.to_object(1, 2, None);
        assert_eq!(obj.as_dict().unwrap()["UserUnit"], Object::Real(3.0));
    }

    #[test]
    fn test_degenerate_page() {
        assert!(matches!(Page::new(1, 0.0, 10.0), Err(Error::DegenerateGeometry(_))));
        assert!(Page::new(1, f64::NAN, 10.0).is_err());
    }

    #[test]
    fn test_point_flip() {
        let page = Page::new(1, 595.0, 842.0).unwrap();
        let p = page.point_to_pdf(&MapMode::default(), &Point::new(10.0, 42.0));
        assert_eq!(p, Point::new(10.0, 800.0));

        let mm = MapMode::new(MapUnit::Mm100);
        let r = page.rect_to_pdf(&mm, &Rect::new(0.0, 0.0, 2540.0, 2540.0));
        assert!((r.y - 770.0).abs() < 1e-9);
        assert!((r.height - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_page_dictionary() {
        let mut page = Page::new(5, 612.0, 792.0).unwrap();
        page.content_ids = vec![6];
        page.annotations = vec![9, 10];
        page.has_widgets = true;
        let s = ObjectSerializer::new().serialize_to_string(&page.to_object(1, 2, Some(0)));
        assert_eq!(
            s,
            "<</Type /Page /Parent 1 0 R /MediaBox [0 0 612 792] /Resources 2 0 R /Contents 6 0 R \
             /Annots [9 0 R 10 0 R] /Tabs /S /StructParents 0>>"
        );
    }
}
