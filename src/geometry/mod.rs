//! Geometric primitives in the caller's logical coordinate system.
//!
//! Logical space has its origin at the top-left of the page and y growing
//! downwards. Units are described by a [`MapMode`]; the page converts them
//! into PDF default user space when operators are written.

/// A 2D point in logical space.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_scribe::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset this point.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Horizontal extent
    pub width: f64,
    /// Vertical extent
    pub height: f64,
}

impl Size {
    /// Create a new size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A rectangle in logical space (top-left corner plus extent).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: f64,
    /// Y coordinate of top-left corner
    pub y: f64,
    /// Width of rectangle
    pub width: f64,
    /// Height of rectangle
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_scribe::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.right(), 100.0);
    /// assert_eq!(rect.bottom(), 50.0);
    /// ```
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corner points in any order.
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Left edge.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Top edge.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Top-left corner.
    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Offset this rectangle.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Check if a point lies within this rectangle.
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Intersection of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > left && bottom > top {
            Some(Rect::from_points(left, top, right, bottom))
        } else {
            None
        }
    }

    /// Smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_points(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// The four corners as a closed polygon.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.left(), self.top()),
            Point::new(self.right(), self.top()),
            Point::new(self.right(), self.bottom()),
            Point::new(self.left(), self.bottom()),
        ])
    }
}

/// A simple polygon; the last point connects back to the first when filled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    /// Vertices in drawing order
    pub points: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its vertices.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding rectangle.
    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let first = match iter.next() {
            Some(p) => *p,
            None => return Rect::default(),
        };
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Rect::from_points(x0, y0, x1, y1)
    }

    /// Offset every vertex.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.points.iter().map(|p| p.translate(dx, dy)).collect())
    }

    /// Twice the signed area; positive for counter-clockwise vertices in a
    /// y-up system.
    fn signed_area2(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let (a, b) = (self.points[i], self.points[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum()
    }

    /// Whether all turns go the same way.
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0.0_f64;
        for i in 0..n {
            let (a, b, c) = (self.points[i], self.points[(i + 1) % n], self.points[(i + 2) % n]);
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() < 1e-12 {
                continue;
            }
            if sign != 0.0 && cross.signum() != sign {
                return false;
            }
            sign = cross.signum();
        }
        true
    }

    /// Part of this polygon inside the convex polygon `clip`
    /// (Sutherland-Hodgman).
    pub fn clip_convex(&self, clip: &Polygon) -> Polygon {
        let orientation = clip.signed_area2().signum();
        let n = clip.points.len();
        let mut output = self.points.clone();
        for i in 0..n {
            if output.is_empty() {
                break;
            }
            let (a, b) = (clip.points[i], clip.points[(i + 1) % n]);
            let side = |p: &Point| ((b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)) * orientation;
            let crossing = |p: &Point, q: &Point| {
                let (sp, sq) = (side(p), side(q));
                let t = sp / (sp - sq);
                Point::new(p.x + (q.x - p.x) * t, p.y + (q.y - p.y) * t)
            };
            let input = std::mem::take(&mut output);
            for (j, current) in input.iter().enumerate() {
                let previous = &input[(j + input.len() - 1) % input.len()];
                let (cur_in, prev_in) = (side(current) >= 0.0, side(previous) >= 0.0);
                if cur_in {
                    if !prev_in {
                        output.push(crossing(previous, current));
                    }
                    output.push(*current);
                } else if prev_in {
                    output.push(crossing(previous, current));
                }
            }
        }
        Polygon::new(output)
    }
}

/// A set of polygons filled together with the even-odd rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolyPolygon {
    /// Sub-polygons
    pub polygons: Vec<Polygon>,
}

impl PolyPolygon {
    /// Create from sub-polygons.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    /// Single rectangle region.
    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(vec![rect.to_polygon()])
    }

    /// Whether no sub-polygon has any vertex.
    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.is_empty())
    }

    /// Bounding rectangle over all sub-polygons.
    pub fn bounds(&self) -> Rect {
        let mut bounds: Option<Rect> = None;
        for poly in self.polygons.iter().filter(|p| !p.is_empty()) {
            let b = poly.bounds();
            bounds = Some(match bounds {
                Some(acc) => acc.union(&b),
                None => b,
            });
        }
        bounds.unwrap_or_default()
    }

    /// Offset every vertex.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.polygons.iter().map(|p| p.translate(dx, dy)).collect())
    }

    /// Intersection with another region.
    ///
    /// Only computed when every sub-polygon of `other` is convex; `None`
    /// otherwise.
    pub fn intersect(&self, other: &PolyPolygon) -> Option<PolyPolygon> {
        let clips: Vec<&Polygon> = other.polygons.iter().filter(|p| p.len() >= 3).collect();
        if clips.iter().any(|p| !p.is_convex()) {
            return None;
        }
        let mut polygons = Vec::new();
        for poly in &self.polygons {
            for clip in &clips {
                let part = poly.clip_convex(clip);
                if part.len() >= 3 {
                    polygons.push(part);
                }
            }
        }
        Some(PolyPolygon::new(polygons))
    }
}

/// One segment of a bezier path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Start a new sub-path
    MoveTo(Point),
    /// Straight line
    LineTo(Point),
    /// Cubic bezier with two control points
    CurveTo(Point, Point, Point),
    /// Close the current sub-path
    Close,
}

/// A bezier path made of sub-paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    /// Segments in drawing order
    pub segments: Vec<PathSegment>,
}

impl Path {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a sub-path.
    pub fn move_to(mut self, x: f64, y: f64) -> Self {
        self.segments.push(PathSegment::MoveTo(Point::new(x, y)));
        self
    }

    /// Append a line.
    pub fn line_to(mut self, x: f64, y: f64) -> Self {
        self.segments.push(PathSegment::LineTo(Point::new(x, y)));
        self
    }

    /// Append a cubic curve.
    pub fn curve_to(mut self, c1: Point, c2: Point, end: Point) -> Self {
        self.segments.push(PathSegment::CurveTo(c1, c2, end));
        self
    }

    /// Close the current sub-path.
    pub fn close(mut self) -> Self {
        self.segments.push(PathSegment::Close);
        self
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Flatten the path into a polygon set, approximating curves.
    pub fn to_poly_polygon(&self) -> PolyPolygon {
        const STEPS: usize = 8;
        let mut polygons = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo(p) => {
                    if !current.is_empty() {
                        polygons.push(Polygon::new(std::mem::take(&mut current)));
                    }
                    current.push(p);
                },
                PathSegment::LineTo(p) => current.push(p),
                PathSegment::CurveTo(c1, c2, end) => {
                    let start = current.last().copied().unwrap_or(c1);
                    for step in 1..=STEPS {
                        let t = step as f64 / STEPS as f64;
                        let mt = 1.0 - t;
                        let x = mt * mt * mt * start.x
                            + 3.0 * mt * mt * t * c1.x
                            + 3.0 * mt * t * t * c2.x
                            + t * t * t * end.x;
                        let y = mt * mt * mt * start.y
                            + 3.0 * mt * mt * t * c1.y
                            + 3.0 * mt * t * t * c2.y
                            + t * t * t * end.y;
                        current.push(Point::new(x, y));
                    }
                },
                PathSegment::Close => {
                    if !current.is_empty() {
                        polygons.push(Polygon::new(std::mem::take(&mut current)));
                    }
                },
            }
        }
        if !current.is_empty() {
            polygons.push(Polygon::new(current));
        }
        PolyPolygon::new(polygons)
    }
}

impl From<&Polygon> for Path {
    fn from(poly: &Polygon) -> Self {
        let mut segments = Vec::with_capacity(poly.len() + 1);
        for (i, p) in poly.points.iter().enumerate() {
            segments.push(if i == 0 {
                PathSegment::MoveTo(*p)
            } else {
                PathSegment::LineTo(*p)
            });
        }
        if !segments.is_empty() {
            segments.push(PathSegment::Close);
        }
        Path { segments }
    }
}

/// An affine transformation `[a b c d e f]` as used by the `cm` operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scale
    pub a: f64,
    /// Vertical skew
    pub b: f64,
    /// Horizontal skew
    pub c: f64,
    /// Vertical scale
    pub d: f64,
    /// Horizontal translation
    pub e: f64,
    /// Vertical translation
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::identity()
        }
    }

    /// Pure scale.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// Counter-clockwise rotation by `angle` radians.
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Horizontal skew by `angle` radians (synthetic italic).
    pub fn skew_x(angle: f64) -> Self {
        Self {
            c: angle.tan(),
            ..Self::identity()
        }
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Apply to a point.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Determinant; zero means the transform collapses the plane.
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Whether this is the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Physical unit of logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapUnit {
    /// 1/72 inch (PDF native)
    #[default]
    Point,
    /// 1/100 millimetre
    Mm100,
    /// 1/10 millimetre
    Mm10,
    /// 1/1440 inch
    Twip,
    /// 1/1000 inch
    Inch1000,
    /// Device pixels at the given resolution
    Pixel(u32),
}

impl MapUnit {
    /// Size of one unit in points.
    pub fn points_per_unit(self) -> f64 {
        match self {
            MapUnit::Point => 1.0,
            MapUnit::Mm100 => 72.0 / 2540.0,
            MapUnit::Mm10 => 72.0 / 254.0,
            MapUnit::Twip => 1.0 / 20.0,
            MapUnit::Inch1000 => 72.0 / 1000.0,
            MapUnit::Pixel(dpi) => 72.0 / f64::from(dpi.max(1)),
        }
    }
}

/// Logical coordinate system: unit, origin and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapMode {
    /// Unit of logical coordinates
    pub unit: MapUnit,
    /// Logical origin offset, in logical units
    pub origin: Point,
    /// Horizontal scale factor
    pub scale_x: f64,
    /// Vertical scale factor
    pub scale_y: f64,
}

impl Default for MapMode {
    fn default() -> Self {
        Self::new(MapUnit::Point)
    }
}

impl MapMode {
    /// Map mode of the given unit with no offset or scale.
    pub fn new(unit: MapUnit) -> Self {
        Self {
            unit,
            origin: Point::default(),
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Set the logical origin.
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Set the scale factors.
    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    /// Convert a logical point into points, top-left origin.
    pub fn to_points(&self, p: &Point) -> Point {
        let ppu = self.unit.points_per_unit();
        Point::new(
            (p.x + self.origin.x) * self.scale_x * ppu,
            (p.y + self.origin.y) * self.scale_y * ppu,
        )
    }

    /// Convert a horizontal logical length into points.
    pub fn length_to_points(&self, len: f64) -> f64 {
        len * self.scale_x.abs() * self.unit.points_per_unit()
    }

    /// Convert a point length back into logical units.
    pub fn points_to_length(&self, pts: f64) -> f64 {
        let factor = self.scale_x.abs() * self.unit.points_per_unit();
        if factor == 0.0 {
            0.0
        } else {
            pts / factor
        }
    }

    /// Convert a logical rectangle into points.
    pub fn rect_to_points(&self, r: &Rect) -> Rect {
        let tl = self.to_points(&Point::new(r.left(), r.top()));
        let br = self.to_points(&Point::new(r.right(), r.bottom()));
        Rect::from_points(tl.x, tl.y, br.x, br.y)
    }
}
