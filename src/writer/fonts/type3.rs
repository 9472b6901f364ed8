//! Type 3 fonts for glyphs that cannot live in a subset font program.
//!
//! Each glyph becomes a CharProc content stream. The font matrix maps
//! 1000 glyph units to one text space unit, so outlines are rescaled from
//! the face's units-per-em to 1/1000 em.
//!
//! - flat outlines (static or variable instances) use `d1` and a plain fill,
//!   taking their color from the text state;
//! - color glyphs use `d0` and fill each layer with its own color;
//! - bitmap glyphs use `d0` and paint an image XObject.

use super::registry::Subset;
use super::tounicode::build_tounicode_cmap;
use super::{FontFace, GlyphKind};
use crate::error::Result;
use crate::geometry::{Matrix, Path, PathSegment, Point};
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use crate::writer::content::ContentStreamBuilder;
use crate::writer::image::{Bitmap, ImageRegistry};
use crate::writer::{stream_object, IndirectObject};

/// Glyph space units per em in every Type 3 font.
const GLYPH_UNITS: f64 = 1000.0;

/// Scale a path from font units to 1/1000 em.
fn scale_path(path: &Path, scale: f64) -> Path {
    let p = |pt: &Point| Point::new(pt.x * scale, pt.y * scale);
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

/// Integer bounding box of a path, `[0 0 0 0]` when empty.
fn path_bbox(path: &Path) -> [i64; 4] {
    let points: Vec<Point> = path
        .segments
        .iter()
        .flat_map(|seg| match seg {
            PathSegment::MoveTo(pt) | PathSegment::LineTo(pt) => vec![*pt],
            PathSegment::CurveTo(c1, c2, end) => vec![*c1, *c2, *end],
            PathSegment::Close => vec![],
        })
        .collect();
    if points.is_empty() {
        return [0; 4];
    }
    let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for pt in &points {
        x0 = x0.min(pt.x);
        y0 = y0.min(pt.y);
        x1 = x1.max(pt.x);
        y1 = y1.max(pt.y);
    }
    [x0.floor() as i64, y0.floor() as i64, x1.ceil() as i64, y1.ceil() as i64]
}

fn union_bbox(a: [i64; 4], b: [i64; 4]) -> [i64; 4] {
    if a == [0; 4] {
        return b;
    }
    if b == [0; 4] {
        return a;
    }
    [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
}

/// A glyph procedure plus the resources it needs.
struct CharProc {
    content: Vec<u8>,
    bbox: [i64; 4],
    image: Option<u32>,
}

fn outline_proc(face: &dyn FontFace, glyph: u16, width: i32, scale: f64) -> CharProc {
    let path = face.glyph_outline(glyph).map(|p| scale_path(&p, scale)).unwrap_or_default();
    let bbox = path_bbox(&path);
    let mut out = ContentStreamBuilder::new();
    out.op(crate::writer::content::ContentStreamOp::Raw(
        format!("{} 0 {} {} {} {} d1", width, bbox[0], bbox[1], bbox[2], bbox[3]).into_bytes(),
    ));
    if !path.is_empty() {
        out.path(&path).fill();
    }
    CharProc {
        content: out.finish(),
        bbox,
        image: None,
    }
}

fn color_proc(face: &dyn FontFace, glyph: u16, width: i32, scale: f64) -> CharProc {
    let mut out = ContentStreamBuilder::new();
    out.op(crate::writer::content::ContentStreamOp::Raw(format!("{} 0 d0", width).into_bytes()));
    let mut bbox = [0; 4];
    for layer in face.color_layers(glyph) {
        let path = scale_path(&layer.outline, scale);
        if path.is_empty() {
            continue;
        }
        bbox = union_bbox(bbox, path_bbox(&path));
        out.fill_color(layer.color).path(&path).fill();
    }
    CharProc {
        content: out.finish(),
        bbox,
        image: None,
    }
}

fn bitmap_proc(
    face: &dyn FontFace,
    glyph: u16,
    width: i32,
    images: &mut ImageRegistry,
    allocator: &mut ObjectAllocator,
) -> CharProc {
    let mut out = ContentStreamBuilder::new();
    out.op(crate::writer::content::ContentStreamOp::Raw(format!("{} 0 d0", width).into_bytes()));

    let raster = face.raster_glyph(glyph);
    let decoded = raster.as_ref().and_then(|r| match Bitmap::from_png(&r.png) {
        Ok(bitmap) => Some((r, bitmap)),
        Err(e) => {
            log::warn!("bitmap glyph {} not decodable: {}", glyph, e);
            None
        },
    });
    let Some((raster, bitmap)) = decoded else {
        return CharProc {
            content: out.finish(),
            bbox: [0; 4],
            image: None,
        };
    };

    let px = GLYPH_UNITS / f64::from(raster.pixels_per_em.max(1));
    let (w, h) = (f64::from(raster.width) * px, f64::from(raster.height) * px);
    let (x, y) = (f64::from(raster.x) * px, f64::from(raster.y) * px);
    let id = images.register_bitmap(allocator, &bitmap);
    out.save_state()
        .transform(Matrix {
            a: w,
            b: 0.0,
            c: 0.0,
            d: h,
            e: x,
            f: y,
        })
        .paint_xobject(&format!("Im{}", id))
        .restore_state();
    CharProc {
        content: out.finish(),
        bbox: [x.floor() as i64, y.floor() as i64, (x + w).ceil() as i64, (y + h).ceil() as i64],
        image: Some(id),
    }
}

/// Objects of a Type 3 subset font: font dictionary, CharProcs, ToUnicode.
///
/// Bitmap glyphs register their images with `images`; those are emitted
/// with the other images.
pub fn type3_objects(
    subset: &Subset,
    face: &dyn FontFace,
    images: &mut ImageRegistry,
    allocator: &mut ObjectAllocator,
    compress: bool,
) -> Result<Vec<IndirectObject>> {
    let scale = GLYPH_UNITS / f64::from(face.units_per_em().max(1));
    let mut objects = Vec::with_capacity(subset.glyphs.len() + 2);
    let mut char_procs = Dict::new();
    let mut xobjects = Dict::new();
    let mut differences = vec![Object::Integer(1)];
    let mut widths = Vec::with_capacity(subset.glyphs.len());
    let mut font_bbox = [0i64; 4];

    for entry in &subset.glyphs {
        let proc = match entry.kind {
            GlyphKind::Outline | GlyphKind::VariableOutline => outline_proc(face, entry.glyph, entry.width, scale),
            GlyphKind::ColorLayers => color_proc(face, entry.glyph, entry.width, scale),
            GlyphKind::Bitmap => bitmap_proc(face, entry.glyph, entry.width, images, allocator),
        };
        font_bbox = union_bbox(font_bbox, proc.bbox);
        if let Some(image) = proc.image {
            xobjects.insert(format!("Im{}", image), Object::Reference(image.into()));
        }

        let proc_id = allocator.create_object();
        let glyph_name = format!("g{}", entry.code);
        char_procs.insert(glyph_name.clone(), Object::Reference(proc_id.into()));
        differences.push(Object::Name(glyph_name));
        widths.push(Object::Integer(i64::from(entry.width)));
        objects.push((proc_id, stream_object(Dict::new(), proc.content, compress)?));
    }

    let (first, last) = subset.code_range();
    let mut encoding = Dict::new();
    encoding.insert("Type".into(), Object::Name("Encoding".into()));
    encoding.insert("Differences".into(), Object::Array(differences));

    let mut resources = Dict::new();
    if !xobjects.is_empty() {
        resources.insert("XObject".into(), Object::Dictionary(xobjects));
    }

    let mut font = Dict::new();
    font.insert("Type".into(), Object::Name("Font".into()));
    font.insert("Subtype".into(), Object::Name("Type3".into()));
    font.insert("FontBBox".into(), Object::Array(font_bbox.iter().map(|&v| Object::Integer(v)).collect()));
    font.insert(
        "FontMatrix".into(),
        Object::Array(vec![
            Object::Real(0.001),
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(0.001),
            Object::Integer(0),
            Object::Integer(0),
        ]),
    );
    font.insert("CharProcs".into(), Object::Dictionary(char_procs));
    font.insert("Encoding".into(), Object::Dictionary(encoding));
    font.insert("FirstChar".into(), Object::Integer(i64::from(first)));
    font.insert("LastChar".into(), Object::Integer(i64::from(last)));
    font.insert("Widths".into(), Object::Array(widths));
    font.insert("Resources".into(), Object::Dictionary(resources));

    if let Some(cmap) = build_tounicode_cmap(subset) {
        let cmap_id = allocator.create_object();
        font.insert("ToUnicode".into(), Object::Reference(cmap_id.into()));
        objects.push((cmap_id, stream_object(Dict::new(), cmap, compress)?));
    }

    objects.insert(0, (subset.font_id, Object::Dictionary(font)));
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::content::Color;
    use crate::writer::fonts::{ColorLayer, FontMetrics, GlyphEntry, SubsetKind};

    #[derive(Debug)]
    struct Squares;

    impl FontFace for Squares {
        fn postscript_name(&self) -> String {
            "Squares".into()
        }
        fn units_per_em(&self) -> u16 {
            2048
        }
        fn metrics(&self) -> FontMetrics {
            FontMetrics::default()
        }
        fn glyph_advance(&self, _glyph: u16) -> u16 {
            2048
        }
        fn char_to_glyph(&self, _ch: char) -> Option<u16> {
            Some(1)
        }
        fn glyph_outline(&self, _glyph: u16) -> Option<Path> {
            Some(Path::new().move_to(0.0, 0.0).line_to(1024.0, 0.0).line_to(1024.0, 2048.0).close())
        }
        fn color_layers(&self, _glyph: u16) -> Vec<ColorLayer> {
            vec![ColorLayer {
                outline: Path::new().move_to(0.0, 0.0).line_to(2048.0, 0.0).line_to(0.0, 2048.0).close(),
                color: Color::new(1.0, 0.0, 0.0),
            }]
        }
    }

    fn subset(kinds: &[GlyphKind]) -> Subset {
        Subset {
            face: 0,
            font_id: 1,
            kind: SubsetKind::Type3,
            glyphs: kinds
                .iter()
                .enumerate()
                .map(|(i, &kind)| GlyphEntry {
                    glyph: i as u16 + 1,
                    code: i as u8 + 1,
                    width: 1000,
                    unicode: vec!['A'],
                    kind,
                })
                .collect(),
        }
    }

    #[test]
    fn test_outline_glyph_scaled_to_1000() {
        let mut alloc = ObjectAllocator::new();
        alloc.create_object();
        let mut images = ImageRegistry::new();
        let objects = type3_objects(&subset(&[GlyphKind::Outline]), &Squares, &mut images, &mut alloc, false).unwrap();
        assert_eq!(objects[0].0, 1);
        let font = objects[0].1.as_dict().unwrap();
        assert_eq!(font["Subtype"].as_name(), Some("Type3"));
        assert_eq!(font["FontBBox"], Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(500), Object::Integer(1000)]));
        let Object::Stream { data, .. } = &objects[1].1 else {
            panic!("expected char proc");
        };
        let text = String::from_utf8_lossy(data);
        assert!(text.starts_with("1000 0 0 0 500 1000 d1\n"));
        assert!(text.contains("500 1000 l"));
        assert!(font.contains_key("ToUnicode"));
    }

    #[test]
    fn test_color_glyph_uses_d0() {
        let mut alloc = ObjectAllocator::new();
        alloc.create_object();
        let mut images = ImageRegistry::new();
        let objects =
            type3_objects(&subset(&[GlyphKind::ColorLayers]), &Squares, &mut images, &mut alloc, false).unwrap();
        let Object::Stream { data, .. } = &objects[1].1 else {
            panic!("expected char proc");
        };
        let text = String::from_utf8_lossy(data);
        assert!(text.starts_with("1000 0 d0\n"));
        assert!(text.contains("1 0 0 rg"));
    }

    #[test]
    fn test_encoding_differences() {
        let mut alloc = ObjectAllocator::new();
        alloc.create_object();
        let mut images = ImageRegistry::new();
        let objects = type3_objects(
            &subset(&[GlyphKind::Outline, GlyphKind::VariableOutline]),
            &Squares,
            &mut images,
            &mut alloc,
            false,
        )
        .unwrap();
        let font = objects[0].1.as_dict().unwrap();
        let encoding = font["Encoding"].as_dict().unwrap();
        let diffs = encoding["Differences"].as_array().unwrap();
        assert_eq!(diffs[0], Object::Integer(1));
        assert_eq!(diffs[2].as_name(), Some("g2"));
        assert_eq!(font["LastChar"].as_integer(), Some(2));
        assert_eq!(font["CharProcs"].as_dict().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_bitmap_gives_empty_proc() {
        let mut alloc = ObjectAllocator::new();
        alloc.create_object();
        let mut images = ImageRegistry::new();
        let objects = type3_objects(&subset(&[GlyphKind::Bitmap]), &Squares, &mut images, &mut alloc, false).unwrap();
        assert!(images.is_empty());
        let Object::Stream { data, .. } = &objects[1].1 else {
            panic!("expected char proc");
        };
        assert_eq!(&data[..], b"1000 0 d0\n");
    }
}
