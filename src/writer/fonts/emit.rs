//! Subset font emission: simple fonts with embedded programs, or Type 3.

use super::registry::{Subset, SubsetKind};
use super::tounicode::build_tounicode_cmap;
use super::type3::type3_objects;
use super::{scale_to_1000, subset_tag, FontFace, FontFlags, FontProgram, FontProgramKind};
use crate::error::Result;
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use crate::writer::image::ImageRegistry;
use crate::writer::{stream_object, IndirectObject};

/// Emit one subset font and everything it references.
///
/// Outline subsets embed the face's subset program; when the face cannot
/// produce one they fall back to a Type 3 outline font.
pub fn emit_subset(
    subset: &Subset,
    face: &dyn FontFace,
    images: &mut ImageRegistry,
    allocator: &mut ObjectAllocator,
    compress: bool,
) -> Result<Vec<IndirectObject>> {
    let program = match subset.kind {
        SubsetKind::Type3 => None,
        SubsetKind::Outline => face.subset_program(&subset.program_glyphs()),
    };
    let Some(program) = program else {
        log::debug!("font {} emitted as Type 3 ({} glyphs)", subset.font_id, subset.glyphs.len());
        return type3_objects(subset, face, images, allocator, compress);
    };

    let tag = subset_tag(subset.font_id, &subset.program_glyphs());
    let base_font = format!("{}+{}", tag, face.postscript_name());
    let mut objects = Vec::with_capacity(4);

    let file_id = allocator.create_object();
    let descriptor_id = allocator.create_object();
    let (file_key, file_object) = font_file(&program, compress)?;
    objects.push((file_id, file_object));

    // subset codes are not Latin text, so the descriptor is symbolic
    let descriptor = font_descriptor(&base_font, face, FontFlags::SYMBOLIC, file_key, file_id);
    objects.push((descriptor_id, Object::Dictionary(descriptor)));

    let (first, last) = subset.code_range();
    let mut font = Dict::new();
    font.insert("Type".into(), Object::Name("Font".into()));
    font.insert(
        "Subtype".into(),
        Object::Name(if program.kind == FontProgramKind::Cff { "Type1" } else { "TrueType" }.into()),
    );
    font.insert("BaseFont".into(), Object::Name(base_font));
    font.insert("FirstChar".into(), Object::Integer(i64::from(first)));
    font.insert("LastChar".into(), Object::Integer(i64::from(last)));
    font.insert(
        "Widths".into(),
        Object::Array(subset.glyphs.iter().map(|g| Object::Integer(i64::from(g.width))).collect()),
    );
    font.insert("FontDescriptor".into(), Object::Reference(descriptor_id.into()));

    if let Some(cmap) = build_tounicode_cmap(subset) {
        let cmap_id = allocator.create_object();
        font.insert("ToUnicode".into(), Object::Reference(cmap_id.into()));
        objects.push((cmap_id, stream_object(Dict::new(), cmap, compress)?));
    }

    objects.insert(0, (subset.font_id, Object::Dictionary(font)));
    Ok(objects)
}

/// Font file stream and the descriptor key pointing at it.
pub(super) fn font_file(program: &FontProgram, compress: bool) -> Result<(&'static str, Object)> {
    let mut dict = Dict::new();
    let key = match program.kind {
        FontProgramKind::TrueType => {
            dict.insert("Length1".into(), Object::Integer(program.data.len() as i64));
            "FontFile2"
        },
        FontProgramKind::Cff => {
            dict.insert("Subtype".into(), Object::Name("Type1C".into()));
            "FontFile3"
        },
        FontProgramKind::OpenType => {
            dict.insert("Subtype".into(), Object::Name("OpenType".into()));
            "FontFile3"
        },
    };
    Ok((key, stream_object(dict, program.data.clone(), compress)?))
}

/// FontDescriptor dictionary in 1/1000 em.
///
/// `base_flags` replaces the symbolic/nonsymbolic classification reported
/// by the face.
pub(super) fn font_descriptor(
    base_font: &str,
    face: &dyn FontFace,
    base_flags: FontFlags,
    file_key: &str,
    file_id: u32,
) -> Dict {
    let metrics = face.metrics();
    let upem = face.units_per_em();
    let s = |v: i32| Object::Integer(i64::from(scale_to_1000(v, upem)));
    let flags = (metrics.flags - FontFlags::SYMBOLIC - FontFlags::NONSYMBOLIC) | base_flags;

    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("FontDescriptor".into()));
    dict.insert("FontName".into(), Object::Name(base_font.to_string()));
    dict.insert("Flags".into(), Object::Integer(i64::from(flags.bits())));
    dict.insert("FontBBox".into(), Object::Array(metrics.bbox.iter().map(|&v| s(v)).collect()));
    dict.insert("ItalicAngle".into(), Object::Real(metrics.italic_angle));
    dict.insert("Ascent".into(), s(metrics.ascent));
    dict.insert("Descent".into(), s(metrics.descent));
    dict.insert("CapHeight".into(), s(metrics.cap_height));
    dict.insert("StemV".into(), s(metrics.stem_v));
    dict.insert(file_key.to_string(), Object::Reference(file_id.into()));
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Path;
    use crate::writer::fonts::{FontMetrics, GlyphKind, GlyphRegistry};

    #[derive(Debug)]
    struct Programmable {
        with_program: bool,
    }

    impl FontFace for Programmable {
        fn postscript_name(&self) -> String {
            "Sample-Regular".into()
        }
        fn units_per_em(&self) -> u16 {
            1000
        }
        fn metrics(&self) -> FontMetrics {
            FontMetrics::default()
        }
        fn glyph_advance(&self, _glyph: u16) -> u16 {
            600
        }
        fn char_to_glyph(&self, ch: char) -> Option<u16> {
            Some(ch as u16)
        }
        fn glyph_outline(&self, _glyph: u16) -> Option<Path> {
            Some(Path::new().move_to(0.0, 0.0).line_to(600.0, 0.0).line_to(300.0, 700.0).close())
        }
        fn subset_program(&self, glyphs: &[u16]) -> Option<FontProgram> {
            self.with_program.then(|| FontProgram {
                kind: FontProgramKind::TrueType,
                data: glyphs.iter().flat_map(|g| g.to_be_bytes()).collect(),
            })
        }
    }

    fn registry() -> (GlyphRegistry, ObjectAllocator) {
        let mut alloc = ObjectAllocator::new();
        let mut registry = GlyphRegistry::new();
        for ch in "Hello".chars() {
            registry.register(&mut alloc, 0, ch as u16, GlyphKind::Outline, &[ch], 600);
        }
        (registry, alloc)
    }

    #[test]
    fn test_truetype_subset() {
        let (registry, mut alloc) = registry();
        let mut images = ImageRegistry::new();
        let face = Programmable { with_program: true };
        let objects = emit_subset(&registry.subsets()[0], &face, &mut images, &mut alloc, false).unwrap();
        let font = objects[0].1.as_dict().unwrap();
        assert_eq!(font["Subtype"].as_name(), Some("TrueType"));
        let base = font["BaseFont"].as_name().unwrap();
        assert_eq!(base.len(), 6 + 1 + "Sample-Regular".len());
        assert_eq!(&base[6..7], "+");
        assert_eq!(font["FirstChar"].as_integer(), Some(1));
        assert_eq!(font["LastChar"].as_integer(), Some(4));
        assert_eq!(font["Widths"].as_array().map(Vec::len), Some(4));

        let descriptor = objects
            .iter()
            .find(|(_, o)| o.as_dict().and_then(|d| d.get("Type")).and_then(Object::as_name) == Some("FontDescriptor"))
            .unwrap();
        let flags = descriptor.1.as_dict().unwrap()["Flags"].as_integer().unwrap();
        assert_eq!(flags & 4, 4);
        assert_eq!(flags & 32, 0);
        assert!(descriptor.1.as_dict().unwrap().contains_key("FontFile2"));
    }

    #[test]
    fn test_falls_back_to_type3() {
        let (registry, mut alloc) = registry();
        let mut images = ImageRegistry::new();
        let face = Programmable { with_program: false };
        let objects = emit_subset(&registry.subsets()[0], &face, &mut images, &mut alloc, false).unwrap();
        assert_eq!(objects[0].1.as_dict().unwrap()["Subtype"].as_name(), Some("Type3"));
    }

    #[test]
    fn test_font_file_kinds() {
        let program = FontProgram {
            kind: FontProgramKind::Cff,
            data: vec![1, 0, 4, 2],
        };
        let (key, obj) = font_file(&program, false).unwrap();
        assert_eq!(key, "FontFile3");
        assert_eq!(obj.as_dict().unwrap()["Subtype"].as_name(), Some("Type1C"));
    }
}
