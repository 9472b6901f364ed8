//! Standalone font for form widget text.
//!
//! Widget default appearances (`/DA`) name a font from the AcroForm default
//! resources. That font is not subsetted: it is a simple font covering all
//! printable WinAnsi codes 32..=255 with their real advance widths, so a
//! viewer can regenerate appearances for any text the user types.

use super::emit::{font_descriptor, font_file};
use super::{FaceId, FontFace, FontFlags};
use crate::error::Result;
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use crate::writer::IndirectObject;

/// First and last code of the standalone font.
pub const FIRST_CODE: u8 = 32;
/// Last code covered.
pub const LAST_CODE: u8 = 255;

/// Resource name the widget font is registered under.
pub const WIDGET_FONT_NAME: &str = "Helv";

/// Where the widget font comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandaloneFont {
    /// The non-embedded standard Helvetica
    #[default]
    Helvetica,
    /// A registered face, embedded in full
    Face(FaceId),
}

/// WinAnsi code points 0x80..=0x9F; unassigned slots map to `None`.
const WINANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Helvetica advance widths for codes 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Helvetica advance widths for codes 128..=255 (0 where unassigned).
const HELVETICA_HIGH: [u16; 128] = [
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 128-143
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667, // 144-159
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 160-175
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 176-191
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 192-207
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 208-223
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 224-239
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 240-255
];

/// Character of a WinAnsi code.
pub fn winansi_char(code: u8) -> Option<char> {
    match code {
        0x80..=0x9F => WINANSI_HIGH[usize::from(code - 0x80)],
        0x7F => None,
        _ => Some(char::from(code)),
    }
}

/// WinAnsi code of a character, if it has one.
pub fn winansi_code(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..0x7F).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    WINANSI_HIGH
        .iter()
        .position(|&c| c == Some(ch))
        .map(|i| 0x80 + i as u8)
}

/// Encode text for the widget font; unmappable characters become `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|ch| winansi_code(ch).unwrap_or(b'?')).collect()
}

/// Helvetica advance of a code in 1/1000 em.
pub fn helvetica_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_ASCII[usize::from(code - 32)],
        128..=255 => HELVETICA_HIGH[usize::from(code - 128)],
        _ => 0,
    }
}

/// Width of encoded text in 1/1000 em.
pub fn text_width(codes: &[u8], widths: &[u16]) -> u32 {
    codes
        .iter()
        .map(|&c| {
            c.checked_sub(FIRST_CODE)
                .and_then(|i| widths.get(usize::from(i)))
                .copied()
                .map(u32::from)
                .unwrap_or(0)
        })
        .sum()
}

/// Advance widths for codes 32..=255.
pub fn standalone_widths(source: StandaloneFont, face: Option<&dyn FontFace>) -> Vec<u16> {
    (FIRST_CODE..=LAST_CODE)
        .map(|code| match (source, face) {
            (StandaloneFont::Face(_), Some(face)) => winansi_char(code)
                .and_then(|ch| face.char_to_glyph(ch))
                .map(|g| face.advance_1000(g).clamp(0, i32::from(u16::MAX)) as u16)
                .unwrap_or(0),
            _ => helvetica_width(code),
        })
        .collect()
}

/// Objects of the standalone widget font.
///
/// A face without an embeddable program falls back to Helvetica.
pub fn standalone_font_objects(
    font_id: u32,
    source: StandaloneFont,
    face: Option<&dyn FontFace>,
    allocator: &mut ObjectAllocator,
    compress: bool,
) -> Result<Vec<IndirectObject>> {
    let widths = standalone_widths(source, face);
    let mut font = Dict::new();
    font.insert("Type".into(), Object::Name("Font".into()));
    font.insert("FirstChar".into(), Object::Integer(i64::from(FIRST_CODE)));
    font.insert("LastChar".into(), Object::Integer(i64::from(LAST_CODE)));
    font.insert(
        "Widths".into(),
        Object::Array(widths.iter().map(|&w| Object::Integer(i64::from(w))).collect()),
    );
    font.insert("Encoding".into(), Object::Name("WinAnsiEncoding".into()));

    let program = match (source, face) {
        (StandaloneFont::Face(_), Some(face)) => face.font_program().map(|p| (face, p)),
        _ => None,
    };
    let Some((face, program)) = program else {
        font.insert("Subtype".into(), Object::Name("Type1".into()));
        font.insert("BaseFont".into(), Object::Name("Helvetica".into()));
        return Ok(vec![(font_id, Object::Dictionary(font))]);
    };

    let base_font = face.postscript_name();
    let file_id = allocator.create_object();
    let descriptor_id = allocator.create_object();
    let (file_key, file_object) = font_file(&program, compress)?;
    let descriptor = font_descriptor(&base_font, face, FontFlags::NONSYMBOLIC, file_key, file_id);

    font.insert("Subtype".into(), Object::Name("TrueType".into()));
    font.insert("BaseFont".into(), Object::Name(base_font));
    font.insert("FontDescriptor".into(), Object::Reference(descriptor_id.into()));
    Ok(vec![
        (font_id, Object::Dictionary(font)),
        (file_id, file_object),
        (descriptor_id, Object::Dictionary(descriptor)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winansi_mapping() {
        assert_eq!(winansi_code('A'), Some(65));
        assert_eq!(winansi_code('é'), Some(0xE9));
        assert_eq!(winansi_code('€'), Some(0x80));
        assert_eq!(winansi_code('—'), Some(0x97));
        assert_eq!(winansi_code('中'), None);
        assert_eq!(winansi_char(0x80), Some('€'));
        assert_eq!(winansi_char(0x81), None);
        assert_eq!(encode_winansi("Größe €"), vec![b'G', b'r', 0xF6, 0xDF, b'e', b' ', 0x80]);
        assert_eq!(encode_winansi("日"), b"?".to_vec());
    }

    #[test]
    fn test_helvetica_widths() {
        assert_eq!(helvetica_width(b' '), 278);
        assert_eq!(helvetica_width(b'W'), 944);
        assert_eq!(helvetica_width(b'i'), 222);
        assert_eq!(helvetica_width(0xE9), 556);
        let widths = standalone_widths(StandaloneFont::Helvetica, None);
        assert_eq!(widths.len(), 224);
        assert_eq!(text_width(b"Hi", &widths), 722 + 222);
    }

    #[test]
    fn test_helvetica_font_object() {
        let mut alloc = ObjectAllocator::new();
        let id = alloc.create_object();
        let objects = standalone_font_objects(id, StandaloneFont::Helvetica, None, &mut alloc, true).unwrap();
        assert_eq!(objects.len(), 1);
        let font = objects[0].1.as_dict().unwrap();
        assert_eq!(font["BaseFont"].as_name(), Some("Helvetica"));
        assert_eq!(font["Encoding"].as_name(), Some("WinAnsiEncoding"));
        assert_eq!(font["Widths"].as_array().map(Vec::len), Some(224));
    }
}
