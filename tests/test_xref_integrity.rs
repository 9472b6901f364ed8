//! Byte-level integrity of emitted documents.
//!
//! Every xref entry must point at its `N 0 obj` header and every stream's
//! `/Length` must equal the bytes between `stream\n` and `\nendstream`,
//! compressed, uncompressed and encrypted alike.

use pdf_scribe::config::EncryptionConfig;
use pdf_scribe::encryption::Algorithm;
use pdf_scribe::geometry::{Path, Point, PolyPolygon, Rect};
use pdf_scribe::writer::fonts::FontMetrics;
use pdf_scribe::writer::{
    Bitmap, Color, DestFit, EmbeddedFile, Font, FontFace, Gradient, GradientStyle, Hatch, HatchStyle, LineInfo,
    PositionedGlyph, StructElementType, TextRun, WidgetDescription, WidgetKind,
};
use pdf_scribe::{PdfVersion, PdfWriter, PdfWriterConfig};
use regex::bytes::Regex;

#[derive(Debug)]
struct BlockFace;

impl FontFace for BlockFace {
    fn postscript_name(&self) -> String {
        "BlockFace".into()
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
        u16::try_from(u32::from(ch)).ok()
    }
    fn glyph_outline(&self, _glyph: u16) -> Option<Path> {
        Some(Path::new().move_to(0.0, 0.0).line_to(500.0, 0.0).line_to(250.0, 700.0).close())
    }
}

/// A page using every resource kind the writer knows.
fn build(config: PdfWriterConfig) -> Vec<u8> {
    let mut w = PdfWriter::in_memory(config).unwrap();
    w.new_page(595.0, 842.0).unwrap();

    w.set_line_color(Some(Color::new(0.0, 0.0, 0.5)));
    w.set_fill_color(Some(Color::new(0.9, 0.9, 0.2)));
    w.draw_rect(&Rect::new(20.0, 20.0, 100.0, 60.0)).unwrap();
    w.draw_ellipse(&Rect::new(140.0, 20.0, 100.0, 60.0)).unwrap();
    w.draw_line_with(
        &Point::new(20.0, 100.0),
        &Point::new(300.0, 100.0),
        &LineInfo::dashed(1.5, 3, 4.0, 2.0),
    )
    .unwrap();

    let area = PolyPolygon::from_rect(&Rect::new(20.0, 120.0, 200.0, 80.0));
    w.draw_gradient(&area, &Gradient::new(GradientStyle::Radial, Color::white(), Color::black()))
        .unwrap();
    w.draw_hatch(&area, &Hatch::new(HatchStyle::Triple, Color::black(), 6.0, 15.0)).unwrap();
    w.draw_transparent(&PolyPolygon::from_rect(&Rect::new(60.0, 140.0, 100.0, 100.0)), 40)
        .unwrap();

    let pixels: Vec<u8> = (0..16 * 16 * 3).map(|i| (i % 251) as u8).collect();
    let bitmap = Bitmap::rgb(16, 16, pixels).unwrap();
    w.draw_bitmap(&Rect::new(300.0, 20.0, 64.0, 64.0), &bitmap).unwrap();
    w.draw_bitmap_with_alpha(&Rect::new(380.0, 20.0, 64.0, 64.0), &bitmap, vec![128; 256])
        .unwrap();
    w.draw_wallpaper(&Rect::new(300.0, 120.0, 150.0, 80.0), &bitmap, 16.0, 16.0).unwrap();

    w.begin_transparency_group().unwrap();
    w.draw_rect(&Rect::new(20.0, 260.0, 80.0, 80.0)).unwrap();
    w.end_transparency_group(&Rect::new(20.0, 260.0, 80.0, 80.0), 25).unwrap();

    let face = w.register_face(Box::new(BlockFace));
    w.set_font(Font::new(face, 14.0)).unwrap();
    let glyphs = "Integrity"
        .chars()
        .enumerate()
        .map(|(i, ch)| PositionedGlyph::new(u32::from(ch) as u16, 20.0 + 8.4 * i as f64, 400.0, ch.to_string()))
        .collect();
    if let Some(p) = w.create_structure_element(StructElementType::Paragraph, None) {
        w.begin_structure_element(p);
        w.draw_glyphs(&TextRun::new(glyphs)).unwrap();
        w.end_structure_element();
    }

    let dest = w.create_dest(&Rect::new(0.0, 0.0, 595.0, 842.0), None, DestFit::Fit).unwrap();
    w.new_page(595.0, 842.0).unwrap();
    let link = w.create_link(&Rect::new(20.0, 20.0, 100.0, 20.0), None, Some("Start")).unwrap();
    w.set_link_dest(link, dest);
    w.create_note(&Rect::new(20.0, 60.0, 20.0, 20.0), None, "Tester", "Looks good", true)
        .unwrap();
    let combo = WidgetDescription::new(
        WidgetKind::ComboBox {
            entries: vec!["Red".into(), "Green".into()],
            selected: Some(1),
            editable: false,
        },
        "color",
        Rect::new(20.0, 100.0, 120.0, 20.0),
    );
    w.create_control(combo, None).unwrap();
    w.add_outline_item(0, "Start", Some(dest));
    w.embed_file(EmbeddedFile::new("data.bin", (0..=255).collect())).unwrap();
    w.finish().unwrap()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn parse_usize(bytes: &[u8]) -> usize {
    std::str::from_utf8(bytes).unwrap().trim().parse().unwrap()
}

/// Offsets of all in-use xref entries, checked against the trailer.
fn xref_offsets(pdf: &[u8]) -> Vec<usize> {
    let startxref = Regex::new(r"startxref\n(\d+)\n%%EOF\n$").unwrap();
    let xref_at = parse_usize(&startxref.captures(pdf).expect("startxref")[1]);
    assert!(pdf[xref_at..].starts_with(b"xref\n0 "));

    let header = Regex::new(r"^xref\n0 (\d+)\n").unwrap();
    let caps = header.captures(&pdf[xref_at..]).unwrap();
    let count = parse_usize(&caps[1]);
    let mut pos = xref_at + caps[0].len();

    let size = Regex::new(r"trailer\n<<.*?/Size (\d+)").unwrap();
    assert_eq!(parse_usize(&size.captures(pdf).expect("trailer")[1]), count);

    let entry = Regex::new(r"^(\d{10}) (\d{5}) ([nf]) \n$").unwrap();
    let mut offsets = Vec::new();
    for i in 0..count {
        let record = &pdf[pos..pos + 20];
        let caps = entry.captures(record).unwrap_or_else(|| panic!("malformed xref record {}", i));
        if i == 0 {
            assert_eq!(&caps[3], b"f");
        } else {
            assert_eq!(&caps[3], b"n");
            offsets.push(parse_usize(&caps[1]));
        }
        pos += 20;
    }
    assert!(pdf[pos..].starts_with(b"trailer\n"));
    offsets
}

fn check_document(pdf: &[u8]) {
    let length = Regex::new(r"/Length (\d+)").unwrap();
    let offsets = xref_offsets(pdf);
    assert!(offsets.len() > 20, "only {} objects", offsets.len());

    for (i, &offset) in offsets.iter().enumerate() {
        let id = i + 1;
        let header = format!("{} 0 obj\n", id);
        assert!(
            pdf[offset..].starts_with(header.as_bytes()),
            "xref entry {} points at {:?}",
            id,
            String::from_utf8_lossy(&pdf[offset..(offset + 20).min(pdf.len())])
        );

        let end = find(pdf, b"\nendobj", offset).expect("endobj");
        if let Some(stream) = find(pdf, b"\nstream\n", offset).filter(|&s| s < end) {
            let dict = &pdf[offset..stream];
            let declared = length
                .captures_iter(dict)
                .last()
                .map(|c| parse_usize(&c[1]))
                .unwrap_or_else(|| panic!("stream {} without /Length", id));
            let data_start = stream + b"\nstream\n".len();
            assert!(
                pdf[data_start + declared..].starts_with(b"\nendstream\nendobj"),
                "stream {} /Length {} does not end at endstream",
                id,
                declared
            );
        }
    }
}

#[test]
fn test_uncompressed_document() {
    check_document(&build(PdfWriterConfig::default().with_compress(false).with_tagged(true)));
}

#[test]
fn test_compressed_document() {
    let pdf = build(PdfWriterConfig::default().with_tagged(true));
    assert!(Regex::new(r"/Filter /FlateDecode").unwrap().is_match(&pdf));
    check_document(&pdf);
}

#[test]
fn test_encrypted_document() {
    for algorithm in [Algorithm::Rc4_128, Algorithm::Aes128, Algorithm::Aes256] {
        let config = PdfWriterConfig::default()
            .with_version(PdfVersion::V1_7)
            .with_encryption(EncryptionConfig::new("", "owner").with_algorithm(algorithm));
        check_document(&build(config));
    }
}

#[test]
fn test_pdfa_document() {
    let pdf = build(PdfWriterConfig::default().with_version(PdfVersion::A2).with_tagged(true));
    check_document(&pdf);
    assert!(Regex::new(r"/OutputIntents|pdfaid").unwrap().is_match(&pdf));
}
