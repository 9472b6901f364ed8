//! End-to-end document scenarios.
//!
//! Each test writes a complete document with compression off and inspects
//! the emitted bytes:
//! - a blank A4 page
//! - a single glyph run
//! - hundreds of form fields in tab order
//! - a file-backed writer
//! - map modes, clipping and multi-stream pages
//! - shapes, JPEGs and pages of other documents
//! - media, structure attributes, transitions, outlines and checksums

use pdf_scribe::config::ForeignPdfPolicy;
use pdf_scribe::geometry::{MapMode, MapUnit, Path, Point, Polygon, Rect};
use pdf_scribe::object::{Dict, Object};
use pdf_scribe::writer::fonts::{FontMetrics, GlyphKind};
use pdf_scribe::writer::page::Transition;
use pdf_scribe::writer::{
    AttrValue, Color, DestFit, EmbeddedFile, Font, FontFace, ForeignPage, JpegImage, PositionedGlyph, StructAttribute,
    StructElementType, TextRun, WidgetDescription, WidgetKind,
};
use pdf_scribe::{PdfVersion, PdfWriter, PdfWriterConfig, Warning};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tempfile::tempdir;

/// Face with square glyphs 500 units wide and a 1:1 char mapping.
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
        500
    }
    fn char_to_glyph(&self, ch: char) -> Option<u16> {
        u16::try_from(u32::from(ch)).ok()
    }
    fn glyph_kind(&self, _glyph: u16) -> GlyphKind {
        GlyphKind::Outline
    }
    fn glyph_outline(&self, _glyph: u16) -> Option<Path> {
        Some(Path::new().move_to(0.0, 0.0).line_to(400.0, 0.0).line_to(400.0, 700.0).line_to(0.0, 700.0).close())
    }
}

fn uncompressed() -> PdfWriterConfig {
    PdfWriterConfig::default().with_compress(false)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Raw data of the stream in object `id`.
fn stream_data(pdf: &str, id: u32) -> String {
    let re = Regex::new(&format!(r"(?s)(?:^|\n){} 0 obj\n.*?\nstream\n(.*?)\nendstream", id)).unwrap();
    re.captures(pdf)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| panic!("no stream object {}", id))
}

fn page_contents_id(pdf: &str) -> u32 {
    let re = Regex::new(r"/Type /Page\b.*?/Contents (\d+) 0 R").unwrap();
    re.captures(pdf).expect("page has contents")[1].parse().unwrap()
}

#[test]
fn test_blank_a4_page() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(595.0, 842.0).unwrap();
    let pdf = text(&writer.finish().unwrap());

    assert!(pdf.starts_with("%PDF-1."));
    assert!(Regex::new(r"/Type /Pages /Kids \[\d+ 0 R\] /Count 1").unwrap().is_match(&pdf));
    assert!(pdf.contains("/MediaBox [0 0 595 842]"));
    assert!(Regex::new(r"/Type /Catalog /Pages \d+ 0 R").unwrap().is_match(&pdf));
    assert!(pdf.trim_end().ends_with("%%EOF"));
}

#[test]
fn test_single_glyph_run() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(595.0, 842.0).unwrap();
    let face = writer.register_face(Box::new(BlockFace));
    writer.set_font(Font::new(face, 20.0)).unwrap();

    // 500/1000 em at 20pt: glyphs 10pt apart, matching their advances
    let glyphs = "Hello"
        .chars()
        .enumerate()
        .map(|(i, ch)| PositionedGlyph::new(u32::from(ch) as u16, 100.0 + 10.0 * i as f64, 200.0, ch.to_string()))
        .collect();
    writer.draw_glyphs(&TextRun::new(glyphs)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let content = stream_data(&pdf, page_contents_id(&pdf));
    let count = |op: &str| Regex::new(&format!(r"(^|\s){}(\s|$)", op)).unwrap().find_iter(&content).count();
    assert_eq!(count("BT"), 1, "{}", content);
    assert_eq!(count("ET"), 1);
    assert_eq!(count("Tf"), 1);
    assert_eq!(count("Tj"), 1);
    assert_eq!(count("TJ"), 0);
    assert!(Regex::new(r"/F\d+ 20 Tf").unwrap().is_match(&content));
    assert!(pdf.contains("/Subtype /Type3"));
    assert!(pdf.contains("/ToUnicode"));
}

#[test]
fn test_kerned_run_uses_text_array() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(595.0, 842.0).unwrap();
    let face = writer.register_face(Box::new(BlockFace));
    writer.set_font(Font::new(face, 20.0)).unwrap();
    let glyphs = vec![
        PositionedGlyph::new(u16::from(b'A'), 100.0, 200.0, "A"),
        PositionedGlyph::new(u16::from(b'V'), 108.0, 200.0, "V"),
    ];
    writer.draw_glyphs(&TextRun::new(glyphs)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let content = stream_data(&pdf, page_contents_id(&pdf));
    assert!(content.contains("TJ"), "{}", content);
    assert!(content.contains(")100("), "expected a 100/1000 em adjustment in {}", content);
}

#[test]
fn test_widgets_sorted_by_tab_order() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(600.0, 900.0).unwrap();

    let mut expected: Vec<(i32, i64, i64, String)> = Vec::new();
    for i in 0..300 {
        let (col, row) = (i % 10, i / 10);
        let tab = (i * 7 % 5) as i32;
        let name = format!("w{}", i);
        let rect = Rect::new(10.0 + 55.0 * col as f64, 10.0 + 28.0 * row as f64, 50.0, 20.0);
        let description = WidgetDescription::new(
            WidgetKind::CheckBox {
                checked: false,
                on_value: "Yes".into(),
            },
            name.clone(),
            rect,
        )
        .with_tab_order(tab);
        writer.create_control(description, None).unwrap();
        // logical y grows downwards, so a smaller y is a higher top edge
        expected.push((tab, rect.y as i64, rect.x as i64, name));
    }
    expected.sort();
    let pdf = text(&writer.finish().unwrap());

    let objects = Regex::new(r"(?s)(\d+) 0 obj\n(.*?)\nendobj").unwrap();
    let field_name = Regex::new(r"/T \((w\d+)\)").unwrap();
    let mut names: HashMap<u32, String> = HashMap::new();
    for cap in objects.captures_iter(&pdf) {
        if let Some(name) = field_name.captures(&cap[2]) {
            names.insert(cap[1].parse().unwrap(), name[1].to_string());
        }
    }

    let annots = Regex::new(r"/Annots \[([^\]]*)\]").unwrap().captures(&pdf).expect("annotations")[1].to_string();
    let order: Vec<String> = Regex::new(r"(\d+) 0 R")
        .unwrap()
        .captures_iter(&annots)
        .map(|c| names[&c[1].parse::<u32>().unwrap()].clone())
        .collect();
    let expected: Vec<String> = expected.into_iter().map(|e| e.3).collect();
    assert_eq!(order.len(), 300);
    assert_eq!(order, expected);
    assert!(pdf.contains("/Tabs /S"));
}

#[test]
fn test_writes_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    let mut writer = PdfWriter::to_file(&path, uncompressed().with_title("File output")).unwrap();
    writer.new_page(200.0, 200.0).unwrap();
    writer.draw_rect(&Rect::new(10.0, 10.0, 50.0, 50.0)).unwrap();
    writer.emit().unwrap();
    drop(writer);

    let pdf = text(&std::fs::read(&path).unwrap());
    assert!(pdf.contains("/Title (File output)"));
    assert!(pdf.contains("/MediaBox [0 0 200 200]"));
    assert!(pdf.ends_with("%%EOF\n"));
}

#[test]
fn test_emit_twice_fails() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    writer.emit().unwrap();
    assert!(writer.emit().is_err());
    assert!(writer.new_page(100.0, 100.0).is_err());
}

/// Ids of every content stream of the first page.
fn page_content_ids(pdf: &str) -> Vec<u32> {
    let re = Regex::new(r"/Type /Page\b.*?/Contents (\[[^\]]*\]|\d+ 0 R)").unwrap();
    let contents = re.captures(pdf).expect("page has contents")[1].to_string();
    Regex::new(r"(\d+) 0 R")
        .unwrap()
        .captures_iter(&contents)
        .map(|c| c[1].parse().unwrap())
        .collect()
}

/// Bounds `[x0, y0, x1, y1]` of each `W* n` clip path in `content`.
fn clip_bounds(content: &str) -> Vec<[f64; 4]> {
    let point = Regex::new(r"(-?[\d.]+) (-?[\d.]+) [ml]\n").unwrap();
    let mut bounds = Vec::new();
    let mut rest = content;
    while let Some(end) = rest.find("W*\nn\n") {
        let head = &rest[..end];
        let start = head.rfind("q\n").max(head.rfind("\nn\n")).map_or(0, |i| i + 2);
        let mut b = [f64::MAX, f64::MAX, f64::MIN, f64::MIN];
        for cap in point.captures_iter(&head[start..]) {
            let (x, y): (f64, f64) = (cap[1].parse().unwrap(), cap[2].parse().unwrap());
            b = [b[0].min(x), b[1].min(y), b[2].max(x), b[3].max(y)];
        }
        bounds.push(b);
        rest = &rest[end + 5..];
    }
    bounds
}

fn jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x03, 0x01, 0x11, 0x00, 0xFF, 0xD9]);
    data
}

/// A letter page whose font lives in a separate foreign object.
fn letter_page() -> ForeignPage {
    let mut font = Dict::new();
    font.insert("Type".into(), Object::Name("Font".into()));
    font.insert("Subtype".into(), Object::Name("Type1".into()));
    font.insert("BaseFont".into(), Object::Name("Courier".into()));
    let mut fonts = Dict::new();
    fonts.insert("F1".into(), Object::Reference(7.into()));
    let mut resources = Dict::new();
    resources.insert("Font".into(), Object::Dictionary(fonts));

    ForeignPage {
        media_box: Rect::new(0.0, 0.0, 100.0, 50.0),
        content: b"BT /F1 12 Tf (Dear reader) Tj ET".to_vec(),
        resources: Object::Dictionary(resources),
        objects: BTreeMap::from([(7, Object::Dictionary(font))]),
        source_pdf: None,
        source_name: "letter.pdf".into(),
        page_index: 0,
        fallback: None,
    }
}

#[test]
fn test_map_mode_scales_logical_units() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    writer.set_map_mode(MapMode::new(MapUnit::Twip));
    writer.draw_rect(&Rect::new(200.0, 200.0, 400.0, 200.0)).unwrap();
    writer.set_map_mode(MapMode::new(MapUnit::Point).with_scale(2.0, 2.0));
    writer.draw_rect(&Rect::new(30.0, 5.0, 10.0, 5.0)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let content = stream_data(&pdf, page_contents_id(&pdf));
    assert!(content.contains("10 80 20 10 re\n"), "{}", content);
    assert!(content.contains("60 80 20 10 re\n"), "{}", content);
}

#[test]
fn test_clip_intersect_move_and_clear() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    let page = Rect::new(0.0, 0.0, 200.0, 100.0);

    writer.intersect_clip_rect(&Rect::new(0.0, 0.0, 100.0, 50.0)).unwrap();
    writer.intersect_clip_rect(&Rect::new(50.0, 0.0, 100.0, 50.0)).unwrap();
    writer.draw_rect(&page).unwrap();
    writer.move_clip_region(10.0, 20.0).unwrap();
    writer.draw_rect(&page).unwrap();
    writer.clear_clip_region();
    writer.draw_rect(&page).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let content = stream_data(&pdf, page_contents_id(&pdf));
    assert_eq!(clip_bounds(&content), vec![[50.0, 50.0, 100.0, 100.0], [60.0, 30.0, 110.0, 80.0]]);
    let last_clip = content.rfind("W*").unwrap();
    let last_restore = content.rfind("Q\n").unwrap();
    assert!(last_restore > last_clip);
    assert!(content.trim_end().ends_with("0 0 200 100 re\nB"), "{}", content);
}

#[test]
fn test_concave_clip_keeps_its_notch() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    writer.intersect_clip_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
    let ell = Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(100.0, 50.0),
        Point::new(50.0, 50.0),
        Point::new(50.0, 100.0),
        Point::new(0.0, 100.0),
    ]);
    writer
        .intersect_clip_region(&pdf_scribe::geometry::PolyPolygon::new(vec![ell]))
        .unwrap();
    writer.draw_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    // the L shape is applied as its own clip path, not as its bounding box
    let content = stream_data(&pdf, page_contents_id(&pdf));
    assert_eq!(clip_bounds(&content).len(), 2);
    assert!(content.contains("50 50 l\n"), "{}", content);
}

#[test]
fn test_flush_content_splits_page_streams() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    writer.set_clip_region(&pdf_scribe::geometry::PolyPolygon::from_rect(&Rect::new(0.0, 0.0, 150.0, 100.0)))
        .unwrap();
    writer.draw_rect(&Rect::new(10.0, 10.0, 20.0, 20.0)).unwrap();
    writer.flush_content().unwrap();
    writer.draw_rect(&Rect::new(40.0, 10.0, 20.0, 20.0)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let ids = page_content_ids(&pdf);
    assert_eq!(ids.len(), 2);
    for id in ids {
        let content = stream_data(&pdf, id);
        // every stream sets up its own clip and colors and closes its q
        assert_eq!(content.matches("W*\nn\n").count(), 1, "{}", content);
        assert!(content.contains("0 0 0 RG\n"), "{}", content);
        assert_eq!(content.matches("q\n").count(), content.matches("Q\n").count());
    }
}

#[test]
fn test_shapes_and_pixel() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    let zigzag = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
    writer.draw_polyline(&zigzag).unwrap();
    writer.draw_polygon(&zigzag).unwrap();
    let path = Path::new()
        .move_to(20.0, 20.0)
        .curve_to(Point::new(30.0, 10.0), Point::new(40.0, 10.0), Point::new(50.0, 20.0))
        .close();
    writer.draw_path(&path).unwrap();
    writer.draw_pixel(&Point::new(5.0, 5.0), Color::new(1.0, 0.0, 0.0)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let content = stream_data(&pdf, page_contents_id(&pdf));
    assert!(content.contains("0 100 m\n10 100 l\n10 90 l\nS\n"), "{}", content);
    assert!(content.contains("0 100 m\n10 100 l\n10 90 l\nh\nB\n"), "{}", content);
    assert!(content.contains("20 80 m\n30 90 40 90 50 80 c\nh\nB*\n"), "{}", content);
    assert!(content.contains("1 0 0 rg\n5 94 1 1 re\nf\n"), "{}", content);
}

#[test]
fn test_bold_text_does_not_widen_later_strokes() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(595.0, 842.0).unwrap();
    let face = writer.register_face(Box::new(BlockFace));
    writer.set_font(Font::new(face, 90.0).bold()).unwrap();
    let glyphs = vec![PositionedGlyph::new(u16::from(b'B'), 10.0, 100.0, "B")];
    writer.draw_glyphs(&TextRun::new(glyphs)).unwrap();
    writer.draw_line(&Point::new(10.0, 10.0), &Point::new(200.0, 10.0)).unwrap();
    let pdf = text(&writer.finish().unwrap());

    let content = stream_data(&pdf, page_contents_id(&pdf));
    assert!(content.contains("q\n3 w\n"), "{}", content);
    let end = content.find("ET\nQ\n").expect("bold run restores the line width");
    let tail = &content[end + 5..];
    assert!(tail.contains("10 832 m\n200 832 l\nS"), "{}", tail);
    assert!(!tail.contains(" w\n"), "{}", tail);
}

#[test]
fn test_jpeg_with_alpha() {
    let image = JpegImage::from_data(jpeg(2, 2)).unwrap().with_alpha(vec![0, 64, 128, 255]).unwrap();

    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    writer.draw_jpeg(&Rect::new(10.0, 10.0, 20.0, 20.0), &image).unwrap();
    assert!(!writer.warnings().contains(Warning::TransparencyOmitted));
    let pdf = text(&writer.finish().unwrap());
    assert!(pdf.contains("/Filter /DCTDecode"));
    assert!(pdf.contains("/SMask "));
    assert!(stream_data(&pdf, page_contents_id(&pdf)).contains(" Do\n"));

    let mut writer = PdfWriter::in_memory(uncompressed().with_version(PdfVersion::A1)).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    writer.draw_jpeg(&Rect::new(10.0, 10.0, 20.0, 20.0), &image).unwrap();
    assert!(writer.warnings().contains(Warning::TransparencyOmitted));
    let pdf = text(&writer.finish().unwrap());
    assert!(pdf.contains("/Filter /DCTDecode"));
    assert!(!pdf.contains("/SMask"));
}

#[test]
fn test_foreign_page_embedded_with_its_objects() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    writer.draw_foreign_page(&Rect::new(0.0, 0.0, 100.0, 50.0), letter_page()).unwrap();
    let pdf = text(&writer.finish().unwrap());

    assert!(pdf.contains("/Subtype /Form /BBox [0 0 100 50]"));
    assert!(pdf.contains("BT /F1 12 Tf (Dear reader) Tj ET"));
    assert!(pdf.contains("/BaseFont /Courier"));
    assert!(!pdf.contains("/Ref"));
}

#[test]
fn test_foreign_page_without_source_is_embedded() {
    let config = uncompressed().with_foreign_pdf(ForeignPdfPolicy::Reference);
    let mut writer = PdfWriter::in_memory(config.clone()).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    writer.draw_foreign_page(&Rect::new(0.0, 0.0, 100.0, 50.0), letter_page()).unwrap();
    let pdf = text(&writer.finish().unwrap());
    assert!(pdf.contains("BT /F1 12 Tf (Dear reader) Tj ET"));
    assert!(!pdf.contains("/Ref"));

    let mut page = letter_page();
    page.source_pdf = Some(b"%PDF-1.7\n%%EOF\n".to_vec());
    let mut writer = PdfWriter::in_memory(config).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    writer.draw_foreign_page(&Rect::new(0.0, 0.0, 100.0, 50.0), page).unwrap();
    let pdf = text(&writer.finish().unwrap());
    assert!(Regex::new(r"/Ref <</F \d+ 0 R /Page 0>>").unwrap().is_match(&pdf), "{}", pdf);
}

#[test]
fn test_screen_annotations() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(300.0, 300.0).unwrap();
    writer
        .create_screen(
            &Rect::new(10.0, 10.0, 160.0, 90.0),
            None,
            "https://example.com/intro.mp4",
            "video/mp4",
            Some("Intro clip"),
        )
        .unwrap();
    let media = EmbeddedFile::new("chime.wav", vec![0x52, 0x49, 0x46, 0x46]).with_mime_type("audio/wav");
    writer
        .create_embedded_screen(&Rect::new(10.0, 120.0, 40.0, 40.0), None, media, None)
        .unwrap();
    let pdf = text(&writer.finish().unwrap());

    assert_eq!(pdf.matches("/Subtype /Screen").count(), 2);
    assert_eq!(pdf.matches("/S /Rendition").count(), 2);
    assert!(pdf.contains("/FS /URL /F (https://example.com/intro.mp4)"));
    assert!(pdf.contains("/CT (video/mp4)"));
    assert!(pdf.contains("/CT (audio/wav)"));
    assert!(pdf.contains("/Contents (Intro clip)"));
    assert!(pdf.contains("(chime.wav)"));
}

#[test]
fn test_structure_attributes_bbox_and_language() {
    let mut writer = PdfWriter::in_memory(uncompressed().with_tagged(true)).unwrap();
    writer.new_page(200.0, 100.0).unwrap();
    let figure = writer.create_structure_element(StructElementType::Figure, None).unwrap();
    writer.begin_structure_element(figure);
    assert!(writer.set_structure_attribute(StructAttribute::Placement, AttrValue::Block));
    assert!(writer.set_structure_bbox(&Rect::new(10.0, 10.0, 50.0, 40.0)).unwrap());
    assert!(writer.set_structure_language("de-DE"));
    writer.draw_rect(&Rect::new(10.0, 10.0, 50.0, 40.0)).unwrap();
    writer.end_structure_element();
    let pdf = text(&writer.finish().unwrap());

    assert!(pdf.contains("/A <</O /Layout /Placement /Block /BBox [10 50 60 90]>>"), "{}", pdf);
    assert!(pdf.contains("/Lang (de-DE)"));

    let mut untagged = PdfWriter::in_memory(uncompressed()).unwrap();
    untagged.new_page(200.0, 100.0).unwrap();
    assert!(!untagged.set_structure_attribute(StructAttribute::Placement, AttrValue::Block));
    assert!(!untagged.set_structure_bbox(&Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap());
    assert!(!untagged.set_structure_language("en"));
}

#[test]
fn test_page_transition() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    writer.set_page_transition(Transition::Dissolve, 1.5).unwrap();
    let pdf = text(&writer.finish().unwrap());
    assert!(pdf.contains("/Trans <</Type /Trans /S /Dissolve /D 1.5>>"), "{}", pdf);
}

#[test]
fn test_outline_dest_can_be_changed() {
    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    let intro = writer.create_dest(&Rect::new(0.0, 0.0, 10.0, 10.0), None, DestFit::Xyz).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    let appendix = writer.create_dest(&Rect::new(0.0, 0.0, 100.0, 100.0), None, DestFit::Fit).unwrap();
    let item = writer.add_outline_item(0, "Appendix", Some(intro));
    assert!(writer.set_outline_dest(item, appendix));
    assert!(!writer.set_outline_dest(item + 10, appendix));
    assert!(writer.warnings().contains(Warning::InvalidReference));
    let pdf = text(&writer.finish().unwrap());

    let objects = Regex::new(r"(?s)(\d+) 0 obj\n(.*?)\nendobj").unwrap();
    let item = objects
        .captures_iter(&pdf)
        .map(|c| c[2].to_string())
        .find(|body| body.contains("/Title (Appendix)"))
        .expect("outline item");
    assert!(Regex::new(r"/Dest \[\d+ 0 R /Fit\]").unwrap().is_match(&item), "{}", item);
}

#[test]
fn test_doc_checksum_tracks_page_content() {
    let build = |width: f64| {
        let mut writer = PdfWriter::in_memory(uncompressed().with_doc_checksum(true)).unwrap();
        writer.new_page(100.0, 100.0).unwrap();
        writer.draw_rect(&Rect::new(10.0, 10.0, width, 10.0)).unwrap();
        let pdf = text(&writer.finish().unwrap());
        let re = Regex::new(r"/DocChecksum /([0-9A-F]{32})").unwrap();
        re.captures(&pdf).expect("trailer /DocChecksum")[1].to_string()
    };
    assert_eq!(build(20.0), build(20.0));
    assert_ne!(build(20.0), build(30.0));

    let mut writer = PdfWriter::in_memory(uncompressed()).unwrap();
    writer.new_page(100.0, 100.0).unwrap();
    assert!(!text(&writer.finish().unwrap()).contains("/DocChecksum"));
}
