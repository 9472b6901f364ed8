//! Tagged output: every structure element is written once and is listed
//! exactly once among the kids of its `/P` parent.

use pdf_scribe::geometry::Rect;
use pdf_scribe::writer::StructElementType;
use pdf_scribe::{PdfVersion, PdfWriter, PdfWriterConfig};
use regex::Regex;
use std::collections::HashMap;

fn tagged() -> PdfWriterConfig {
    PdfWriterConfig::default().with_compress(false).with_tagged(true)
}

/// Object bodies by id; panics if an id is written twice.
fn objects(pdf: &str) -> HashMap<u32, String> {
    let re = Regex::new(r"(?s)(?:^|\n)(\d+) 0 obj\n(.*?)\nendobj").unwrap();
    let mut bodies = HashMap::new();
    for cap in re.captures_iter(pdf) {
        let id: u32 = cap[1].parse().unwrap();
        assert!(bodies.insert(id, cap[2].to_string()).is_none(), "object {} written twice", id);
    }
    bodies
}

/// Checks the parent/kid invariant and returns the number of elements.
fn check_tree(pdf: &str) -> usize {
    let bodies = objects(pdf);
    let parent = Regex::new(r"/P (\d+) 0 R").unwrap();
    let mut elements = 0;
    for (id, body) in bodies.iter().filter(|(_, b)| b.starts_with("<</Type /StructElem")) {
        elements += 1;
        let parent_id: u32 = parent.captures(body).expect("element without /P")[1].parse().unwrap();
        let parent_body = bodies
            .get(&parent_id)
            .unwrap_or_else(|| panic!("parent {} of {} not written", parent_id, id));
        assert!(
            parent_body.starts_with("<</Type /StructElem") || parent_body.starts_with("<</Type /StructTreeRoot"),
            "parent {} of {} is not a structure node",
            parent_id,
            id
        );
        let kid = Regex::new(&format!(r"\b{} 0 R\b", id)).unwrap();
        assert_eq!(kid.find_iter(parent_body).count(), 1, "{} among the kids of {}", id, parent_id);
    }
    elements
}

#[test]
fn test_nested_elements_listed_once() {
    let mut w = PdfWriter::in_memory(tagged()).unwrap();
    w.new_page(595.0, 842.0).unwrap();

    let doc = w.create_structure_element(StructElementType::Document, None).unwrap();
    w.begin_structure_element(doc);
    let sect = w.create_structure_element(StructElementType::Section, None).unwrap();
    w.begin_structure_element(sect);
    let first = w.create_structure_element(StructElementType::Paragraph, None).unwrap();
    w.begin_structure_element(first);
    w.draw_rect(&Rect::new(10.0, 10.0, 50.0, 10.0)).unwrap();
    w.end_structure_element();

    // kids of a non-structure element are lifted into its parent
    let wrapper = w.create_structure_element(StructElementType::NonStructElement, None).unwrap();
    w.begin_structure_element(wrapper);
    let second = w.create_structure_element(StructElementType::Paragraph, None).unwrap();
    w.begin_structure_element(second);
    w.draw_rect(&Rect::new(10.0, 30.0, 50.0, 10.0)).unwrap();
    w.end_structure_element();
    w.end_structure_element();
    w.end_structure_element();

    w.new_page(595.0, 842.0).unwrap();
    let figure = w.create_structure_element(StructElementType::Figure, None).unwrap();
    w.begin_structure_element(figure);
    assert!(w.set_alternate_text("A chart"));
    w.draw_ellipse(&Rect::new(100.0, 100.0, 80.0, 60.0)).unwrap();
    w.end_structure_element();
    w.end_structure_element();
    assert!(!w.end_structure_element());

    let pdf = String::from_utf8_lossy(&w.finish().unwrap()).into_owned();
    assert_eq!(check_tree(&pdf), 5);
    assert!(!pdf.contains("/S /NonStruct"));
    assert!(pdf.contains("/Alt (A chart)"));
    assert!(pdf.contains("/StructTreeRoot"));
    assert!(Regex::new(r"/ParentTree \d+ 0 R /ParentTreeNextKey 2").unwrap().is_match(&pdf));
    assert!(pdf.contains("/MarkInfo <</Marked true>>"));
    assert!(pdf.contains("/P<</MCID 0>>BDC"));
}

#[test]
fn test_alias_goes_to_role_map() {
    let mut w = PdfWriter::in_memory(tagged()).unwrap();
    w.new_page(200.0, 200.0).unwrap();
    let note = w.create_structure_element(StructElementType::Paragraph, Some("Callout")).unwrap();
    w.begin_structure_element(note);
    w.draw_rect(&Rect::new(10.0, 10.0, 20.0, 20.0)).unwrap();
    w.end_structure_element();
    let pdf = String::from_utf8_lossy(&w.finish().unwrap()).into_owned();

    check_tree(&pdf);
    assert!(pdf.contains("/S /Callout"));
    assert!(pdf.contains("/RoleMap <</Callout /P>>"));
}

#[test]
fn test_wide_element_split_into_divisions() {
    let mut w = PdfWriter::in_memory(tagged().with_version(PdfVersion::V1_7)).unwrap();
    w.new_page(200.0, 200.0).unwrap();
    let sect = w.create_structure_element(StructElementType::Section, None).unwrap();
    w.begin_structure_element(sect);
    for _ in 0..8200 {
        w.create_structure_element(StructElementType::Span, None).unwrap();
    }
    w.end_structure_element();
    let pdf = String::from_utf8_lossy(&w.finish().unwrap()).into_owned();

    // 1 section, 8200 spans and 2 synthetic divisions
    assert_eq!(check_tree(&pdf), 8203);
    assert_eq!(pdf.matches("/S /Div").count(), 2);
}
