//! Signed documents: the `/ByteRange` must cover every byte of the file
//! except the `/Contents` value, and the provider's signature must land in
//! that value as zero-padded hex.

use pdf_scribe::config::SignatureConfig;
use pdf_scribe::error::Warning;
use pdf_scribe::geometry::Rect;
use pdf_scribe::signatures::SignatureProvider;
use pdf_scribe::{PdfWriter, PdfWriterConfig, Result};
use regex::bytes::Regex;
use std::cell::RefCell;
use std::rc::Rc;

/// Returns a fixed "signature" and remembers what it was asked to sign.
struct RecordingProvider {
    seen: Rc<RefCell<Vec<u8>>>,
}

impl SignatureProvider for RecordingProvider {
    fn sign(&self, signed_bytes: &[u8]) -> Result<Vec<u8>> {
        *self.seen.borrow_mut() = signed_bytes.to_vec();
        Ok(vec![0x30, 0x82, 0xDE, 0xAD, 0xBE, 0xEF])
    }
}

fn signed_config() -> PdfWriterConfig {
    PdfWriterConfig::default().with_compress(false).with_signature(SignatureConfig {
        reason: Some("Approved".into()),
        reserved_size: 512,
        ..Default::default()
    })
}

fn number(bytes: &[u8]) -> usize {
    std::str::from_utf8(bytes).unwrap().parse().unwrap()
}

#[test]
fn test_signature_backfill_covers_file() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut writer = PdfWriter::in_memory(signed_config()).unwrap();
    writer.set_signature_provider(Box::new(RecordingProvider { seen: Rc::clone(&seen) }));
    writer.new_page(300.0, 300.0).unwrap();
    writer.draw_rect(&Rect::new(10.0, 10.0, 100.0, 100.0)).unwrap();
    let pdf = writer.finish().unwrap();

    let range = Regex::new(r"/ByteRange \[(\d+) (\d+) (\d+) (\d+) *\]").unwrap();
    let caps = range.captures(&pdf).expect("filled ByteRange");
    let [start, before, after, rest] = [1, 2, 3, 4].map(|i| number(&caps[i]));
    assert_eq!(start, 0);
    assert_eq!(after + rest, pdf.len());
    assert_eq!(after - before, 512 * 2 + 2);
    assert_eq!(pdf[before], b'<');
    assert_eq!(pdf[after - 1], b'>');

    let contents = &pdf[before + 1..after - 1];
    assert!(contents.starts_with(b"3082DEADBEEF"));
    assert!(contents[12..].iter().all(|&b| b == b'0'));

    let mut expected = pdf[..before].to_vec();
    expected.extend_from_slice(&pdf[after..]);
    assert_eq!(*seen.borrow(), expected);

    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached"));
    assert!(text.contains("/Reason (Approved)"));
    assert!(text.contains("/SigFlags 3"));
    assert!(text.contains("/FT /Sig"));

    // the only field is the implicit signature, so the AcroForm font is allocated late
    let helv = Regex::new(r"/DR <</Font <</Helv (\d+) 0 R>>>>").unwrap();
    let font_id = number(&helv.captures(&pdf).expect("AcroForm /DR")[1]);
    let header = format!("\n{} 0 obj\n<</Type /Font", font_id);
    assert!(text.contains(&header), "widget font {} not written", font_id);
}

#[test]
fn test_signature_without_provider_warns() {
    let mut writer = PdfWriter::in_memory(signed_config()).unwrap();
    writer.new_page(300.0, 300.0).unwrap();
    writer.emit().unwrap();
    assert!(writer.warnings().contains(Warning::SignatureFailed));
}

#[test]
fn test_oversized_signature_is_reported() {
    struct Huge;
    impl SignatureProvider for Huge {
        fn sign(&self, _signed_bytes: &[u8]) -> Result<Vec<u8>> {
            Ok(vec![0xAB; 4096])
        }
    }

    let mut writer = PdfWriter::in_memory(signed_config()).unwrap();
    writer.set_signature_provider(Box::new(Huge));
    writer.new_page(300.0, 300.0).unwrap();
    writer.emit().unwrap();
    assert!(writer.warnings().contains(Warning::SignatureFailed));
}
