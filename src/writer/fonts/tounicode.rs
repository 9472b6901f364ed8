//! ToUnicode CMaps for one-byte subset fonts.

use super::registry::Subset;
use std::fmt::Write;

/// Entries per `beginbfchar` section.
const BFCHAR_CHUNK: usize = 100;

/// Build the ToUnicode CMap of a subset.
///
/// Returns `None` when no glyph carries text.
pub fn build_tounicode_cmap(subset: &Subset) -> Option<Vec<u8>> {
    let mappings: Vec<(u8, String)> = subset
        .glyphs
        .iter()
        .filter(|g| !g.unicode.is_empty())
        .map(|g| (g.code, utf16_hex(&g.unicode)))
        .collect();
    if mappings.is_empty() {
        return None;
    }

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo <<\n");
    cmap.push_str("  /Registry (Adobe)\n");
    cmap.push_str("  /Ordering (UCS)\n");
    cmap.push_str("  /Supplement 0\n");
    cmap.push_str(">> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
    cmap.push_str("/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n");
    cmap.push_str("<00> <FF>\n");
    cmap.push_str("endcodespacerange\n");

    for chunk in mappings.chunks(BFCHAR_CHUNK) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (code, text) in chunk {
            let _ = writeln!(cmap, "<{:02X}> <{}>", code, text);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\n");
    cmap.push_str("end\n");
    Some(cmap.into_bytes())
}

/// UTF-16BE hex digits of a code point sequence.
fn utf16_hex(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len() * 4);
    let mut units = [0u16; 2];
    for ch in chars {
        for unit in ch.encode_utf16(&mut units).iter() {
            let _ = write!(out, "{:04X}", unit);
        }
    }
    out
}
