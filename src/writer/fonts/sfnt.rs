//! `glyf`-based TrueType subsetting.
//!
//! The subset keeps the requested glyphs in order, followed by any glyphs
//! their composites reference. Glyph `i` of the request becomes glyph `i`
//! of the subset and is reachable through one-byte code `i` via a `(1,0)`
//! and a `(3,0)` cmap, the mappings PDF readers consult for symbolic
//! simple fonts.

use crate::error::{Error, Result};
use std::collections::HashMap;
use ttf_parser::{RawFace, Tag};

/// Hinting tables copied unchanged when present.
const HINTING_TABLES: [&[u8; 4]; 3] = [b"cvt ", b"fpgm", b"prep"];

/// Offset of `checkSumAdjustment` in `head`.
const HEAD_CHECKSUM: usize = 8;
/// Offset of `indexToLocFormat` in `head`.
const HEAD_LOCA_FORMAT: usize = 50;
/// Offset of `numberOfHMetrics` in `hhea`.
const HHEA_METRICS: usize = 34;
/// Offset of `numGlyphs` in `maxp`.
const MAXP_GLYPHS: usize = 4;

// composite glyph flags
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Build a subset font program holding `glyphs` (`.notdef` first).
pub fn subset_glyf(face: &RawFace<'_>, glyphs: &[u16]) -> Result<Vec<u8>> {
    if glyphs.is_empty() || glyphs.len() > 256 {
        return Err(Error::Font(format!("cannot subset {} glyphs into a simple font", glyphs.len())));
    }
    let table = |tag: &[u8; 4]| face.table(Tag::from_bytes(tag));
    let required = |tag: &[u8; 4]| {
        table(tag).ok_or_else(|| Error::Font(format!("missing '{}' table", String::from_utf8_lossy(tag))))
    };
    let head = required(b"head")?;
    let hhea = required(b"hhea")?;
    let maxp = required(b"maxp")?;
    let hmtx = required(b"hmtx")?;
    let loca = required(b"loca")?;
    let glyf = required(b"glyf")?;

    let source = Source {
        glyf,
        loca,
        long_loca: read_u16(head, HEAD_LOCA_FORMAT)? == 1,
        hmtx,
        num_h_metrics: usize::from(read_u16(hhea, HHEA_METRICS)?),
    };

    // new glyph order: the request, then composite components on demand
    let mut order: Vec<u16> = glyphs.to_vec();
    let mut index: HashMap<u16, u16> = HashMap::new();
    for (i, &g) in glyphs.iter().enumerate() {
        index.entry(g).or_insert(i as u16);
    }
    let mut bodies = Vec::with_capacity(order.len());
    let mut next = 0;
    while next < order.len() {
        let mut body = source.glyph(order[next])?.to_vec();
        if is_composite(&body) {
            remap_components(&mut body, |component| {
                if let Some(&new) = index.get(&component) {
                    return new;
                }
                let new = order.len() as u16;
                order.push(component);
                index.insert(component, new);
                new
            })?;
        }
        bodies.push(body);
        next += 1;
        if order.len() > usize::from(u16::MAX) {
            return Err(Error::Font("composite glyphs do not terminate".into()));
        }
    }

    let mut new_glyf = Vec::new();
    let mut new_loca = Vec::with_capacity((bodies.len() + 1) * 4);
    for body in &bodies {
        new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());
        new_glyf.extend_from_slice(body);
        pad4(&mut new_glyf);
    }
    new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());

    let mut new_hmtx = Vec::with_capacity(order.len() * 4);
    for &g in &order {
        let (advance, lsb) = source.metrics(g)?;
        new_hmtx.extend_from_slice(&advance.to_be_bytes());
        new_hmtx.extend_from_slice(&lsb.to_be_bytes());
    }

    let count = order.len() as u16;
    let mut new_head = head.to_vec();
    write_u32(&mut new_head, HEAD_CHECKSUM, 0)?;
    write_u16(&mut new_head, HEAD_LOCA_FORMAT, 1)?;
    let mut new_hhea = hhea.to_vec();
    write_u16(&mut new_hhea, HHEA_METRICS, count)?;
    let mut new_maxp = maxp.to_vec();
    write_u16(&mut new_maxp, MAXP_GLYPHS, count)?;

    let mut tables: Vec<([u8; 4], Vec<u8>)> = vec![
        (*b"cmap", code_cmap(glyphs.len())),
        (*b"glyf", new_glyf),
        (*b"head", new_head),
        (*b"hhea", new_hhea),
        (*b"hmtx", new_hmtx),
        (*b"loca", new_loca),
        (*b"maxp", new_maxp),
    ];
    for tag in HINTING_TABLES {
        if let Some(data) = table(tag) {
            tables.push((*tag, data.to_vec()));
        }
    }
    Ok(assemble(tables))
}

struct Source<'a> {
    glyf: &'a [u8],
    loca: &'a [u8],
    long_loca: bool,
    hmtx: &'a [u8],
    num_h_metrics: usize,
}

impl Source<'_> {
    fn glyph(&self, glyph: u16) -> Result<&[u8]> {
        let g = usize::from(glyph);
        let (start, end) = if self.long_loca {
            (read_u32(self.loca, g * 4)? as usize, read_u32(self.loca, g * 4 + 4)? as usize)
        } else {
            (
                usize::from(read_u16(self.loca, g * 2)?) * 2,
                usize::from(read_u16(self.loca, g * 2 + 2)?) * 2,
            )
        };
        self.glyf
            .get(start..end.max(start))
            .ok_or_else(|| Error::Font(format!("glyph {} outside 'glyf'", glyph)))
    }

    fn metrics(&self, glyph: u16) -> Result<(u16, i16)> {
        let g = usize::from(glyph);
        if self.num_h_metrics == 0 {
            return Err(Error::Font("'hhea' declares no horizontal metrics".into()));
        }
        if g < self.num_h_metrics {
            return Ok((read_u16(self.hmtx, g * 4)?, read_u16(self.hmtx, g * 4 + 2)? as i16));
        }
        let advance = read_u16(self.hmtx, (self.num_h_metrics - 1) * 4)?;
        let lsb_at = self.num_h_metrics * 4 + (g - self.num_h_metrics) * 2;
        Ok((advance, read_u16(self.hmtx, lsb_at).unwrap_or(0) as i16))
    }
}

fn is_composite(body: &[u8]) -> bool {
    body.len() >= 10 && i16::from_be_bytes([body[0], body[1]]) < 0
}

/// Rewrite every component glyph id of a composite glyph in place.
fn remap_components(body: &mut [u8], mut map: impl FnMut(u16) -> u16) -> Result<()> {
    let mut at = 10;
    loop {
        let flags = read_u16(body, at)?;
        let component = read_u16(body, at + 2)?;
        write_u16(body, at + 2, map(component))?;
        at += 4;
        at += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            at += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            at += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            at += 8;
        }
        if flags & MORE_COMPONENTS == 0 {
            return Ok(());
        }
    }
}

/// cmap mapping code `i` to glyph `i` for `count` codes, as `(1,0)`
/// format 0 and `(3,0)` format 4 at `0xF000 + i`.
fn code_cmap(count: usize) -> Vec<u8> {
    let mut mac = Vec::with_capacity(262);
    mac.extend_from_slice(&0u16.to_be_bytes());
    mac.extend_from_slice(&262u16.to_be_bytes());
    mac.extend_from_slice(&0u16.to_be_bytes());
    mac.extend((0..256).map(|code| if code < count { code as u8 } else { 0 }));

    let last = 0xF000 + count as u16 - 1;
    let mut win = Vec::with_capacity(40);
    win.extend_from_slice(&4u16.to_be_bytes());
    win.extend_from_slice(&32u16.to_be_bytes());
    win.extend_from_slice(&0u16.to_be_bytes());
    // two segments: the code range and the 0xFFFF terminator
    win.extend_from_slice(&4u16.to_be_bytes());
    win.extend_from_slice(&4u16.to_be_bytes());
    win.extend_from_slice(&1u16.to_be_bytes());
    win.extend_from_slice(&0u16.to_be_bytes());
    for end in [last, 0xFFFF] {
        win.extend_from_slice(&end.to_be_bytes());
    }
    win.extend_from_slice(&0u16.to_be_bytes());
    for start in [0xF000u16, 0xFFFF] {
        win.extend_from_slice(&start.to_be_bytes());
    }
    for delta in [0x1000u16, 1] {
        win.extend_from_slice(&delta.to_be_bytes());
    }
    win.extend_from_slice(&[0; 4]);

    let mut cmap = Vec::with_capacity(20 + mac.len() + win.len());
    cmap.extend_from_slice(&0u16.to_be_bytes());
    cmap.extend_from_slice(&2u16.to_be_bytes());
    for (platform, offset) in [(1u16, 20u32), (3, 20 + mac.len() as u32)] {
        cmap.extend_from_slice(&platform.to_be_bytes());
        cmap.extend_from_slice(&0u16.to_be_bytes());
        cmap.extend_from_slice(&offset.to_be_bytes());
    }
    cmap.extend_from_slice(&mac);
    cmap.extend_from_slice(&win);
    cmap
}

/// Lay out an sfnt file and fix up `head.checkSumAdjustment`.
pub(super) fn assemble(mut tables: Vec<([u8; 4], Vec<u8>)>) -> Vec<u8> {
    tables.sort_by(|a, b| a.0.cmp(&b.0));
    let count = tables.len() as u16;
    let selector = 15 - count.max(1).leading_zeros() as u16;
    let range = (1u16 << selector) * 16;

    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&range.to_be_bytes());
    out.extend_from_slice(&selector.to_be_bytes());
    out.extend_from_slice(&(count * 16 - range).to_be_bytes());

    let mut offset = 12 + 16 * tables.len();
    let mut head_at = None;
    for (tag, data) in &tables {
        out.extend_from_slice(tag);
        out.extend_from_slice(&checksum(data).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        if tag == b"head" {
            head_at = Some(offset);
        }
        offset += (data.len() + 3) & !3;
    }
    for (_, data) in &tables {
        out.extend_from_slice(data);
        pad4(&mut out);
    }
    if let Some(at) = head_at {
        let adjustment = 0xB1B0_AFBAu32.wrapping_sub(checksum(&out));
        out[at + HEAD_CHECKSUM..at + HEAD_CHECKSUM + 4].copy_from_slice(&adjustment.to_be_bytes());
    }
    out
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn pad4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

fn read_u16(data: &[u8], at: usize) -> Result<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| Error::Font(format!("font table truncated at {}", at)))
}

fn read_u32(data: &[u8], at: usize) -> Result<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::Font(format!("font table truncated at {}", at)))
}

fn write_u16(data: &mut [u8], at: usize, value: u16) -> Result<()> {
    let slot = data
        .get_mut(at..at + 2)
        .ok_or_else(|| Error::Font(format!("font table truncated at {}", at)))?;
    slot.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

fn write_u32(data: &mut [u8], at: usize, value: u32) -> Result<()> {
    let slot = data
        .get_mut(at..at + 4)
        .ok_or_else(|| Error::Font(format!("font table truncated at {}", at)))?;
    slot.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ttf_parser::{Face, GlyphId};

    fn be16(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|&v| (v as u16).to_be_bytes()).collect()
    }

    /// A triangle glyph with a bounding box of `size` units.
    fn triangle(size: i32) -> Vec<u8> {
        let mut g = be16(&[1, 0, 0, size, size, 2, 0]);
        // (0,0) (size,0) (size/2,size), all on-curve with one-byte deltas
        g.extend_from_slice(&[0x37, 0x37, 0x27]);
        g.extend_from_slice(&[0, size as u8, (size / 2) as u8]);
        g.extend_from_slice(&[0, 0, size as u8]);
        g
    }

    /// Composite glyph placing `component` once without a transform.
    fn composite(component: u16) -> Vec<u8> {
        let mut g = be16(&[-1, 0, 0, 60, 60]);
        // ARGS_ARE_XY_VALUES with byte offsets
        g.extend_from_slice(&be16(&[0x0002, i32::from(component)]));
        g.extend_from_slice(&[0, 0]);
        g
    }

    /// Five-glyph font: 0 empty, 1..3 triangles, 4 a composite of 2.
    pub(crate) fn sample_font() -> Vec<u8> {
        let bodies = [Vec::new(), triangle(100), triangle(60), triangle(20), composite(2)];
        let mut glyf = Vec::new();
        let mut loca = Vec::new();
        for body in &bodies {
            loca.extend_from_slice(&((glyf.len() / 2) as u16).to_be_bytes());
            glyf.extend_from_slice(body);
            pad4(&mut glyf);
        }
        loca.extend_from_slice(&((glyf.len() / 2) as u16).to_be_bytes());

        let mut head = be16(&[1, 0, 1, 0, 0, 0, 0x5F0F, 0x3CF5, 0, 1000]);
        head.extend_from_slice(&[0; 16]);
        head.extend_from_slice(&be16(&[0, 0, 100, 100, 0, 8, 2, 0, 0]));
        let mut hhea = be16(&[1, 0, 800, -200, 0, 600, 0, 0, 100, 1, 0, 0]);
        hhea.extend_from_slice(&[0; 10]);
        hhea.extend_from_slice(&be16(&[3]));
        let maxp = be16(&[0, 0x5000, 5]);
        let hmtx = be16(&[0, 0, 600, 0, 500, 0, 0, 0]);
        let cmap: Vec<u8> = be16(&[0, 1, 1, 0, 0, 12, 0, 262, 0])
            .into_iter()
            .chain((0..=255u8).map(|c| if c == b'A' { 1 } else { 0 }))
            .collect();

        assemble(vec![
            (*b"head", head),
            (*b"hhea", hhea),
            (*b"maxp", maxp),
            (*b"hmtx", hmtx),
            (*b"loca", loca),
            (*b"glyf", glyf),
            (*b"cmap", cmap),
        ])
    }

    #[test]
    fn test_subset_keeps_request_order() {
        let data = sample_font();
        let face = Face::parse(&data, 0).unwrap();
        let subset = subset_glyf(face.raw_face(), &[0, 3, 1]).unwrap();

        let sub = Face::parse(&subset, 0).unwrap();
        assert_eq!(sub.number_of_glyphs(), 3);
        assert_eq!(sub.glyph_bounding_box(GlyphId(1)).map(|b| b.x_max), Some(20));
        assert_eq!(sub.glyph_bounding_box(GlyphId(2)).map(|b| b.x_max), Some(100));
        // glyph 3 sits past numberOfHMetrics and inherits the last advance
        assert_eq!(sub.glyph_hor_advance(GlyphId(1)), Some(500));
        assert_eq!(sub.glyph_hor_advance(GlyphId(2)), Some(600));
    }

    #[test]
    fn test_composite_pulls_in_component() {
        let data = sample_font();
        let face = Face::parse(&data, 0).unwrap();
        let subset = subset_glyf(face.raw_face(), &[0, 4]).unwrap();

        let sub = Face::parse(&subset, 0).unwrap();
        assert_eq!(sub.number_of_glyphs(), 3);
        assert_eq!(sub.glyph_bounding_box(GlyphId(2)).map(|b| b.x_max), Some(60));
        assert_eq!(sub.glyph_bounding_box(GlyphId(1)).map(|b| b.x_max), Some(60));
    }

    #[test]
    fn test_codes_map_to_subset_glyphs() {
        let data = sample_font();
        let face = Face::parse(&data, 0).unwrap();
        let subset = subset_glyf(face.raw_face(), &[0, 2, 1]).unwrap();
        let sub = Face::parse(&subset, 0).unwrap();
        let subtable = |platform| {
            let cmap = sub.tables().cmap.unwrap();
            cmap.subtables.into_iter().find(|s| s.platform_id == platform).unwrap()
        };
        let mac = subtable(ttf_parser::PlatformId::Macintosh);
        assert_eq!(mac.glyph_index(2), Some(GlyphId(2)));
        let win = subtable(ttf_parser::PlatformId::Windows);
        assert_eq!(win.glyph_index(0xF001), Some(GlyphId(1)));
        assert_eq!(win.glyph_index(0xF005), None);
    }

    #[test]
    fn test_whole_file_checksum() {
        let data = sample_font();
        let face = Face::parse(&data, 0).unwrap();
        let subset = subset_glyf(face.raw_face(), &[0, 1]).unwrap();
        assert_eq!(checksum(&subset), 0xB1B0_AFBA);
    }

    #[test]
    fn test_too_many_glyphs_rejected() {
        let data = sample_font();
        let face = Face::parse(&data, 0).unwrap();
        assert!(subset_glyf(face.raw_face(), &[1; 300]).is_err());
    }
}
