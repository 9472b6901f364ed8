//! Glyph registry: `(face, glyph)` to `(subset font object, one-byte code)`.

use super::{FaceId, GlyphKind};
use crate::writer::allocator::ObjectAllocator;
use std::collections::HashMap;

/// Codes per subset; code 0 stays `.notdef` and 255 is kept free.
pub const MAX_SUBSET_GLYPHS: usize = 254;

/// Which encoder a subset goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsetKind {
    /// Embedded font program, or a Type 3 outline font when the face has none
    Outline,
    /// Type 3 font with color, bitmap or variable glyphs
    Type3,
}

/// Result of registering a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphMapping {
    /// Object id of the subset font
    pub font_id: u32,
    /// Code of the glyph in that subset
    pub code: u8,
    /// The glyph's text cannot be expressed through ToUnicode alone
    pub needs_actual_text: bool,
}

/// One glyph of a subset.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphEntry {
    /// Glyph id in the face
    pub glyph: u16,
    /// Code in the subset
    pub code: u8,
    /// Advance width in 1/1000 em
    pub width: i32,
    /// Text recorded for ToUnicode
    pub unicode: Vec<char>,
    /// Encoding kind of the glyph
    pub kind: GlyphKind,
}

/// A subset font object under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Subset {
    /// Face the glyphs come from
    pub face: FaceId,
    /// Object id of the font dictionary
    pub font_id: u32,
    /// Encoder
    pub kind: SubsetKind,
    /// Glyphs in code order, codes starting at 1
    pub glyphs: Vec<GlyphEntry>,
}

impl Subset {
    fn is_full(&self) -> bool {
        self.glyphs.len() >= MAX_SUBSET_GLYPHS
    }

    /// Lowest and highest code used.
    pub fn code_range(&self) -> (u8, u8) {
        let last = self.glyphs.last().map(|g| g.code).unwrap_or(1);
        (1, last)
    }

    /// Glyph ids in code order, for subset programs (`.notdef` first).
    pub fn program_glyphs(&self) -> Vec<u16> {
        std::iter::once(0).chain(self.glyphs.iter().map(|g| g.glyph)).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    subset: usize,
    index: usize,
}

/// All subsets of all faces, in creation order.
#[derive(Debug, Default)]
pub struct GlyphRegistry {
    subsets: Vec<Subset>,
    glyphs: HashMap<(FaceId, u16), Slot>,
    /// Currently filling subset per face and kind
    open: HashMap<(FaceId, SubsetKind), usize>,
}

impl GlyphRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a glyph to its subset font and code.
    ///
    /// Registering the same `(face, glyph)` again returns the same mapping
    /// and leaves the subset unchanged. `width` is the advance in 1/1000 em.
    pub fn register(
        &mut self,
        allocator: &mut ObjectAllocator,
        face: FaceId,
        glyph: u16,
        kind: GlyphKind,
        unicode: &[char],
        width: i32,
    ) -> GlyphMapping {
        if let Some(slot) = self.glyphs.get(&(face, glyph)).copied() {
            let subset = &self.subsets[slot.subset];
            let entry = &subset.glyphs[slot.index];
            return GlyphMapping {
                font_id: subset.font_id,
                code: entry.code,
                needs_actual_text: unicode.len() > 1 || entry.unicode.as_slice() != unicode,
            };
        }

        let subset_kind = if kind.needs_type3() {
            SubsetKind::Type3
        } else {
            SubsetKind::Outline
        };
        let subset_index = match self.open.get(&(face, subset_kind)) {
            Some(&i) if !self.subsets[i].is_full() => i,
            _ => {
                let font_id = allocator.create_object();
                log::debug!("new {:?} subset {} for face {}", subset_kind, font_id, face);
                self.subsets.push(Subset {
                    face,
                    font_id,
                    kind: subset_kind,
                    glyphs: Vec::new(),
                });
                let i = self.subsets.len() - 1;
                self.open.insert((face, subset_kind), i);
                i
            },
        };

        let subset = &mut self.subsets[subset_index];
        let index = subset.glyphs.len();
        let code = (index + 1) as u8;
        subset.glyphs.push(GlyphEntry {
            glyph,
            code,
            width,
            unicode: unicode.to_vec(),
            kind,
        });
        self.glyphs.insert((face, glyph), Slot { subset: subset_index, index });

        GlyphMapping {
            font_id: subset.font_id,
            code,
            needs_actual_text: unicode.len() > 1,
        }
    }

    /// Look up a registered glyph.
    pub fn lookup(&self, face: FaceId, glyph: u16) -> Option<&GlyphEntry> {
        self.glyphs
            .get(&(face, glyph))
            .map(|slot| &self.subsets[slot.subset].glyphs[slot.index])
    }

    /// All subsets in creation order.
    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    /// Number of subsets.
    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    /// Whether no glyph was registered.
    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }
}
