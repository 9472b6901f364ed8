//! PDF writing.
//!
//! ## Architecture
//!
//! ```text
//! drawing / text / annotation calls
//!     ↓
//! [PdfWriter] (page lifecycle, graphics state, redirection)
//!     ↓
//! [ContentStreamBuilder] (operators → content stream bytes)
//!     ↓                               ↘
//! [resource registries]               page content stream objects
//! (fonts, images, shadings, patterns,  written when the page ends
//!  ExtGStates, structure, annotations)
//!     ↓
//! emit(): deferred objects, catalog, xref, trailer, signature backfill
//! ```
//!
//! Every indirect object goes through [`ObjectSerializer`] and is encrypted
//! for its own object number when the document is encrypted.
//!
//! ## Example
//!
//! ```ignore
//! use pdf_scribe::writer::{PdfWriter, PdfWriterConfig};
//! use pdf_scribe::geometry::Rect;
//!
//! let mut writer = PdfWriter::in_memory(PdfWriterConfig::default())?;
//! writer.new_page(595.0, 842.0)?;
//! writer.draw_rect(&Rect::new(72.0, 72.0, 200.0, 100.0))?;
//! let bytes = writer.finish()?;
//! ```

pub mod allocator;
pub mod annotations;
pub mod content;
mod document;
mod drawing;
pub mod embedded_files;
pub mod fonts;
pub mod gradient;
pub mod graphics_state;
pub mod image;
mod interactive;
pub mod metadata;
pub mod outline;
pub mod output;
pub mod page;
pub mod primitives;
pub mod resources;
pub mod serializer;
pub mod structure;
pub mod text;

pub use crate::config::PdfWriterConfig;
pub use allocator::ObjectAllocator;
pub use annotations::{DestFit, Destination, LinkTarget, WidgetDescription, WidgetKind};
pub use content::{Color, ContentStreamBuilder, ContentStreamOp, LineCap, LineJoin, TextArrayItem};
pub use document::PdfWriter;
pub use embedded_files::{AFRelationship, EmbeddedFile};
pub use fonts::{Font, FontFace, TrueTypeFace};
pub use gradient::{Gradient, GradientStyle, Hatch, HatchStyle};
pub use graphics_state::{BlendMode, ExtGStateBuilder, LineInfo, PushFlags};
pub use image::{Bitmap, ColorSpace, ForeignPage, JpegImage};
pub use output::PdfOutput;
pub use serializer::ObjectSerializer;
pub use structure::{AttrValue, StructAttribute, StructElementType};
pub use text::{PositionedGlyph, TextDecoration, TextRun};

use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// An indirect object ready to be written: object id and value.
pub type IndirectObject = (u32, Object);

/// Deflate `data` with zlib framing (`/FlateDecode`).
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish().map_err(Error::from)
}

/// Build a stream object, compressing `data` when asked.
///
/// `/Length` is written by the serializer from the final payload.
pub(crate) fn stream_object(mut dict: Dict, data: Vec<u8>, compress: bool) -> Result<Object> {
    let data = if compress && !data.is_empty() {
        dict.insert("Filter".into(), Object::Name("FlateDecode".into()));
        deflate(&data)?
    } else {
        data
    };
    Ok(Object::Stream {
        dict,
        data: bytes::Bytes::from(data),
    })
}
