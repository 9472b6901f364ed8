#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::should_implement_trait)]

//! # PDF Scribe
//!
//! Streaming PDF writer: pages, fonts, images and annotations go out to
//! the output sink as soon as they are complete, and a final
//! [`PdfWriter::emit`] writes the shared resources, the catalog, the
//! cross-reference table and the trailer.
//!
//! ## Features
//!
//! - **Drawing**: paths, polygons, clipping, dash patterns, gradients, hatches,
//!   tiling patterns and transparency groups in a logical coordinate space
//! - **Text**: glyph runs in subset TrueType or Type 3 fonts with ToUnicode
//!   maps and ActualText
//! - **Images**: raw bitmaps with alpha masks, JPEG passthrough and pages of
//!   other PDFs (embedded or as reference XObjects)
//! - **Interactive content**: links, notes, screens, form fields, outline,
//!   named destinations and file attachments
//! - **Tagged PDF**: structure tree with marked content, PDF/UA and PDF/A
//!   identification in XMP metadata
//! - **Security**: RC4/AES encryption with the standard security handler and
//!   detached signatures backfilled into a ByteRange placeholder
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_scribe::geometry::Rect;
//! use pdf_scribe::writer::Color;
//! use pdf_scribe::{PdfWriter, PdfWriterConfig};
//!
//! # fn main() -> pdf_scribe::Result<()> {
//! let config = PdfWriterConfig::default().with_title("Report");
//! let mut writer = PdfWriter::to_file("report.pdf", config)?;
//! writer.new_page(595.0, 842.0)?;
//! writer.set_fill_color(Some(Color::new(0.2, 0.4, 0.8)));
//! writer.draw_rect(&Rect::new(72.0, 72.0, 200.0, 100.0))?;
//! writer.emit()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encryption;
pub mod error;
pub mod geometry;
pub mod object;
pub mod signatures;
pub mod writer;

pub use config::{PdfVersion, PdfWriterConfig};
pub use error::{Error, Result, Warning, WarningSet};
pub use writer::PdfWriter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_scribe");
    }
}
