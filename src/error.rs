//! Error types for the PDF writer.
//!
//! Fatal failures are reported through [`Error`]. Content-limit problems that
//! still allow a valid file to be produced are collected as [`Warning`]s in a
//! [`WarningSet`] that the caller can inspect after `emit()`.

use std::collections::BTreeSet;

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while producing a PDF file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the output sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous write failed; the document accepts no further output
    #[error("Document is closed after a previous write failure")]
    Closed,

    /// An object offset was recorded twice
    #[error("Object {0} was already written")]
    ObjectRewritten(u32),

    /// An allocated object never received an offset
    #[error("Object {0} was allocated but never written")]
    ObjectNotWritten(u32),

    /// An object id outside the allocated range
    #[error("Unknown object id {0}")]
    UnknownObject(u32),

    /// Stream begin/end calls were not paired
    #[error("Unbalanced stream: {0}")]
    UnbalancedStream(String),

    /// Caller passed an unusable value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Key derivation or cipher failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Signature creation or backfill failure
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Font program or glyph data problem
    #[error("Font error: {0}")]
    Font(String),

    /// Image data problem
    #[error("Image error: {0}")]
    Image(String),

    /// Degenerate rectangle or transform (zero extent)
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

/// Non-fatal problems recorded during writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Warning {
    /// Transparency was requested but the target version forbids it;
    /// the content was drawn opaque.
    TransparencyOmitted,
    /// An alpha mask was dropped from an image for the same reason.
    TransparencyDowngraded,
    /// A dash pattern exceeded the array limit and was stroked solid.
    DashPatternSimplified,
    /// The detached signature could not be created or inserted.
    SignatureFailed,
    /// PDF/A output without an ICC profile for the output intent.
    OutputIntentMissing,
    /// A link, destination, outline or structure id was out of range.
    InvalidReference,
}

/// Set of warnings accumulated over a document's lifetime.
#[derive(Debug, Clone, Default)]
pub struct WarningSet {
    warnings: BTreeSet<Warning>,
}

impl WarningSet {
    /// Create an empty warning set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning. Returns `true` when it was not yet present.
    pub fn insert(&mut self, warning: Warning) -> bool {
        let fresh = self.warnings.insert(warning);
        if fresh {
            log::warn!("pdf writer warning: {:?}", warning);
        }
        fresh
    }

    /// Check whether a warning was recorded.
    pub fn contains(&self, warning: Warning) -> bool {
        self.warnings.contains(&warning)
    }

    /// Iterate over recorded warnings in stable order.
    pub fn iter(&self) -> impl Iterator<Item = Warning> + '_ {
        self.warnings.iter().copied()
    }

    /// Number of distinct warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Whether no warning was recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
