//! Writer configuration.
//!
//! Everything the host can choose before the first page is written: target
//! version or conformance profile, encryption, signing, viewer preferences and
//! link handling. All types serialize with serde so a host can keep the
//! configuration in a JSON file.

use crate::encryption::{Algorithm, Permissions};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Target PDF version or conformance profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PdfVersion {
    /// PDF 1.3 (no transparency)
    V1_3,
    /// PDF 1.4
    V1_4,
    /// PDF 1.5
    V1_5,
    /// PDF 1.6
    V1_6,
    /// PDF 1.7
    #[default]
    V1_7,
    /// PDF 2.0
    V2_0,
    /// PDF/A-1b (based on 1.4, no transparency)
    A1,
    /// PDF/A-2b (based on 1.7)
    A2,
    /// PDF/A-3b (based on 1.7, arbitrary embedded files)
    A3,
    /// PDF/A-4 (based on 2.0)
    A4,
}

impl PdfVersion {
    /// Version string written in the `%PDF-x.y` header.
    pub fn header(self) -> &'static str {
        match self {
            PdfVersion::V1_3 => "1.3",
            PdfVersion::V1_4 | PdfVersion::A1 => "1.4",
            PdfVersion::V1_5 => "1.5",
            PdfVersion::V1_6 => "1.6",
            PdfVersion::V1_7 | PdfVersion::A2 | PdfVersion::A3 => "1.7",
            PdfVersion::V2_0 | PdfVersion::A4 => "2.0",
        }
    }

    /// Numeric version times ten (13, 14, ..., 20) used for feature checks.
    pub fn level(self) -> u8 {
        match self {
            PdfVersion::V1_3 => 13,
            PdfVersion::V1_4 | PdfVersion::A1 => 14,
            PdfVersion::V1_5 => 15,
            PdfVersion::V1_6 => 16,
            PdfVersion::V1_7 | PdfVersion::A2 | PdfVersion::A3 => 17,
            PdfVersion::V2_0 | PdfVersion::A4 => 20,
        }
    }

    /// PDF/A part number, if this is an archival profile.
    pub fn pdfa_part(self) -> Option<u8> {
        match self {
            PdfVersion::A1 => Some(1),
            PdfVersion::A2 => Some(2),
            PdfVersion::A3 => Some(3),
            PdfVersion::A4 => Some(4),
            _ => None,
        }
    }

    /// Whether this is any PDF/A profile.
    pub fn is_pdfa(self) -> bool {
        self.pdfa_part().is_some()
    }

    /// Whether constant alpha, soft masks and transparency groups may be used.
    pub fn allows_transparency(self) -> bool {
        !matches!(self, PdfVersion::V1_3 | PdfVersion::A1)
    }

    /// Whether encryption is permitted (PDF/A forbids it).
    pub fn allows_encryption(self) -> bool {
        !self.is_pdfa()
    }
}

/// Encryption request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Password needed to open the document (may be empty)
    pub user_password: String,
    /// Password granting full access
    pub owner_password: String,
    /// Permissions granted to user-password holders
    pub permissions: Permissions,
    /// Cipher and revision
    pub algorithm: Algorithm,
    /// Whether the XMP metadata stream is encrypted too
    pub encrypt_metadata: bool,
}

impl EncryptionConfig {
    /// Create an AES-256 (R6) configuration granting all permissions.
    pub fn new(user_password: impl Into<String>, owner_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: owner_password.into(),
            permissions: Permissions::all(),
            algorithm: Algorithm::Aes256,
            encrypt_metadata: true,
        }
    }

    /// Select the cipher/revision.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Restrict the user permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Leave the metadata stream readable.
    pub fn with_encrypt_metadata(mut self, encrypt: bool) -> Self {
        self.encrypt_metadata = encrypt;
        self
    }
}

/// Signature request (the certificate lives in the host's signature provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Signer name
    pub name: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Location of signing
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Upper bound of the DER signature size in bytes
    pub reserved_size: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            name: None,
            reason: None,
            location: None,
            contact_info: None,
            reserved_size: 8192,
        }
    }
}

/// How foreign PDF pages are placed into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForeignPdfPolicy {
    /// Copy the page's content and resources into a form XObject
    #[default]
    Embed,
    /// Embed the whole foreign file and point at it with a reference XObject,
    /// drawing a rasterized fallback
    Reference,
}

/// How links to external documents are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkPolicy {
    /// `/URI` action for everything
    #[default]
    Uri,
    /// `/Launch` action for file targets
    Launch,
    /// `/GoToR` action for links to other PDF documents
    GoToR,
}

/// Initial page layout of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageLayout {
    /// Viewer default
    #[default]
    Default,
    /// One page at a time
    SinglePage,
    /// One continuous column
    OneColumn,
    /// Two columns, odd pages left
    TwoColumnLeft,
    /// Two columns, odd pages right
    TwoColumnRight,
}

impl PageLayout {
    /// PDF name, or `None` for the viewer default.
    pub fn pdf_name(self) -> Option<&'static str> {
        match self {
            PageLayout::Default => None,
            PageLayout::SinglePage => Some("SinglePage"),
            PageLayout::OneColumn => Some("OneColumn"),
            PageLayout::TwoColumnLeft => Some("TwoColumnLeft"),
            PageLayout::TwoColumnRight => Some("TwoColumnRight"),
        }
    }
}

/// Initial panel shown by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageMode {
    /// Neither outlines nor thumbnails
    #[default]
    UseNone,
    /// Outline panel open
    UseOutlines,
    /// Thumbnail panel open
    UseThumbs,
    /// Full screen
    FullScreen,
}

impl PageMode {
    /// PDF name for `/PageMode`.
    pub fn pdf_name(self) -> &'static str {
        match self {
            PageMode::UseNone => "UseNone",
            PageMode::UseOutlines => "UseOutlines",
            PageMode::UseThumbs => "UseThumbs",
            PageMode::FullScreen => "FullScreen",
        }
    }
}

/// Initial magnification.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Zoom {
    /// Viewer default
    #[default]
    Default,
    /// Fit whole page
    FitPage,
    /// Fit page width
    FitWidth,
    /// Fit visible content
    FitVisible,
    /// Explicit percentage
    Percent(u32),
}

/// Viewer preferences and open action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerPreferences {
    /// Page layout
    pub page_layout: PageLayout,
    /// Page mode
    pub page_mode: PageMode,
    /// Initial zoom
    pub zoom: Zoom,
    /// Zero-based page opened first
    pub initial_page: usize,
    /// Hide the viewer toolbar
    pub hide_toolbar: bool,
    /// Hide the viewer menu bar
    pub hide_menubar: bool,
    /// Hide window UI elements
    pub hide_window_ui: bool,
    /// Resize window to the first page
    pub fit_window: bool,
    /// Center the window on screen
    pub center_window: bool,
    /// Show the document title instead of the file name
    pub display_doc_title: bool,
}

impl ViewerPreferences {
    /// Whether any entry of the `/ViewerPreferences` dictionary is needed.
    pub fn has_dictionary_entries(&self) -> bool {
        self.hide_toolbar
            || self.hide_menubar
            || self.hide_window_ui
            || self.fit_window
            || self.center_window
            || self.display_doc_title
    }
}

/// Document information (`/Info` and XMP).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Title
    pub title: Option<String>,
    /// Author
    pub author: Option<String>,
    /// Subject
    pub subject: Option<String>,
    /// Keywords
    pub keywords: Option<String>,
    /// Creating application
    pub creator: Option<String>,
    /// Producing library
    pub producer: Option<String>,
    /// Natural language (e.g. "en-US")
    pub language: Option<String>,
}

/// Configuration for PDF generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfWriterConfig {
    /// Target version or conformance profile
    pub version: PdfVersion,
    /// PDF/UA-1 accessibility conformance (implies tagging)
    pub pdf_ua: bool,
    /// Produce a structure tree
    pub tagged: bool,
    /// Deflate-compress streams (off only for debugging)
    pub compress: bool,
    /// Encryption parameters
    pub encryption: Option<EncryptionConfig>,
    /// Signature parameters
    pub signature: Option<SignatureConfig>,
    /// Placement of foreign PDF pages
    pub foreign_pdf: ForeignPdfPolicy,
    /// Resolution of rasterized fallbacks for reference XObjects
    pub reference_dpi: u32,
    /// Viewer preferences
    pub viewer: ViewerPreferences,
    /// External link handling
    pub link_policy: LinkPolicy,
    /// Document information
    pub info: DocumentInfo,
    /// Write the non-standard `/DocChecksum` trailer entry
    pub doc_checksum: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: PdfVersion::default(),
            pdf_ua: false,
            tagged: false,
            compress: true,
            encryption: None,
            signature: None,
            foreign_pdf: ForeignPdfPolicy::default(),
            reference_dpi: 300,
            viewer: ViewerPreferences::default(),
            link_policy: LinkPolicy::default(),
            info: DocumentInfo {
                producer: Some(format!("pdf_scribe {}", env!("CARGO_PKG_VERSION"))),
                ..DocumentInfo::default()
            },
            doc_checksum: false,
        }
    }
}

impl PdfWriterConfig {
    /// Create the default configuration (PDF 1.7, compressed, untagged).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("Invalid writer configuration: {}", e)))
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidArgument(format!("Unserializable configuration: {}", e)))
    }

    /// Set the target version.
    pub fn with_version(mut self, version: PdfVersion) -> Self {
        self.version = version;
        self
    }

    /// Enable PDF/UA (turns on tagging).
    pub fn with_pdf_ua(mut self, ua: bool) -> Self {
        self.pdf_ua = ua;
        if ua {
            self.tagged = true;
        }
        self
    }

    /// Enable or disable the structure tree.
    pub fn with_tagged(mut self, tagged: bool) -> Self {
        self.tagged = tagged;
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Request encryption.
    pub fn with_encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Request a signature.
    pub fn with_signature(mut self, signature: SignatureConfig) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.info.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.info.author = Some(author.into());
        self
    }

    /// Set document language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.info.language = Some(language.into());
        self
    }

    /// Set the link policy.
    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.link_policy = policy;
        self
    }

    /// Set the foreign PDF policy.
    pub fn with_foreign_pdf(mut self, policy: ForeignPdfPolicy) -> Self {
        self.foreign_pdf = policy;
        self
    }

    /// Enable the non-standard document checksum.
    pub fn with_doc_checksum(mut self, enable: bool) -> Self {
        self.doc_checksum = enable;
        self
    }

    /// Whether a structure tree is produced.
    pub fn is_tagged(&self) -> bool {
        self.tagged || self.pdf_ua
    }

    /// Whether encryption is active after profile restrictions.
    pub fn encryption_active(&self) -> bool {
        self.encryption.is_some() && self.version.allows_encryption()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_headers() {
        assert_eq!(PdfVersion::V1_3.header(), "1.3");
        assert_eq!(PdfVersion::A1.header(), "1.4");
        assert_eq!(PdfVersion::A3.header(), "1.7");
        assert_eq!(PdfVersion::A4.header(), "2.0");
    }

    #[test]
    fn test_transparency_rules() {
        assert!(!PdfVersion::V1_3.allows_transparency());
        assert!(!PdfVersion::A1.allows_transparency());
        assert!(PdfVersion::A2.allows_transparency());
        assert!(PdfVersion::V1_7.allows_transparency());
    }

    #[test]
    fn test_pdf_ua_implies_tagging() {
        let config = PdfWriterConfig::new().with_pdf_ua(true);
        assert!(config.is_tagged());
    }

    #[test]
    fn test_pdfa_disables_encryption() {
        let config = PdfWriterConfig::new()
            .with_version(PdfVersion::A2)
            .with_encryption(EncryptionConfig::new("u", "o"));
        assert!(!config.encryption_active());
    }

    #[test]
    fn test_json_round_trip() {
        let config = PdfWriterConfig::new()
            .with_title("Report")
            .with_version(PdfVersion::V2_0)
            .with_link_policy(LinkPolicy::GoToR);
        let json = config.to_json().unwrap();
        let back = PdfWriterConfig::from_json(&json).unwrap();
        assert_eq!(back.version, PdfVersion::V2_0);
        assert_eq!(back.link_policy, LinkPolicy::GoToR);
        assert_eq!(back.info.title.as_deref(), Some("Report"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(PdfWriterConfig::from_json("{ not json").is_err());
    }
}
