//! The document driver.
//!
//! [`PdfWriter`] owns the output, the object table and every deferred
//! resource pool. Pages are written as soon as they end; fonts, images,
//! annotations, the structure tree and the catalog wait for [`emit`], which
//! writes them in a fixed order and finishes with the cross-reference table
//! and trailer.
//!
//! [`emit`]: PdfWriter::emit

use super::allocator::ObjectAllocator;
use super::annotations::{
    acroform_object, radio_group_object, sort_by_tab_order, Appearance, Destination, Link, LinkTarget, Note,
    Screen, TabEntry, Widget, WidgetDescription, WidgetKind,
};
use super::content::ContentStreamBuilder;
use super::drawing::GroupFrame;
use super::embedded_files::{associated_files, embedded_files_tree, file_attachment_object, EmbeddedEntry};
use super::fonts::standard::{standalone_font_objects, StandaloneFont};
use super::fonts::{emit_subset, FaceId, FontFace, GlyphRegistry};
use super::gradient::GradientRegistry;
use super::graphics_state::GraphicsStateStack;
use super::image::{bitmap_objects, foreign_page_objects, jpeg_objects, ImageRegistry, ImageSource};
use super::interactive::FileAttachment;
use super::metadata::{
    document_id, icc_profile_object, id_array, info_object, metadata_stream, output_intent_object, DocChecksum,
    XmpWriter,
};
use super::outline::{named_dests_object, OutlineTree};
use super::output::{PdfOutput, SeekSink};
use super::page::{Orientation, Page, Transition};
use super::resources::{ExtGStateRegistry, ResourceRegistry};
use super::serializer::ObjectSerializer;
use super::structure::{AttrValue, MarkedContent, StructAttribute, StructElementType, StructureTree};
use super::{stream_object, IndirectObject};
use crate::config::{PageMode, PdfVersion, PdfWriterConfig, Zoom};
use crate::encryption::{EncryptionWriteHandler, StandardSecurityHandler};
use crate::error::{Error, Result, Warning, WarningSet};
use crate::geometry::{Path, Point, PolyPolygon, Polygon, Rect};
use crate::object::{Dict, Object};
use crate::signatures::{PdfSigner, SignatureProvider};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, HashMap};

/// Incremental PDF writer.
///
/// Drawing calls go to the current page; everything shared between pages
/// is collected and written by [`emit`](PdfWriter::emit).
pub struct PdfWriter {
    pub(super) config: PdfWriterConfig,
    pub(super) output: PdfOutput,
    pub(super) allocator: ObjectAllocator,
    serializer: ObjectSerializer,
    security: Option<StandardSecurityHandler>,
    encryption: Option<EncryptionWriteHandler>,
    file_id: [u8; 16],
    pub(super) date: DateTime<FixedOffset>,
    pub(super) warnings: WarningSet,
    checksum: Option<DocChecksum>,
    emitted: bool,

    pub(super) pages: Vec<Page>,
    pub(super) current_page: Option<usize>,
    pub(super) content: ContentStreamBuilder,
    pub(super) state: GraphicsStateStack,
    pub(super) resources: ResourceRegistry,
    pub(super) ext_gstates: ExtGStateRegistry,
    pub(super) images: ImageRegistry,
    pub(super) gradients: GradientRegistry,
    /// Patterns, transparency groups and appearance streams
    pub(super) pending: Vec<IndirectObject>,
    pub(super) frames: Vec<GroupFrame>,

    pub(super) glyphs: GlyphRegistry,
    pub(super) faces: Vec<Box<dyn FontFace>>,
    pub(super) widget_font: StandaloneFont,
    widget_font_id: Option<u32>,

    pub(super) structure: Option<StructureTree>,
    pub(super) outline: Option<OutlineTree>,
    pub(super) destinations: Vec<Destination>,
    pub(super) named_dests: BTreeMap<String, usize>,
    pub(super) links: Vec<Link>,
    pub(super) notes: Vec<Note>,
    pub(super) screens: Vec<Screen>,
    pub(super) widgets: Vec<Widget>,
    /// Radio group id to (field object id, field name)
    pub(super) radio_groups: BTreeMap<u32, (u32, String)>,
    pub(super) embedded: Vec<EmbeddedEntry>,
    pub(super) attachments: Vec<FileAttachment>,
    /// `/StructParent` keys of annotations
    pub(super) annot_struct_parents: HashMap<u32, usize>,
    icc_profile: Option<Vec<u8>>,
    signature_provider: Option<Box<dyn SignatureProvider>>,

    catalog_id: u32,
    pages_root_id: u32,
    resource_dict_id: u32,
}

impl std::fmt::Debug for PdfWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfWriter")
            .field("version", &self.config.version)
            .field("pages", &self.pages.len())
            .field("objects", &self.allocator.count())
            .field("offset", &self.output.offset())
            .finish_non_exhaustive()
    }
}

impl PdfWriter {
    /// Writer collecting the document in memory; see [`finish`](PdfWriter::finish).
    pub fn in_memory(config: PdfWriterConfig) -> Result<Self> {
        let seed = uuid::Uuid::new_v4();
        Self::open(config, PdfOutput::memory(), seed.as_bytes())
    }

    /// Writer creating the file at `path`.
    pub fn to_file(path: impl AsRef<std::path::Path>, config: PdfWriterConfig) -> Result<Self> {
        let path = path.as_ref();
        let output = PdfOutput::create_file(path)?;
        Self::open(config, output, path.to_string_lossy().as_bytes())
    }

    /// Writer on a caller-supplied seekable sink.
    pub fn custom(sink: Box<dyn SeekSink>, config: PdfWriterConfig) -> Result<Self> {
        let seed = uuid::Uuid::new_v4();
        Self::open(config, PdfOutput::custom(sink), seed.as_bytes())
    }

    fn open(config: PdfWriterConfig, mut output: PdfOutput, seed: &[u8]) -> Result<Self> {
        let date = chrono::Local::now().fixed_offset();
        let file_id = document_id(&date, &config.info, seed);

        let security = match &config.encryption {
            Some(encryption) if config.encryption_active() => {
                if encryption.algorithm.min_pdf_level() > config.version.level() {
                    log::warn!(
                        "{:?} needs PDF {}.{}, the header says {}",
                        encryption.algorithm,
                        encryption.algorithm.min_pdf_level() / 10,
                        encryption.algorithm.min_pdf_level() % 10,
                        config.version.header()
                    );
                }
                Some(StandardSecurityHandler::new(encryption, &file_id)?)
            },
            Some(_) => {
                log::warn!("encryption is not allowed for {:?}; writing unencrypted", config.version);
                None
            },
            None => None,
        };
        let encryption = security.as_ref().map(EncryptionWriteHandler::new);

        output.write_all(format!("%PDF-{}\n", config.version.header()).as_bytes())?;
        output.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

        let mut allocator = ObjectAllocator::new();
        let catalog_id = allocator.create_object();
        let pages_root_id = allocator.create_object();
        let resource_dict_id = allocator.create_object();
        let structure = config
            .is_tagged()
            .then(|| StructureTree::new(allocator.create_object()));
        let checksum = (config.doc_checksum && !config.version.is_pdfa() && !config.pdf_ua).then(DocChecksum::new);

        log::debug!(
            "new PDF {} writer (tagged: {}, encrypted: {})",
            config.version.header(),
            structure.is_some(),
            encryption.is_some()
        );

        Ok(Self {
            config,
            output,
            allocator,
            serializer: ObjectSerializer::new(),
            security,
            encryption,
            file_id,
            date,
            warnings: WarningSet::new(),
            checksum,
            emitted: false,
            pages: Vec::new(),
            current_page: None,
            content: ContentStreamBuilder::new(),
            state: GraphicsStateStack::new(),
            resources: ResourceRegistry::new(),
            ext_gstates: ExtGStateRegistry::new(),
            images: ImageRegistry::new(),
            gradients: GradientRegistry::new(),
            pending: Vec::new(),
            frames: Vec::new(),
            glyphs: GlyphRegistry::new(),
            faces: Vec::new(),
            widget_font: StandaloneFont::default(),
            widget_font_id: None,
            structure,
            outline: None,
            destinations: Vec::new(),
            named_dests: BTreeMap::new(),
            links: Vec::new(),
            notes: Vec::new(),
            screens: Vec::new(),
            widgets: Vec::new(),
            radio_groups: BTreeMap::new(),
            embedded: Vec::new(),
            attachments: Vec::new(),
            annot_struct_parents: HashMap::new(),
            icc_profile: None,
            signature_provider: None,
            catalog_id,
            pages_root_id,
            resource_dict_id,
        })
    }

    /// The configuration in effect.
    pub fn config(&self) -> &PdfWriterConfig {
        &self.config
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &WarningSet {
        &self.warnings
    }

    /// Whether the output is still usable.
    pub fn is_open(&self) -> bool {
        self.output.is_open()
    }

    /// Number of pages created.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The first entry of the trailer `/ID`.
    pub fn file_id(&self) -> &[u8; 16] {
        &self.file_id
    }

    /// The security handler, when the document is encrypted.
    pub fn security_handler(&self) -> Option<&StandardSecurityHandler> {
        self.security.as_ref()
    }

    /// ICC profile for the PDF/A output intent.
    pub fn set_icc_profile(&mut self, profile: Vec<u8>) {
        self.icc_profile = Some(profile);
    }

    /// Signer invoked after the trailer is written.
    pub fn set_signature_provider(&mut self, provider: Box<dyn SignatureProvider>) {
        self.signature_provider = Some(provider);
    }

    /// Register a font face; the returned id goes into [`Font`](super::Font).
    pub fn register_face(&mut self, face: Box<dyn FontFace>) -> FaceId {
        self.faces.push(face);
        self.faces.len() - 1
    }

    /// Embed a registered face in full as the widget font instead of Helvetica.
    pub fn set_widget_font(&mut self, face: FaceId) -> Result<()> {
        if face >= self.faces.len() {
            return Err(Error::InvalidArgument(format!("unknown font face {}", face)));
        }
        self.widget_font = StandaloneFont::Face(face);
        Ok(())
    }

    /// Object id of the widget font, allocated on first use.
    pub(super) fn widget_font_id(&mut self) -> u32 {
        match self.widget_font_id {
            Some(id) => id,
            None => {
                let id = self.allocator.create_object();
                self.widget_font_id = Some(id);
                id
            },
        }
    }

    // ---- object output ----

    /// Write one indirect object, encrypted for its own id.
    pub(super) fn write_object(&mut self, id: u32, obj: &Object) -> Result<()> {
        self.write_object_as(id, obj, true)
    }

    fn write_object_as(&mut self, id: u32, obj: &Object, encrypt: bool) -> Result<()> {
        let handler = if encrypt { self.encryption.as_ref() } else { None };
        let bytes = self.serializer.serialize_indirect(id, obj, handler)?;
        self.allocator.update_object(id, self.output.offset())?;
        self.output.write_all(&bytes)
    }

    fn write_objects(&mut self, objects: Vec<IndirectObject>) -> Result<()> {
        for (id, obj) in objects {
            self.write_object(id, &obj)?;
        }
        Ok(())
    }

    // ---- pages ----

    /// Start a portrait page of `width` x `height` points, ending the
    /// current one. Returns the page index.
    pub fn new_page(&mut self, width: f64, height: f64) -> Result<usize> {
        self.new_page_with(width, height, Orientation::Portrait)
    }

    /// Start a page with an explicit orientation.
    pub fn new_page_with(&mut self, width: f64, height: f64, orientation: Orientation) -> Result<usize> {
        self.ensure_writable()?;
        if self.resources.is_redirected() {
            return Err(Error::UnbalancedStream("new page inside a redirected stream".into()));
        }
        self.end_page()?;
        let mut page = Page::new(self.allocator.create_object(), width, height)?;
        page.orientation = orientation;
        self.pages.push(page);
        let index = self.pages.len() - 1;
        self.current_page = Some(index);
        self.content = ContentStreamBuilder::new();
        self.state.reset_emitted();
        log::debug!("page {} started ({} x {})", index, width, height);
        Ok(index)
    }

    /// Close the current page and write its content. A no-op without one.
    pub fn end_page(&mut self) -> Result<()> {
        let Some(index) = self.current_page else {
            return Ok(());
        };
        if self.resources.is_redirected() || !self.frames.is_empty() {
            return Err(Error::UnbalancedStream(format!(
                "page {} ended with {} open redirection(s)",
                index,
                self.resources.redirect_depth()
            )));
        }
        self.end_marked_sequence();
        self.write_page_stream(index)?;
        self.current_page = None;
        log::debug!("page {} written with {} stream(s)", index, self.pages[index].content_ids.len());
        Ok(())
    }

    /// Write the content so far as its own stream of the current page.
    pub fn flush_content(&mut self) -> Result<()> {
        let index = self.page_index()?;
        if self.resources.is_redirected() {
            return Err(Error::UnbalancedStream("flush inside a redirected stream".into()));
        }
        self.end_marked_sequence();
        self.write_page_stream(index)
    }

    fn write_page_stream(&mut self, index: usize) -> Result<()> {
        self.state.finish_stream(&mut self.content);
        if self.content.marked_depth() > 0 || self.content.in_text_object() {
            return Err(Error::UnbalancedStream(format!(
                "page {} stream has {} open marked content sequence(s)",
                index,
                self.content.marked_depth()
            )));
        }
        let content = std::mem::take(&mut self.content).finish();
        if content.is_empty() {
            return Ok(());
        }
        if let Some(checksum) = self.checksum.as_mut() {
            checksum.update(&content);
        }
        let id = self.allocator.create_object();
        let obj = stream_object(Dict::new(), content, self.config.compress)?;
        self.write_object(id, &obj)?;
        self.pages[index].content_ids.push(id);
        Ok(())
    }

    /// Display duration of the current page in presentations.
    pub fn set_page_duration(&mut self, seconds: f64) -> Result<()> {
        let index = self.page_index()?;
        self.pages[index].duration = Some(seconds);
        Ok(())
    }

    /// Transition effect shown when the current page opens.
    pub fn set_page_transition(&mut self, transition: Transition, seconds: f64) -> Result<()> {
        let index = self.page_index()?;
        self.pages[index].transition = Some((transition, seconds));
        Ok(())
    }

    pub(super) fn ensure_writable(&self) -> Result<()> {
        if self.emitted || !self.output.is_open() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    pub(super) fn page_index(&self) -> Result<usize> {
        self.ensure_writable()?;
        self.current_page
            .ok_or_else(|| Error::InvalidArgument("no current page".into()))
    }

    pub(super) fn page_for(&self, index: usize) -> Result<&Page> {
        self.pages
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("page {} does not exist", index)))
    }

    // ---- coordinates ----

    /// Logical point to the PDF space of the current stream.
    pub(super) fn point_to_pdf(&self, p: &Point) -> Result<Point> {
        let page = self.page_for(self.page_index()?)?;
        let origin = self.resources.origin();
        Ok(page
            .point_to_pdf(&self.state.current().map_mode, p)
            .translate(-origin.x, -origin.y))
    }

    pub(super) fn length_to_pdf(&self, len: f64) -> Result<f64> {
        let page = self.page_for(self.page_index()?)?;
        Ok(page.length_to_pdf(&self.state.current().map_mode, len))
    }

    pub(super) fn rect_to_pdf(&self, r: &Rect) -> Result<Rect> {
        let page = self.page_for(self.page_index()?)?;
        let origin = self.resources.origin();
        Ok(page
            .rect_to_pdf(&self.state.current().map_mode, r)
            .translate(-origin.x, -origin.y))
    }

    /// Logical rectangle on `page` in that page's PDF space, ignoring
    /// redirection; used for annotations and destinations.
    pub(super) fn rect_on_page(&self, page: usize, r: &Rect) -> Result<Rect> {
        let page = self.page_for(page)?;
        Ok(page.rect_to_pdf(&self.state.current().map_mode, r))
    }

    pub(super) fn polygon_to_pdf(&self, poly: &Polygon) -> Result<Polygon> {
        let page = self.page_for(self.page_index()?)?;
        let origin = self.resources.origin();
        Ok(page
            .polygon_to_pdf(&self.state.current().map_mode, poly)
            .translate(-origin.x, -origin.y))
    }

    pub(super) fn poly_polygon_to_pdf(&self, poly: &PolyPolygon) -> Result<PolyPolygon> {
        let page = self.page_for(self.page_index()?)?;
        let origin = self.resources.origin();
        Ok(page
            .poly_polygon_to_pdf(&self.state.current().map_mode, poly)
            .translate(-origin.x, -origin.y))
    }

    pub(super) fn path_to_pdf(&self, path: &Path) -> Result<Path> {
        let page = self.page_for(self.page_index()?)?;
        let origin = self.resources.origin();
        let mapped = page.path_to_pdf(&self.state.current().map_mode, path);
        Ok(if origin == Point::default() {
            mapped
        } else {
            Path {
                segments: mapped
                    .segments
                    .into_iter()
                    .map(|seg| shift_segment(seg, -origin.x, -origin.y))
                    .collect(),
            }
        })
    }

    // ---- tagged content ----

    /// Open the marked-content sequence of the current structure element
    /// before content is drawn on the page.
    pub(super) fn begin_marked_sequence(&mut self) {
        if self.resources.is_redirected() {
            return;
        }
        let (Some(index), Some(tree)) = (self.current_page, self.structure.as_mut()) else {
            return;
        };
        if tree.is_sequence_open() {
            return;
        }
        let page = &mut self.pages[index];
        let Some(marked) = tree.begin_sequence(page.id, &mut page.mcid_parents) else {
            return;
        };
        // a clip `q` must not straddle the sequence
        self.state.finish_stream(&mut self.content);
        match marked {
            MarkedContent::Structure { tag, mcid } => {
                self.content.begin_marked_content(&tag, Some(mcid), None);
            },
            MarkedContent::Artifact => {
                self.content.begin_marked_content("Artifact", None, None);
            },
        }
    }

    pub(super) fn end_marked_sequence(&mut self) {
        if self.resources.is_redirected() {
            return;
        }
        let Some(tree) = self.structure.as_mut() else {
            return;
        };
        if tree.end_sequence() {
            self.state.finish_stream(&mut self.content);
            self.content.end_marked_content();
        }
    }

    /// Create a structure element below the current one whose type is set
    /// later. Returns `None` for untagged documents.
    pub fn ensure_structure_element(&mut self) -> Option<usize> {
        self.structure.as_mut().map(StructureTree::ensure_element)
    }

    /// Give an element created by
    /// [`ensure_structure_element`](PdfWriter::ensure_structure_element) its type.
    pub fn init_structure_element(&mut self, index: usize, kind: StructElementType, alias: Option<&str>) -> bool {
        let Some(tree) = self.structure.as_mut() else {
            return false;
        };
        let ok = tree.init_element(&mut self.allocator, index, kind, alias);
        if !ok {
            log::warn!("structure element {} cannot be initialised", index);
            self.warnings.insert(Warning::InvalidReference);
        }
        ok
    }

    /// Create and type an element in one step.
    pub fn create_structure_element(&mut self, kind: StructElementType, alias: Option<&str>) -> Option<usize> {
        let index = self.ensure_structure_element()?;
        self.init_structure_element(index, kind, alias).then_some(index)
    }

    /// Make `index` the current element; following content belongs to it.
    pub fn begin_structure_element(&mut self, index: usize) -> bool {
        if self.structure.is_none() {
            return false;
        }
        self.end_marked_sequence();
        let ok = self.structure.as_mut().is_some_and(|tree| tree.begin_element(index));
        if !ok {
            self.warnings.insert(Warning::InvalidReference);
        }
        ok
    }

    /// Return to the parent element. Ending at the root is a logged no-op.
    pub fn end_structure_element(&mut self) -> bool {
        if self.structure.is_none() {
            return false;
        }
        self.end_marked_sequence();
        self.structure.as_mut().is_some_and(StructureTree::end_element)
    }

    /// Attribute of the current element.
    pub fn set_structure_attribute(&mut self, attribute: StructAttribute, value: AttrValue) -> bool {
        self.structure
            .as_mut()
            .is_some_and(|tree| tree.set_attribute(attribute, value))
    }

    /// Bounding box of the current element, in logical coordinates.
    pub fn set_structure_bbox(&mut self, rect: &Rect) -> Result<bool> {
        let bbox = self.rect_to_pdf(rect)?;
        Ok(self.structure.as_mut().is_some_and(|tree| tree.set_bbox(bbox)))
    }

    /// Replacement text of the current element.
    pub fn set_actual_text(&mut self, text: &str) -> bool {
        self.structure.as_mut().is_some_and(|tree| tree.set_actual_text(text))
    }

    /// Alternate description of the current element.
    pub fn set_alternate_text(&mut self, text: &str) -> bool {
        self.structure.as_mut().is_some_and(|tree| tree.set_alt_text(text))
    }

    /// Language of the current element.
    pub fn set_structure_language(&mut self, language: &str) -> bool {
        self.structure.as_mut().is_some_and(|tree| tree.set_language(language))
    }

    /// ID-tree key of the current element.
    pub fn set_structure_id(&mut self, id: &str) -> bool {
        self.structure.as_mut().is_some_and(|tree| tree.set_structure_id(id))
    }

    /// Register an annotation with the current element and remember its
    /// `/StructParent`.
    pub(super) fn tag_annotation(&mut self, page: usize, annot_id: u32) {
        let page_id = self.pages[page].id;
        if let Some(key) = self
            .structure
            .as_mut()
            .and_then(|tree| tree.add_object_ref(page_id, annot_id))
        {
            self.annot_struct_parents.insert(annot_id, key);
        }
    }

    // ---- emission ----

    /// Finish the document: write all deferred objects, the catalog, the
    /// cross-reference table and the trailer, then sign if requested.
    ///
    /// The writer is unusable afterwards.
    pub fn emit(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.end_page()?;
        self.emitted = true;
        if self.pages.is_empty() {
            log::warn!("document without pages; adding a blank A4 page");
            self.pages.push(Page::new(self.allocator.create_object(), 595.0, 842.0)?);
        }

        let signer = self.prepare_signature();
        self.sort_annotations();
        self.emit_resources()?;
        self.emit_pages()?;
        let navigation = self.emit_navigation()?;
        let info_id = self.allocator.create_object();
        self.write_object(info_id, &info_object(&self.config.info, &self.date))?;
        let metadata_id = self.emit_metadata()?;
        self.emit_structure()?;
        self.emit_page_tree()?;
        let sig_id = signer.as_ref().map(|_| self.allocator.create_object());
        let acroform = self.emit_annotations(sig_id)?;
        let files = self.emit_files()?;
        self.emit_catalog(&navigation, metadata_id, acroform, files)?;

        let encrypt_id = match self.security.as_ref().map(StandardSecurityHandler::to_object) {
            Some(dict) => {
                let id = self.allocator.create_object();
                self.write_object_as(id, &dict, false)?;
                Some(id)
            },
            None => None,
        };

        let placeholder = match (&signer, sig_id) {
            (Some(signer), Some(id)) => {
                let start = self.output.offset();
                let (bytes, placeholder) =
                    signer.build_signature_object(id, &self.date, self.encryption.as_ref(), start)?;
                self.allocator.update_object(id, start)?;
                self.output.write_all(&bytes)?;
                Some(placeholder)
            },
            _ => None,
        };

        self.write_trailer(info_id, encrypt_id)?;

        if let (Some(signer), Some(placeholder), Some(provider)) =
            (&signer, placeholder, self.signature_provider.as_deref())
        {
            if let Err(e) = signer.backfill(&mut self.output, placeholder, provider) {
                log::warn!("signing failed: {}", e);
                self.warnings.insert(Warning::SignatureFailed);
            }
        }
        self.output.flush()?;
        log::debug!("document finished: {} objects, {} bytes", self.allocator.count(), self.output.offset());
        Ok(())
    }

    /// [`emit`](PdfWriter::emit) and return the bytes of an in-memory document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.emit()?;
        self.output
            .into_bytes()
            .ok_or_else(|| Error::Unsupported("the output is not held in memory".into()))
    }

    fn prepare_signature(&mut self) -> Option<PdfSigner> {
        let config = self.config.signature.clone()?;
        if self.signature_provider.is_none() {
            log::warn!("signature requested without a signature provider");
            self.warnings.insert(Warning::SignatureFailed);
            return None;
        }
        let has_field = self
            .widgets
            .iter()
            .any(|w| matches!(w.description.kind, WidgetKind::Signature));
        if !has_field {
            let id = self.allocator.create_object();
            let rect = Rect::new(0.0, 0.0, 0.0, 0.0);
            self.widgets.push(Widget {
                id,
                page: 0,
                rect,
                description: WidgetDescription::new(WidgetKind::Signature, "Signature1", rect),
                parent: None,
                appearance: Appearance::default(),
            });
            self.pages[0].annotations.push(id);
            self.pages[0].has_widgets = true;
        }
        Some(PdfSigner::new(&config))
    }

    fn sort_annotations(&mut self) {
        let widgets: HashMap<u32, &Widget> = self.widgets.iter().map(|w| (w.id, w)).collect();
        for page in self.pages.iter_mut().filter(|p| p.has_widgets) {
            let entries: Vec<TabEntry> = page
                .annotations
                .iter()
                .map(|&id| TabEntry {
                    id,
                    widget: widgets.get(&id).map(|w| (w.description.tab_order, w.rect)),
                })
                .collect();
            page.annotations = sort_by_tab_order(&entries);
        }
    }

    fn emit_resources(&mut self) -> Result<()> {
        let compress = self.config.compress;
        for subset in self.glyphs.subsets().to_vec() {
            let face = self
                .faces
                .get(subset.face)
                .ok_or_else(|| Error::Font(format!("unknown font face {}", subset.face)))?;
            let objects = emit_subset(&subset, face.as_ref(), &mut self.images, &mut self.allocator, compress)?;
            self.write_objects(objects)?;
        }
        if let Some(font_id) = self.widget_font_id {
            let face = match self.widget_font {
                StandaloneFont::Face(face) => self.faces.get(face).map(|f| f.as_ref()),
                StandaloneFont::Helvetica => None,
            };
            let objects = standalone_font_objects(font_id, self.widget_font, face, &mut self.allocator, compress)?;
            self.write_objects(objects)?;
        }

        let shadings = self.gradients.take_pending();
        self.write_objects(shadings)?;
        let states = self.ext_gstates.take_pending();
        self.write_objects(states)?;

        // foreign pages may register fallback bitmaps
        loop {
            let batch = self.images.take_pending();
            if batch.is_empty() {
                break;
            }
            for xobject in batch {
                let objects = match &xobject.source {
                    ImageSource::Bitmap(bitmap) => bitmap_objects(xobject.id, bitmap, &mut self.allocator, compress)?,
                    ImageSource::Jpeg(jpeg) => jpeg_objects(xobject.id, jpeg, &mut self.allocator, compress)?,
                    ImageSource::ForeignPage(page, policy) => {
                        let mut specs = Vec::new();
                        let objects = foreign_page_objects(
                            xobject.id,
                            page,
                            *policy,
                            &mut self.allocator,
                            &mut self.images,
                            compress,
                            &mut |allocator, name, data| {
                                let entry = EmbeddedEntry {
                                    file: super::EmbeddedFile::new(name, data.to_vec())
                                        .with_mime_type("application/pdf"),
                                    stream_id: allocator.create_object(),
                                    filespec_id: allocator.create_object(),
                                };
                                let id = entry.filespec_id;
                                specs.push(entry);
                                id
                            },
                        )?;
                        for spec in specs {
                            self.write_objects(spec.to_objects(compress)?)?;
                        }
                        objects
                    },
                };
                self.write_objects(objects)?;
            }
        }

        let pending = std::mem::take(&mut self.pending);
        self.write_objects(pending)?;

        let resources = self.resources.global().to_object();
        self.write_object(self.resource_dict_id, &resources)?;
        log::debug!("resources written");
        Ok(())
    }

    fn emit_pages(&mut self) -> Result<()> {
        for index in 0..self.pages.len() {
            let page = &self.pages[index];
            let key = self.structure.as_ref().and_then(|tree| tree.page_key(page.id));
            let obj = page.to_object(self.pages_root_id, self.resource_dict_id, key);
            let id = page.id;
            self.write_object(id, &obj)?;
        }
        Ok(())
    }

    /// Destination array of destination `index`, if it resolves.
    pub(super) fn resolve_dest(&self, index: usize) -> Option<Object> {
        let dest = self.destinations.get(index)?;
        let page = self.pages.get(dest.page)?;
        Some(dest.to_array(page.id))
    }

    fn emit_navigation(&mut self) -> Result<Navigation> {
        let mut navigation = Navigation::default();

        if !self.named_dests.is_empty() {
            let mut dests = BTreeMap::new();
            for (name, &index) in &self.named_dests {
                match self.resolve_dest(index) {
                    Some(dest) => {
                        dests.insert(name.clone(), dest);
                    },
                    None => {
                        log::warn!("named destination {} points to unknown destination {}", name, index);
                        self.warnings.insert(Warning::InvalidReference);
                    },
                }
            }
            let id = self.allocator.create_object();
            self.write_object(id, &named_dests_object(&dests))?;
            navigation.dests = Some(id);
        }

        if let Some(outline) = self.outline.as_ref().filter(|o| !o.is_empty()) {
            let unresolved = std::cell::Cell::new(false);
            let objects = outline.to_objects(|index| {
                let dest = self.resolve_dest(index);
                if dest.is_none() {
                    unresolved.set(true);
                }
                dest
            });
            if unresolved.get() {
                self.warnings.insert(Warning::InvalidReference);
            }
            navigation.outline = Some(outline.root_id());
            self.write_objects(objects)?;
        }

        if self.config.version.is_pdfa() {
            match self.icc_profile.take() {
                Some(profile) => {
                    let profile_id = self.allocator.create_object();
                    self.write_object(profile_id, &icc_profile_object(&profile, self.config.compress)?)?;
                    let intent_id = self.allocator.create_object();
                    self.write_object(intent_id, &output_intent_object(profile_id))?;
                    navigation.output_intent = Some(intent_id);
                },
                None => {
                    log::warn!("PDF/A output without an ICC profile has no output intent");
                    self.warnings.insert(Warning::OutputIntentMissing);
                },
            }
        }
        Ok(navigation)
    }

    fn emit_metadata(&mut self) -> Result<u32> {
        let packet = XmpWriter::new(&self.config.info, self.date, self.config.version)
            .pdf_ua(self.config.pdf_ua)
            .document_id(&self.file_id)
            .build_bytes();
        let id = self.allocator.create_object();
        let encrypt = self.encryption.as_ref().is_some_and(EncryptionWriteHandler::encrypt_metadata);
        self.write_object_as(id, &metadata_stream(packet)?, encrypt)?;
        Ok(id)
    }

    fn emit_structure(&mut self) -> Result<()> {
        let Some(tree) = self.structure.as_ref() else {
            return Ok(());
        };
        let pages: Vec<(u32, &[u32])> = self
            .pages
            .iter()
            .map(|p| (p.id, p.mcid_parents.as_slice()))
            .collect();
        let pdf2 = matches!(self.config.version, PdfVersion::V2_0 | PdfVersion::A4);
        let objects = tree.to_objects(&mut self.allocator, &pages, pdf2);
        self.write_objects(objects)
    }

    fn emit_page_tree(&mut self) -> Result<()> {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("Pages".into()));
        dict.insert(
            "Kids".into(),
            Object::Array(self.pages.iter().map(|p| Object::Reference(p.id.into())).collect()),
        );
        dict.insert("Count".into(), Object::Integer(self.pages.len() as i64));
        self.write_object(self.pages_root_id, &Object::Dictionary(dict))
    }

    /// Write every annotation; returns the AcroForm dictionary if there are fields.
    fn emit_annotations(&mut self, signature: Option<u32>) -> Result<Option<Object>> {
        let policy = self.config.link_policy;
        let mut objects = Vec::new();

        for link in &self.links {
            let page_id = self.pages[link.page].id;
            let dest = match link.target {
                LinkTarget::Dest(index) => {
                    let dest = self.resolve_dest(index);
                    if dest.is_none() {
                        log::warn!("link {} points to unknown destination {}", link.id, index);
                        self.warnings.insert(Warning::InvalidReference);
                    }
                    dest
                },
                _ => None,
            };
            let key = self.annot_struct_parents.get(&link.id).copied();
            objects.push((link.id, link.to_object(page_id, dest, policy, key)));
        }
        for note in &self.notes {
            let page_id = self.pages[note.page].id;
            let key = self.annot_struct_parents.get(&note.id).copied();
            let [annot, popup] = note.to_objects(page_id, key);
            objects.push((note.id, annot));
            objects.push((note.popup_id, popup));
        }
        for screen in &self.screens {
            let page_id = self.pages[screen.page].id;
            let key = self.annot_struct_parents.get(&screen.id).copied();
            objects.push((screen.id, screen.to_object(page_id, key)));
        }

        let mut fields = Vec::new();
        for widget in &self.widgets {
            let page_id = self.pages[widget.page].id;
            let key = self.annot_struct_parents.get(&widget.id).copied();
            objects.push((widget.id, widget.to_object(page_id, signature, policy, key)));
            if widget.parent.is_none() {
                fields.push(widget.id);
            }
        }
        for (group, (field_id, name)) in &self.radio_groups {
            let kids: Vec<&Widget> = self
                .widgets
                .iter()
                .filter(|w| matches!(w.description.kind, WidgetKind::RadioButton { group: g, .. } if g == *group))
                .collect();
            objects.push((*field_id, radio_group_object(name, &kids)));
            fields.push(*field_id);
        }

        let acroform = if fields.is_empty() {
            None
        } else {
            let font_id = self.widget_font_id();
            Some(acroform_object(&fields, font_id, signature.is_some()))
        };
        let late_font = self.widget_font_id.filter(|&id| !self.allocator.is_written(id));
        if let (Some(_), Some(font_id)) = (&acroform, late_font) {
            // widget font allocated after resources were written
            let face = match self.widget_font {
                StandaloneFont::Face(face) => self.faces.get(face).map(|f| f.as_ref()),
                StandaloneFont::Helvetica => None,
            };
            let font = standalone_font_objects(font_id, self.widget_font, face, &mut self.allocator, self.config.compress)?;
            objects.extend(font);
        }
        self.write_objects(objects)?;
        Ok(acroform)
    }

    fn emit_files(&mut self) -> Result<FileObjects> {
        let compress = self.config.compress;
        let mut objects = Vec::new();
        for entry in &self.embedded {
            objects.extend(entry.to_objects(compress)?);
        }
        for attachment in &self.attachments {
            objects.extend(attachment.entry.to_objects(compress)?);
            let page_id = self.pages[attachment.page].id;
            let key = self.annot_struct_parents.get(&attachment.id).copied();
            objects.push((
                attachment.id,
                file_attachment_object(
                    page_id,
                    &attachment.rect,
                    attachment.entry.filespec_id,
                    attachment.contents.as_deref(),
                    key,
                ),
            ));
        }
        self.write_objects(objects)?;

        let mut files = FileObjects::default();
        if !self.embedded.is_empty() {
            files.names = Some(embedded_files_tree(&self.embedded));
            let af_allowed = self.config.version.level() >= 20 || self.config.version == PdfVersion::A3;
            if af_allowed {
                files.associated = associated_files(&self.embedded);
            }
        }
        Ok(files)
    }

    fn emit_catalog(
        &mut self,
        navigation: &Navigation,
        metadata_id: u32,
        acroform: Option<Object>,
        files: FileObjects,
    ) -> Result<()> {
        let viewer = &self.config.viewer;
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("Catalog".into()));
        dict.insert("Pages".into(), Object::Reference(self.pages_root_id.into()));

        let page_mode = match viewer.page_mode {
            PageMode::UseNone if navigation.outline.is_some() => PageMode::UseOutlines,
            mode => mode,
        };
        if page_mode != PageMode::UseNone {
            dict.insert("PageMode".into(), Object::Name(page_mode.pdf_name().into()));
        }
        if let Some(layout) = viewer.page_layout.pdf_name() {
            dict.insert("PageLayout".into(), Object::Name(layout.into()));
        }
        let display_title = viewer.display_doc_title || self.config.pdf_ua;
        if viewer.has_dictionary_entries() || display_title {
            let mut prefs = Dict::new();
            for (key, on) in [
                ("HideToolbar", viewer.hide_toolbar),
                ("HideMenubar", viewer.hide_menubar),
                ("HideWindowUI", viewer.hide_window_ui),
                ("FitWindow", viewer.fit_window),
                ("CenterWindow", viewer.center_window),
                ("DisplayDocTitle", display_title),
            ] {
                if on {
                    prefs.insert(key.into(), Object::Boolean(true));
                }
            }
            dict.insert("ViewerPreferences".into(), Object::Dictionary(prefs));
        }
        if viewer.initial_page > 0 || viewer.zoom != Zoom::Default {
            let page = viewer.initial_page.min(self.pages.len() - 1);
            dict.insert("OpenAction".into(), open_action(self.pages[page].id, viewer.zoom));
        }
        if let Some(language) = &self.config.info.language {
            dict.insert("Lang".into(), Object::String(language.as_bytes().to_vec()));
        }
        if let Some(tree) = &self.structure {
            let mut mark_info = Dict::new();
            mark_info.insert("Marked".into(), Object::Boolean(true));
            dict.insert("MarkInfo".into(), Object::Dictionary(mark_info));
            dict.insert("StructTreeRoot".into(), Object::Reference(tree.root_id().into()));
        }
        if let Some(acroform) = acroform {
            dict.insert("AcroForm".into(), acroform);
        }
        if let Some(tree) = files.names {
            let mut names = Dict::new();
            names.insert("EmbeddedFiles".into(), tree);
            dict.insert("Names".into(), Object::Dictionary(names));
        }
        if let Some(af) = files.associated {
            dict.insert("AF".into(), af);
        }
        if let Some(id) = navigation.dests {
            dict.insert("Dests".into(), Object::Reference(id.into()));
        }
        if let Some(id) = navigation.outline {
            dict.insert("Outlines".into(), Object::Reference(id.into()));
        }
        dict.insert("Metadata".into(), Object::Reference(metadata_id.into()));
        if let Some(id) = navigation.output_intent {
            dict.insert("OutputIntents".into(), Object::Array(vec![Object::Reference(id.into())]));
        }
        self.write_object(self.catalog_id, &Object::Dictionary(dict))
    }

    fn write_trailer(&mut self, info_id: u32, encrypt_id: Option<u32>) -> Result<()> {
        let xref_offset = self.output.offset();
        let xref = self.allocator.write_xref()?;
        self.output.write_all(&xref)?;

        let mut trailer = Dict::new();
        trailer.insert("Size".into(), Object::Integer(i64::from(self.allocator.count()) + 1));
        trailer.insert("Root".into(), Object::Reference(self.catalog_id.into()));
        trailer.insert("Info".into(), Object::Reference(info_id.into()));
        trailer.insert("ID".into(), id_array(&self.file_id));
        if let Some(id) = encrypt_id {
            trailer.insert("Encrypt".into(), Object::Reference(id.into()));
        }
        if let Some(checksum) = &self.checksum {
            trailer.insert("DocChecksum".into(), Object::Name(checksum.finish()));
        }

        let mut buf = b"trailer\n".to_vec();
        buf.extend_from_slice(&self.serializer.serialize(&Object::Dictionary(trailer)));
        buf.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
        self.output.write_all(&buf)?;
        log::debug!("xref at offset {}", xref_offset);
        Ok(())
    }
}

/// Objects referenced from the catalog.
#[derive(Debug, Default)]
struct Navigation {
    dests: Option<u32>,
    outline: Option<u32>,
    output_intent: Option<u32>,
}

#[derive(Debug, Default)]
struct FileObjects {
    names: Option<Object>,
    associated: Option<Object>,
}

fn open_action(page_id: u32, zoom: Zoom) -> Object {
    let page = Object::Reference(page_id.into());
    let name = |n: &str| Object::Name(n.into());
    Object::Array(match zoom {
        Zoom::Default => vec![page, name("XYZ"), Object::Null, Object::Null, Object::Integer(0)],
        Zoom::FitPage => vec![page, name("Fit")],
        Zoom::FitWidth => vec![page, name("FitH"), Object::Null],
        Zoom::FitVisible => vec![page, name("FitBH"), Object::Null],
        Zoom::Percent(p) => vec![
            page,
            name("XYZ"),
            Object::Null,
            Object::Null,
            Object::Real(f64::from(p) / 100.0),
        ],
    })
}

fn shift_segment(seg: crate::geometry::PathSegment, dx: f64, dy: f64) -> crate::geometry::PathSegment {
    use crate::geometry::PathSegment;
    match seg {
        PathSegment::MoveTo(p) => PathSegment::MoveTo(p.translate(dx, dy)),
        PathSegment::LineTo(p) => PathSegment::LineTo(p.translate(dx, dy)),
        PathSegment::CurveTo(a, b, c) => {
            PathSegment::CurveTo(a.translate(dx, dy), b.translate(dx, dy), c.translate(dx, dy))
        },
        PathSegment::Close => PathSegment::Close,
    }
}
