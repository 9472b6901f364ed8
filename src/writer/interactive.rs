//! Annotations, form controls, destinations, outline items and file
//! embedding on [`PdfWriter`].
//!
//! Everything here is recorded on the writer and written by
//! [`PdfWriter::emit`]; only widget appearance streams are built right away,
//! through a redirection, and queued with the other pending objects.

use super::annotations::{Appearance, DestFit, Destination, Link, LinkTarget, Note, Screen, Widget, WidgetDescription, WidgetKind};
use super::content::{Color, ContentStreamBuilder, ContentStreamOp};
use super::document::PdfWriter;
use super::embedded_files::{EmbeddedEntry, EmbeddedFile};
use super::fonts::standard::{encode_winansi, standalone_widths, text_width, StandaloneFont, WIDGET_FONT_NAME};
use super::outline::OutlineTree;
use super::resources::ResourceKind;
use super::stream_object;
use crate::error::{Error, Result, Warning};
use crate::geometry::Rect;
use crate::object::{Dict, Object};

/// Padding between a widget border and its text.
const WIDGET_PADDING: f64 = 2.0;

/// A `/FileAttachment` annotation with its embedded file.
#[derive(Debug, Clone)]
pub(super) struct FileAttachment {
    /// Annotation object id
    pub id: u32,
    /// Page index
    pub page: usize,
    /// Icon rectangle in PDF space
    pub rect: Rect,
    /// Stream and filespec of the file
    pub entry: EmbeddedEntry,
    /// Annotation text
    pub contents: Option<String>,
}

impl PdfWriter {
    /// Page index for an annotation: `page` or the current page.
    fn annotation_page(&self, page: Option<usize>) -> Result<usize> {
        self.ensure_writable()?;
        match page {
            Some(index) if index < self.pages.len() => Ok(index),
            Some(index) => {
                log::warn!("annotation on page {} of {}", index, self.pages.len());
                Err(Error::InvalidArgument(format!("page {} does not exist", index)))
            },
            None => self.page_index(),
        }
    }

    fn add_annotation(&mut self, page: usize, id: u32) {
        self.pages[page].annotations.push(id);
        self.tag_annotation(page, id);
    }

    // ---- destinations and links ----

    /// Destination showing logical `rect` of `page` (the current page when
    /// `None`). Returns the destination index.
    pub fn create_dest(&mut self, rect: &Rect, page: Option<usize>, fit: DestFit) -> Result<usize> {
        let page = self.annotation_page(page)?;
        let rect = self.rect_on_page(page, rect)?;
        self.destinations.push(Destination { page, rect, fit });
        Ok(self.destinations.len() - 1)
    }

    /// Destination listed under `name` in the catalog `/Dests`.
    pub fn create_named_dest(
        &mut self,
        name: impl Into<String>,
        rect: &Rect,
        page: Option<usize>,
        fit: DestFit,
    ) -> Result<usize> {
        let index = self.create_dest(rect, page, fit)?;
        self.named_dests.insert(name.into(), index);
        Ok(index)
    }

    /// Link area without a target; see [`set_link_dest`] and [`set_link_url`].
    ///
    /// [`set_link_dest`]: PdfWriter::set_link_dest
    /// [`set_link_url`]: PdfWriter::set_link_url
    pub fn create_link(&mut self, rect: &Rect, page: Option<usize>, alt_text: Option<&str>) -> Result<usize> {
        let page = self.annotation_page(page)?;
        let rect = self.rect_on_page(page, rect)?;
        let id = self.allocator.create_object();
        self.links.push(Link {
            id,
            page,
            rect,
            target: LinkTarget::Unset,
            alt_text: alt_text.map(str::to_string),
        });
        self.add_annotation(page, id);
        Ok(self.links.len() - 1)
    }

    /// Point link `link` at destination `dest`.
    ///
    /// Unknown indices are logged and skipped.
    pub fn set_link_dest(&mut self, link: usize, dest: usize) -> bool {
        if dest >= self.destinations.len() {
            log::warn!("link {} set to unknown destination {}", link, dest);
            self.warnings.insert(Warning::InvalidReference);
            return false;
        }
        self.set_link_target(link, LinkTarget::Dest(dest))
    }

    /// Point link `link` at an external URL.
    pub fn set_link_url(&mut self, link: usize, url: &str) -> bool {
        self.set_link_target(link, LinkTarget::Url(url.to_string()))
    }

    fn set_link_target(&mut self, link: usize, target: LinkTarget) -> bool {
        match self.links.get_mut(link) {
            Some(entry) => {
                entry.target = target;
                true
            },
            None => {
                log::warn!("link {} does not exist", link);
                self.warnings.insert(Warning::InvalidReference);
                false
            },
        }
    }

    // ---- notes and screens ----

    /// Text note with a popup.
    pub fn create_note(
        &mut self,
        rect: &Rect,
        page: Option<usize>,
        title: &str,
        contents: &str,
        open: bool,
    ) -> Result<usize> {
        let page = self.annotation_page(page)?;
        let rect = self.rect_on_page(page, rect)?;
        let id = self.allocator.create_object();
        let popup_id = self.allocator.create_object();
        self.notes.push(Note {
            id,
            popup_id,
            page,
            rect,
            title: title.to_string(),
            contents: contents.to_string(),
            open,
        });
        self.add_annotation(page, id);
        self.pages[page].annotations.push(popup_id);
        Ok(self.notes.len() - 1)
    }

    /// Screen annotation playing media linked by URL.
    pub fn create_screen(
        &mut self,
        rect: &Rect,
        page: Option<usize>,
        url: &str,
        mime_type: &str,
        alt_text: Option<&str>,
    ) -> Result<usize> {
        self.push_screen(rect, page, Some(url.to_string()), None, mime_type, alt_text)
    }

    /// Screen annotation playing media embedded in the document.
    pub fn create_embedded_screen(
        &mut self,
        rect: &Rect,
        page: Option<usize>,
        media: EmbeddedFile,
        alt_text: Option<&str>,
    ) -> Result<usize> {
        let mime_type = media.mime_type.clone().unwrap_or_else(|| "application/octet-stream".into());
        let entry = EmbeddedEntry {
            file: media,
            stream_id: self.allocator.create_object(),
            filespec_id: self.allocator.create_object(),
        };
        let spec = entry.filespec_id;
        self.pending.extend(entry.to_objects(self.config.compress)?);
        self.push_screen(rect, page, None, Some(spec), &mime_type, alt_text)
    }

    fn push_screen(
        &mut self,
        rect: &Rect,
        page: Option<usize>,
        url: Option<String>,
        embedded_spec: Option<u32>,
        mime_type: &str,
        alt_text: Option<&str>,
    ) -> Result<usize> {
        let page = self.annotation_page(page)?;
        let rect = self.rect_on_page(page, rect)?;
        let id = self.allocator.create_object();
        self.screens.push(Screen {
            id,
            page,
            rect,
            url,
            embedded_spec,
            mime_type: mime_type.to_string(),
            alt_text: alt_text.map(str::to_string),
        });
        self.add_annotation(page, id);
        Ok(self.screens.len() - 1)
    }

    // ---- form controls ----

    /// Form control described by `description`, whose rectangle is logical.
    /// Returns the widget index.
    pub fn create_control(&mut self, description: WidgetDescription, page: Option<usize>) -> Result<usize> {
        if self.resources.is_redirected() {
            return Err(Error::UnbalancedStream("form control inside a redirected stream".into()));
        }
        let page = self.annotation_page(page)?;
        let rect = self.rect_on_page(page, &description.rect)?;

        let parent = match &description.kind {
            WidgetKind::RadioButton { group, .. } => {
                let field = match self.radio_groups.get(group) {
                    Some((field_id, _)) => *field_id,
                    None => {
                        let field_id = self.allocator.create_object();
                        self.radio_groups.insert(*group, (field_id, description.name.clone()));
                        field_id
                    },
                };
                Some(field)
            },
            _ => None,
        };

        let mut widget = Widget {
            id: 0,
            page,
            rect,
            description,
            parent,
            appearance: Appearance::default(),
        };
        if !rect.is_empty() {
            widget.appearance = self.widget_appearance(&widget)?;
        }
        let id = self.allocator.create_object();
        widget.id = id;
        log::trace!("widget {} ({}) on page {}", id, widget.description.kind.field_type(), page);

        self.widgets.push(widget);
        self.pages[page].has_widgets = true;
        self.add_annotation(page, id);
        Ok(self.widgets.len() - 1)
    }

    fn widget_appearance(&mut self, widget: &Widget) -> Result<Appearance> {
        let desc = &widget.description;
        match &desc.kind {
            WidgetKind::CheckBox { .. } | WidgetKind::RadioButton { .. } => {
                let radio = matches!(desc.kind, WidgetKind::RadioButton { .. });
                let on = self.appearance_stream(widget.rect, |out, w, h| {
                    frame(out, desc, w, h, radio);
                    check_mark(out, desc.text_color, w, h, radio);
                })?;
                let off = self.appearance_stream(widget.rect, |out, w, h| frame(out, desc, w, h, radio))?;
                Ok(Appearance {
                    normal: Some(on),
                    off: Some(off),
                })
            },
            WidgetKind::Signature => {
                let normal = self.appearance_stream(widget.rect, |out, w, h| frame(out, desc, w, h, false))?;
                Ok(Appearance {
                    normal: Some(normal),
                    off: None,
                })
            },
            _ => {
                let font_id = self.widget_font_id();
                let face = match self.widget_font {
                    StandaloneFont::Face(face) => self.faces.get(face).map(|f| f.as_ref()),
                    StandaloneFont::Helvetica => None,
                };
                let widths = standalone_widths(self.widget_font, face);
                let value = displayed_text(&desc.kind, &desc.text);
                let centered = matches!(desc.kind, WidgetKind::PushButton { .. });
                let normal = self.appearance_stream_with_font(widget.rect, font_id, |out, w, h| {
                    frame(out, desc, w, h, false);
                    let codes = encode_winansi(&value);
                    if codes.is_empty() {
                        return;
                    }
                    let size = desc.font_size;
                    let text_w = f64::from(text_width(&codes, &widths)) * size / 1000.0;
                    let x = if centered {
                        ((w - text_w) / 2.0).max(WIDGET_PADDING)
                    } else {
                        WIDGET_PADDING
                    };
                    let y = (h - size) / 2.0 + size * 0.22;
                    let marked = matches!(desc.kind, WidgetKind::Edit { .. } | WidgetKind::ComboBox { .. });
                    if marked {
                        out.begin_marked_content("Tx", None, None);
                    }
                    out.save_state();
                    out.rect(1.0, 1.0, (w - 2.0).max(0.0), (h - 2.0).max(0.0));
                    out.op(ContentStreamOp::Clip).end_path();
                    out.begin_text();
                    out.set_font(WIDGET_FONT_NAME, size);
                    out.fill_color(desc.text_color);
                    out.op(ContentStreamOp::MoveText(x, y));
                    out.op(ContentStreamOp::ShowText(codes));
                    out.end_text();
                    out.restore_state();
                    if marked {
                        out.end_marked_content();
                    }
                })?;
                Ok(Appearance {
                    normal: Some(normal),
                    off: None,
                })
            },
        }
    }

    fn appearance_stream(&mut self, rect: Rect, draw: impl FnOnce(&mut ContentStreamBuilder, f64, f64)) -> Result<u32> {
        self.build_appearance(rect, None, draw)
    }

    fn appearance_stream_with_font(
        &mut self,
        rect: Rect,
        font_id: u32,
        draw: impl FnOnce(&mut ContentStreamBuilder, f64, f64),
    ) -> Result<u32> {
        self.build_appearance(rect, Some(font_id), draw)
    }

    /// Form XObject of a widget, drawn in its own redirected stream.
    fn build_appearance(
        &mut self,
        rect: Rect,
        font_id: Option<u32>,
        draw: impl FnOnce(&mut ContentStreamBuilder, f64, f64),
    ) -> Result<u32> {
        self.resources
            .begin_redirect(&mut self.content, &mut self.state, rect);
        if let Some(font_id) = font_id {
            self.resources
                .register_named(ResourceKind::Font, WIDGET_FONT_NAME, font_id);
        }
        draw(&mut self.content, rect.width, rect.height);
        let stream = self
            .resources
            .end_redirect(&mut self.content, &mut self.state)
            .ok_or_else(|| Error::UnbalancedStream("appearance redirection lost".into()))?;

        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("XObject".into()));
        dict.insert("Subtype".into(), Object::Name("Form".into()));
        dict.insert(
            "BBox".into(),
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ]),
        );
        dict.insert("Resources".into(), stream.resources.to_object());
        let id = self.allocator.create_object();
        self.pending
            .push((id, stream_object(dict, stream.content, self.config.compress)?));
        Ok(id)
    }

    // ---- outline ----

    /// Outline item below `parent` (0 is the root) jumping to `dest`.
    ///
    /// An unknown parent attaches the item to the root with a warning.
    pub fn add_outline_item(&mut self, parent: usize, title: &str, dest: Option<usize>) -> usize {
        let outline = self
            .outline
            .get_or_insert_with(|| OutlineTree::new(self.allocator.create_object()));
        let (index, valid) = outline.add(&mut self.allocator, parent, title, dest);
        if !valid {
            log::warn!("outline parent {} does not exist", parent);
            self.warnings.insert(Warning::InvalidReference);
        }
        index
    }

    /// Move an outline item below another parent.
    pub fn set_outline_parent(&mut self, item: usize, parent: usize) -> bool {
        let ok = self.outline.as_mut().is_some_and(|o| o.set_parent(item, parent));
        self.check_outline(ok, item)
    }

    /// Rename an outline item.
    pub fn set_outline_title(&mut self, item: usize, title: &str) -> bool {
        let ok = self.outline.as_mut().is_some_and(|o| o.set_title(item, title));
        self.check_outline(ok, item)
    }

    /// Change the destination of an outline item.
    pub fn set_outline_dest(&mut self, item: usize, dest: usize) -> bool {
        let ok = self.outline.as_mut().is_some_and(|o| o.set_dest(item, dest));
        self.check_outline(ok, item)
    }

    /// Show an outline item expanded or collapsed.
    pub fn set_outline_open(&mut self, item: usize, open: bool) -> bool {
        let ok = self.outline.as_mut().is_some_and(|o| o.set_open(item, open));
        self.check_outline(ok, item)
    }

    fn check_outline(&mut self, ok: bool, item: usize) -> bool {
        if !ok {
            log::warn!("outline item {} cannot be changed", item);
            self.warnings.insert(Warning::InvalidReference);
        }
        ok
    }

    // ---- files ----

    /// Embed a file in the document's `/EmbeddedFiles` name tree. Returns
    /// the id of its file specification.
    pub fn embed_file(&mut self, file: EmbeddedFile) -> Result<u32> {
        self.ensure_writable()?;
        let entry = EmbeddedEntry {
            file,
            stream_id: self.allocator.create_object(),
            filespec_id: self.allocator.create_object(),
        };
        let id = entry.filespec_id;
        log::debug!("embedding {} ({} bytes)", entry.file.name, entry.file.size());
        self.embedded.push(entry);
        Ok(id)
    }

    /// Attach a file to the page with a paperclip annotation at `rect`.
    pub fn attach_file(
        &mut self,
        rect: &Rect,
        page: Option<usize>,
        file: EmbeddedFile,
        contents: Option<&str>,
    ) -> Result<usize> {
        let page = self.annotation_page(page)?;
        let rect = self.rect_on_page(page, rect)?;
        let entry = EmbeddedEntry {
            file,
            stream_id: self.allocator.create_object(),
            filespec_id: self.allocator.create_object(),
        };
        let id = self.allocator.create_object();
        self.attachments.push(FileAttachment {
            id,
            page,
            rect,
            entry,
            contents: contents.map(str::to_string),
        });
        self.add_annotation(page, id);
        Ok(self.attachments.len() - 1)
    }
}

/// Text a text-showing widget displays.
fn displayed_text(kind: &WidgetKind, text: &str) -> String {
    match kind {
        WidgetKind::Edit { password: true, .. } => "*".repeat(text.chars().count()),
        WidgetKind::ComboBox {
            entries,
            selected: Some(i),
            ..
        } => entries.get(*i).cloned().unwrap_or_default(),
        WidgetKind::ListBox { entries, selected, .. } => selected
            .first()
            .and_then(|&i| entries.get(i))
            .cloned()
            .unwrap_or_default(),
        _ => text.to_string(),
    }
}

/// Background and border of a widget appearance.
fn frame(out: &mut ContentStreamBuilder, desc: &WidgetDescription, w: f64, h: f64, round: bool) {
    let shape = |out: &mut ContentStreamBuilder, inset: f64| {
        if round {
            out.ellipse(w / 2.0, h / 2.0, (w / 2.0 - inset).max(0.0), (h / 2.0 - inset).max(0.0));
        } else {
            out.rect(inset, inset, (w - 2.0 * inset).max(0.0), (h - 2.0 * inset).max(0.0));
        }
    };
    if let Some(bg) = desc.background {
        out.fill_color(bg);
        shape(out, 0.0);
        out.fill();
    }
    if let Some(border) = desc.border {
        out.stroke_color(border).set_line_width(1.0);
        shape(out, 0.5);
        out.stroke();
    }
}

/// Cross for check boxes, dot for radio buttons.
fn check_mark(out: &mut ContentStreamBuilder, color: Color, w: f64, h: f64, radio: bool) {
    if radio {
        out.fill_color(color);
        out.ellipse(w / 2.0, h / 2.0, w / 4.0, h / 4.0);
        out.fill();
    } else {
        let inset = w.min(h) * 0.2;
        out.stroke_color(color).set_line_width((w.min(h) / 10.0).max(1.0));
        out.move_to(inset, inset).line_to(w - inset, h - inset);
        out.move_to(inset, h - inset).line_to(w - inset, inset);
        out.stroke();
    }
}
