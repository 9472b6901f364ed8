//! Annotation dictionaries: links, destinations, notes with popups, screens
//! and form widgets, plus the AcroForm dictionary and tab-order sorting.
//!
//! Everything here works in PDF space; the document maps logical
//! rectangles before building these records.

use super::content::Color;
use super::fonts::standard::WIDGET_FONT_NAME;
use super::primitives::encode_text_string;
use crate::config::LinkPolicy;
use crate::geometry::Rect;
use crate::object::{Dict, Object};
use bitflags::bitflags;
use std::cmp::Ordering;

fn name(n: &str) -> Object {
    Object::Name(n.to_string())
}

fn text(s: &str) -> Object {
    Object::String(encode_text_string(s))
}

fn reference(id: u32) -> Object {
    Object::Reference(id.into())
}

/// `/Rect` array of a rectangle whose `y` is the lower edge.
pub fn rect_array(r: &Rect) -> Object {
    Object::Array(vec![
        Object::Real(r.x),
        Object::Real(r.y),
        Object::Real(r.x + r.width),
        Object::Real(r.y + r.height),
    ])
}

fn color_array(c: &Color) -> Object {
    Object::Array(c.components().iter().map(|&v| Object::Real(v)).collect())
}

/// How a destination positions the target page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DestFit {
    /// Scroll to the top-left corner of the target area, keeping the zoom
    #[default]
    Xyz,
    /// Fit the whole page
    Fit,
    /// Fit the page width, top edge at the target
    FitWidth,
    /// Fit the target rectangle
    FitRectangle,
}

/// A location in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Target page index
    pub page: usize,
    /// Target area, `y` at the lower edge
    pub rect: Rect,
    /// Fit mode
    pub fit: DestFit,
}

impl Destination {
    /// Explicit destination array on `page_id`.
    pub fn to_array(&self, page_id: u32) -> Object {
        let r = &self.rect;
        let mut arr = vec![reference(page_id)];
        match self.fit {
            DestFit::Xyz => {
                arr.push(name("XYZ"));
                arr.push(Object::Real(r.x));
                arr.push(Object::Real(r.y + r.height));
                arr.push(Object::Integer(0));
            },
            DestFit::Fit => arr.push(name("Fit")),
            DestFit::FitWidth => {
                arr.push(name("FitH"));
                arr.push(Object::Real(r.y + r.height));
            },
            DestFit::FitRectangle => {
                arr.push(name("FitR"));
                arr.extend([r.x, r.y, r.x + r.width, r.y + r.height].map(Object::Real));
            },
        }
        Object::Array(arr)
    }
}

/// Where a link goes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LinkTarget {
    /// Not set yet; the link is written without an action
    #[default]
    Unset,
    /// Destination by index
    Dest(usize),
    /// External URL
    Url(String),
}

/// A link annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Annotation object id
    pub id: u32,
    /// Page index
    pub page: usize,
    /// Active area
    pub rect: Rect,
    /// Target
    pub target: LinkTarget,
    /// Alternate description (`/Contents`)
    pub alt_text: Option<String>,
}

fn has_scheme(url: &str) -> bool {
    url.split_once(':').is_some_and(|(scheme, _)| {
        scheme.len() > 1
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Action dictionary for an external URL under `policy`.
///
/// Web URLs always become `/URI`. File targets follow the policy; for
/// `/GoToR` a `#name` fragment becomes a named destination in the target
/// document.
pub fn url_action(url: &str, policy: LinkPolicy) -> Object {
    let is_file = url.starts_with("file:") || !has_scheme(url);
    let mut action = Dict::new();
    action.insert("Type".into(), name("Action"));
    match policy {
        LinkPolicy::Launch if is_file => {
            let path = url.strip_prefix("file://").unwrap_or(url);
            action.insert("S".into(), name("Launch"));
            action.insert("F".into(), text(path));
        },
        LinkPolicy::GoToR if is_file => {
            let path = url.strip_prefix("file://").unwrap_or(url);
            let (file, fragment) = match path.split_once('#') {
                Some((file, fragment)) => (file, Some(fragment)),
                None => (path, None),
            };
            action.insert("S".into(), name("GoToR"));
            action.insert("F".into(), text(file));
            let dest = match fragment {
                Some(fragment) if !fragment.is_empty() => text(fragment),
                _ => Object::Array(vec![Object::Integer(0), name("Fit")]),
            };
            action.insert("D".into(), dest);
        },
        _ => {
            action.insert("S".into(), name("URI"));
            action.insert("URI".into(), Object::String(url.as_bytes().to_vec()));
        },
    }
    Object::Dictionary(action)
}

impl Link {
    /// Link annotation dictionary.
    ///
    /// `dest` is the resolved destination array of a [`LinkTarget::Dest`].
    pub fn to_object(
        &self,
        page_id: u32,
        dest: Option<Object>,
        policy: LinkPolicy,
        struct_parent: Option<usize>,
    ) -> Object {
        let mut dict = Dict::new();
        dict.insert("Type".into(), name("Annot"));
        dict.insert("Subtype".into(), name("Link"));
        dict.insert("Rect".into(), rect_array(&self.rect));
        dict.insert("P".into(), reference(page_id));
        dict.insert(
            "Border".into(),
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        );
        dict.insert("F".into(), Object::Integer(AnnotFlags::PRINT.bits().into()));
        if let Some(alt) = &self.alt_text {
            dict.insert("Contents".into(), text(alt));
        }
        match (&self.target, dest) {
            (LinkTarget::Dest(_), Some(dest)) => {
                dict.insert("Dest".into(), dest);
            },
            (LinkTarget::Url(url), _) => {
                dict.insert("A".into(), url_action(url, policy));
            },
            _ => {},
        }
        if let Some(key) = struct_parent {
            dict.insert("StructParent".into(), Object::Integer(key as i64));
        }
        Object::Dictionary(dict)
    }
}

bitflags! {
    /// Annotation flags (`/F`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AnnotFlags: u32 {
        /// Hidden
        const HIDDEN = 1 << 1;
        /// Printed with the page
        const PRINT = 1 << 2;
        /// Does not scale with the zoom
        const NO_ZOOM = 1 << 3;
        /// Does not rotate with the page
        const NO_ROTATE = 1 << 4;
    }
}

/// A text note and its popup.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Note annotation object id
    pub id: u32,
    /// Popup annotation object id
    pub popup_id: u32,
    /// Page index
    pub page: usize,
    /// Icon area
    pub rect: Rect,
    /// Author
    pub title: String,
    /// Text
    pub contents: String,
    /// Popup shown open
    pub open: bool,
}

impl Note {
    /// The note and popup dictionaries, in that order.
    pub fn to_objects(&self, page_id: u32, struct_parent: Option<usize>) -> [Object; 2] {
        let mut note = Dict::new();
        note.insert("Type".into(), name("Annot"));
        note.insert("Subtype".into(), name("Text"));
        note.insert("Rect".into(), rect_array(&self.rect));
        note.insert("P".into(), reference(page_id));
        note.insert("F".into(), Object::Integer(AnnotFlags::PRINT.bits().into()));
        if !self.title.is_empty() {
            note.insert("T".into(), text(&self.title));
        }
        note.insert("Contents".into(), text(&self.contents));
        note.insert("Open".into(), Object::Boolean(self.open));
        note.insert("Popup".into(), reference(self.popup_id));
        if let Some(key) = struct_parent {
            note.insert("StructParent".into(), Object::Integer(key as i64));
        }

        let popup_rect = Rect::new(self.rect.x + self.rect.width, self.rect.y - 100.0, 200.0, 100.0);
        let mut popup = Dict::new();
        popup.insert("Type".into(), name("Annot"));
        popup.insert("Subtype".into(), name("Popup"));
        popup.insert("Rect".into(), rect_array(&popup_rect));
        popup.insert("P".into(), reference(page_id));
        popup.insert("Parent".into(), reference(self.id));
        popup.insert("Open".into(), Object::Boolean(self.open));
        [Object::Dictionary(note), Object::Dictionary(popup)]
    }
}

/// A screen annotation playing media.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    /// Annotation object id
    pub id: u32,
    /// Page index
    pub page: usize,
    /// Playback area
    pub rect: Rect,
    /// Linked media URL
    pub url: Option<String>,
    /// File specification of embedded media
    pub embedded_spec: Option<u32>,
    /// Media type of the clip
    pub mime_type: String,
    /// Alternate description
    pub alt_text: Option<String>,
}

impl Screen {
    /// Screen annotation with a rendition action.
    pub fn to_object(&self, page_id: u32, struct_parent: Option<usize>) -> Object {
        let mut dict = Dict::new();
        dict.insert("Type".into(), name("Annot"));
        dict.insert("Subtype".into(), name("Screen"));
        dict.insert("Rect".into(), rect_array(&self.rect));
        dict.insert("P".into(), reference(page_id));
        dict.insert("F".into(), Object::Integer(AnnotFlags::PRINT.bits().into()));
        if let Some(alt) = &self.alt_text {
            dict.insert("Contents".into(), text(alt));
        }

        let data = match (self.embedded_spec, &self.url) {
            (Some(spec), _) => Some(reference(spec)),
            (None, Some(url)) => {
                let mut spec = Dict::new();
                spec.insert("Type".into(), name("Filespec"));
                spec.insert("FS".into(), name("URL"));
                spec.insert("F".into(), text(url));
                Some(Object::Dictionary(spec))
            },
            (None, None) => None,
        };
        if let Some(data) = data {
            let mut clip = Dict::new();
            clip.insert("Type".into(), name("MediaClip"));
            clip.insert("S".into(), name("MCD"));
            clip.insert("D".into(), data);
            clip.insert("CT".into(), Object::String(self.mime_type.as_bytes().to_vec()));
            let mut permissions = Dict::new();
            permissions.insert("TF".into(), Object::String(b"TEMPACCESS".to_vec()));
            clip.insert("P".into(), Object::Dictionary(permissions));

            let mut rendition = Dict::new();
            rendition.insert("Type".into(), name("Rendition"));
            rendition.insert("S".into(), name("MR"));
            rendition.insert("C".into(), Object::Dictionary(clip));

            let mut action = Dict::new();
            action.insert("Type".into(), name("Action"));
            action.insert("S".into(), name("Rendition"));
            action.insert("OP".into(), Object::Integer(0));
            action.insert("AN".into(), reference(self.id));
            action.insert("R".into(), Object::Dictionary(rendition));
            dict.insert("A".into(), Object::Dictionary(action));
        }
        if let Some(key) = struct_parent {
            dict.insert("StructParent".into(), Object::Integer(key as i64));
        }
        Object::Dictionary(dict)
    }
}

bitflags! {
    /// Form field flags (`/Ff`), across field types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        /// User cannot change the value
        const READ_ONLY = 1 << 0;
        /// Must have a value before submit
        const REQUIRED = 1 << 1;
        /// Text may span lines
        const MULTILINE = 1 << 12;
        /// Text shown as bullets
        const PASSWORD = 1 << 13;
        /// At least one radio button stays on
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Radio button group
        const RADIO = 1 << 15;
        /// Push button
        const PUSHBUTTON = 1 << 16;
        /// Drop-down choice
        const COMBO = 1 << 17;
        /// Editable combo box
        const EDIT = 1 << 18;
        /// Value is a file path
        const FILE_SELECT = 1 << 20;
        /// Several list entries may be selected
        const MULTI_SELECT = 1 << 21;
    }
}

/// Kind-specific part of a widget.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum WidgetKind {
    /// Push button, optionally opening a URL
    PushButton {
        /// URL opened on click
        url: Option<String>,
    },
    /// Check box
    CheckBox {
        /// Initial state
        checked: bool,
        /// Export value of the on state
        on_value: String,
    },
    /// One button of a radio group
    RadioButton {
        /// Group identifier shared by the buttons of one field
        group: u32,
        /// Initially selected
        selected: bool,
        /// Export value of this button
        on_value: String,
    },
    /// List box
    ListBox {
        /// Entries
        entries: Vec<String>,
        /// Selected entry indices
        selected: Vec<usize>,
        /// Allow several selections
        multi_select: bool,
    },
    /// Drop-down list
    ComboBox {
        /// Entries
        entries: Vec<String>,
        /// Selected entry
        selected: Option<usize>,
        /// User may type a value
        editable: bool,
    },
    /// Text field
    Edit {
        /// Spans lines
        multiline: bool,
        /// Masks input
        password: bool,
        /// Maximum length
        max_len: Option<u32>,
        /// Value is a file path
        file_select: bool,
    },
    /// Unsigned signature field
    Signature,
}

impl WidgetKind {
    /// `/FT` of the field.
    pub fn field_type(&self) -> &'static str {
        match self {
            WidgetKind::PushButton { .. } | WidgetKind::CheckBox { .. } | WidgetKind::RadioButton { .. } => {
                "Btn"
            },
            WidgetKind::ListBox { .. } | WidgetKind::ComboBox { .. } => "Ch",
            WidgetKind::Edit { .. } => "Tx",
            WidgetKind::Signature => "Sig",
        }
    }

    /// Type-specific `/Ff` bits.
    pub fn flags(&self) -> FieldFlags {
        match self {
            WidgetKind::PushButton { .. } => FieldFlags::PUSHBUTTON,
            WidgetKind::CheckBox { .. } | WidgetKind::Signature => FieldFlags::empty(),
            WidgetKind::RadioButton { .. } => FieldFlags::RADIO | FieldFlags::NO_TOGGLE_TO_OFF,
            WidgetKind::ListBox { multi_select, .. } => {
                if *multi_select {
                    FieldFlags::MULTI_SELECT
                } else {
                    FieldFlags::empty()
                }
            },
            WidgetKind::ComboBox { editable, .. } => {
                if *editable {
                    FieldFlags::COMBO | FieldFlags::EDIT
                } else {
                    FieldFlags::COMBO
                }
            },
            WidgetKind::Edit {
                multiline,
                password,
                file_select,
                ..
            } => {
                let mut flags = FieldFlags::empty();
                flags.set(FieldFlags::MULTILINE, *multiline);
                flags.set(FieldFlags::PASSWORD, *password);
                flags.set(FieldFlags::FILE_SELECT, *file_select);
                flags
            },
        }
    }

    /// Whether the widget shows text in the widget font.
    pub fn shows_text(&self) -> bool {
        !matches!(
            self,
            WidgetKind::CheckBox { .. } | WidgetKind::RadioButton { .. } | WidgetKind::Signature
        )
    }
}

/// A form control as described by the host.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WidgetDescription {
    /// Control type and its state
    pub kind: WidgetKind,
    /// Field name
    pub name: String,
    /// Tooltip (`/TU`)
    pub description: Option<String>,
    /// Caption or value text
    pub text: String,
    /// Position in logical coordinates
    pub rect: Rect,
    /// Explicit tab order
    pub tab_order: Option<i32>,
    /// Read only
    pub read_only: bool,
    /// Required
    pub required: bool,
    /// Text color
    pub text_color: Color,
    /// Background fill
    pub background: Option<Color>,
    /// Border stroke
    pub border: Option<Color>,
    /// Text size in points
    pub font_size: f64,
}

impl WidgetDescription {
    /// Description of `kind` named `name` at `rect`.
    pub fn new(kind: WidgetKind, name: impl Into<String>, rect: Rect) -> Self {
        Self {
            kind,
            name: name.into(),
            description: None,
            text: String::new(),
            rect,
            tab_order: None,
            read_only: false,
            required: false,
            text_color: Color::black(),
            background: None,
            border: Some(Color::black()),
            font_size: 12.0,
        }
    }

    /// Set the caption or value.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the tab order.
    pub fn with_tab_order(mut self, order: i32) -> Self {
        self.tab_order = Some(order);
        self
    }

    /// Set the tooltip.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `/Ff` including the common flags.
    pub fn field_flags(&self) -> FieldFlags {
        let mut flags = self.kind.flags();
        flags.set(FieldFlags::READ_ONLY, self.read_only);
        flags.set(FieldFlags::REQUIRED, self.required);
        flags
    }

    /// Default appearance string (`/DA`).
    pub fn default_appearance(&self) -> String {
        let mut da = Vec::new();
        super::primitives::append_name(WIDGET_FONT_NAME, &mut da);
        da.push(b' ');
        super::primitives::append_fixed(self.font_size, super::primitives::COORD_PRECISION, &mut da);
        da.extend_from_slice(b" Tf ");
        for v in self.text_color.components() {
            super::primitives::append_fixed(v, super::primitives::COORD_PRECISION, &mut da);
            da.push(b' ');
        }
        da.extend_from_slice(b"rg");
        String::from_utf8_lossy(&da).into_owned()
    }
}

/// Appearance stream ids of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Appearance {
    /// Normal (or on) appearance
    pub normal: Option<u32>,
    /// Off appearance of check boxes and radio buttons
    pub off: Option<u32>,
}

/// A widget placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    /// Widget annotation (and field) object id
    pub id: u32,
    /// Page index
    pub page: usize,
    /// Rectangle, `y` at the lower edge
    pub rect: Rect,
    /// Host description
    pub description: WidgetDescription,
    /// Radio group field this button belongs to
    pub parent: Option<u32>,
    /// Appearance streams
    pub appearance: Appearance,
}

impl Widget {
    /// On-state name of a check box or radio button.
    fn on_state(&self) -> Option<String> {
        match &self.description.kind {
            WidgetKind::CheckBox { on_value, .. } | WidgetKind::RadioButton { on_value, .. } => {
                Some(if on_value.is_empty() { "Yes".to_string() } else { on_value.clone() })
            },
            _ => None,
        }
    }

    fn is_on(&self) -> bool {
        match &self.description.kind {
            WidgetKind::CheckBox { checked, .. } => *checked,
            WidgetKind::RadioButton { selected, .. } => *selected,
            _ => false,
        }
    }

    /// Merged field and widget annotation dictionary.
    ///
    /// Radio buttons are kids of their group field and carry only the
    /// annotation part.
    pub fn to_object(
        &self,
        page_id: u32,
        signature: Option<u32>,
        policy: LinkPolicy,
        struct_parent: Option<usize>,
    ) -> Object {
        let desc = &self.description;
        let mut dict = Dict::new();
        dict.insert("Type".into(), name("Annot"));
        dict.insert("Subtype".into(), name("Widget"));
        dict.insert("Rect".into(), rect_array(&self.rect));
        dict.insert("P".into(), reference(page_id));
        dict.insert("F".into(), Object::Integer(AnnotFlags::PRINT.bits().into()));

        if let Some(parent) = self.parent {
            dict.insert("Parent".into(), reference(parent));
        } else {
            dict.insert("FT".into(), name(desc.kind.field_type()));
            dict.insert("T".into(), text(&desc.name));
            let flags = desc.field_flags();
            if !flags.is_empty() {
                dict.insert("Ff".into(), Object::Integer(flags.bits().into()));
            }
        }
        if let Some(tooltip) = &desc.description {
            dict.insert("TU".into(), text(tooltip));
        }

        let mut mk = Dict::new();
        if let Some(bg) = &desc.background {
            mk.insert("BG".into(), color_array(bg));
        }
        if let Some(border) = &desc.border {
            mk.insert("BC".into(), color_array(border));
        }

        match &desc.kind {
            WidgetKind::PushButton { url } => {
                mk.insert("CA".into(), text(&desc.text));
                if let Some(url) = url {
                    dict.insert("A".into(), url_action(url, policy));
                }
            },
            WidgetKind::CheckBox { .. } | WidgetKind::RadioButton { .. } => {
                let on = self.on_state().unwrap_or_else(|| "Yes".into());
                let state = if self.is_on() { on.clone() } else { "Off".to_string() };
                if self.parent.is_none() {
                    dict.insert("V".into(), name(&state));
                }
                dict.insert("AS".into(), name(&state));
                if let (Some(normal), Some(off)) = (self.appearance.normal, self.appearance.off) {
                    let mut states = Dict::new();
                    states.insert(on, reference(normal));
                    states.insert("Off".into(), reference(off));
                    let mut ap = Dict::new();
                    ap.insert("N".into(), Object::Dictionary(states));
                    dict.insert("AP".into(), Object::Dictionary(ap));
                }
            },
            WidgetKind::ListBox { entries, selected, .. } => {
                dict.insert("Opt".into(), Object::Array(entries.iter().map(|e| text(e)).collect()));
                let values: Vec<Object> = selected.iter().filter_map(|&i| entries.get(i)).map(|e| text(e)).collect();
                if values.len() == 1 {
                    dict.insert("V".into(), values[0].clone());
                } else if !values.is_empty() {
                    dict.insert("V".into(), Object::Array(values));
                }
                dict.insert(
                    "I".into(),
                    Object::Array(selected.iter().map(|&i| Object::Integer(i as i64)).collect()),
                );
            },
            WidgetKind::ComboBox { entries, selected, .. } => {
                dict.insert("Opt".into(), Object::Array(entries.iter().map(|e| text(e)).collect()));
                match selected.and_then(|i| entries.get(i)) {
                    Some(value) => {
                        dict.insert("V".into(), text(value));
                    },
                    None if !desc.text.is_empty() => {
                        dict.insert("V".into(), text(&desc.text));
                    },
                    None => {},
                }
            },
            WidgetKind::Edit { max_len, .. } => {
                dict.insert("V".into(), text(&desc.text));
                dict.insert("DV".into(), text(&desc.text));
                if let Some(max) = max_len {
                    dict.insert("MaxLen".into(), Object::Integer(i64::from(*max)));
                }
            },
            WidgetKind::Signature => {
                if let Some(sig) = signature {
                    dict.insert("V".into(), reference(sig));
                }
            },
        }

        if !mk.is_empty() {
            dict.insert("MK".into(), Object::Dictionary(mk));
        }
        if desc.kind.shows_text() {
            dict.insert("DA".into(), text(&desc.default_appearance()));
        }
        if !matches!(desc.kind, WidgetKind::CheckBox { .. } | WidgetKind::RadioButton { .. }) {
            if let Some(normal) = self.appearance.normal {
                let mut ap = Dict::new();
                ap.insert("N".into(), reference(normal));
                dict.insert("AP".into(), Object::Dictionary(ap));
            }
        }
        if let Some(key) = struct_parent {
            dict.insert("StructParent".into(), Object::Integer(key as i64));
        }
        Object::Dictionary(dict)
    }
}

/// Field dictionary of a radio group.
pub fn radio_group_object(name_text: &str, kids: &[&Widget]) -> Object {
    let mut dict = Dict::new();
    dict.insert("FT".into(), name("Btn"));
    dict.insert("T".into(), text(name_text));
    dict.insert(
        "Ff".into(),
        Object::Integer((FieldFlags::RADIO | FieldFlags::NO_TOGGLE_TO_OFF).bits().into()),
    );
    dict.insert("Kids".into(), Object::Array(kids.iter().map(|w| reference(w.id)).collect()));
    let value = kids
        .iter()
        .find(|w| w.is_on())
        .and_then(|w| w.on_state())
        .unwrap_or_else(|| "Off".into());
    dict.insert("V".into(), name(&value));
    Object::Dictionary(dict)
}

/// The `/AcroForm` dictionary.
///
/// `font_id` is the standalone widget font registered as default resource.
pub fn acroform_object(fields: &[u32], font_id: u32, has_signature: bool) -> Object {
    let mut fonts = Dict::new();
    fonts.insert(WIDGET_FONT_NAME.into(), reference(font_id));
    let mut dr = Dict::new();
    dr.insert("Font".into(), Object::Dictionary(fonts));

    let mut dict = Dict::new();
    dict.insert("Fields".into(), Object::Array(fields.iter().map(|&id| reference(id)).collect()));
    dict.insert("DR".into(), Object::Dictionary(dr));
    dict.insert("DA".into(), text(&format!("/{} 0 Tf 0 g", WIDGET_FONT_NAME)));
    if has_signature {
        // SignaturesExist | AppendOnly
        dict.insert("SigFlags".into(), Object::Integer(3));
    }
    Object::Dictionary(dict)
}

/// Annotation entry considered by [`sort_by_tab_order`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabEntry {
    /// Annotation object id
    pub id: u32,
    /// Tab order and rectangle of widgets; `None` for other annotations
    pub widget: Option<(Option<i32>, Rect)>,
}

fn compare_widgets(a: &(Option<i32>, Rect), b: &(Option<i32>, Rect)) -> Ordering {
    let order = |o: Option<i32>| o.map(i64::from).unwrap_or(i64::MAX);
    let top = |r: &Rect| r.y + r.height;
    order(a.0)
        .cmp(&order(b.0))
        .then_with(|| top(&b.1).total_cmp(&top(&a.1)))
        .then_with(|| a.1.x.total_cmp(&b.1.x))
}

/// Page annotation order: widgets by tab order, then higher top edge, then
/// smaller left edge; other annotations follow in their original order.
pub fn sort_by_tab_order(entries: &[TabEntry]) -> Vec<u32> {
    let mut widgets: Vec<(u32, (Option<i32>, Rect))> =
        entries.iter().filter_map(|e| e.widget.map(|w| (e.id, w))).collect();
    widgets.sort_by(|a, b| compare_widgets(&a.1, &b.1));
    widgets
        .into_iter()
        .map(|(id, _)| id)
        .chain(entries.iter().filter(|e| e.widget.is_none()).map(|e| e.id))
        .collect()
}
