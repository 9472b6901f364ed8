//! Tagged PDF structure tree.
//!
//! Elements live in an arena addressed by index; index 0 is the
//! StructTreeRoot. An element starts as a placeholder (its slot in the
//! parent's kids is reserved, the type is unknown), becomes typed once the
//! host knows what it is, and collects marked-content ids, annotation
//! references and child elements until the document is emitted.
//!
//! At emission, placeholders that were never typed and `NonStructElement`
//! nodes are spliced out: their kids move up into the nearest element that
//! is written. Kid lists longer than [`MAX_STRUCT_KIDS`] are split into
//! synthetic `/Div` elements.

use super::primitives::encode_text_string;
use super::IndirectObject;
use crate::geometry::Rect;
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use std::collections::{BTreeMap, HashMap};

/// Largest kid array written for one element.
pub const MAX_STRUCT_KIDS: usize = 8191;

/// Namespace of the PDF 2.0 standard structure types.
pub const PDF2_NAMESPACE: &str = "http://iso.org/pdf2/ssn";

/// Index of the StructTreeRoot.
pub const STRUCT_ROOT: usize = 0;

/// Standard structure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum StructElementType {
    /// Transparent grouping; written as its kids
    NonStructElement,
    Document,
    DocumentFragment,
    Part,
    Article,
    Section,
    Division,
    BlockQuote,
    Caption,
    TOC,
    TOCI,
    Index,
    Aside,
    Title,
    FENote,
    Paragraph,
    Heading,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    List,
    ListItem,
    LILabel,
    LIBody,
    Table,
    TableRow,
    TableHeader,
    TableData,
    TableHead,
    TableBody,
    TableFoot,
    Span,
    Quote,
    Note,
    Reference,
    BibEntry,
    Code,
    Link,
    Annot,
    Emphasis,
    Strong,
    Sub,
    Ruby,
    RB,
    RT,
    RP,
    Warichu,
    WT,
    WP,
    Figure,
    Formula,
    Form,
}

impl StructElementType {
    /// Structure type name.
    pub fn pdf_name(self) -> &'static str {
        use StructElementType::*;
        match self {
            NonStructElement => "NonStruct",
            Document => "Document",
            DocumentFragment => "DocumentFragment",
            Part => "Part",
            Article => "Art",
            Section => "Sect",
            Division => "Div",
            BlockQuote => "BlockQuote",
            Caption => "Caption",
            TOC => "TOC",
            TOCI => "TOCI",
            Index => "Index",
            Aside => "Aside",
            Title => "Title",
            FENote => "FENote",
            Paragraph => "P",
            Heading => "H",
            H1 => "H1",
            H2 => "H2",
            H3 => "H3",
            H4 => "H4",
            H5 => "H5",
            H6 => "H6",
            List => "L",
            ListItem => "LI",
            LILabel => "Lbl",
            LIBody => "LBody",
            Table => "Table",
            TableRow => "TR",
            TableHeader => "TH",
            TableData => "TD",
            TableHead => "THead",
            TableBody => "TBody",
            TableFoot => "TFoot",
            Span => "Span",
            Quote => "Quote",
            Note => "Note",
            Reference => "Reference",
            BibEntry => "BibEntry",
            Code => "Code",
            Link => "Link",
            Annot => "Annot",
            Emphasis => "Em",
            Strong => "Strong",
            Sub => "Sub",
            Ruby => "Ruby",
            RB => "RB",
            RT => "RT",
            RP => "RP",
            Warichu => "Warichu",
            WT => "WT",
            WP => "WP",
            Figure => "Figure",
            Formula => "Formula",
            Form => "Form",
        }
    }

    /// PDF 1.x type a 2.0-only type is role-mapped to.
    pub fn pdf1_fallback(self) -> Option<StructElementType> {
        use StructElementType::*;
        match self {
            DocumentFragment | Aside => Some(Division),
            Title => Some(Paragraph),
            FENote => Some(Note),
            Emphasis | Strong | Sub => Some(Span),
            _ => None,
        }
    }

    fn has_bbox(self) -> bool {
        matches!(
            self,
            StructElementType::Figure | StructElementType::Formula | StructElementType::Table
        )
    }
}

/// Attribute keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum StructAttribute {
    Placement,
    WritingMode,
    SpaceBefore,
    SpaceAfter,
    StartIndent,
    EndIndent,
    TextIndent,
    TextAlign,
    Width,
    Height,
    BlockAlign,
    InlineAlign,
    LineHeight,
    TextDecorationType,
    ListNumbering,
    RowSpan,
    ColSpan,
    Scope,
}

impl StructAttribute {
    /// Attribute name.
    pub fn pdf_name(self) -> &'static str {
        use StructAttribute::*;
        match self {
            Placement => "Placement",
            WritingMode => "WritingMode",
            SpaceBefore => "SpaceBefore",
            SpaceAfter => "SpaceAfter",
            StartIndent => "StartIndent",
            EndIndent => "EndIndent",
            TextIndent => "TextIndent",
            TextAlign => "TextAlign",
            Width => "Width",
            Height => "Height",
            BlockAlign => "BlockAlign",
            InlineAlign => "InlineAlign",
            LineHeight => "LineHeight",
            TextDecorationType => "TextDecorationType",
            ListNumbering => "ListNumbering",
            RowSpan => "RowSpan",
            ColSpan => "ColSpan",
            Scope => "Scope",
        }
    }

    /// Attribute owner (`/O`).
    pub fn owner(self) -> &'static str {
        match self {
            StructAttribute::ListNumbering => "List",
            StructAttribute::RowSpan | StructAttribute::ColSpan | StructAttribute::Scope => "Table",
            _ => "Layout",
        }
    }
}

/// Attribute values.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum AttrValue {
    Block,
    Inline,
    Before,
    Start,
    End,
    LrTb,
    RlTb,
    TbRl,
    Center,
    Justify,
    Middle,
    Auto,
    Normal,
    Underline,
    LineThrough,
    Overline,
    None,
    Disc,
    Circle,
    Square,
    Decimal,
    UpperRoman,
    LowerRoman,
    UpperAlpha,
    LowerAlpha,
    Row,
    Column,
    Both,
    /// Length or other real
    Number(f64),
    /// Counts such as row spans
    Integer(i64),
}

impl AttrValue {
    fn to_object(self) -> Object {
        use AttrValue::*;
        let name = match self {
            Number(v) => return Object::Real(v),
            Integer(v) => return Object::Integer(v),
            Block => "Block",
            Inline => "Inline",
            Before => "Before",
            Start => "Start",
            End => "End",
            LrTb => "LrTb",
            RlTb => "RlTb",
            TbRl => "TbRl",
            Center => "Center",
            Justify => "Justify",
            Middle => "Middle",
            Auto => "Auto",
            Normal => "Normal",
            Underline => "Underline",
            LineThrough => "LineThrough",
            Overline => "Overline",
            None => "None",
            Disc => "Disc",
            Circle => "Circle",
            Square => "Square",
            Decimal => "Decimal",
            UpperRoman => "UpperRoman",
            LowerRoman => "LowerRoman",
            UpperAlpha => "UpperAlpha",
            LowerAlpha => "LowerAlpha",
            Row => "Row",
            Column => "Column",
            Both => "Both",
        };
        Object::Name(name.into())
    }
}

/// Kid of a structure element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKid {
    /// Child element by index
    Element(usize),
    /// Marked-content sequence on a page
    Mcid {
        /// Page object id
        page: u32,
        /// Marked-content id
        mcid: u32,
    },
    /// Annotation or XObject
    ObjRef {
        /// Page object id
        page: u32,
        /// Referenced object id
        object: u32,
    },
}

/// One structure element.
#[derive(Debug, Clone, PartialEq)]
pub struct StructElement {
    /// Object id, allocated when typed
    pub id: Option<u32>,
    /// Parent index
    pub parent: usize,
    /// Type; `None` while a placeholder
    pub kind: Option<StructElementType>,
    /// Custom tag role-mapped to `kind`
    pub alias: Option<String>,
    /// Attributes
    pub attributes: BTreeMap<StructAttribute, AttrValue>,
    /// Kids in document order
    pub kids: Vec<StructKid>,
    /// First page the element has content on
    pub page: Option<u32>,
    /// Replacement text
    pub actual_text: Option<String>,
    /// Alternate description
    pub alt_text: Option<String>,
    /// Language
    pub language: Option<String>,
    /// Bounding box in PDF space
    pub bbox: Option<Rect>,
    /// Entry in the ID tree
    pub structure_id: Option<String>,
}

impl StructElement {
    fn placeholder(parent: usize) -> Self {
        Self {
            id: None,
            parent,
            kind: None,
            alias: None,
            attributes: BTreeMap::new(),
            kids: Vec::new(),
            page: None,
            actual_text: None,
            alt_text: None,
            language: None,
            bbox: None,
            structure_id: None,
        }
    }

    /// Whether the element is written as its own object.
    pub fn is_written(&self) -> bool {
        matches!(self.kind, Some(kind) if kind != StructElementType::NonStructElement)
    }

    /// Tag used in content streams and `/S`.
    pub fn tag(&self) -> Option<&str> {
        let kind = self.kind?;
        Some(self.alias.as_deref().unwrap_or(kind.pdf_name()))
    }
}

/// Marked-content tag to open around content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkedContent {
    /// Content of a structure element
    Structure {
        /// Structure tag
        tag: String,
        /// Marked-content id on the page
        mcid: u32,
    },
    /// Page furniture
    Artifact,
}

/// Kid written into a `/K` array after splicing and splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kid {
    Object(u32),
    Mcid { page: u32, mcid: u32 },
    ObjRef { page: u32, object: u32 },
}

/// Structure arena plus parent-tree bookkeeping.
#[derive(Debug, Clone)]
pub struct StructureTree {
    elements: Vec<StructElement>,
    current: usize,
    open: Option<usize>,
    page_keys: BTreeMap<u32, usize>,
    object_keys: BTreeMap<usize, (u32, u32)>,
    next_key: usize,
}

impl StructureTree {
    /// Tree whose root object id is `root_id`.
    pub fn new(root_id: u32) -> Self {
        let mut root = StructElement::placeholder(STRUCT_ROOT);
        root.id = Some(root_id);
        Self {
            elements: vec![root],
            current: STRUCT_ROOT,
            open: None,
            page_keys: BTreeMap::new(),
            object_keys: BTreeMap::new(),
            next_key: 0,
        }
    }

    /// Object id of the StructTreeRoot.
    pub fn root_id(&self) -> u32 {
        self.elements[STRUCT_ROOT].id.unwrap_or(0)
    }

    /// Element by index.
    pub fn get(&self, index: usize) -> Option<&StructElement> {
        self.elements.get(index)
    }

    /// Number of elements, root excluded.
    pub fn len(&self) -> usize {
        self.elements.len() - 1
    }

    /// Whether no element was created.
    pub fn is_empty(&self) -> bool {
        self.elements.len() == 1
    }

    /// Index of the current element.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Create a placeholder below the current element.
    pub fn ensure_element(&mut self) -> usize {
        let index = self.elements.len();
        self.elements.push(StructElement::placeholder(self.current));
        self.elements[self.current].kids.push(StructKid::Element(index));
        index
    }

    /// Give a placeholder its type and object id.
    ///
    /// Returns `false` for unknown indices, the root, and elements that
    /// already have a type.
    pub fn init_element(
        &mut self,
        allocator: &mut ObjectAllocator,
        index: usize,
        kind: StructElementType,
        alias: Option<&str>,
    ) -> bool {
        let Some(element) = self.elements.get_mut(index).filter(|_| index != STRUCT_ROOT) else {
            return false;
        };
        if element.kind.is_some() {
            return false;
        }
        element.kind = Some(kind);
        element.alias = alias.filter(|a| !a.is_empty()).map(str::to_string);
        if kind != StructElementType::NonStructElement {
            element.id = Some(allocator.create_object());
        }
        true
    }

    /// Make `index` the current element.
    ///
    /// The caller closes any open marked-content sequence first.
    pub fn begin_element(&mut self, index: usize) -> bool {
        if index == STRUCT_ROOT || index >= self.elements.len() {
            log::warn!("structure element {} does not exist", index);
            return false;
        }
        self.current = index;
        true
    }

    /// Return to the parent of the current element; a no-op at the root.
    pub fn end_element(&mut self) -> bool {
        if self.current == STRUCT_ROOT {
            log::warn!("end of structure element that was never begun");
            return false;
        }
        self.current = self.elements[self.current].parent;
        true
    }

    fn with_element(&mut self, index: usize, f: impl FnOnce(&mut StructElement)) -> bool {
        match self.elements.get_mut(index).filter(|_| index != STRUCT_ROOT) {
            Some(element) => {
                f(element);
                true
            },
            None => false,
        }
    }

    /// Set an attribute of the current element.
    pub fn set_attribute(&mut self, attribute: StructAttribute, value: AttrValue) -> bool {
        self.with_element(self.current, |e| {
            e.attributes.insert(attribute, value);
        })
    }

    /// Set the bounding box of the current element.
    pub fn set_bbox(&mut self, bbox: Rect) -> bool {
        self.with_element(self.current, |e| e.bbox = Some(bbox))
    }

    /// Set the replacement text of the current element.
    pub fn set_actual_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.with_element(self.current, |e| e.actual_text = Some(text))
    }

    /// Set the alternate description of the current element.
    pub fn set_alt_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.with_element(self.current, |e| e.alt_text = Some(text))
    }

    /// Set the language of the current element.
    pub fn set_language(&mut self, language: impl Into<String>) -> bool {
        let language = language.into();
        self.with_element(self.current, |e| e.language = Some(language))
    }

    /// Register the current element in the ID tree.
    pub fn set_structure_id(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.with_element(self.current, |e| e.structure_id = Some(id))
    }

    /// Element that owns marked content drawn while `index` is current.
    fn content_owner(&self, mut index: usize) -> Option<usize> {
        loop {
            if index == STRUCT_ROOT {
                return None;
            }
            match self.elements[index].kind {
                Some(StructElementType::NonStructElement) => return None,
                Some(_) => return Some(index),
                None => index = self.elements[index].parent,
            }
        }
    }

    /// Whether a marked-content sequence is open.
    pub fn is_sequence_open(&self) -> bool {
        self.open.is_some()
    }

    /// Open the marked-content sequence of the current element on a page.
    ///
    /// Returns `None` when the sequence is already open. Otherwise the
    /// caller writes the returned tag; for structure content the new MCID
    /// is recorded in the element and in `mcid_parents`.
    pub fn begin_sequence(&mut self, page_id: u32, mcid_parents: &mut Vec<u32>) -> Option<MarkedContent> {
        if self.open.is_some() {
            return None;
        }
        self.open = Some(self.current);
        let Some(owner) = self.content_owner(self.current) else {
            return Some(MarkedContent::Artifact);
        };
        let element = &mut self.elements[owner];
        let (Some(id), Some(tag)) = (element.id, element.tag().map(str::to_string)) else {
            return Some(MarkedContent::Artifact);
        };
        let mcid = mcid_parents.len() as u32;
        mcid_parents.push(id);
        element.kids.push(StructKid::Mcid { page: page_id, mcid });
        element.page.get_or_insert(page_id);
        if !self.page_keys.contains_key(&page_id) {
            self.page_keys.insert(page_id, self.next_key);
            self.next_key += 1;
        }
        Some(MarkedContent::Structure { tag, mcid })
    }

    /// Close the open sequence; returns whether one was open.
    pub fn end_sequence(&mut self) -> bool {
        self.open.take().is_some()
    }

    /// Parent-tree key of a page, once it carries structure content.
    pub fn page_key(&self, page_id: u32) -> Option<usize> {
        self.page_keys.get(&page_id).copied()
    }

    /// Attach an annotation to the current element.
    ///
    /// Returns the annotation's `/StructParent` key, or `None` when no
    /// written element is current.
    pub fn add_object_ref(&mut self, page_id: u32, object: u32) -> Option<usize> {
        let owner = self.content_owner(self.current)?;
        let element = &mut self.elements[owner];
        element.kids.push(StructKid::ObjRef { page: page_id, object });
        element.page.get_or_insert(page_id);
        let key = self.next_key;
        self.next_key += 1;
        self.object_keys.insert(key, (page_id, object));
        Some(key)
    }

    /// Nearest ancestor that is written (or the root).
    fn written_parent(&self, index: usize) -> usize {
        let mut parent = self.elements[index].parent;
        while parent != STRUCT_ROOT && !self.elements[parent].is_written() {
            parent = self.elements[parent].parent;
        }
        parent
    }

    /// Kids of `index` with untyped and transparent elements spliced in.
    fn flattened_kids(&self, index: usize, out: &mut Vec<(StructKid, Option<usize>)>) {
        for kid in &self.elements[index].kids {
            match *kid {
                StructKid::Element(child) if !self.elements[child].is_written() => {
                    self.flattened_kids(child, out);
                },
                StructKid::Element(child) => out.push((*kid, Some(child))),
                other => out.push((other, None)),
            }
        }
    }

    /// Structure tree objects: elements, synthetic divisions, the parent
    /// tree, and the StructTreeRoot.
    ///
    /// `pages` lists each page object id with its MCID parents. `pdf2`
    /// selects PDF 2.0 namespaces instead of role-mapping 2.0 types.
    pub fn to_objects(
        &self,
        allocator: &mut ObjectAllocator,
        pages: &[(u32, &[u32])],
        pdf2: bool,
    ) -> Vec<IndirectObject> {
        let namespace_id = pdf2.then(|| allocator.create_object());

        // final kids and /P of every written element, including splits
        let mut parent_of: HashMap<u32, u32> = HashMap::new();
        let mut mcid_owner: HashMap<(u32, u32), u32> = HashMap::new();
        let mut object_owner: HashMap<u32, u32> = HashMap::new();
        let mut divisions: Vec<(u32, u32, Vec<Kid>)> = Vec::new();
        let mut kids_of: HashMap<u32, Vec<Kid>> = HashMap::new();

        for (index, element) in self.elements.iter().enumerate() {
            if index != STRUCT_ROOT && !element.is_written() {
                continue;
            }
            let Some(id) = element.id else { continue };
            let mut flat = Vec::new();
            self.flattened_kids(index, &mut flat);
            let kids: Vec<Kid> = flat
                .into_iter()
                .filter_map(|(kid, child)| match kid {
                    StructKid::Element(_) => child.and_then(|c| self.elements[c].id).map(Kid::Object),
                    StructKid::Mcid { page, mcid } => Some(Kid::Mcid { page, mcid }),
                    StructKid::ObjRef { page, object } => Some(Kid::ObjRef { page, object }),
                })
                .collect();
            let kids = split_kids(allocator, id, kids, &mut divisions);
            kids_of.insert(id, kids);
        }
        for (owner, kids) in kids_of
            .iter()
            .map(|(id, kids)| (*id, kids))
            .chain(divisions.iter().map(|(id, _, kids)| (*id, kids)))
        {
            for kid in kids {
                match *kid {
                    Kid::Object(child) => {
                        parent_of.insert(child, owner);
                    },
                    Kid::Mcid { page, mcid } => {
                        mcid_owner.insert((page, mcid), owner);
                    },
                    Kid::ObjRef { object, .. } => {
                        object_owner.insert(object, owner);
                    },
                }
            }
        }

        let mut objects = Vec::new();
        let mut role_map = Dict::new();
        let mut id_tree: BTreeMap<String, u32> = BTreeMap::new();

        for (index, element) in self.elements.iter().enumerate().skip(1) {
            let (Some(id), Some(kind)) = (element.id, element.kind) else { continue };
            if !element.is_written() {
                continue;
            }
            let tag = element.tag().unwrap_or(kind.pdf_name()).to_string();
            let standard = match (pdf2, kind.pdf1_fallback()) {
                (false, Some(fallback)) => fallback,
                _ => kind,
            };
            if tag != standard.pdf_name() {
                role_map.insert(tag.clone(), Object::Name(standard.pdf_name().into()));
            }

            let parent = parent_of
                .get(&id)
                .copied()
                .unwrap_or_else(|| self.elements[self.written_parent(index)].id.unwrap_or(0));
            let kids = kids_of.get(&id).map(Vec::as_slice).unwrap_or(&[]);

            let mut dict = Dict::new();
            dict.insert("Type".into(), Object::Name("StructElem".into()));
            dict.insert("S".into(), Object::Name(tag));
            dict.insert("P".into(), Object::Reference(parent.into()));
            if let Some(ns) = namespace_id {
                dict.insert("NS".into(), Object::Reference(ns.into()));
            }
            if let Some(page) = element.page {
                dict.insert("Pg".into(), Object::Reference(page.into()));
            }
            if let Some(sid) = &element.structure_id {
                dict.insert("ID".into(), Object::String(sid.as_bytes().to_vec()));
                id_tree.insert(sid.clone(), id);
            }
            if let Some(attrs) = attribute_object(element, kind) {
                dict.insert("A".into(), attrs);
            }
            if let Some(text) = &element.alt_text {
                dict.insert("Alt".into(), Object::String(encode_text_string(text)));
            }
            if let Some(text) = &element.actual_text {
                dict.insert("ActualText".into(), Object::String(encode_text_string(text)));
            }
            if let Some(lang) = &element.language {
                dict.insert("Lang".into(), Object::String(encode_text_string(lang)));
            }
            if !kids.is_empty() {
                dict.insert("K".into(), kids_object(kids, element.page));
            }
            objects.push((id, Object::Dictionary(dict)));
        }

        for (id, parent, kids) in &divisions {
            let mut dict = Dict::new();
            dict.insert("Type".into(), Object::Name("StructElem".into()));
            dict.insert("S".into(), Object::Name("Div".into()));
            let parent = parent_of.get(id).copied().unwrap_or(*parent);
            dict.insert("P".into(), Object::Reference(parent.into()));
            if let Some(ns) = namespace_id {
                dict.insert("NS".into(), Object::Reference(ns.into()));
            }
            dict.insert("K".into(), kids_object(kids, None));
            objects.push((*id, Object::Dictionary(dict)));
        }

        // parent tree: pages first (by key), then annotations
        let mut nums: BTreeMap<usize, Object> = BTreeMap::new();
        for (page_id, parents) in pages {
            let Some(key) = self.page_key(*page_id) else { continue };
            let refs = parents
                .iter()
                .enumerate()
                .map(|(mcid, &fallback)| {
                    let owner = mcid_owner.get(&(*page_id, mcid as u32)).copied().unwrap_or(fallback);
                    Object::Reference(owner.into())
                })
                .collect();
            nums.insert(key, Object::Array(refs));
        }
        for (&key, &(_, object)) in &self.object_keys {
            if let Some(owner) = object_owner.get(&object) {
                nums.insert(key, Object::Reference((*owner).into()));
            }
        }
        let parent_tree_id = allocator.create_object();
        let mut parent_tree = Dict::new();
        parent_tree.insert(
            "Nums".into(),
            Object::Array(
                nums.into_iter()
                    .flat_map(|(key, value)| [Object::Integer(key as i64), value])
                    .collect(),
            ),
        );
        objects.push((parent_tree_id, Object::Dictionary(parent_tree)));

        let mut root = Dict::new();
        root.insert("Type".into(), Object::Name("StructTreeRoot".into()));
        if let Some(kids) = kids_of.get(&self.root_id()) {
            if !kids.is_empty() {
                root.insert("K".into(), kids_object(kids, None));
            }
        }
        root.insert("ParentTree".into(), Object::Reference(parent_tree_id.into()));
        root.insert("ParentTreeNextKey".into(), Object::Integer(self.next_key as i64));
        if !role_map.is_empty() {
            root.insert("RoleMap".into(), Object::Dictionary(role_map));
        }
        if !id_tree.is_empty() {
            let mut names = Dict::new();
            names.insert(
                "Names".into(),
                Object::Array(
                    id_tree
                        .into_iter()
                        .flat_map(|(sid, id)| [Object::String(sid.into_bytes()), Object::Reference(id.into())])
                        .collect(),
                ),
            );
            root.insert("IDTree".into(), Object::Dictionary(names));
        }
        if let Some(ns) = namespace_id {
            let mut namespace = Dict::new();
            namespace.insert("Type".into(), Object::Name("Namespace".into()));
            namespace.insert("NS".into(), Object::String(PDF2_NAMESPACE.as_bytes().to_vec()));
            objects.push((ns, Object::Dictionary(namespace)));
            root.insert("Namespaces".into(), Object::Array(vec![Object::Reference(ns.into())]));
        }
        objects.push((self.root_id(), Object::Dictionary(root)));
        objects
    }
}

/// Split `kids` of element `owner` into synthetic divisions of at most
/// [`MAX_STRUCT_KIDS`] kids, recursively.
fn split_kids(
    allocator: &mut ObjectAllocator,
    owner: u32,
    kids: Vec<Kid>,
    divisions: &mut Vec<(u32, u32, Vec<Kid>)>,
) -> Vec<Kid> {
    if kids.len() <= MAX_STRUCT_KIDS {
        return kids;
    }
    let mut grouped = Vec::with_capacity(kids.len() / MAX_STRUCT_KIDS + 1);
    for chunk in kids.chunks(MAX_STRUCT_KIDS) {
        let id = allocator.create_object();
        divisions.push((id, owner, chunk.to_vec()));
        grouped.push(Kid::Object(id));
    }
    // nested divisions get their final /P from the parent map
    split_kids(allocator, owner, grouped, divisions)
}

fn kids_object(kids: &[Kid], page: Option<u32>) -> Object {
    Object::Array(
        kids.iter()
            .map(|kid| match *kid {
                Kid::Object(id) => Object::Reference(id.into()),
                Kid::Mcid { page: p, mcid } if Some(p) == page => Object::Integer(i64::from(mcid)),
                Kid::Mcid { page: p, mcid } => {
                    let mut mcr = Dict::new();
                    mcr.insert("Type".into(), Object::Name("MCR".into()));
                    mcr.insert("Pg".into(), Object::Reference(p.into()));
                    mcr.insert("MCID".into(), Object::Integer(i64::from(mcid)));
                    Object::Dictionary(mcr)
                },
                Kid::ObjRef { page: p, object } => {
                    let mut objr = Dict::new();
                    objr.insert("Type".into(), Object::Name("OBJR".into()));
                    objr.insert("Pg".into(), Object::Reference(p.into()));
                    objr.insert("Obj".into(), Object::Reference(object.into()));
                    Object::Dictionary(objr)
                },
            })
            .collect(),
    )
}

fn attribute_object(element: &StructElement, kind: StructElementType) -> Option<Object> {
    let mut owners: BTreeMap<&str, Dict> = BTreeMap::new();
    for (attr, value) in &element.attributes {
        owners
            .entry(attr.owner())
            .or_default()
            .insert(attr.pdf_name().into(), value.to_object());
    }
    if let (Some(bbox), true) = (element.bbox, kind.has_bbox()) {
        owners.entry("Layout").or_default().insert(
            "BBox".into(),
            Object::Array(
                [bbox.x, bbox.y, bbox.x + bbox.width, bbox.y + bbox.height]
                    .map(Object::Real)
                    .to_vec(),
            ),
        );
    }
    if owners.is_empty() {
        return None;
    }
    let mut dicts: Vec<Object> = owners
        .into_iter()
        .map(|(owner, attrs)| {
            let mut dict = Dict::new();
            dict.insert("O".into(), Object::Name(owner.into()));
            dict.extend(attrs);
            Object::Dictionary(dict)
        })
        .collect();
    if dicts.len() == 1 {
        dicts.pop()
    } else {
        Some(Object::Array(dicts))
    }
}
