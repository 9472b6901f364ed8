//! Resource dictionaries and redirection.
//!
//! Content streams refer to fonts, XObjects, ExtGStates, shadings and
//! patterns by name. Names are derived from the object id (`/F12`,
//! `/Im7`), so the same resource has the same name everywhere. Page content
//! registers into the document-global dictionary; while a stream is
//! redirected (appearance streams, transparency groups, tiling cells) its
//! resources go into the dictionary of that redirection instead.

use super::content::ContentStreamBuilder;
use super::graphics_state::{ExtGStateBuilder, GraphicsStateStack};
use super::IndirectObject;
use crate::geometry::{Point, Rect};
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use std::collections::{BTreeMap, HashMap};

/// Resource categories of a resource dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// `/Font`
    Font,
    /// `/XObject` images and forms
    XObject,
    /// `/ExtGState`
    ExtGState,
    /// `/Shading`
    Shading,
    /// `/Pattern`
    Pattern,
}

impl ResourceKind {
    /// Key in the resource dictionary.
    pub fn dict_key(self) -> &'static str {
        match self {
            ResourceKind::Font => "Font",
            ResourceKind::XObject => "XObject",
            ResourceKind::ExtGState => "ExtGState",
            ResourceKind::Shading => "Shading",
            ResourceKind::Pattern => "Pattern",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ResourceKind::Font => "F",
            ResourceKind::XObject => "Im",
            ResourceKind::ExtGState => "Tr",
            ResourceKind::Shading => "Sh",
            ResourceKind::Pattern => "P",
        }
    }
}

/// Name of the resource with object id `id`.
pub fn resource_name(kind: ResourceKind, id: u32) -> String {
    format!("{}{}", kind.prefix(), id)
}

/// One resource dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDict {
    entries: BTreeMap<ResourceKind, BTreeMap<String, u32>>,
}

impl ResourceDict {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource under its derived name and return the name.
    pub fn add(&mut self, kind: ResourceKind, id: u32) -> String {
        let name = resource_name(kind, id);
        self.add_named(kind, &name, id);
        name
    }

    /// Add a resource under an explicit name.
    pub fn add_named(&mut self, kind: ResourceKind, name: &str, id: u32) {
        self.entries.entry(kind).or_default().insert(name.to_string(), id);
    }

    /// Object id registered under `name`.
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<u32> {
        self.entries.get(&kind).and_then(|e| e.get(name)).copied()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Number of entries of a kind.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.entries.get(&kind).map(BTreeMap::len).unwrap_or(0)
    }

    /// The dictionary object.
    pub fn to_object(&self) -> Object {
        let mut dict = Dict::new();
        for (kind, entries) in &self.entries {
            if entries.is_empty() {
                continue;
            }
            let sub: Dict = entries
                .iter()
                .map(|(name, &id)| (name.clone(), Object::Reference(id.into())))
                .collect();
            dict.insert(kind.dict_key().to_string(), Object::Dictionary(sub));
        }
        dict.insert(
            "ProcSet".into(),
            Object::Array(
                ["PDF", "Text", "ImageB", "ImageC", "ImageI"]
                    .iter()
                    .map(|n| Object::Name((*n).to_string()))
                    .collect(),
            ),
        );
        Object::Dictionary(dict)
    }
}

/// Saved state of the stream a redirection replaced.
#[derive(Debug)]
pub struct RedirectFrame {
    /// Content of the interrupted stream
    pub saved_content: ContentStreamBuilder,
    /// Graphics state of the interrupted stream
    pub saved_state: GraphicsStateStack,
    /// Resources of the redirected stream
    pub resources: ResourceDict,
    /// Offset subtracted from PDF coordinates inside the redirection
    pub origin: Point,
    /// Target rectangle in the enclosing stream's PDF space
    pub target: Rect,
}

/// Output of a finished redirection.
#[derive(Debug)]
pub struct RedirectedStream {
    /// Operators of the redirected stream
    pub content: Vec<u8>,
    /// Resources it used
    pub resources: ResourceDict,
    /// Target rectangle in the enclosing stream's PDF space
    pub target: Rect,
}

/// Global resources plus the stack of redirections.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    global: ResourceDict,
    redirects: Vec<RedirectFrame>,
}

impl ResourceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource in the innermost scope and return its name.
    pub fn register(&mut self, kind: ResourceKind, id: u32) -> String {
        match self.redirects.last_mut() {
            Some(frame) => frame.resources.add(kind, id),
            None => self.global.add(kind, id),
        }
    }

    /// Register under an explicit name.
    pub fn register_named(&mut self, kind: ResourceKind, name: &str, id: u32) {
        match self.redirects.last_mut() {
            Some(frame) => frame.resources.add_named(kind, name, id),
            None => self.global.add_named(kind, name, id),
        }
    }

    /// The document-global dictionary.
    pub fn global(&self) -> &ResourceDict {
        &self.global
    }

    /// Whether a redirection is active.
    pub fn is_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }

    /// Nesting depth of redirections.
    pub fn redirect_depth(&self) -> usize {
        self.redirects.len()
    }

    /// Coordinate offset of the innermost redirection.
    pub fn origin(&self) -> Point {
        self.redirects.last().map(|f| f.origin).unwrap_or_default()
    }

    /// Start redirecting into a fresh stream.
    ///
    /// The interrupted stream's content and graphics state are moved into
    /// the frame; the caller continues with blank ones.
    pub fn begin_redirect(
        &mut self,
        content: &mut ContentStreamBuilder,
        state: &mut GraphicsStateStack,
        target: Rect,
    ) {
        let mut fresh_state = state.clone();
        fresh_state.reset_emitted();
        let outer_origin = self.origin();
        self.redirects.push(RedirectFrame {
            saved_content: std::mem::take(content),
            saved_state: std::mem::replace(state, fresh_state),
            resources: ResourceDict::new(),
            origin: Point::new(outer_origin.x + target.x, outer_origin.y + target.y),
            target,
        });
    }

    /// Finish the innermost redirection and restore the interrupted stream.
    ///
    /// Colors and clip are re-emitted in the restored stream before its
    /// next drawing operation. Returns `None` without an active redirection.
    pub fn end_redirect(
        &mut self,
        content: &mut ContentStreamBuilder,
        state: &mut GraphicsStateStack,
    ) -> Option<RedirectedStream> {
        let Some(frame) = self.redirects.pop() else {
            log::warn!("end of redirection without matching begin");
            return None;
        };
        state.finish_stream(content);
        let redirected = std::mem::replace(content, frame.saved_content);
        *state = frame.saved_state;
        state.invalidate_colors();
        state.mark_dirty(super::graphics_state::UpdateFlags::CLIP);
        Some(RedirectedStream {
            content: redirected.finish(),
            resources: frame.resources,
            target: frame.target,
        })
    }
}

/// Deduplicating registry of ExtGState dictionaries.
#[derive(Debug, Default)]
pub struct ExtGStateRegistry {
    by_key: HashMap<String, u32>,
    pending: Vec<IndirectObject>,
}

impl ExtGStateRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Object id of an ExtGState; equal states share one object.
    pub fn register(&mut self, allocator: &mut ObjectAllocator, state: &ExtGStateBuilder) -> u32 {
        let key = state.dedup_key();
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = allocator.create_object();
        self.by_key.insert(key, id);
        self.pending.push((id, state.build()));
        id
    }

    /// Objects not yet written.
    pub fn take_pending(&mut self) -> Vec<IndirectObject> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::serializer::ObjectSerializer;

    #[test]
    fn test_resource_names() {
        assert_eq!(resource_name(ResourceKind::Font, 12), "F12");
        assert_eq!(resource_name(ResourceKind::XObject, 7), "Im7");
        assert_eq!(resource_name(ResourceKind::ExtGState, 3), "Tr3");
        assert_eq!(resource_name(ResourceKind::Pattern, 4), "P4");
    }

    #[test]
    fn test_dict_object() {
        let mut dict = ResourceDict::new();
        dict.add(ResourceKind::XObject, 9);
        dict.add(ResourceKind::Font, 4);
        dict.add(ResourceKind::Font, 4);
        assert_eq!(dict.count(ResourceKind::Font), 1);
        let s = ObjectSerializer::new().serialize_to_string(&dict.to_object());
        assert_eq!(
            s,
            "<</Font <</F4 4 0 R>> /XObject <</Im9 9 0 R>> /ProcSet [/PDF /Text /ImageB /ImageC /ImageI]>>"
        );
    }

    #[test]
    fn test_redirect_scopes_resources() {
        let mut registry = ResourceRegistry::new();
        let mut content = ContentStreamBuilder::new();
        let mut state = GraphicsStateStack::new();
        content.move_to(0.0, 0.0);
        registry.register(ResourceKind::Font, 1);

        registry.begin_redirect(&mut content, &mut state, Rect::new(10.0, 20.0, 30.0, 40.0));
        assert!(content.is_empty());
        assert_eq!(registry.origin(), Point::new(10.0, 20.0));
        registry.register(ResourceKind::XObject, 2);
        content.line_to(1.0, 1.0);

        let redirected = registry.end_redirect(&mut content, &mut state).unwrap();
        assert_eq!(redirected.content, b"1 1 l\n");
        assert_eq!(redirected.resources.get(ResourceKind::XObject, "Im2"), Some(2));
        assert_eq!(registry.global().get(ResourceKind::XObject, "Im2"), None);
        assert_eq!(content.as_bytes(), b"0 0 m\n");
        assert!(!registry.is_redirected());
        assert!(registry.end_redirect(&mut content, &mut state).is_none());
    }

    #[test]
    fn test_ext_gstate_dedup() {
        let mut alloc = ObjectAllocator::new();
        let mut registry = ExtGStateRegistry::new();
        let a = registry.register(&mut alloc, &ExtGStateBuilder::new().alpha(0.5));
        let b = registry.register(&mut alloc, &ExtGStateBuilder::new().alpha(0.5));
        let c = registry.register(&mut alloc, &ExtGStateBuilder::new().alpha(0.25));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.take_pending().len(), 2);
    }
}
