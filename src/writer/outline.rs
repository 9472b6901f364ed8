//! Document outline (bookmarks) and named destinations.
//!
//! Items live in a flat arena addressed by index; index 0 is the outline
//! root. Parent links may be changed after creation, so the tree is only
//! linked up (`/First`, `/Next`, ...) when it is written.

use super::primitives::encode_text_string;
use super::IndirectObject;
use crate::object::{Dict, Object};
use crate::writer::allocator::ObjectAllocator;
use std::collections::BTreeMap;

/// Index of the outline root.
pub const OUTLINE_ROOT: usize = 0;

/// One outline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineItem {
    /// Object id
    pub id: u32,
    /// Parent item index
    pub parent: usize,
    /// Child item indices in display order
    pub children: Vec<usize>,
    /// Displayed text
    pub title: String,
    /// Destination index
    pub dest: Option<usize>,
    /// Children shown expanded
    pub open: bool,
}

/// Outline arena.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineTree {
    items: Vec<OutlineItem>,
}

impl OutlineTree {
    /// Tree with only the root, whose object id is `root_id`.
    pub fn new(root_id: u32) -> Self {
        Self {
            items: vec![OutlineItem {
                id: root_id,
                parent: OUTLINE_ROOT,
                children: Vec::new(),
                title: String::new(),
                dest: None,
                open: true,
            }],
        }
    }

    /// Number of items excluding the root.
    pub fn len(&self) -> usize {
        self.items.len() - 1
    }

    /// Whether only the root exists.
    pub fn is_empty(&self) -> bool {
        self.items.len() == 1
    }

    /// Object id of the root.
    pub fn root_id(&self) -> u32 {
        self.items[OUTLINE_ROOT].id
    }

    /// Item by index.
    pub fn get(&self, index: usize) -> Option<&OutlineItem> {
        self.items.get(index)
    }

    /// Append an item below `parent`.
    ///
    /// An unknown parent attaches the item to the root; the second value is
    /// `false` in that case.
    pub fn add(
        &mut self,
        allocator: &mut ObjectAllocator,
        parent: usize,
        title: impl Into<String>,
        dest: Option<usize>,
    ) -> (usize, bool) {
        let valid = parent < self.items.len();
        let parent = if valid { parent } else { OUTLINE_ROOT };
        let index = self.items.len();
        self.items.push(OutlineItem {
            id: allocator.create_object(),
            parent,
            children: Vec::new(),
            title: title.into(),
            dest,
            open: true,
        });
        self.items[parent].children.push(index);
        (index, valid)
    }

    fn is_ancestor(&self, ancestor: usize, mut index: usize) -> bool {
        while index != OUTLINE_ROOT {
            if index == ancestor {
                return true;
            }
            index = self.items[index].parent;
        }
        ancestor == OUTLINE_ROOT
    }

    /// Move an item below another parent.
    ///
    /// Fails for unknown indices, the root, and moves that would create a
    /// cycle.
    pub fn set_parent(&mut self, index: usize, parent: usize) -> bool {
        if index == OUTLINE_ROOT
            || index >= self.items.len()
            || parent >= self.items.len()
            || self.is_ancestor(index, parent)
        {
            return false;
        }
        let old = self.items[index].parent;
        self.items[old].children.retain(|&c| c != index);
        self.items[index].parent = parent;
        self.items[parent].children.push(index);
        true
    }

    /// Change the title.
    pub fn set_title(&mut self, index: usize, title: impl Into<String>) -> bool {
        match self.items.get_mut(index).filter(|_| index != OUTLINE_ROOT) {
            Some(item) => {
                item.title = title.into();
                true
            },
            None => false,
        }
    }

    /// Change the destination.
    pub fn set_dest(&mut self, index: usize, dest: usize) -> bool {
        match self.items.get_mut(index).filter(|_| index != OUTLINE_ROOT) {
            Some(item) => {
                item.dest = Some(dest);
                true
            },
            None => false,
        }
    }

    /// Show or hide children.
    pub fn set_open(&mut self, index: usize, open: bool) -> bool {
        match self.items.get_mut(index).filter(|_| index != OUTLINE_ROOT) {
            Some(item) => {
                item.open = open;
                true
            },
            None => false,
        }
    }

    /// Descendants visible when `index` is expanded, honoring the state of
    /// nested items.
    fn visible_below(&self, index: usize) -> i64 {
        self.items[index]
            .children
            .iter()
            .map(|&c| 1 + if self.items[c].open { self.visible_below(c) } else { 0 })
            .sum()
    }

    /// Signed `/Count`: positive when open, negative when closed.
    pub fn count(&self, index: usize) -> i64 {
        let visible = self.visible_below(index);
        if self.items[index].open || index == OUTLINE_ROOT {
            visible
        } else {
            -visible
        }
    }

    /// Outline objects, root first.
    ///
    /// `resolve` maps a destination index to its destination array; items
    /// whose destination cannot be resolved are written without one.
    pub fn to_objects(&self, resolve: impl Fn(usize) -> Option<Object>) -> Vec<IndirectObject> {
        let mut objects = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            let mut dict = Dict::new();
            if index == OUTLINE_ROOT {
                dict.insert("Type".into(), Object::Name("Outlines".into()));
            } else {
                dict.insert("Title".into(), Object::String(encode_text_string(&item.title)));
                dict.insert("Parent".into(), Object::Reference(self.items[item.parent].id.into()));
                let siblings = &self.items[item.parent].children;
                if let Some(pos) = siblings.iter().position(|&s| s == index) {
                    if pos > 0 {
                        dict.insert("Prev".into(), Object::Reference(self.items[siblings[pos - 1]].id.into()));
                    }
                    if let Some(&next) = siblings.get(pos + 1) {
                        dict.insert("Next".into(), Object::Reference(self.items[next].id.into()));
                    }
                }
            }
            if let (Some(&first), Some(&last)) = (item.children.first(), item.children.last()) {
                dict.insert("First".into(), Object::Reference(self.items[first].id.into()));
                dict.insert("Last".into(), Object::Reference(self.items[last].id.into()));
                dict.insert("Count".into(), Object::Integer(self.count(index)));
            }
            if let Some(dest) = item.dest.and_then(&resolve) {
                dict.insert("Dest".into(), dest);
            }
            objects.push((item.id, Object::Dictionary(dict)));
        }
        objects
    }
}

/// The catalog `/Dests` dictionary.
pub fn named_dests_object(dests: &BTreeMap<String, Object>) -> Object {
    Object::Dictionary(dests.iter().map(|(name, dest)| (name.clone(), dest.clone())).collect())
}
