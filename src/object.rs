//! PDF object types.
//!
//! The value model used for every dictionary the writer emits and for
//! object graphs copied from foreign documents. Dictionaries keep insertion
//! order so emitted files are deterministic and read naturally
//! (`/Type` first).

use indexmap::IndexMap;

/// Insertion-ordered PDF dictionary.
pub type Dict = IndexMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dict),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl From<u32> for ObjectRef {
    fn from(id: u32) -> Self {
        Self { id, gen: 0 }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to a number (integer or real).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Collect every reference reachable inside this object (not following them).
    pub fn references(&self) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<ObjectRef>) {
        match self {
            Object::Reference(r) => out.push(*r),
            Object::Array(items) => items.iter().for_each(|o| o.collect_references(out)),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                dict.values().for_each(|o| o.collect_references(out))
            },
            _ => {},
        }
    }

    /// Rewrite every reference inside this object through `map`.
    ///
    /// References for which `map` returns `None` become `null`.
    pub fn remap_references<F>(&mut self, map: &F)
    where
        F: Fn(ObjectRef) -> Option<ObjectRef>,
    {
        match self {
            Object::Reference(r) => match map(*r) {
                Some(new_ref) => *r = new_ref,
                None => *self = Object::Null,
            },
            Object::Array(items) => items.iter_mut().for_each(|o| o.remap_references(map)),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                dict.values_mut().for_each(|o| o.remap_references(map))
            },
            _ => {},
        }
    }
}

impl From<ObjectRef> for Object {
    fn from(r: ObjectRef) -> Self {
        Object::Reference(r)
    }
}

impl From<Dict> for Object {
    fn from(d: Dict) -> Self {
        Object::Dictionary(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(12, 0).to_string(), "12 0 R");
        assert_eq!(ObjectRef::from(7), ObjectRef::new(7, 0));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Object::Integer(3).as_integer(), Some(3));
        assert_eq!(Object::Real(1.5).as_number(), Some(1.5));
        assert_eq!(Object::Integer(2).as_number(), Some(2.0));
        assert_eq!(Object::Name("Page".into()).as_name(), Some("Page"));
        assert!(Object::Null.is_null());
    }

    #[test]
    fn test_dictionary_keeps_insertion_order() {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("Page".into()));
        dict.insert("A".into(), Object::Integer(1));
        let keys: Vec<_> = dict.keys().cloned().collect();
        assert_eq!(keys, vec!["Type".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_remap_references() {
        let mut dict = Dict::new();
        dict.insert("Parent".into(), Object::Reference(ObjectRef::new(3, 0)));
        dict.insert(
            "Kids".into(),
            Object::Array(vec![
                Object::Reference(ObjectRef::new(4, 0)),
                Object::Reference(ObjectRef::new(99, 0)),
            ]),
        );
        let mut obj = Object::Dictionary(dict);
        assert_eq!(obj.references().len(), 3);

        obj.remap_references(&|r| if r.id == 99 { None } else { Some(ObjectRef::new(r.id + 100, 0)) });
        let d = obj.as_dict().unwrap();
        assert_eq!(d["Parent"].as_reference(), Some(ObjectRef::new(103, 0)));
        let kids = d["Kids"].as_array().unwrap();
        assert_eq!(kids[0].as_reference(), Some(ObjectRef::new(104, 0)));
        assert!(kids[1].is_null());
    }
}
