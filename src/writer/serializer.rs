//! PDF object serialization.
//!
//! Serializes [`Object`] values to their byte representation according to
//! ISO 32000-1:2008 Section 7.3. When an encryption handler is supplied,
//! every string and stream payload inside the object is encrypted with the
//! key of the enclosing indirect object.

use super::primitives;
use crate::encryption::EncryptionWriteHandler;
use crate::error::Result;
use crate::object::{Dict, Object, ObjectRef};

/// Serializer for PDF objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Put every dictionary entry on its own line
    pretty: bool,
}

/// Encryption context for the object being serialized.
#[derive(Clone, Copy)]
struct Crypt<'a> {
    handler: &'a EncryptionWriteHandler,
    obj_num: u32,
}

impl ObjectSerializer {
    /// Create a compact serializer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a serializer that writes one dictionary entry per line.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // plain serialization never encrypts and so never fails
        let _ = self.write_object(&mut buf, obj, None);
        buf
    }

    /// Serialize an object to a string (for tests and logging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} 0 obj\n{object}\nendobj\n`. With a handler, strings and
    /// stream data are encrypted for object `id`.
    pub fn serialize_indirect(
        &self,
        id: u32,
        obj: &Object,
        handler: Option<&EncryptionWriteHandler>,
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        let crypt = handler.map(|handler| Crypt { handler, obj_num: id });
        self.write_object(&mut buf, obj, crypt)?;
        buf.extend_from_slice(b"\nendobj\n");
        Ok(buf)
    }

    fn write_object(&self, w: &mut Vec<u8>, obj: &Object, crypt: Option<Crypt<'_>>) -> Result<()> {
        match obj {
            Object::Null => w.extend_from_slice(b"null"),
            Object::Boolean(b) => w.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => w.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => primitives::append_fixed(*r, primitives::REAL_PRECISION, w),
            Object::String(s) => match crypt {
                Some(c) => {
                    let encrypted = c.handler.encrypt_string(s, c.obj_num, 0)?;
                    primitives::append_hex_string(&encrypted, w);
                },
                None => Self::write_string(w, s),
            },
            Object::Name(n) => primitives::append_name(n, w),
            Object::Array(arr) => {
                w.push(b'[');
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    self.write_object(w, item, crypt)?;
                }
                w.push(b']');
            },
            Object::Dictionary(dict) => self.write_dictionary(w, dict, None, crypt)?,
            Object::Stream { dict, data } => {
                let payload = match crypt {
                    Some(c) => c.handler.encrypt_stream(data, c.obj_num, 0)?,
                    None => data.to_vec(),
                };
                self.write_dictionary(w, dict, Some(payload.len()), crypt)?;
                w.extend_from_slice(b"\nstream\n");
                w.extend_from_slice(&payload);
                w.extend_from_slice(b"\nendstream");
            },
            Object::Reference(r) => Self::write_reference(w, *r),
        }
        Ok(())
    }

    /// Literal when printable, hex otherwise.
    fn write_string(w: &mut Vec<u8>, data: &[u8]) {
        let printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));
        if printable {
            primitives::append_literal_string(data, w);
        } else {
            primitives::append_hex_string(data, w);
        }
    }

    fn write_reference(w: &mut Vec<u8>, r: ObjectRef) {
        w.extend_from_slice(r.to_string().as_bytes());
    }

    /// Write a dictionary; `length` overrides any `/Length` entry (streams).
    fn write_dictionary(
        &self,
        w: &mut Vec<u8>,
        dict: &Dict,
        length: Option<usize>,
        crypt: Option<Crypt<'_>>,
    ) -> Result<()> {
        w.extend_from_slice(b"<<");
        let mut first = true;
        for (key, value) in dict {
            if length.is_some() && key == "Length" {
                continue;
            }
            self.separate(w, &mut first);
            primitives::append_name(key, w);
            w.push(b' ');
            self.write_object(w, value, crypt)?;
        }
        if let Some(len) = length {
            self.separate(w, &mut first);
            w.extend_from_slice(format!("/Length {}", len).as_bytes());
        }
        if self.pretty && !first {
            w.push(b'\n');
        }
        w.extend_from_slice(b">>");
        Ok(())
    }

    fn separate(&self, w: &mut Vec<u8>, first: &mut bool) {
        if self.pretty {
            w.push(b'\n');
        } else if !*first {
            w.push(b' ');
        }
        *first = false;
    }
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Create a String object from raw bytes of a Rust string.
    pub fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec())
    }

    /// Create a text string (PDFDocEncoding-compatible ASCII or UTF-16BE).
    pub fn text(s: &str) -> Object {
        Object::String(primitives::encode_text_string(s))
    }

    /// Create an Integer object.
    pub fn integer(i: i64) -> Object {
        Object::Integer(i)
    }

    /// Create a Real object.
    pub fn real(r: f64) -> Object {
        Object::Real(r)
    }

    /// Create a Boolean object.
    pub fn boolean(b: bool) -> Object {
        Object::Boolean(b)
    }

    /// Create an Array object.
    pub fn array(items: Vec<Object>) -> Object {
        Object::Array(items)
    }

    /// Create a Dictionary object; entries keep the given order.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Create a Reference object to `id 0 R`.
    pub fn reference(id: u32) -> Object {
        Object::Reference(ObjectRef::new(id, 0))
    }

    /// Create a rectangle array `[llx lly urx ury]`.
    pub fn rect(llx: f64, lly: f64, urx: f64, ury: f64) -> Object {
        Object::Array(vec![
            Object::Real(llx),
            Object::Real(lly),
            Object::Real(urx),
            Object::Real(ury),
        ])
    }

    /// Create an array of references.
    pub fn references(ids: &[u32]) -> Object {
        Object::Array(ids.iter().map(|&id| Self::reference(id)).collect())
    }
}
