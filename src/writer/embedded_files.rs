//! Embedded files and file attachments.
//!
//! An embedded file is written as two objects: the `/EmbeddedFile` stream
//! with its `/Params` and a `/Filespec` pointing at it. Documents list every
//! file in the `/EmbeddedFiles` name tree; PDF/A-3 and PDF 2.0 documents
//! additionally associate them with the catalog through `/AF`.
//!
//! ```ignore
//! use pdf_scribe::writer::EmbeddedFile;
//!
//! let file = EmbeddedFile::new("data.csv", csv_bytes)
//!     .with_description("Monthly sales data")
//!     .with_mime_type("text/csv");
//! writer.embed_file(file)?;
//! ```

use super::annotations::rect_array;
use super::primitives::{encode_text_string, format_pdf_date};
use super::{stream_object, IndirectObject};
use crate::error::Result;
use crate::geometry::Rect;
use crate::object::{Dict, Object};
use chrono::{DateTime, FixedOffset};
use md5::{Digest, Md5};

/// A file to embed in the document.
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    /// File name, also the key in the name tree
    pub name: String,
    /// File contents
    pub data: Vec<u8>,
    /// Description shown by viewers
    pub description: Option<String>,
    /// MIME type (`/Subtype`)
    pub mime_type: Option<String>,
    /// Creation date
    pub creation_date: Option<DateTime<FixedOffset>>,
    /// Modification date
    pub modification_date: Option<DateTime<FixedOffset>>,
    /// Relationship to the document (`/AFRelationship`)
    pub af_relationship: Option<AFRelationship>,
}

/// Associated-file relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AFRelationship {
    /// Original source of the content
    Source,
    /// Data used to derive the content
    Data,
    /// Alternative representation
    Alternative,
    /// Supplementary representation
    Supplement,
    /// Encrypted payload
    EncryptedPayload,
    /// Form data
    FormData,
    /// Schema
    Schema,
    /// Not known
    Unspecified,
}

impl AFRelationship {
    /// PDF name of the relationship.
    pub fn pdf_name(self) -> &'static str {
        match self {
            AFRelationship::Source => "Source",
            AFRelationship::Data => "Data",
            AFRelationship::Alternative => "Alternative",
            AFRelationship::Supplement => "Supplement",
            AFRelationship::EncryptedPayload => "EncryptedPayload",
            AFRelationship::FormData => "FormData",
            AFRelationship::Schema => "Schema",
            AFRelationship::Unspecified => "Unspecified",
        }
    }
}

impl EmbeddedFile {
    /// Create an embedded file.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            description: None,
            mime_type: None,
            creation_date: None,
            modification_date: None,
            af_relationship: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the creation date.
    pub fn with_creation_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Set the modification date.
    pub fn with_modification_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.modification_date = Some(date);
        self
    }

    /// Set the associated-file relationship.
    pub fn with_af_relationship(mut self, relationship: AFRelationship) -> Self {
        self.af_relationship = Some(relationship);
        self
    }

    /// Size of the file data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The `/EmbeddedFile` stream.
    pub fn stream_object(&self, compress: bool) -> Result<Object> {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("EmbeddedFile".into()));
        if let Some(mime) = &self.mime_type {
            dict.insert("Subtype".into(), Object::Name(mime.clone()));
        }

        let mut params = Dict::new();
        params.insert("Size".into(), Object::Integer(self.data.len() as i64));
        if let Some(date) = &self.creation_date {
            params.insert("CreationDate".into(), Object::String(format_pdf_date(date).into_bytes()));
        }
        if let Some(date) = &self.modification_date {
            params.insert("ModDate".into(), Object::String(format_pdf_date(date).into_bytes()));
        }
        params.insert("CheckSum".into(), Object::String(Md5::digest(&self.data).to_vec()));
        dict.insert("Params".into(), Object::Dictionary(params));

        stream_object(dict, self.data.clone(), compress)
    }

    /// The `/Filespec` dictionary referencing the stream `stream_id`.
    pub fn filespec_object(&self, stream_id: u32) -> Object {
        let mut dict = Dict::new();
        dict.insert("Type".into(), Object::Name("Filespec".into()));
        dict.insert("F".into(), Object::String(encode_text_string(&self.name)));
        dict.insert("UF".into(), Object::String(encode_text_string(&self.name)));
        if let Some(desc) = &self.description {
            dict.insert("Desc".into(), Object::String(encode_text_string(desc)));
        }

        let mut ef = Dict::new();
        ef.insert("F".into(), Object::Reference(stream_id.into()));
        ef.insert("UF".into(), Object::Reference(stream_id.into()));
        dict.insert("EF".into(), Object::Dictionary(ef));

        if let Some(relationship) = self.af_relationship {
            dict.insert("AFRelationship".into(), Object::Name(relationship.pdf_name().into()));
        }
        Object::Dictionary(dict)
    }
}

/// An embedded file with its object ids.
#[derive(Debug, Clone)]
pub struct EmbeddedEntry {
    /// The file
    pub file: EmbeddedFile,
    /// Id of the `/EmbeddedFile` stream
    pub stream_id: u32,
    /// Id of the `/Filespec`
    pub filespec_id: u32,
}

impl EmbeddedEntry {
    /// Stream and filespec objects.
    pub fn to_objects(&self, compress: bool) -> Result<Vec<IndirectObject>> {
        Ok(vec![
            (self.stream_id, self.file.stream_object(compress)?),
            (self.filespec_id, self.file.filespec_object(self.stream_id)),
        ])
    }
}

/// The `/EmbeddedFiles` name tree, keys sorted.
///
/// Duplicate names keep the first file registered under them.
pub fn embedded_files_tree(entries: &[EmbeddedEntry]) -> Object {
    let mut sorted: Vec<&EmbeddedEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.file.name.cmp(&b.file.name));
    sorted.dedup_by(|a, b| a.file.name == b.file.name);

    let names = sorted
        .into_iter()
        .flat_map(|e| {
            [
                Object::String(encode_text_string(&e.file.name)),
                Object::Reference(e.filespec_id.into()),
            ]
        })
        .collect();
    let mut dict = Dict::new();
    dict.insert("Names".into(), Object::Array(names));
    Object::Dictionary(dict)
}

/// The catalog `/AF` array of files that carry a relationship.
pub fn associated_files(entries: &[EmbeddedEntry]) -> Option<Object> {
    let refs: Vec<Object> = entries
        .iter()
        .filter(|e| e.file.af_relationship.is_some())
        .map(|e| Object::Reference(e.filespec_id.into()))
        .collect();
    (!refs.is_empty()).then_some(Object::Array(refs))
}

/// A `/FileAttachment` annotation showing a paperclip at `rect` (PDF space).
pub fn file_attachment_object(
    page_id: u32,
    rect: &Rect,
    filespec_id: u32,
    contents: Option<&str>,
    struct_parent: Option<usize>,
) -> Object {
    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("Annot".into()));
    dict.insert("Subtype".into(), Object::Name("FileAttachment".into()));
    dict.insert("Rect".into(), rect_array(rect));
    dict.insert("P".into(), Object::Reference(page_id.into()));
    dict.insert("F".into(), Object::Integer(4));
    dict.insert("FS".into(), Object::Reference(filespec_id.into()));
    dict.insert("Name".into(), Object::Name("Paperclip".into()));
    if let Some(text) = contents {
        dict.insert("Contents".into(), Object::String(encode_text_string(text)));
    }
    if let Some(key) = struct_parent {
        dict.insert("StructParent".into(), Object::Integer(key as i64));
    }
    Object::Dictionary(dict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::serializer::ObjectSerializer;
    use chrono::TimeZone;

    fn entry(name: &str, id: u32) -> EmbeddedEntry {
        EmbeddedEntry {
            file: EmbeddedFile::new(name, b"a,b,c".to_vec()),
            stream_id: id,
            filespec_id: id + 1,
        }
    }

    #[test]
    fn test_stream_params() {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .unwrap();
        let file = EmbeddedFile::new("data.csv", b"a,b,c".to_vec())
            .with_mime_type("text/csv")
            .with_creation_date(date);
        let obj = file.stream_object(false).unwrap();
        let out = ObjectSerializer::new().serialize_to_string(&obj);
        assert!(out.contains("/Subtype /text#2Fcsv"));
        assert!(out.contains("/Size 5"));
        assert!(out.contains("/CreationDate (D:20240115103000Z)"));
        assert!(out.contains("/CheckSum <"));
        assert!(out.contains("stream\na,b,c"));
    }

    #[test]
    fn test_filespec_references_stream() {
        let file = EmbeddedFile::new("r\u{e9}sum\u{e9}.txt", Vec::new())
            .with_af_relationship(AFRelationship::Source);
        let spec = file.filespec_object(9);
        let dict = spec.as_dict().unwrap();
        assert_eq!(dict["AFRelationship"].as_name(), Some("Source"));
        let ef = dict["EF"].as_dict().unwrap();
        assert_eq!(ef["F"].as_reference().map(|r| r.id), Some(9));
        // non-ASCII names are UTF-16BE
        assert_eq!(&dict["UF"].as_string().unwrap()[..2], &[0xFE, 0xFF]);
    }

    #[test]
    fn test_name_tree_sorted_and_unique() {
        let entries = vec![entry("b.txt", 10), entry("a.txt", 20), entry("b.txt", 30)];
        let tree = embedded_files_tree(&entries);
        assert_eq!(
            ObjectSerializer::new().serialize_to_string(&tree),
            "<</Names [(a.txt) 21 0 R (b.txt) 11 0 R]>>"
        );
    }

    #[test]
    fn test_associated_files_only_with_relationship() {
        let mut entries = vec![entry("a.txt", 10), entry("b.txt", 20)];
        assert!(associated_files(&entries).is_none());
        entries[1].file.af_relationship = Some(AFRelationship::Data);
        let af = associated_files(&entries).unwrap();
        assert_eq!(ObjectSerializer::new().serialize_to_string(&af), "[21 0 R]");
    }

    #[test]
    fn test_attachment_annotation() {
        let annot = file_attachment_object(3, &Rect::new(10.0, 20.0, 16.0, 16.0), 8, Some("notes"), None);
        let out = ObjectSerializer::new().serialize_to_string(&annot);
        assert!(out.contains("/Subtype /FileAttachment"));
        assert!(out.contains("/FS 8 0 R"));
        assert!(out.contains("/Rect [10 20 26 36]"));
    }
}
