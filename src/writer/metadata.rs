//! Document metadata: the Info dictionary, the XMP packet, the PDF/A output
//! intent and the trailer `/ID`.

use super::primitives::{encode_text_string, format_pdf_date, format_xmp_date, hex_lower};
use super::stream_object;
use crate::config::{DocumentInfo, PdfVersion};
use crate::error::Result;
use crate::object::{Dict, Object};
use chrono::{DateTime, FixedOffset};
use md5::{Digest, Md5};

const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
const NS_XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
const NS_PDFAID: &str = "http://www.aiim.org/pdfa/ns/id/";
const NS_PDFUAID: &str = "http://www.aiim.org/pdfua/ns/id/";

/// Registry name of the sRGB output condition.
pub const SRGB_CONDITION: &str = "sRGB IEC61966-2.1";

/// The document Info dictionary.
pub fn info_object(info: &DocumentInfo, date: &DateTime<FixedOffset>) -> Object {
    let mut dict = Dict::new();
    let entries = [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Creator", &info.creator),
        ("Producer", &info.producer),
    ];
    for (key, value) in entries {
        if let Some(text) = value.as_deref().filter(|t| !t.is_empty()) {
            dict.insert(key.into(), Object::String(encode_text_string(text)));
        }
    }
    let stamp = format_pdf_date(date).into_bytes();
    dict.insert("CreationDate".into(), Object::String(stamp.clone()));
    dict.insert("ModDate".into(), Object::String(stamp));
    Object::Dictionary(dict)
}

/// XMP packet builder.
#[derive(Debug, Clone)]
pub struct XmpWriter<'a> {
    info: &'a DocumentInfo,
    date: DateTime<FixedOffset>,
    version: PdfVersion,
    pdf_ua: bool,
    document_id: Option<String>,
}

impl<'a> XmpWriter<'a> {
    /// Packet describing `info` for a document written at `date`.
    pub fn new(info: &'a DocumentInfo, date: DateTime<FixedOffset>, version: PdfVersion) -> Self {
        Self {
            info,
            date,
            version,
            pdf_ua: false,
            document_id: None,
        }
    }

    /// Add the PDF/UA identification schema.
    pub fn pdf_ua(mut self, enable: bool) -> Self {
        self.pdf_ua = enable;
        self
    }

    /// Set `xmpMM:DocumentID` (hex of the trailer id).
    pub fn document_id(mut self, id: &[u8]) -> Self {
        self.document_id = Some(hex_lower(id));
        self
    }

    /// The packet as bytes.
    pub fn build_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
        xml.push_str(&format!("<x:xmpmeta xmlns:x=\"{}\">\n", NS_X));
        xml.push_str(&format!("  <rdf:RDF xmlns:rdf=\"{}\">\n", NS_RDF));

        xml.push_str(&format!("    <rdf:Description rdf:about=\"\" xmlns:dc=\"{}\">\n", NS_DC));
        xml.push_str("      <dc:format>application/pdf</dc:format>\n");
        if let Some(title) = &self.info.title {
            push_alt(&mut xml, "dc:title", title);
        }
        if let Some(author) = &self.info.author {
            xml.push_str("      <dc:creator>\n        <rdf:Seq>\n");
            xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(author)));
            xml.push_str("        </rdf:Seq>\n      </dc:creator>\n");
        }
        if let Some(subject) = &self.info.subject {
            push_alt(&mut xml, "dc:description", subject);
        }
        if let Some(language) = &self.info.language {
            xml.push_str("      <dc:language>\n        <rdf:Bag>\n");
            xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(language)));
            xml.push_str("        </rdf:Bag>\n      </dc:language>\n");
        }
        xml.push_str("    </rdf:Description>\n");

        let date = format_xmp_date(&self.date);
        xml.push_str(&format!("    <rdf:Description rdf:about=\"\" xmlns:xmp=\"{}\">\n", NS_XMP));
        if let Some(tool) = &self.info.creator {
            xml.push_str(&format!("      <xmp:CreatorTool>{}</xmp:CreatorTool>\n", escape_xml(tool)));
        }
        xml.push_str(&format!("      <xmp:CreateDate>{}</xmp:CreateDate>\n", date));
        xml.push_str(&format!("      <xmp:ModifyDate>{}</xmp:ModifyDate>\n", date));
        xml.push_str(&format!("      <xmp:MetadataDate>{}</xmp:MetadataDate>\n", date));
        xml.push_str("    </rdf:Description>\n");

        xml.push_str(&format!("    <rdf:Description rdf:about=\"\" xmlns:pdf=\"{}\">\n", NS_PDF));
        if let Some(producer) = &self.info.producer {
            xml.push_str(&format!("      <pdf:Producer>{}</pdf:Producer>\n", escape_xml(producer)));
        }
        if let Some(keywords) = &self.info.keywords {
            xml.push_str(&format!("      <pdf:Keywords>{}</pdf:Keywords>\n", escape_xml(keywords)));
        }
        xml.push_str(&format!("      <pdf:PDFVersion>{}</pdf:PDFVersion>\n", self.version.header()));
        xml.push_str("    </rdf:Description>\n");

        if let Some(id) = &self.document_id {
            xml.push_str(&format!("    <rdf:Description rdf:about=\"\" xmlns:xmpMM=\"{}\">\n", NS_XMP_MM));
            xml.push_str(&format!("      <xmpMM:DocumentID>uuid:{}</xmpMM:DocumentID>\n", id));
            xml.push_str(&format!(
                "      <xmpMM:InstanceID>uuid:{}</xmpMM:InstanceID>\n",
                uuid::Uuid::new_v4()
            ));
            xml.push_str("    </rdf:Description>\n");
        }

        if let Some(part) = self.version.pdfa_part() {
            xml.push_str(&format!("    <rdf:Description rdf:about=\"\" xmlns:pdfaid=\"{}\">\n", NS_PDFAID));
            xml.push_str(&format!("      <pdfaid:part>{}</pdfaid:part>\n", part));
            if part == 4 {
                xml.push_str("      <pdfaid:rev>2020</pdfaid:rev>\n");
            } else {
                xml.push_str("      <pdfaid:conformance>B</pdfaid:conformance>\n");
            }
            xml.push_str("    </rdf:Description>\n");
        }

        if self.pdf_ua {
            xml.push_str(&format!(
                "    <rdf:Description rdf:about=\"\" xmlns:pdfuaid=\"{}\">\n",
                NS_PDFUAID
            ));
            xml.push_str("      <pdfuaid:part>1</pdfuaid:part>\n");
            xml.push_str("    </rdf:Description>\n");
        }

        xml.push_str("  </rdf:RDF>\n");
        xml.push_str("</x:xmpmeta>\n");
        // padding so the packet can be edited in place
        for _ in 0..20 {
            xml.push_str(&" ".repeat(99));
            xml.push('\n');
        }
        xml.push_str("<?xpacket end=\"w\"?>");
        xml
    }
}

fn push_alt(xml: &mut String, element: &str, text: &str) {
    xml.push_str(&format!("      <{}>\n        <rdf:Alt>\n", element));
    xml.push_str(&format!(
        "          <rdf:li xml:lang=\"x-default\">{}</rdf:li>\n",
        escape_xml(text)
    ));
    xml.push_str(&format!("        </rdf:Alt>\n      </{}>\n", element));
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// The catalog `/Metadata` stream. Never compressed.
pub fn metadata_stream(packet: Vec<u8>) -> Result<Object> {
    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("Metadata".into()));
    dict.insert("Subtype".into(), Object::Name("XML".into()));
    stream_object(dict, packet, false)
}

/// ICC profile stream for an RGB output intent.
pub fn icc_profile_object(profile: &[u8], compress: bool) -> Result<Object> {
    let mut dict = Dict::new();
    dict.insert("N".into(), Object::Integer(3));
    dict.insert("Alternate".into(), Object::Name("DeviceRGB".into()));
    stream_object(dict, profile.to_vec(), compress)
}

/// A `/GTS_PDFA1` output intent using the profile `profile_id`.
pub fn output_intent_object(profile_id: u32) -> Object {
    let mut dict = Dict::new();
    dict.insert("Type".into(), Object::Name("OutputIntent".into()));
    dict.insert("S".into(), Object::Name("GTS_PDFA1".into()));
    dict.insert(
        "OutputConditionIdentifier".into(),
        Object::String(SRGB_CONDITION.as_bytes().to_vec()),
    );
    dict.insert("Info".into(), Object::String(SRGB_CONDITION.as_bytes().to_vec()));
    dict.insert("DestOutputProfile".into(), Object::Reference(profile_id.into()));
    Object::Dictionary(dict)
}

/// First part of the trailer `/ID`: MD5 over the timestamp, the Info entries
/// and a host-supplied seed (usually the output file name).
pub fn document_id(date: &DateTime<FixedOffset>, info: &DocumentInfo, seed: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(format_pdf_date(date).as_bytes());
    for text in [&info.title, &info.author, &info.subject, &info.keywords, &info.creator, &info.producer]
        .into_iter()
        .flatten()
    {
        hasher.update(text.as_bytes());
    }
    hasher.update(seed);
    hasher.finalize().into()
}

/// The trailer `/ID` array: both entries equal for a new document.
pub fn id_array(id: &[u8; 16]) -> Object {
    Object::Array(vec![Object::String(id.to_vec()), Object::String(id.to_vec())])
}

/// Running MD5 over page content, written as `/DocChecksum`.
#[derive(Clone, Default)]
pub struct DocChecksum {
    hasher: Md5,
}

impl std::fmt::Debug for DocChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocChecksum").finish_non_exhaustive()
    }
}

impl DocChecksum {
    /// Start an empty checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Upper-case hex digest, used as a name.
    pub fn finish(&self) -> String {
        hex_lower(&self.hasher.clone().finalize()).to_uppercase()
    }
}
