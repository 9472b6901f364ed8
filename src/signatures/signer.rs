//! Signature dictionary and in-place backfill.

use super::byterange::ByteRangeCalculator;
use super::SignatureProvider;
use crate::config::SignatureConfig;
use crate::encryption::EncryptionWriteHandler;
use crate::error::{Error, Result};
use crate::writer::output::PdfOutput;
use crate::writer::primitives::{append_hex_string, append_literal_string, encode_text_string, format_pdf_date};
use chrono::{DateTime, FixedOffset};

/// Where the placeholders of a written signature dictionary live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignaturePlaceholder {
    /// Offset of the `/ByteRange` array's `[`
    pub byte_range_offset: u64,
    /// Offset of the `/Contents` value's `<`
    pub contents_offset: u64,
}

/// Writes the signature dictionary and fills it in once the file is complete.
#[derive(Debug, Clone)]
pub struct PdfSigner {
    config: SignatureConfig,
    calculator: ByteRangeCalculator,
}

impl PdfSigner {
    /// Signer for `config`.
    pub fn new(config: &SignatureConfig) -> Self {
        Self {
            config: config.clone(),
            calculator: ByteRangeCalculator::new(config.reserved_size),
        }
    }

    /// Size of the `/Contents` placeholder.
    pub fn placeholder_size(&self) -> usize {
        self.calculator.placeholder_size()
    }

    /// The complete `id 0 obj ... endobj` bytes of the signature dictionary.
    ///
    /// The dictionary is written by hand so that the placeholder positions
    /// are known; `start` is the file offset the object will be written at.
    /// Text entries are encrypted like any other string, `/Contents` never is.
    pub fn build_signature_object(
        &self,
        id: u32,
        date: &DateTime<FixedOffset>,
        crypt: Option<&EncryptionWriteHandler>,
        start: u64,
    ) -> Result<(Vec<u8>, SignaturePlaceholder)> {
        let mut buf = Vec::with_capacity(self.placeholder_size() + 512);
        buf.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        buf.extend_from_slice(b"<</Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached");

        let text_entry = |key: &str, value: &[u8], buf: &mut Vec<u8>| -> Result<()> {
            buf.extend_from_slice(format!(" /{} ", key).as_bytes());
            match crypt {
                Some(handler) => append_hex_string(&handler.encrypt_string(value, id, 0)?, buf),
                None => append_literal_string(value, buf),
            }
            Ok(())
        };
        text_entry("M", format_pdf_date(date).as_bytes(), &mut buf)?;
        let optional = [
            ("Name", &self.config.name),
            ("Reason", &self.config.reason),
            ("Location", &self.config.location),
            ("ContactInfo", &self.config.contact_info),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                text_entry(key, &encode_text_string(value), &mut buf)?;
            }
        }

        buf.extend_from_slice(b" /ByteRange ");
        let byte_range_offset = start + buf.len() as u64;
        buf.extend_from_slice(ByteRangeCalculator::byte_range_placeholder().as_bytes());
        buf.extend_from_slice(b" /Contents ");
        let contents_offset = start + buf.len() as u64;
        buf.extend_from_slice(self.calculator.generate_placeholder().as_bytes());
        buf.extend_from_slice(b">>\nendobj\n");

        Ok((
            buf,
            SignaturePlaceholder {
                byte_range_offset,
                contents_offset,
            },
        ))
    }

    /// Fill in `/ByteRange`, sign the covered bytes and overwrite `/Contents`.
    ///
    /// Must run after the trailer was written; nothing may be appended
    /// afterwards.
    pub fn backfill(
        &self,
        output: &mut PdfOutput,
        placeholder: SignaturePlaceholder,
        provider: &dyn SignatureProvider,
    ) -> Result<()> {
        let file_size = output.offset();
        let range = self
            .calculator
            .calculate_byte_range(file_size, placeholder.contents_offset)?;
        self.calculator.validate_byte_range(&range, file_size)?;
        output.overwrite_at(
            placeholder.byte_range_offset,
            ByteRangeCalculator::format_byte_range(&range)?.as_bytes(),
        )?;

        let mut signed = output.read_range(range[0], range[1] as usize)?;
        signed.extend(output.read_range(range[2], range[3] as usize)?);
        log::debug!("signing {} bytes with byte range {:?}", signed.len(), range);

        let signature = provider
            .sign(&signed)
            .map_err(|e| Error::Signing(e.to_string()))?;
        let contents = self.calculator.encode_signature(&signature)?;
        output.overwrite_at(placeholder.contents_offset, &contents)
    }
}
