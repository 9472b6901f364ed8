//! Digital signatures.
//!
//! A signed document carries a `/Sig` dictionary whose `/ByteRange` and
//! `/Contents` are fixed-width placeholders. After the trailer is written
//! the writer reads back every byte outside `/Contents`, hands them to a
//! [`SignatureProvider`] and overwrites the placeholders in place. The
//! provider owns the certificate and produces the DER-encoded detached
//! PKCS#7 (`adbe.pkcs7.detached`) signature.

mod byterange;
mod signer;

pub use byterange::{ByteRangeCalculator, BYTE_RANGE_DIGITS};
pub use signer::{PdfSigner, SignaturePlaceholder};

use crate::error::Result;

/// Creates detached signatures over the signed byte ranges.
pub trait SignatureProvider {
    /// DER-encoded PKCS#7 signature of `signed_bytes`.
    fn sign(&self, signed_bytes: &[u8]) -> Result<Vec<u8>>;
}
