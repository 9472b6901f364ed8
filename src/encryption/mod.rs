//! PDF encryption support.
//!
//! This module implements the writing side of the standard security handler
//! (ISO 32000-1:2008 Section 7.6, ISO 32000-2:2020 Section 7.6.4):
//!
//! - RC4 encryption (40-bit and 128-bit), revisions 2 and 3
//! - AES-128 in CBC mode, revision 4
//! - AES-256 in CBC mode, revision 6 (PDF 2.0)
//!
//! [`StandardSecurityHandler`] derives the file key and the `/O`, `/U`,
//! `/OE`, `/UE` and `/Perms` values. [`EncryptionWriteHandler`] then
//! encrypts each string and stream with a key derived from the object
//! number, except for AES-256 where the file key is used directly with a
//! fresh IV per string or stream.

mod aes;
mod algorithms;
mod handler;
mod rc4;
mod write_handler;

pub use handler::StandardSecurityHandler;
pub use write_handler::EncryptionWriteHandler;

pub use self::aes::{aes128_decrypt, aes256_decrypt};
pub use self::rc4::rc4_crypt;

use serde::{Deserialize, Serialize};

/// Encryption algorithm and revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Algorithm {
    /// RC4 with 40-bit key (V=1, R=2)
    RC4_40,
    /// RC4 with 128-bit key (V=2, R=3)
    Rc4_128,
    /// AES with 128-bit key in CBC mode (V=4, R=4)
    Aes128,
    /// AES with 256-bit key in CBC mode (V=5, R=6)
    Aes256,
}

impl Algorithm {
    /// Get the key length in bytes for this algorithm.
    pub fn key_length(&self) -> usize {
        match self {
            Algorithm::RC4_40 => 5,
            Algorithm::Rc4_128 => 16,
            Algorithm::Aes128 => 16,
            Algorithm::Aes256 => 32,
        }
    }

    /// The `(V, R)` pair written into the encryption dictionary.
    pub fn version_revision(&self) -> (u32, u32) {
        match self {
            Algorithm::RC4_40 => (1, 2),
            Algorithm::Rc4_128 => (2, 3),
            Algorithm::Aes128 => (4, 4),
            Algorithm::Aes256 => (5, 6),
        }
    }

    /// Check if this is an AES algorithm.
    pub fn is_aes(&self) -> bool {
        matches!(self, Algorithm::Aes128 | Algorithm::Aes256)
    }

    /// Check if this is an RC4 algorithm.
    pub fn is_rc4(&self) -> bool {
        matches!(self, Algorithm::RC4_40 | Algorithm::Rc4_128)
    }

    /// Lowest PDF version (times ten) that defines this algorithm.
    pub fn min_pdf_level(&self) -> u8 {
        match self {
            Algorithm::RC4_40 => 13,
            Algorithm::Rc4_128 => 14,
            Algorithm::Aes128 => 16,
            Algorithm::Aes256 => 17,
        }
    }
}

bitflags::bitflags! {
    /// User access permissions (`/P`).
    ///
    /// PDF Spec: Table 22 - User access permissions. Bit positions are the
    /// spec's 1-based bit numbers minus one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permissions: u32 {
        /// Print the document (bit 3)
        const PRINT = 1 << 2;
        /// Modify contents (bit 4)
        const MODIFY = 1 << 3;
        /// Copy text and graphics (bit 5)
        const COPY = 1 << 4;
        /// Add or modify annotations, fill forms (bit 6)
        const ANNOTATE = 1 << 5;
        /// Fill existing form fields (bit 9, R>=3)
        const FILL_FORMS = 1 << 8;
        /// Extract for accessibility (bit 10, R>=3)
        const EXTRACT_ACCESSIBILITY = 1 << 9;
        /// Assemble the document (bit 11, R>=3)
        const ASSEMBLE = 1 << 10;
        /// Faithful high-quality print (bit 12, R>=3)
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

impl Permissions {
    /// Reserved bits that must be set in `/P` (bits 7, 8 and 13-32).
    const RESERVED: u32 = 0xFFFF_F0C0;

    /// The signed `/P` value for the encryption dictionary.
    pub fn p_value(&self) -> i32 {
        (self.bits() | Self::RESERVED) as i32
    }

    /// Recover the permission flags from a `/P` value.
    pub fn from_p_value(p: i32) -> Self {
        Self::from_bits_truncate(p as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p_value_all() {
        assert_eq!(Permissions::all().p_value(), -4);
    }

    #[test]
    fn test_p_value_print_only() {
        let p = Permissions::PRINT.p_value();
        assert_eq!(p as u32, 0xFFFF_F0C4);
        assert_eq!(Permissions::from_p_value(p), Permissions::PRINT);
    }

    #[test]
    fn test_algorithm_revisions() {
        assert_eq!(Algorithm::RC4_40.version_revision(), (1, 2));
        assert_eq!(Algorithm::Aes256.version_revision(), (5, 6));
        assert_eq!(Algorithm::Aes256.key_length(), 32);
        assert!(Algorithm::Aes128.is_aes());
        assert!(Algorithm::Rc4_128.is_rc4());
    }
}
