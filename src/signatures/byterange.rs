//! ByteRange placeholders.
//!
//! A signature dictionary is written before the final file size is known.
//! Both its `/ByteRange` array and its `/Contents` hex string are therefore
//! written as fixed-width placeholders and overwritten in place once the
//! trailer is on disk. The signed bytes are everything except the
//! `/Contents` value, angle brackets included:
//!
//! `[0 contents_offset contents_end file_size-contents_end]`

use crate::error::{Error, Result};
use crate::writer::primitives::append_hex;

/// Digits reserved for each ByteRange number; enough for files up to 10 GB.
pub const BYTE_RANGE_DIGITS: usize = 10;

/// Sizes and formatting of the two placeholders of one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeCalculator {
    /// Size of the `/Contents` value: hex digits plus the two brackets
    placeholder_size: usize,
}

impl ByteRangeCalculator {
    /// Calculator for a DER signature of at most `signature_size` bytes.
    pub fn new(signature_size: usize) -> Self {
        Self {
            placeholder_size: signature_size * 2 + 2,
        }
    }

    /// Size of the `/Contents` placeholder in bytes.
    pub fn placeholder_size(&self) -> usize {
        self.placeholder_size
    }

    /// `<000...0>` of the placeholder size.
    pub fn generate_placeholder(&self) -> String {
        format!("<{}>", "0".repeat(self.placeholder_size - 2))
    }

    /// ByteRange placeholder; [`format_byte_range`] output always fits.
    ///
    /// [`format_byte_range`]: ByteRangeCalculator::format_byte_range
    pub fn byte_range_placeholder() -> String {
        let zeros = "0".repeat(BYTE_RANGE_DIGITS);
        format!("[0 {zeros} {zeros} {zeros}]")
    }

    /// ByteRange for a file of `file_size` bytes whose `/Contents` value
    /// starts at `contents_offset`.
    pub fn calculate_byte_range(&self, file_size: u64, contents_offset: u64) -> Result<[u64; 4]> {
        let after = contents_offset + self.placeholder_size as u64;
        if after > file_size {
            return Err(Error::Signing(format!(
                "signature placeholder at {} ends past the file end {}",
                contents_offset, file_size
            )));
        }
        Ok([0, contents_offset, after, file_size - after])
    }

    /// The array padded with spaces to the width of the placeholder.
    pub fn format_byte_range(byte_range: &[u64; 4]) -> Result<String> {
        let text = format!("[{} {} {} {}]", byte_range[0], byte_range[1], byte_range[2], byte_range[3]);
        let width = Self::byte_range_placeholder().len();
        if text.len() > width {
            return Err(Error::Signing(format!("ByteRange {} does not fit its placeholder", text)));
        }
        Ok(format!("{:<width$}", text, width = width))
    }

    /// Check that a range covers the whole file except the placeholder.
    pub fn validate_byte_range(&self, byte_range: &[u64; 4], file_size: u64) -> Result<()> {
        let [start, before, after, rest] = *byte_range;
        if start != 0 {
            return Err(Error::Signing(format!("ByteRange must start at 0, got {}", start)));
        }
        if after + rest != file_size {
            return Err(Error::Signing(format!(
                "ByteRange must end at file size {}, got {}",
                file_size,
                after + rest
            )));
        }
        if after - before != self.placeholder_size as u64 {
            return Err(Error::Signing(format!(
                "ByteRange gap {} differs from the placeholder size {}",
                after.saturating_sub(before),
                self.placeholder_size
            )));
        }
        Ok(())
    }

    /// The `/Contents` value for `signature`, zero padded to the placeholder.
    pub fn encode_signature(&self, signature: &[u8]) -> Result<Vec<u8>> {
        let hex_len = signature.len() * 2;
        if hex_len + 2 > self.placeholder_size {
            return Err(Error::Signing(format!(
                "signature of {} bytes exceeds the reserved {} bytes",
                signature.len(),
                (self.placeholder_size - 2) / 2
            )));
        }
        let mut value = Vec::with_capacity(self.placeholder_size);
        value.push(b'<');
        append_hex(signature, &mut value);
        value.resize(self.placeholder_size - 1, b'0');
        value.push(b'>');
        Ok(value)
    }
}

impl Default for ByteRangeCalculator {
    fn default() -> Self {
        Self::new(8192)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_size() {
        let calc = ByteRangeCalculator::new(1024);
        assert_eq!(calc.placeholder_size(), 2050);
        assert_eq!(ByteRangeCalculator::new(4).generate_placeholder(), "<00000000>");
    }

    #[test]
    fn test_calculate_byte_range() {
        let calc = ByteRangeCalculator::new(49);
        let range = calc.calculate_byte_range(1000, 400).unwrap();
        assert_eq!(range, [0, 400, 500, 500]);
        assert!(calc.validate_byte_range(&range, 1000).is_ok());
        assert!(calc.validate_byte_range(&range, 1001).is_err());
        assert!(calc.calculate_byte_range(450, 400).is_err());
    }

    #[test]
    fn test_format_keeps_placeholder_width() {
        let placeholder = ByteRangeCalculator::byte_range_placeholder();
        assert_eq!(placeholder, "[0 0000000000 0000000000 0000000000]");
        let formatted = ByteRangeCalculator::format_byte_range(&[0, 100, 200, 300]).unwrap();
        assert_eq!(formatted.len(), placeholder.len());
        assert!(formatted.starts_with("[0 100 200 300]"));
        assert!(formatted[15..].bytes().all(|b| b == b' '));
    }

    #[test]
    fn test_encode_signature_pads() {
        let calc = ByteRangeCalculator::new(4);
        assert_eq!(calc.encode_signature(&[0xAB, 0xCD]).unwrap(), b"<ABCD0000>".to_vec());
        assert!(calc.encode_signature(&[0; 5]).is_err());
    }
}
