//! PDF syntax primitives.
//!
//! Free functions that append names, strings, numbers, references and dates
//! to a byte buffer. Numbers are always written in fixed-point notation: PDF
//! has no exponent syntax, so `1e-7` must come out as `0`, never as `1e-7`.

use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Timelike};

/// Fractional digits used for coordinates in content streams.
pub const COORD_PRECISION: u32 = 3;

/// Fractional digits used for generic real numbers in dictionaries.
pub const REAL_PRECISION: u32 = 5;

/// Largest precision `append_fixed` honours.
pub const MAX_PRECISION: u32 = 9;

/// Append `value` in fixed-point notation with at most `precision` fractional digits.
///
/// The fraction is truncated, not rounded, except that a fraction which is
/// within floating point noise of the next digit step counts as that step
/// (0.29 stays "0.29" instead of becoming "0.28"). Trailing zeros and a
/// trailing dot are stripped; negative zero is written as "0". Non-finite
/// values are written as "0".
///
/// # Examples
///
/// ```
/// use pdf_scribe::writer::primitives::append_fixed;
///
/// let mut buf = Vec::new();
/// append_fixed(0.1, 3, &mut buf);
/// buf.push(b' ');
/// append_fixed(-3.0, 3, &mut buf);
/// assert_eq!(buf, b"0.1 -3");
/// ```
pub fn append_fixed(value: f64, precision: u32, buf: &mut Vec<u8>) {
    if !value.is_finite() {
        buf.push(b'0');
        return;
    }
    let precision = precision.min(MAX_PRECISION);
    let negative = value < 0.0;
    let magnitude = value.abs().min(i64::MAX as f64 / 2.0);

    let mut int_part = magnitude.trunc() as i64;
    let scale = 10_i64.pow(precision);
    let scaled = (magnitude - int_part as f64) * scale as f64;
    let mut frac = scaled.floor() as i64;
    if scaled - (frac as f64) > 1.0 - 1e-6 {
        frac += 1;
    }
    if frac >= scale {
        int_part += 1;
        frac = 0;
    }

    if negative && (int_part != 0 || frac != 0) {
        buf.push(b'-');
    }
    buf.extend_from_slice(int_part.to_string().as_bytes());
    if frac != 0 {
        let digits = format!("{:0width$}", frac, width = precision as usize);
        buf.push(b'.');
        buf.extend_from_slice(digits.trim_end_matches('0').as_bytes());
    }
}

/// Format a number with [`append_fixed`] into a new string.
pub fn format_fixed(value: f64, precision: u32) -> String {
    let mut buf = Vec::new();
    append_fixed(value, precision, &mut buf);
    // append_fixed only produces ASCII
    String::from_utf8_lossy(&buf).into_owned()
}

/// Append a coordinate value (precision [`COORD_PRECISION`]).
pub fn append_number(value: f64, buf: &mut Vec<u8>) {
    append_fixed(value, COORD_PRECISION, buf);
}

/// Append `x y` separated by a space.
pub fn append_point(x: f64, y: f64, buf: &mut Vec<u8>) {
    append_number(x, buf);
    buf.push(b' ');
    append_number(y, buf);
}

/// Whether `byte` may appear unescaped in a name.
fn is_regular_name_byte(byte: u8) -> bool {
    matches!(byte,
        b'!'
        | b'"'
        | b'$'..=b'&'
        | b'\''
        | b'*'..=b'.'
        | b'0'..=b'9'
        | b';'
        | b'='
        | b'?'
        | b'@'
        | b'A'..=b'Z'
        | b'^'..=b'z'
        | b'|'
        | b'~')
}

/// Append a name, escaping delimiters and non-printable bytes as `#XX`.
pub fn append_name(name: &str, buf: &mut Vec<u8>) {
    buf.push(b'/');
    for byte in name.bytes() {
        if is_regular_name_byte(byte) {
            buf.push(byte);
        } else {
            buf.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

/// Append a literal string `( ... )`.
///
/// Parentheses and backslashes are escaped; control and non-ASCII bytes
/// use octal escapes so the result survives line-ending conversion.
pub fn append_literal_string(data: &[u8], buf: &mut Vec<u8>) {
    buf.push(b'(');
    for &byte in data {
        match byte {
            b'(' => buf.extend_from_slice(b"\\("),
            b')' => buf.extend_from_slice(b"\\)"),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0x20..=0x7E => buf.push(byte),
            _ => buf.extend_from_slice(format!("\\{:03o}", byte).as_bytes()),
        }
    }
    buf.push(b')');
}

/// Append a hex string `< ... >` in upper case.
pub fn append_hex_string(data: &[u8], buf: &mut Vec<u8>) {
    buf.push(b'<');
    append_hex(data, buf);
    buf.push(b'>');
}

/// Append the upper case hex digits of `data` without delimiters.
pub fn append_hex(data: &[u8], buf: &mut Vec<u8>) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    buf.reserve(data.len() * 2);
    for &byte in data {
        buf.push(HEX[(byte >> 4) as usize]);
        buf.push(HEX[(byte & 0x0F) as usize]);
    }
}

/// Encode a text string (`/Title`, `/Alt`, `/ActualText`, ...).
///
/// Printable ASCII passes through unchanged; anything else becomes
/// UTF-16BE with a byte order mark.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.bytes().all(|b| (0x20..=0x7E).contains(&b) || b == b'\n' || b == b'\r' || b == b'\t') {
        return text.as_bytes().to_vec();
    }
    let mut out = Vec::with_capacity(2 + text.len() * 2);
    out.extend_from_slice(&[0xFE, 0xFF]);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Append a text string, literal when plain ASCII, otherwise UTF-16BE hex.
pub fn append_text_string(text: &str, buf: &mut Vec<u8>) {
    let encoded = encode_text_string(text);
    if encoded.starts_with(&[0xFE, 0xFF]) {
        append_hex_string(&encoded, buf);
    } else {
        append_literal_string(&encoded, buf);
    }
}

/// Append an indirect reference `id 0 R`.
pub fn append_ref(id: u32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(id.to_string().as_bytes());
    buf.extend_from_slice(b" 0 R");
}

/// Render a PDF date string `D:YYYYMMDDHHmmSS+HH'mm'`.
pub fn format_pdf_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    let offset_secs = date.offset().fix().local_minus_utc();
    let tz = if offset_secs == 0 {
        "Z".to_string()
    } else {
        let sign = if offset_secs < 0 { '-' } else { '+' };
        let abs = offset_secs.abs();
        format!("{}{:02}'{:02}'", sign, abs / 3600, (abs % 3600) / 60)
    };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{}",
        date.year(),
        date.month(),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        tz
    )
}

/// Render the ISO 8601 timestamp used in XMP packets.
pub fn format_xmp_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

/// Lower-case hex of arbitrary bytes (document ids, checksums).
pub fn hex_lower(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: f64, p: u32) -> String {
        format_fixed(v, p)
    }

    #[test]
    fn test_fixed_basic() {
        assert_eq!(fixed(0.1, 3), "0.1");
        assert_eq!(fixed(-3.0, 3), "-3");
        assert_eq!(fixed(595.0, 3), "595");
        assert_eq!(fixed(1.25, 1), "1.2");
        assert_eq!(fixed(0.29, 2), "0.29");
        assert_eq!(fixed(56.9999999999, 3), "57");
    }

    #[test]
    fn test_fixed_truncates() {
        assert_eq!(fixed(2.71828, 3), "2.718");
        assert_eq!(fixed(-2.71828, 2), "-2.71");
    }

    #[test]
    fn test_fixed_tiny_and_negative_zero() {
        assert_eq!(fixed(1e-7, 3), "0");
        assert_eq!(fixed(-1e-7, 3), "0");
        assert_eq!(fixed(-0.0, 3), "0");
        assert_eq!(fixed(123456.0, 0), "123456");
        assert_eq!(fixed(f64::NAN, 3), "0");
    }

    #[test]
    fn test_name_escaping() {
        let mut buf = Vec::new();
        append_name("Name With Space", &mut buf);
        assert_eq!(buf, b"/Name#20With#20Space");
        buf.clear();
        append_name("A/B#(x)", &mut buf);
        assert_eq!(buf, b"/A#2FB#23#28x#29");
    }

    #[test]
    fn test_literal_string_escaping() {
        let mut buf = Vec::new();
        append_literal_string(b"a(b)c\\d\n\x01", &mut buf);
        assert_eq!(buf, b"(a\\(b\\)c\\\\d\\n\\001)");
    }

    #[test]
    fn test_hex_string() {
        let mut buf = Vec::new();
        append_hex_string(&[0x00, 0xAB, 0x7F], &mut buf);
        assert_eq!(buf, b"<00AB7F>");
    }

    #[test]
    fn test_text_string_encoding() {
        assert_eq!(encode_text_string("Hello"), b"Hello");
        assert_eq!(encode_text_string("é"), vec![0xFE, 0xFF, 0x00, 0xE9]);
        let mut buf = Vec::new();
        append_text_string("é", &mut buf);
        assert_eq!(buf, b"<FEFF00E9>");
    }

    #[test]
    fn test_date_format() {
        let date = DateTime::parse_from_rfc3339("2024-03-05T07:08:09+01:30").unwrap();
        assert_eq!(format_pdf_date(&date), "D:20240305070809+01'30'");
        let utc = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z").unwrap();
        assert_eq!(format_pdf_date(&utc), "D:20240305070809Z");
        assert_eq!(format_xmp_date(&date), "2024-03-05T07:08:09+01:30");
    }

    #[test]
    fn test_ref() {
        let mut buf = Vec::new();
        append_ref(42, &mut buf);
        assert_eq!(buf, b"42 0 R");
    }
}
