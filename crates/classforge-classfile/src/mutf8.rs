//! Modified UTF-8, the string encoding of `CONSTANT_Utf8` entries
//!
//! Differs from standard UTF-8 in two ways: NUL is encoded as `C0 80`, and
//! supplementary characters are stored as two encoded UTF-16 surrogates.

use crate::error::ClassFileError;

/// Decode modified UTF-8 bytes
///
/// # Errors
/// Returns [`ClassFileError::InvalidUtf8`] on malformed sequences or
/// unpaired surrogates
pub fn decode(bytes: &[u8]) -> Result<String, ClassFileError> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        match b0 {
            0x01..=0x7F => {
                units.push(u16::from(b0));
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = continuation(bytes, i + 1)?;
                units.push((u16::from(b0 & 0x1F) << 6) | b1);
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = continuation(bytes, i + 1)?;
                let b2 = continuation(bytes, i + 2)?;
                units.push((u16::from(b0 & 0x0F) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            _ => return Err(ClassFileError::InvalidUtf8 { offset: i }),
        }
    }
    String::from_utf16(&units).map_err(|_| ClassFileError::InvalidUtf8 { offset: bytes.len() })
}

fn continuation(bytes: &[u8], at: usize) -> Result<u16, ClassFileError> {
    match bytes.get(at) {
        Some(b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(ClassFileError::InvalidUtf8 { offset: at }),
    }
}

/// Encode a string as modified UTF-8
#[must_use]
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
