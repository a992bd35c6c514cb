//! Unicode identifier classification.
//!
//! Identifiers follow [UAX #31](https://www.unicode.org/reports/tr31/):
//! they start with `_` or an `XID_Start` code point and continue with
//! `XID_Continue` code points.

/// A single decoded UTF-8 scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Char {
    /// Number of bytes the scalar occupies in the input.
    pub len: usize,
    /// Decoded code point.
    pub cp: u32,
}

/// Returns whether `cp` may start an identifier.
#[inline]
pub fn is_identifier_start(cp: u32) -> bool {
    cp == u32::from(b'_') || char::from_u32(cp).map_or(false, unicode_ident::is_xid_start)
}

/// Returns whether `cp` may continue an identifier.
#[inline]
pub fn is_identifier_continue(cp: u32) -> bool {
    char::from_u32(cp).map_or(false, unicode_ident::is_xid_continue)
}

/// Decodes the first UTF-8 scalar of `bytes`.
///
/// Returns `None` for empty input and for any malformed sequence: invalid lead
/// byte, truncated sequence, bad continuation byte, overlong encoding,
/// surrogate, or a value past U+10FFFF.
pub fn peek_utf8(bytes: &[u8]) -> Option<Utf8Char> {
    let lead = *bytes.first()?;

    let (len, init) = match lead {
        0x00..=0x7F => return Some(Utf8Char { len: 1, cp: u32::from(lead) }),
        0xC2..=0xDF => (2, u32::from(lead & 0x1F)),
        0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
        0xF0..=0xF4 => (4, u32::from(lead & 0x07)),
        _ => return None,
    };

    let tail = bytes.get(1..len)?;

    let mut cp = init;
    for &byte in tail {
        if byte & 0xC0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | u32::from(byte & 0x3F);
    }

    const MIN: [u32; 5] = [0, 0, 0x80, 0x800, 0x10000];
    if cp < MIN[len] || (0xD800..=0xDFFF).contains(&cp) || cp > 0x10FFFF {
        return None;
    }

    Some(Utf8Char { len, cp })
}

/// Validate identifier.
///
/// Rules are:
/// - Must be at least 1 char long
/// - Must start with an underscore or an `XID_Start` character
/// - Must continue with `XID_Continue` characters only
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if is_identifier_start(first as u32) => chars.all(|c| is_identifier_continue(c as u32)),
        _ => false,
    }
}

/// Validate a `:` separated list of identifiers (e.g. `inputs:diffuse:color`).
pub fn is_valid_namespaced_identifier(name: &str) -> bool {
    name.split(':').all(is_valid_identifier)
}
