//! Escape processing and key-name case transforms.
//!
//! Escapes are processed on demand when a string value is materialized;
//! the scanner only records that a string contains a backslash.

use crate::core::errors::JsonError;

fn invalid(what: &str, at: usize) -> JsonError {
    JsonError::InvalidData(format!("{what} in string escape at byte {at}"))
}

/// Process the escapes in `raw` (the bytes between the quotes) into a fresh
/// buffer. Handles the eight named escapes plus `\uXXXX`, joining UTF-16
/// surrogate pairs.
pub(crate) fn unescape(raw: &[u8]) -> Result<Vec<u8>, JsonError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let Some(&esc) = raw.get(i + 1) else {
            return Err(invalid("dangling backslash", i));
        };
        match esc {
            b'"' | b'\\' | b'/' => out.push(esc),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'u' => {
                let (c, consumed) = unescape_unicode(raw, i)?;
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                i += consumed;
                continue;
            }
            _ => return Err(invalid("unknown escape", i)),
        }
        i += 2;
    }
    Ok(out)
}

/// Decode `\uXXXX` at `raw[i..]`, consuming a trailing low surrogate when
/// the first unit is a lead surrogate. Returns the scalar and the number of
/// bytes consumed from `i`.
fn unescape_unicode(raw: &[u8], i: usize) -> Result<(char, usize), JsonError> {
    let first = parse_u4(raw, i + 2).ok_or_else(|| invalid("truncated \\u escape", i))?;
    match first {
        0xDC00..=0xDFFF => Err(invalid("unpaired low surrogate", i)),
        0xD800..=0xDBFF => {
            // lead surrogate: the pair must follow immediately
            if raw.get(i + 6..i + 8) != Some(b"\\u") {
                return Err(invalid("unpaired lead surrogate", i));
            }
            let second =
                parse_u4(raw, i + 8).ok_or_else(|| invalid("truncated \\u escape", i + 6))?;
            if !(0xDC00..=0xDFFF).contains(&second) {
                return Err(invalid("unpaired lead surrogate", i));
            }
            let scalar =
                0x1_0000 + ((u32::from(first) - 0xD800) << 10 | (u32::from(second) - 0xDC00));
            match char::from_u32(scalar) {
                Some(c) => Ok((c, 12)),
                None => Err(invalid("invalid surrogate pair", i)),
            }
        }
        _ => match char::from_u32(u32::from(first)) {
            Some(c) => Ok((c, 6)),
            None => Err(invalid("invalid code point", i)),
        },
    }
}

fn parse_u4(raw: &[u8], at: usize) -> Option<u16> {
    let hex = raw.get(at..at + 4)?;
    let mut n: u16 = 0;
    for &c in hex {
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => return None,
        };
        n = (n << 4) + u16::from(digit);
    }
    Some(n)
}

/// Materialize a string value from its data span.
pub(crate) fn decode_string(raw: &[u8], uses_escaping: bool) -> Result<String, JsonError> {
    if uses_escaping {
        let bytes = unescape(raw)?;
        String::from_utf8(bytes).map_err(|e| JsonError::InvalidData(e.to_string()))
    } else {
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| JsonError::InvalidData(e.to_string()))
    }
}

/// Collapse `_x` into uppercase `X`: `user_name` becomes `userName`.
/// A leading or trailing underscore is preserved.
pub(crate) fn snake_to_camel(raw: &[u8], out: &mut Vec<u8>) {
    out.clear();
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b == b'_' && i > 0 {
            if let Some(&next) = raw.get(i + 1) {
                if next.is_ascii_lowercase() {
                    out.push(next.to_ascii_uppercase());
                    i += 2;
                    continue;
                }
            }
        }
        out.push(b);
        i += 1;
    }
}

/// The inverse transform for encoding: `userName` becomes `user_name`.
pub(crate) fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() && !out.is_empty() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
